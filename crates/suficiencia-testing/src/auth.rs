//! Token and header helpers for router tests.
//!
//! `MockAuth` signs real tokens with the test secrets so requests pass the
//! same API key and bearer gates as production traffic.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use uuid::Uuid;

use suficiencia_auth_types::token::{TokenService, TokenSubject};
use suficiencia_domain::role::{Role, RoleSet};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_JWT_REFRESH_SECRET: &str = "test-jwt-refresh-secret";

pub const X_API_KEY: &str = "x-api-key";

/// Token service signing with the test secrets (15m / 7d lifetimes).
pub fn test_token_service() -> TokenService {
    TokenService::new(
        TEST_JWT_SECRET,
        TEST_JWT_REFRESH_SECRET,
        Duration::from_secs(15 * 60),
        Duration::from_secs(7 * 86_400),
    )
}

/// Identity to sign into test requests.
#[derive(Debug, Clone)]
pub struct MockAuth {
    pub usuario_id: Uuid,
    pub email: String,
    pub roles: RoleSet,
}

impl MockAuth {
    pub fn new(usuario_id: Uuid, roles: &[Role]) -> Self {
        Self {
            usuario_id,
            email: format!("{usuario_id}@test.local"),
            roles: roles.iter().copied().collect(),
        }
    }

    pub fn student(usuario_id: Uuid) -> Self {
        Self::new(usuario_id, &[Role::Student])
    }

    pub fn teacher(usuario_id: Uuid) -> Self {
        Self::new(usuario_id, &[Role::Teacher])
    }

    pub fn admin(usuario_id: Uuid) -> Self {
        Self::new(usuario_id, &[Role::Administrator])
    }

    /// A signed access token for this identity.
    pub fn access_token(&self) -> String {
        let subject = TokenSubject {
            usuario_id: self.usuario_id,
            email: self.email.clone(),
            roles: self.roles.clone(),
        };
        test_token_service()
            .issue_pair(&subject)
            .expect("sign test token")
            .access_token
    }

    /// `Authorization: Bearer <token>` header pair.
    pub fn authorization(&self) -> (HeaderName, HeaderValue) {
        let value = HeaderValue::from_str(&format!("Bearer {}", self.access_token()))
            .expect("token is a valid header value");
        (axum::http::header::AUTHORIZATION, value)
    }
}

/// `x-api-key` header pair carrying the test key.
pub fn api_key_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(X_API_KEY),
        HeaderValue::from_static(TEST_API_KEY),
    )
}
