use std::sync::Arc;

use anyhow::Context as _;
use reqwest::StatusCode;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use suficiencia_api_schema::usuarios;

use crate::domain::repository::IdentityProvider;
use crate::domain::types::VerifiedIdentity;
use crate::error::ApiError;
use crate::infra::password::verify_password;

// ── HTTP directory ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DirectoryRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct DirectoryResponse {
    success: bool,
    user: Option<DirectoryUser>,
}

#[derive(Deserialize)]
struct DirectoryUser {
    email: String,
    cedula: Option<String>,
    nombres: String,
    apellidos: String,
}

/// Institutional directory answering `POST {email, password}` with
/// `{success, user: {email, cedula, nombres, apellidos}}`.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    pub client: reqwest::Client,
    pub url: Arc<str>,
}

impl HttpIdentityProvider {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: Arc::from(url),
        }
    }
}

impl IdentityProvider for HttpIdentityProvider {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedIdentity>, ApiError> {
        let response = self
            .client
            .post(self.url.as_ref())
            .json(&DirectoryRequest { email, password })
            .send()
            .await
            .context("call identity provider")?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        let body: DirectoryResponse = response
            .error_for_status()
            .context("identity provider status")?
            .json()
            .await
            .context("decode identity provider response")?;

        Ok(match body {
            DirectoryResponse {
                success: true,
                user: Some(user),
            } => Some(VerifiedIdentity {
                email: user.email,
                codigo_institucional: user.cedula.filter(|c| !c.is_empty()),
                nombres: user.nombres,
                apellidos: user.apellidos,
            }),
            _ => None,
        })
    }
}

// ── Local password check ─────────────────────────────────────────────────────

/// Verifies against `usuarios.password_hash`. Users without a stored hash
/// cannot log in locally.
#[derive(Clone)]
pub struct LocalIdentityProvider {
    pub db: Arc<DatabaseConnection>,
}

impl IdentityProvider for LocalIdentityProvider {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedIdentity>, ApiError> {
        let Some(user) = usuarios::Entity::find()
            .filter(usuarios::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .context("find user for local login")?
        else {
            return Ok(None);
        };
        let Some(hash) = user.password_hash.clone() else {
            return Ok(None);
        };
        if !verify_password(password.to_owned(), hash).await? {
            return Ok(None);
        }
        Ok(Some(VerifiedIdentity {
            email: user.email,
            codigo_institucional: user.codigo_institucional,
            nombres: user.nombres,
            apellidos: user.apellidos,
        }))
    }
}

// ── Directory ────────────────────────────────────────────────────────────────

/// The identity provider selected by configuration.
#[derive(Clone)]
pub enum Directory {
    Http(HttpIdentityProvider),
    Local(LocalIdentityProvider),
}

impl IdentityProvider for Directory {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedIdentity>, ApiError> {
        match self {
            Self::Http(p) => p.verify(email, password).await,
            Self::Local(p) => p.verify(email, password).await,
        }
    }
}
