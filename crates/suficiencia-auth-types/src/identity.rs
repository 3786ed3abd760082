//! Authenticated caller extraction.

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use http::request::Parts;
use http::{HeaderMap, StatusCode};
use uuid::Uuid;

use suficiencia_core::error::ErrorBody;
use suficiencia_domain::role::RoleSet;

use crate::token::Claims;

/// The authenticated user of the current request.
///
/// Inserted into request extensions by the authentication gate after the
/// bearer token verified and the user was found active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub usuario_id: Uuid,
    pub email: String,
    pub roles: RoleSet,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            usuario_id: claims.usuario_id,
            email: claims.email,
            roles: claims.roles,
        }
    }
}

/// Rejection when a handler asks for a [`Caller`] on a route the
/// authentication gate did not run on.
#[derive(Debug)]
pub struct MissingCaller;

impl IntoResponse for MissingCaller {
    fn into_response(self) -> Response {
        ErrorBody::new("INVALID_TOKEN", "authentication required")
            .into_response_with(StatusCode::UNAUTHORIZED)
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = MissingCaller;

    // axum-core 0.5 defines this as `fn -> impl Future + Send`; extract synchronously
    // and hand back a 'static future.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let caller = parts.extensions.get::<Caller>().cloned();
        async move { caller.ok_or(MissingCaller) }
    }
}

/// Token from an `Authorization: Bearer <token>` header, if present and well-formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_owned())
        .filter(|t| !t.is_empty())
}
