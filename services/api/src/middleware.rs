//! Request gates, evaluated in order: API key, bearer token, role, resource.
//!
//! Each gate short-circuits with its own error; later gates read what earlier
//! ones stored in request extensions.

use std::collections::HashMap;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use suficiencia_auth_types::identity::{Caller, bearer_token};
use suficiencia_domain::enrollment::CourseRelation;
use suficiencia_domain::role::Role;

use crate::error::ApiError;
use crate::extract::AppPath;
use crate::state::AppState;
use crate::usecase::session::{
    AuthenticateUseCase, CourseAccessUseCase, RequireStudentUseCase, authorize,
};

pub const X_API_KEY: &str = "x-api-key";

/// Paths served without an API key.
pub const PUBLIC_PATHS: [&str; 5] = ["/", "/health", "/docs", "/docs/json", "/api/auth/login"];

/// Student linkage of the caller, set by [`require_student`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentContext {
    pub estudiante_id: Uuid,
}

/// Course relation of the caller, set by [`require_course_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseContext {
    pub curso_id: Uuid,
    pub relation: CourseRelation,
}

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }
    let presented = request
        .headers()
        .get(X_API_KEY)
        .and_then(|v| v.to_str().ok());
    match presented {
        Some(key) if key == state.api_key.as_ref() => Ok(next.run(request).await),
        _ => Err(ApiError::InvalidApiKey),
    }
}

pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers());
    let usecase = AuthenticateUseCase {
        repo: state.session_repo(),
        tokens: state.tokens.clone(),
    };
    let caller = usecase.execute(token.as_deref()).await?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Role gate; wrap with `from_fn(move |req, next| require_roles(ROLES, req, next))`.
pub async fn require_roles(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = request
        .extensions()
        .get::<Caller>()
        .ok_or(ApiError::InvalidToken)?;
    authorize(&caller.roles, allowed)?;
    Ok(next.run(request).await)
}

pub async fn require_student(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let usuario_id = request
        .extensions()
        .get::<Caller>()
        .map(|c| c.usuario_id)
        .ok_or(ApiError::InvalidToken)?;
    let usecase = RequireStudentUseCase {
        repo: state.session_repo(),
    };
    let estudiante_id = usecase.execute(usuario_id).await?;
    request
        .extensions_mut()
        .insert(StudentContext { estudiante_id });
    Ok(next.run(request).await)
}

/// Course gate on the `{id}` path parameter.
pub async fn require_course_access(
    State(state): State<AppState>,
    AppPath(params): AppPath<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let usuario_id = request
        .extensions()
        .get::<Caller>()
        .map(|c| c.usuario_id)
        .ok_or(ApiError::InvalidToken)?;
    let curso_id = params
        .get("id")
        .and_then(|v| v.parse::<Uuid>().ok())
        .ok_or_else(|| ApiError::validation("id", "must be a UUID"))?;
    let usecase = CourseAccessUseCase {
        repo: state.session_repo(),
    };
    let relation = usecase.execute(usuario_id, curso_id).await?;
    request
        .extensions_mut()
        .insert(CourseContext { curso_id, relation });
    Ok(next.run(request).await)
}
