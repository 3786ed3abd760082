use std::sync::Arc;

use uuid::Uuid;

use suficiencia_auth_types::identity::Caller;
use suficiencia_auth_types::token::{TokenError, TokenService};
use suficiencia_domain::enrollment::CourseRelation;
use suficiencia_domain::role::{Role, RoleSet};

use crate::domain::repository::SessionRepository;
use crate::error::ApiError;

// ── Authenticate ─────────────────────────────────────────────────────────────

pub struct AuthenticateUseCase<R: SessionRepository> {
    pub repo: R,
    pub tokens: Arc<TokenService>,
}

impl<R: SessionRepository> AuthenticateUseCase<R> {
    /// Verify the bearer token and require its user to exist and be active.
    pub async fn execute(&self, token: Option<&str>) -> Result<Caller, ApiError> {
        let token = token.ok_or(ApiError::InvalidToken)?;
        let claims = self.tokens.verify_access(token).map_err(|e| match e {
            TokenError::Expired => ApiError::TokenExpired,
            _ => ApiError::InvalidToken,
        })?;
        if claims.usuario_id.is_nil() {
            return Err(ApiError::InvalidToken);
        }
        match self.repo.user_active(claims.usuario_id).await? {
            Some(true) => Ok(Caller::from(claims)),
            _ => Err(ApiError::UserInactive),
        }
    }
}

// ── Authorize ────────────────────────────────────────────────────────────────

/// Pass when the caller holds at least one of `allowed`.
pub fn authorize(roles: &RoleSet, allowed: &[Role]) -> Result<(), ApiError> {
    if roles.intersects(allowed) {
        Ok(())
    } else {
        Err(ApiError::InsufficientRole {
            required: allowed.to_vec(),
        })
    }
}

// ── RequireStudent ───────────────────────────────────────────────────────────

pub struct RequireStudentUseCase<R: SessionRepository> {
    pub repo: R,
}

impl<R: SessionRepository> RequireStudentUseCase<R> {
    /// The caller's student linkage id.
    pub async fn execute(&self, usuario_id: Uuid) -> Result<Uuid, ApiError> {
        self.repo
            .student_id(usuario_id)
            .await?
            .ok_or(ApiError::StudentRequired)
    }
}

// ── RequireCourseAccess ──────────────────────────────────────────────────────

pub struct CourseAccessUseCase<R: SessionRepository> {
    pub repo: R,
}

impl<R: SessionRepository> CourseAccessUseCase<R> {
    pub async fn execute(
        &self,
        usuario_id: Uuid,
        curso_id: Uuid,
    ) -> Result<CourseRelation, ApiError> {
        self.repo
            .course_relation(usuario_id, curso_id)
            .await?
            .ok_or(ApiError::CourseAccessDenied)
    }
}
