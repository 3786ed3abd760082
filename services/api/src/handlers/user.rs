use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use suficiencia_auth_types::identity::Caller;

use crate::error::ApiError;
use crate::extract::{AppJson, AppPath};
use crate::handlers::{EnrollmentResponse, UserResponse};
use crate::middleware::StudentContext;
use crate::state::AppState;
use crate::usecase::enrollment::EnrollStudentUseCase;
use crate::usecase::user::{GetUserUseCase, UpdateProfileInput, UpdateProfileUseCase};

// ── GET /api/users/profile ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ProfileResponse {
    pub usuario: UserResponse,
}

pub async fn get_profile(
    caller: Caller,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let usecase = GetUserUseCase {
        repo: state.user_repo(),
    };
    let user = usecase.execute(caller.usuario_id).await?;
    Ok(Json(ProfileResponse {
        usuario: user.into(),
    }))
}

// ── PUT /api/users/profile ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub nombres: Option<String>,
    pub apellidos: Option<String>,
}

#[derive(Serialize)]
pub struct UpdateProfileResponse {
    pub message: &'static str,
    pub usuario: UserResponse,
}

pub async fn update_profile(
    caller: Caller,
    State(state): State<AppState>,
    AppJson(body): AppJson<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    let usecase = UpdateProfileUseCase {
        repo: state.user_repo(),
    };
    let user = usecase
        .execute(
            caller.usuario_id,
            UpdateProfileInput {
                nombres: body.nombres,
                apellidos: body.apellidos,
            },
        )
        .await?;
    Ok(Json(UpdateProfileResponse {
        message: "Perfil actualizado exitosamente",
        usuario: user.into(),
    }))
}

// ── POST /api/users/enroll/{id} ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct EnrollResponse {
    pub message: &'static str,
    pub enrollment: EnrollmentResponse,
}

pub async fn enroll_self(
    caller: Caller,
    Extension(student): Extension<StudentContext>,
    State(state): State<AppState>,
    AppPath(curso_id): AppPath<Uuid>,
) -> Result<(StatusCode, Json<EnrollResponse>), ApiError> {
    let usecase = EnrollStudentUseCase {
        courses: state.course_repo(),
        users: state.user_repo(),
        enrollments: state.enrollment_repo(),
    };
    let enrollment = usecase.execute(curso_id, caller.usuario_id).await?;
    info!(
        curso_id = %curso_id,
        estudiante_id = %student.estudiante_id,
        "student self-enrolled"
    );
    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            message: "Inscripción realizada exitosamente",
            enrollment: enrollment.into(),
        }),
    ))
}
