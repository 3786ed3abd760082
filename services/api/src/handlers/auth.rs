use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use suficiencia_auth_types::identity::Caller;

use crate::error::ApiError;
use crate::extract::AppJson;
use crate::handlers::{MessageResponse, UserResponse};
use crate::state::AppState;
use crate::usecase::auth::{
    LoginInput, LoginUseCase, RefreshUseCase, RegisterInput, RegisterUseCase,
};
use crate::usecase::user::GetUserUseCase;

// ── POST /api/auth/login ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub token_duration_ms: u64,
    pub refresh_duration_ms: u64,
    pub usuario: UserResponse,
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let usecase = LoginUseCase {
        users: state.user_repo(),
        identity: state.identity_provider(),
        tokens: state.tokens.clone(),
    };
    let out = usecase
        .execute(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok(Json(LoginResponse {
        token: out.tokens.access_token,
        refresh_token: out.tokens.refresh_token,
        token_duration_ms: out.tokens.access_ttl_ms,
        refresh_duration_ms: out.tokens.refresh_ttl_ms,
        usuario: out.user.into(),
    }))
}

// ── POST /api/auth/register ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub usuario: UserResponse,
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let allow_registration = state.settings.read().await.allow_registration;
    let usecase = RegisterUseCase {
        users: state.user_repo(),
        bcrypt_cost: state.bcrypt_cost,
        allow_registration,
    };
    let user = usecase
        .execute(RegisterInput {
            codigo_institucional: body.codigo_institucional,
            email: body.email,
            nombres: body.nombres,
            apellidos: body.apellidos,
            password: body.password,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Usuario registrado exitosamente",
            usuario: user.into(),
        }),
    ))
}

// ── POST /api/auth/refresh ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub refresh_token: String,
    pub message: &'static str,
}

pub async fn refresh(
    State(state): State<AppState>,
    AppJson(body): AppJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let usecase = RefreshUseCase {
        tokens: state.tokens.clone(),
    };
    let token = usecase.execute(body.refresh_token.as_deref()).await?;
    Ok(Json(RefreshResponse {
        token,
        refresh_token: body.refresh_token.unwrap_or_default(),
        message: "Token renovado exitosamente",
    }))
}

// ── POST /api/auth/logout ────────────────────────────────────────────────────

/// Tokens are stateless; clients drop them.
pub async fn logout(_caller: Caller) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Sesión cerrada exitosamente",
    })
}

// ── GET /api/auth/verify ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub usuario: UserResponse,
}

pub async fn verify(
    caller: Caller,
    State(state): State<AppState>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let usecase = GetUserUseCase {
        repo: state.user_repo(),
    };
    let user = usecase.execute(caller.usuario_id).await?;
    Ok(Json(VerifyResponse {
        valid: true,
        usuario: user.into(),
    }))
}
