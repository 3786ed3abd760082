use axum::{Json, extract::State};
use serde::Serialize;

use suficiencia_core::health::HealthStatus;

use crate::state::AppState;

#[derive(Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub docs: &'static str,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "API Plataforma Educativa",
        version: env!("CARGO_PKG_VERSION"),
        docs: "/docs",
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::ok(state.started_at, &state.environment))
}
