use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since process start.
    pub uptime: f64,
    pub environment: String,
}

impl HealthStatus {
    pub fn ok(started_at: Instant, environment: &str) -> Self {
        Self {
            status: "ok",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            uptime: started_at.elapsed().as_secs_f64(),
            environment: environment.to_owned(),
        }
    }
}
