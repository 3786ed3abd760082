use std::sync::Arc;
use std::time::Instant;

use sea_orm::Database;
use tokio::sync::RwLock;
use tracing::info;

use suficiencia_core::config::Config;
use suficiencia_core::tracing::init_tracing;

use suficiencia_api::config::ApiConfig;
use suficiencia_api::domain::types::SystemSettings;
use suficiencia_api::error::expose_internal_errors;
use suficiencia_api::infra::identity::HttpIdentityProvider;
use suficiencia_api::router::build_router;
use suficiencia_api::state::AppState;

#[tokio::main]
async fn main() {
    let config = ApiConfig::from_env()
        .expect("failed to load configuration")
        .validate()
        .expect("invalid configuration");

    init_tracing(&config.config.log_level);
    expose_internal_errors(!config.config.is_production());

    let db = Database::connect(config.connect_options())
        .await
        .expect("failed to connect to database");

    let identity = config
        .config
        .identity_provider_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .map(HttpIdentityProvider::new);
    if identity.is_none() {
        info!("no identity provider configured, verifying passwords locally");
    }

    let state = AppState {
        db: Arc::new(db),
        tokens: Arc::new(config.token_service()),
        api_key: Arc::from(config.config.api_key.as_str()),
        settings: Arc::new(RwLock::new(SystemSettings::default())),
        identity,
        started_at: Instant::now(),
        environment: Arc::from(config.config.app_env.as_str()),
        bcrypt_cost: config.config.bcrypt_cost,
        default_page_size: config.config.default_page_size,
        max_page_size: config.config.max_page_size,
    };

    let router = build_router(state);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(environment = %config.config.app_env, "api service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
