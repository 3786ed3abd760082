use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use tokio::sync::RwLock;
use uuid::Uuid;

use suficiencia_api::domain::types::SystemSettings;
use suficiencia_api::router::build_router;
use suficiencia_api::state::AppState;
use suficiencia_api_schema::usuarios;
use suficiencia_testing::auth::{MockAuth, TEST_API_KEY, api_key_header, test_token_service};

fn server(db: DatabaseConnection) -> TestServer {
    let state = AppState {
        db: Arc::new(db),
        tokens: Arc::new(test_token_service()),
        api_key: Arc::from(TEST_API_KEY),
        settings: Arc::new(RwLock::new(SystemSettings::default())),
        identity: None,
        started_at: Instant::now(),
        environment: Arc::from("test"),
        bcrypt_cost: 4,
        default_page_size: 20,
        max_page_size: 100,
    };
    TestServer::new(build_router(state)).unwrap()
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

/// Database answering the session lookup for one active user.
fn active_user_db(id: Uuid) -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![usuarios::Model {
            id,
            codigo_institucional: None,
            email: format!("{id}@uni.test"),
            nombres: "Ana".to_owned(),
            apellidos: "Pérez".to_owned(),
            password_hash: None,
            activo: true,
            fecha_creacion: Utc::now(),
            fecha_actualizacion: Utc::now(),
        }]])
        .into_connection()
}

#[tokio::test]
async fn should_serve_health_without_api_key() {
    let server = server(empty_db());

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["environment"], "test");
}

#[tokio::test]
async fn should_require_api_key_on_api_routes() {
    let server = server(empty_db());

    let response = server.get("/api/courses").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<serde_json::Value>()["code"], "INVALID_API_KEY");
}

#[tokio::test]
async fn should_require_bearer_token_after_api_key() {
    let server = server(empty_db());
    let (name, value) = api_key_header();

    let response = server.get("/api/auth/verify").add_header(name, value).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<serde_json::Value>()["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn should_forbid_student_on_admin_routes() {
    let id = Uuid::now_v7();
    let server = server(active_user_db(id));
    let (key_name, key_value) = api_key_header();
    let (auth_name, auth_value) = MockAuth::student(id).authorization();

    let response = server
        .get("/api/admin/users")
        .add_header(key_name, key_value)
        .add_header(auth_name, auth_value)
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["code"], "INSUFFICIENT_ROLE");
    assert_eq!(body["details"]["required_roles"][0], "administrador");
}

#[tokio::test]
async fn should_gate_admin_member_routes() {
    let course_id = Uuid::now_v7();
    let paths = [
        format!("/api/admin/students/{}/courses", Uuid::now_v7()),
        format!("/api/admin/teachers/{}/courses", Uuid::now_v7()),
        "/api/admin/registrations/recent".to_owned(),
        "/api/admin/activity".to_owned(),
    ];
    for path in paths {
        let id = Uuid::now_v7();
        let server = server(active_user_db(id));
        let (key_name, key_value) = api_key_header();
        let (auth_name, auth_value) = MockAuth::teacher(id).authorization();

        let response = server
            .get(&path)
            .add_header(key_name, key_value)
            .add_header(auth_name, auth_value)
            .await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN, "{path}");
    }

    let id = Uuid::now_v7();
    let server = server(active_user_db(id));
    let (key_name, key_value) = api_key_header();
    let (auth_name, auth_value) = MockAuth::student(id).authorization();
    let response = server
        .post(&format!("/api/admin/courses/{course_id}/enroll-student"))
        .add_header(key_name, key_value)
        .add_header(auth_name, auth_value)
        .json(&serde_json::json!({ "usuario_id": id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn should_report_unavailable_admin_features() {
    let id = Uuid::now_v7();
    let server = server(active_user_db(id));
    let (key_name, key_value) = api_key_header();
    let (auth_name, auth_value) = MockAuth::admin(id).authorization();

    let response = server
        .post("/api/admin/backup")
        .add_header(key_name, key_value)
        .add_header(auth_name, auth_value)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        response.json::<serde_json::Value>()["code"],
        "FEATURE_NOT_AVAILABLE"
    );
}

#[tokio::test]
async fn should_answer_unknown_route_with_not_found() {
    let server = server(empty_db());
    let (name, value) = api_key_header();

    let response = server.get("/api/nope").add_header(name, value).await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<serde_json::Value>()["code"], "ROUTE_NOT_FOUND");
}
