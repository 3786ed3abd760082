use std::sync::Arc;

use uuid::Uuid;

use suficiencia_api::error::ApiError;
use suficiencia_api::usecase::auth::{
    LoginInput, LoginUseCase, RefreshUseCase, RegisterInput, RegisterUseCase,
};
use suficiencia_api::usecase::session::AuthenticateUseCase;
use suficiencia_auth_types::token::TokenSubject;
use suficiencia_domain::role::{Role, RoleSet};
use suficiencia_testing::auth::{MockAuth, test_token_service};

use crate::helpers::{MockIdentityProvider, MockSessionRepo, MockUserRepo, test_user};

fn login_input(email: &str, password: &str) -> LoginInput {
    LoginInput {
        email: Some(email.to_owned()),
        password: Some(password.to_owned()),
    }
}

// ── LoginUseCase ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_provision_student_on_first_login() {
    let users = MockUserRepo::default();
    let handle = users.users_handle();
    let usecase = LoginUseCase {
        users,
        identity: MockIdentityProvider::accepting("ana@uni.test", "secret"),
        tokens: Arc::new(test_token_service()),
    };

    let out = usecase
        .execute(login_input("ana@uni.test", "secret"))
        .await
        .unwrap();

    assert_eq!(out.user.email, "ana@uni.test");
    assert_eq!(out.user.roles.to_vec(), vec![Role::Student]);
    assert_eq!(out.tokens.access_ttl_ms, 15 * 60 * 1000);
    assert_eq!(handle.lock().unwrap().len(), 1);

    let claims = test_token_service()
        .verify_access(&out.tokens.access_token)
        .unwrap();
    assert_eq!(claims.usuario_id, out.user.id);
}

#[tokio::test]
async fn should_not_duplicate_user_on_second_login() {
    let users = MockUserRepo::default();
    let handle = users.users_handle();
    let usecase = LoginUseCase {
        users,
        identity: MockIdentityProvider::accepting("ana@uni.test", "secret"),
        tokens: Arc::new(test_token_service()),
    };

    let first = usecase
        .execute(login_input("ana@uni.test", "secret"))
        .await
        .unwrap();
    let second = usecase
        .execute(login_input("ana@uni.test", "secret"))
        .await
        .unwrap();

    assert_eq!(first.user.id, second.user.id);
    assert_eq!(handle.lock().unwrap().len(), 1);
    assert_eq!(second.user.roles.len(), 1);
}

#[tokio::test]
async fn should_reactivate_existing_user_and_grant_student_when_roleless() {
    let mut user = test_user(&[]);
    user.activo = false;
    let email = user.email.clone();
    let usecase = LoginUseCase {
        users: MockUserRepo::new(vec![user]),
        identity: MockIdentityProvider::accepting(&email, "secret"),
        tokens: Arc::new(test_token_service()),
    };

    let out = usecase.execute(login_input(&email, "secret")).await.unwrap();

    assert!(out.user.activo);
    assert!(out.user.roles.contains(Role::Student));
}

#[tokio::test]
async fn should_keep_existing_roles_on_login() {
    let user = test_user(&[Role::Teacher]);
    let email = user.email.clone();
    let usecase = LoginUseCase {
        users: MockUserRepo::new(vec![user]),
        identity: MockIdentityProvider::accepting(&email, "secret"),
        tokens: Arc::new(test_token_service()),
    };

    let out = usecase.execute(login_input(&email, "secret")).await.unwrap();

    assert_eq!(out.user.roles.to_vec(), vec![Role::Teacher]);
}

#[tokio::test]
async fn should_match_stored_email_regardless_of_case() {
    let mut user = test_user(&[Role::Student]);
    user.email = "ana@uni.test".to_owned();
    let id = user.id;
    let users = MockUserRepo::new(vec![user]);
    let handle = users.users_handle();
    let usecase = LoginUseCase {
        users,
        identity: MockIdentityProvider::accepting("ana@uni.test", "secret"),
        tokens: Arc::new(test_token_service()),
    };

    let out = usecase
        .execute(login_input("  Ana@Uni.TEST ", "secret"))
        .await
        .unwrap();

    assert_eq!(out.user.id, id);
    assert_eq!(out.user.email, "ana@uni.test");
    assert_eq!(handle.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_reject_login_with_wrong_password() {
    let usecase = LoginUseCase {
        users: MockUserRepo::default(),
        identity: MockIdentityProvider::accepting("ana@uni.test", "secret"),
        tokens: Arc::new(test_token_service()),
    };

    let result = usecase.execute(login_input("ana@uni.test", "nope")).await;
    assert!(
        matches!(result, Err(ApiError::InvalidCredentials)),
        "expected InvalidCredentials, got {:?}",
        result.err()
    );
}

#[tokio::test]
async fn should_reject_login_with_missing_fields() {
    let usecase = LoginUseCase {
        users: MockUserRepo::default(),
        identity: MockIdentityProvider::accepting("ana@uni.test", "secret"),
        tokens: Arc::new(test_token_service()),
    };

    let result = usecase
        .execute(LoginInput {
            email: Some("  ".to_owned()),
            password: Some("secret".to_owned()),
        })
        .await;
    assert!(matches!(result, Err(ApiError::MissingFields)));

    let result = usecase
        .execute(LoginInput {
            email: Some("ana@uni.test".to_owned()),
            password: None,
        })
        .await;
    assert!(matches!(result, Err(ApiError::MissingFields)));
}

// ── RegisterUseCase ──────────────────────────────────────────────────────────

fn register_input(email: &str) -> RegisterInput {
    RegisterInput {
        codigo_institucional: None,
        email: email.to_owned(),
        nombres: "Ana".to_owned(),
        apellidos: "Pérez".to_owned(),
        password: None,
    }
}

#[tokio::test]
async fn should_register_active_student() {
    let usecase = RegisterUseCase {
        users: MockUserRepo::default(),
        bcrypt_cost: 4,
        allow_registration: true,
    };

    let user = usecase.execute(register_input("Ana@Uni.Test")).await.unwrap();

    assert_eq!(user.email, "ana@uni.test");
    assert!(user.activo);
    assert_eq!(user.roles, RoleSet::from(vec![Role::Student]));
}

#[tokio::test]
async fn should_reject_duplicate_registration() {
    let usecase = RegisterUseCase {
        users: MockUserRepo::default(),
        bcrypt_cost: 4,
        allow_registration: true,
    };

    usecase.execute(register_input("ana@uni.test")).await.unwrap();
    let result = usecase.execute(register_input("ana@uni.test")).await;
    assert!(matches!(result, Err(ApiError::EmailExists)));
}

#[tokio::test]
async fn should_refuse_registration_when_disabled() {
    let usecase = RegisterUseCase {
        users: MockUserRepo::default(),
        bcrypt_cost: 4,
        allow_registration: false,
    };

    let result = usecase.execute(register_input("ana@uni.test")).await;
    assert!(matches!(result, Err(ApiError::RegistrationDisabled)));
}

// ── RefreshUseCase ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_issue_access_token_from_refresh_token() {
    let tokens = Arc::new(test_token_service());
    let user = test_user(&[Role::Student]);
    let pair = tokens
        .issue_pair(&TokenSubject {
            usuario_id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
        })
        .unwrap();
    let usecase = RefreshUseCase {
        tokens: tokens.clone(),
    };

    let access = usecase.execute(Some(&pair.refresh_token)).await.unwrap();

    let claims = tokens.verify_access(&access).unwrap();
    assert_eq!(claims.usuario_id, user.id);
    assert_eq!(claims.roles, user.roles);
}

#[tokio::test]
async fn should_reject_access_token_presented_as_refresh() {
    let usecase = RefreshUseCase {
        tokens: Arc::new(test_token_service()),
    };
    let access = MockAuth::student(Uuid::now_v7()).access_token();

    let result = usecase.execute(Some(&access)).await;
    assert!(matches!(result, Err(ApiError::RefreshTokenInvalid)));
}

#[tokio::test]
async fn should_require_refresh_token() {
    let usecase = RefreshUseCase {
        tokens: Arc::new(test_token_service()),
    };

    assert!(matches!(
        usecase.execute(None).await,
        Err(ApiError::RefreshTokenMissing)
    ));
    assert!(matches!(
        usecase.execute(Some("")).await,
        Err(ApiError::RefreshTokenMissing)
    ));
}

// ── AuthenticateUseCase ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_authenticate_active_user() {
    let id = Uuid::now_v7();
    let usecase = AuthenticateUseCase {
        repo: MockSessionRepo::default().with_user(id, true),
        tokens: Arc::new(test_token_service()),
    };
    let token = MockAuth::teacher(id).access_token();

    let caller = usecase.execute(Some(&token)).await.unwrap();

    assert_eq!(caller.usuario_id, id);
    assert!(caller.roles.contains(Role::Teacher));
}

#[tokio::test]
async fn should_reject_inactive_or_unknown_user() {
    let inactive = Uuid::now_v7();
    let usecase = AuthenticateUseCase {
        repo: MockSessionRepo::default().with_user(inactive, false),
        tokens: Arc::new(test_token_service()),
    };

    let token = MockAuth::student(inactive).access_token();
    assert!(matches!(
        usecase.execute(Some(&token)).await,
        Err(ApiError::UserInactive)
    ));

    let token = MockAuth::student(Uuid::now_v7()).access_token();
    assert!(matches!(
        usecase.execute(Some(&token)).await,
        Err(ApiError::UserInactive)
    ));
}

#[tokio::test]
async fn should_reject_missing_or_malformed_token() {
    let usecase = AuthenticateUseCase {
        repo: MockSessionRepo::default(),
        tokens: Arc::new(test_token_service()),
    };

    assert!(matches!(
        usecase.execute(None).await,
        Err(ApiError::InvalidToken)
    ));
    assert!(matches!(
        usecase.execute(Some("not-a-jwt")).await,
        Err(ApiError::InvalidToken)
    ));
}
