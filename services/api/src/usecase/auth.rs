use std::sync::Arc;

use anyhow::Context as _;
use tracing::info;
use uuid::Uuid;

use suficiencia_auth_types::token::{TokenError, TokenPair, TokenService, TokenSubject};
use suficiencia_domain::role::{Role, RoleSet};

use crate::domain::repository::{IdentityProvider, UserRepository};
use crate::domain::types::{NewUser, User, non_blank, normalize_email, validate_email};
use crate::error::{ApiError, FieldError};
use crate::infra::password::hash_password;

fn subject(user: &User) -> TokenSubject {
    TokenSubject {
        usuario_id: user.id,
        email: user.email.clone(),
        roles: user.roles.clone(),
    }
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct LoginOutput {
    pub user: User,
    pub tokens: TokenPair,
}

pub struct LoginUseCase<U: UserRepository, P: IdentityProvider> {
    pub users: U,
    pub identity: P,
    pub tokens: Arc<TokenService>,
}

impl<U: UserRepository, P: IdentityProvider> LoginUseCase<U, P> {
    /// Verify credentials with the identity provider, provisioning a student
    /// account on first login.
    pub async fn execute(&self, input: LoginInput) -> Result<LoginOutput, ApiError> {
        let (Some(email), Some(password)) = (
            non_blank(input.email).map(|e| normalize_email(&e)),
            input.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(ApiError::MissingFields);
        };

        let verified = self
            .identity
            .verify(&email, &password)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;
        let email = normalize_email(&verified.email);

        let existing = self
            .users
            .find_by_login(&email, verified.codigo_institucional.as_deref())
            .await?;
        let user = match existing {
            Some(user) => self.users.touch_login(user.id).await?,
            None => {
                let user = self
                    .users
                    .create(&NewUser {
                        id: Uuid::now_v7(),
                        codigo_institucional: verified.codigo_institucional,
                        email,
                        nombres: verified.nombres,
                        apellidos: verified.apellidos,
                        password_hash: None,
                        activo: true,
                        roles: RoleSet::from(vec![Role::Student]),
                    })
                    .await?;
                info!(
                    usuario_id = %user.id,
                    email = %user.email,
                    "provisioned user on first login"
                );
                user
            }
        };

        let tokens = self
            .tokens
            .issue_pair(&subject(&user))
            .context("sign token pair")?;
        info!(usuario_id = %user.id, "login");
        Ok(LoginOutput { user, tokens })
    }
}

// ── Register ─────────────────────────────────────────────────────────────────

pub struct RegisterInput {
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
    pub password: Option<String>,
}

pub struct RegisterUseCase<U: UserRepository> {
    pub users: U,
    pub bcrypt_cost: u32,
    pub allow_registration: bool,
}

impl<U: UserRepository> RegisterUseCase<U> {
    pub async fn execute(&self, input: RegisterInput) -> Result<User, ApiError> {
        if !self.allow_registration {
            return Err(ApiError::RegistrationDisabled);
        }
        let identity = validate_identity(input.email, input.nombres, input.apellidos)?;
        let password_hash = match input.password.filter(|p| !p.is_empty()) {
            Some(p) => Some(hash_password(p, self.bcrypt_cost).await?),
            None => None,
        };
        self.users
            .create(&NewUser {
                id: Uuid::now_v7(),
                codigo_institucional: non_blank(input.codigo_institucional),
                email: identity.email,
                nombres: identity.nombres,
                apellidos: identity.apellidos,
                password_hash,
                activo: true,
                roles: RoleSet::from(vec![Role::Student]),
            })
            .await
    }
}

pub(crate) struct ValidIdentity {
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

/// Email shape plus non-blank names, reporting every bad field at once.
pub(crate) fn validate_identity(
    email: String,
    nombres: String,
    apellidos: String,
) -> Result<ValidIdentity, ApiError> {
    let email = normalize_email(&email);
    let nombres = nombres.trim().to_owned();
    let apellidos = apellidos.trim().to_owned();

    let mut errors = Vec::new();
    if !validate_email(&email) {
        errors.push(FieldError::new("email", "must be a valid email"));
    }
    if nombres.is_empty() {
        errors.push(FieldError::new("nombres", "must not be empty"));
    }
    if apellidos.is_empty() {
        errors.push(FieldError::new("apellidos", "must not be empty"));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(ValidIdentity {
        email,
        nombres,
        apellidos,
    })
}

// ── Refresh ──────────────────────────────────────────────────────────────────

pub struct RefreshUseCase {
    pub tokens: Arc<TokenService>,
}

impl RefreshUseCase {
    /// A fresh access token for the refresh token's identity. The refresh
    /// token itself stays valid and is not rotated.
    pub async fn execute(&self, refresh_token: Option<&str>) -> Result<String, ApiError> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::RefreshTokenMissing)?;
        let claims = self.tokens.verify_refresh(token).map_err(|e| match e {
            TokenError::Expired => ApiError::RefreshTokenExpired,
            _ => ApiError::RefreshTokenInvalid,
        })?;
        let access = self
            .tokens
            .reissue_access(&claims)
            .context("sign access token")?;
        Ok(access)
    }
}
