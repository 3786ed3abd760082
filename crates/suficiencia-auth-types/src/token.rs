//! Access/refresh token pairs.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use suficiencia_domain::role::RoleSet;

/// Errors returned by [`TokenService`].
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Claims carried by both access and refresh tokens.
///
/// | Field | Meaning |
/// |-------|---------|
/// | `usuario_id` | user id (UUID) |
/// | `email` | user email at issue time |
/// | `roles` | role names at issue time |
/// | `iat` / `exp` | seconds since UNIX epoch |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub usuario_id: Uuid,
    pub email: String,
    pub roles: RoleSet,
    pub iat: u64,
    pub exp: u64,
}

/// Identity a token pair is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub usuario_id: Uuid,
    pub email: String,
    pub roles: RoleSet,
}

impl From<&Claims> for TokenSubject {
    fn from(claims: &Claims) -> Self {
        Self {
            usuario_id: claims.usuario_id,
            email: claims.email.clone(),
            roles: claims.roles.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_ttl_ms: u64,
    pub refresh_ttl_ms: u64,
}

// ── Durations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration: {0:?}")]
pub struct InvalidDuration(pub String);

/// A configured token lifetime.
///
/// A bare number is milliseconds. Strings accept `ms`, `s`, `m`, `h` and `d`
/// suffixes; an unsuffixed numeric string is seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    Millis(u64),
    Text(String),
}

impl DurationSpec {
    pub fn to_duration(&self) -> Result<Duration, InvalidDuration> {
        match self {
            Self::Millis(ms) => Ok(Duration::from_millis(*ms)),
            Self::Text(s) => parse_duration(s),
        }
    }
}

pub fn parse_duration(input: &str) -> Result<Duration, InvalidDuration> {
    let s = input.trim();
    let invalid = || InvalidDuration(input.to_owned());

    if let Some(ms) = s.strip_suffix("ms") {
        return ms.trim().parse().map(Duration::from_millis).map_err(|_| invalid());
    }
    let (number, unit_secs) = match s.char_indices().last() {
        Some((i, 's')) => (&s[..i], 1),
        Some((i, 'm')) => (&s[..i], 60),
        Some((i, 'h')) => (&s[..i], 3_600),
        Some((i, 'd')) => (&s[..i], 86_400),
        Some(_) => (s, 1),
        None => return Err(invalid()),
    };
    let n: u64 = number.trim().parse().map_err(|_| invalid())?;
    n.checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

// ── TokenService ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKey {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Issues and verifies HS256 token pairs.
///
/// Access and refresh tokens carry identical claims and are signed with
/// distinct secrets. The parsed lifetime drives both the `exp` claim and the
/// TTL reported to clients.
#[derive(Clone)]
pub struct TokenService {
    access: SigningKey,
    refresh: SigningKey,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access: SigningKey::new(access_secret, access_ttl),
            refresh: SigningKey::new(refresh_secret, refresh_ttl),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access.ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl
    }

    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, TokenError> {
        let now = now_secs();
        Ok(TokenPair {
            access_token: sign(&self.access, subject, now)?,
            refresh_token: sign(&self.refresh, subject, now)?,
            access_ttl_ms: millis(self.access.ttl),
            refresh_ttl_ms: millis(self.refresh.ttl),
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.refresh, token)
    }

    /// Mint a fresh access token for the identity in `claims`.
    ///
    /// The refresh token is not rotated.
    pub fn reissue_access(&self, claims: &Claims) -> Result<String, TokenError> {
        sign(&self.access, &TokenSubject::from(claims), now_secs())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Whole seconds, rounded up so a sub-second TTL still expires after `iat`.
fn ttl_secs(d: Duration) -> u64 {
    d.as_secs().saturating_add(u64::from(d.subsec_nanos() > 0))
}

fn sign(key: &SigningKey, subject: &TokenSubject, now: u64) -> Result<String, TokenError> {
    let claims = Claims {
        usuario_id: subject.usuario_id,
        email: subject.email.clone(),
        roles: subject.roles.clone(),
        iat: now,
        exp: now.saturating_add(ttl_secs(key.ttl)),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &key.encoding).map_err(TokenError::Signing)
}

/// Validation: HS256, `exp` required and checked with zero leeway.
fn verify(key: &SigningKey, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<Claims>(token, &key.decoding, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_) => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })?;

    Ok(data.claims)
}
