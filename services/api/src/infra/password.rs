//! bcrypt hashing off the async runtime.

use anyhow::Context as _;

use crate::error::ApiError;

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("join password hashing task")?
        .context("hash password")?;
    Ok(hash)
}

/// `false` for a wrong password and for a stored hash bcrypt cannot read.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("join password verification task")?;
    match result {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable password hash");
            Ok(false)
        }
    }
}
