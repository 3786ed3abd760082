//! Store error classification.

use sea_orm::sqlx::error::ErrorKind;
use sea_orm::{DbErr, RuntimeErr};

/// Constraint class of a failed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique,
    ForeignKey,
    Check,
}

/// Classify `err` when it was raised by a relational constraint.
pub fn constraint_violation(err: &DbErr) -> Option<ConstraintViolation> {
    let runtime = match err {
        DbErr::Query(e) | DbErr::Exec(e) => e,
        _ => return None,
    };
    let RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db)) = runtime else {
        return None;
    };
    match db.kind() {
        ErrorKind::UniqueViolation => Some(ConstraintViolation::Unique),
        ErrorKind::ForeignKeyViolation => Some(ConstraintViolation::ForeignKey),
        ErrorKind::CheckViolation => Some(ConstraintViolation::Check),
        _ => None,
    }
}
