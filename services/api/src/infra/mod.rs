use sea_orm::{DbErr, TransactionError};

use suficiencia_core::db::{ConstraintViolation, constraint_violation};

use crate::error::ApiError;

pub mod course_db;
pub mod db;
pub mod exam_db;
pub mod identity;
pub mod password;

/// `conflict` when `err` is a unique violation, the generic mapping otherwise.
pub(crate) fn unique_as(err: DbErr, conflict: ApiError) -> ApiError {
    match constraint_violation(&err) {
        Some(ConstraintViolation::Unique) => conflict,
        _ => ApiError::from(err),
    }
}

pub(crate) fn txn_err(err: TransactionError<ApiError>) -> ApiError {
    match err {
        TransactionError::Connection(e) => ApiError::from(e),
        TransactionError::Transaction(e) => e,
    }
}
