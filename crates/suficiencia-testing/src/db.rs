//! Store errors as the Postgres driver raises them.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use sea_orm::sqlx::error::{DatabaseError, ErrorKind};
use sea_orm::{DbErr, RuntimeErr};

#[derive(Debug)]
struct ConstraintError {
    code: &'static str,
    message: &'static str,
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl StdError for ConstraintError {}

impl DatabaseError for ConstraintError {
    fn message(&self) -> &str {
        self.message
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.code))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        match self.code {
            "23505" => ErrorKind::UniqueViolation,
            "23503" => ErrorKind::ForeignKeyViolation,
            "23514" => ErrorKind::CheckViolation,
            _ => ErrorKind::Other,
        }
    }
}

fn query_error(error: ConstraintError) -> DbErr {
    DbErr::Query(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(
        Box::new(error),
    )))
}

/// `duplicate key value violates unique constraint`, SQLSTATE 23505.
pub fn unique_violation() -> DbErr {
    query_error(ConstraintError {
        code: "23505",
        message: "duplicate key value violates unique constraint",
    })
}
