//! Exam booking types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parse::ParseError;

/// Status of a student's booking on an exam schedule.
///
/// Status is independent of slot accounting: a cancelled booking keeps its
/// slot until the booking is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BookingStatus {
    #[default]
    #[serde(rename = "agendado")]
    Booked,
    #[serde(rename = "confirmado")]
    Confirmed,
    #[serde(rename = "cancelado")]
    Cancelled,
    #[serde(rename = "completado")]
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "agendado",
            Self::Confirmed => "confirmado",
            Self::Cancelled => "cancelado",
            Self::Completed => "completado",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agendado" => Ok(Self::Booked),
            "confirmado" => Ok(Self::Confirmed),
            "cancelado" => Ok(Self::Cancelled),
            "completado" => Ok(Self::Completed),
            other => Err(ParseError::new("booking status", other)),
        }
    }
}
