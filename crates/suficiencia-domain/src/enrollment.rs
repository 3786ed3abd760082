//! Course enrollment and teacher assignment types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parse::ParseError;

/// Status of a student's enrollment in a course.
///
/// `Enrolled` is the initial state; the others are terminal in normal flow.
/// Administrative updates may move between any two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    #[default]
    #[serde(rename = "inscrito")]
    Enrolled,
    #[serde(rename = "aprobado")]
    Passed,
    #[serde(rename = "reprobado")]
    Failed,
    #[serde(rename = "retirado")]
    Withdrawn,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enrolled => "inscrito",
            Self::Passed => "aprobado",
            Self::Failed => "reprobado",
            Self::Withdrawn => "retirado",
        }
    }

    /// Withdrawn students lose access to the course.
    pub fn grants_course_access(self) -> bool {
        self != Self::Withdrawn
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inscrito" => Ok(Self::Enrolled),
            "aprobado" => Ok(Self::Passed),
            "reprobado" => Ok(Self::Failed),
            "retirado" => Ok(Self::Withdrawn),
            other => Err(ParseError::new("enrollment status", other)),
        }
    }
}

/// Kind of teacher assignment to a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AssignmentType {
    #[default]
    #[serde(rename = "titular")]
    Lead,
    #[serde(rename = "asistente")]
    Assistant,
    #[serde(rename = "colaborador")]
    Collaborator,
}

impl AssignmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "titular",
            Self::Assistant => "asistente",
            Self::Collaborator => "colaborador",
        }
    }
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "titular" => Ok(Self::Lead),
            "asistente" => Ok(Self::Assistant),
            "colaborador" => Ok(Self::Collaborator),
            other => Err(ParseError::new("assignment type", other)),
        }
    }
}

/// How a caller is related to a course, as matched by the course access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseRelation {
    #[serde(rename = "docente")]
    Teacher,
    #[serde(rename = "estudiante")]
    Student,
}
