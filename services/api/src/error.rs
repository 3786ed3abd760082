use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::DbErr;
use serde::Serialize;

use suficiencia_core::db::{ConstraintViolation, constraint_violation};
use suficiencia_core::error::ErrorBody;
use suficiencia_domain::role::Role;

static EXPOSE_INTERNAL: OnceLock<bool> = OnceLock::new();

/// Include internal error chains in 500 responses. Set once at startup; off
/// unless enabled (production keeps it off).
pub fn expose_internal_errors(enabled: bool) {
    let _ = EXPOSE_INTERNAL.set(enabled);
}

fn internal_exposed() -> bool {
    EXPOSE_INTERNAL.get().copied().unwrap_or(false)
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every failure the API can report. Each variant has a fixed machine code
/// and HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 400
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("email and password are required")]
    MissingFields,
    #[error("refresh token is required")]
    RefreshTokenMissing,
    #[error("no fields to update")]
    NoFieldsToUpdate,
    #[error("user does not have the student role")]
    UserNotStudent,
    #[error("user does not have the teacher role")]
    UserNotTeacher,
    #[error("exam date must not be in the past")]
    InvalidExamDate,
    #[error("end time must be after start time")]
    InvalidTimeRange,
    #[error("capacity must be at least 1 and not below occupied slots")]
    InvalidCapacity,
    #[error("no slots available")]
    NoSlotsAvailable,
    #[error("schedule has booked students")]
    ScheduleHasStudents,
    #[error("referenced resource does not exist")]
    InvalidReference,
    #[error("constraint violation")]
    ConstraintViolation,

    // 401
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("user inactive or not found")]
    UserInactive,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("refresh token expired")]
    RefreshTokenExpired,
    #[error("invalid refresh token")]
    RefreshTokenInvalid,

    // 403
    #[error("insufficient role")]
    InsufficientRole { required: Vec<Role> },
    #[error("student role required")]
    StudentRequired,
    #[error("course access denied")]
    CourseAccessDenied,
    #[error("registration is disabled")]
    RegistrationDisabled,

    // 404
    #[error("user not found")]
    UserNotFound,
    #[error("student not found")]
    StudentNotFound,
    #[error("teacher not found")]
    TeacherNotFound,
    #[error("course not found")]
    CourseNotFound,
    #[error("enrollment not found")]
    EnrollmentNotFound,
    #[error("assignment not found")]
    AssignmentNotFound,
    #[error("exam schedule not found")]
    ScheduleNotFound,
    #[error("appointment not found")]
    AppointmentNotFound,
    #[error("role not assigned")]
    RoleNotAssigned,

    // 409
    #[error("email already registered")]
    EmailExists,
    #[error("course code already exists")]
    CourseCodeExists,
    #[error("student already enrolled")]
    AlreadyEnrolled,
    #[error("teacher already assigned")]
    AlreadyAssigned,
    #[error("role already assigned")]
    RoleAlreadyAssigned,
    #[error("a schedule already starts at that date and time")]
    ScheduleConflict,
    #[error("student already scheduled")]
    StudentAlreadyScheduled,
    #[error("course has enrollments or teacher assignments")]
    CourseHasDependents,
    #[error("duplicate resource")]
    DuplicateResource,

    // 501
    #[error("feature not available")]
    FeatureNotAvailable,

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MissingFields => "MISSING_FIELDS",
            Self::RefreshTokenMissing => "REFRESH_TOKEN_MISSING",
            Self::NoFieldsToUpdate => "NO_FIELDS_TO_UPDATE",
            Self::UserNotStudent => "USER_NOT_STUDENT",
            Self::UserNotTeacher => "USER_NOT_TEACHER",
            Self::InvalidExamDate => "INVALID_EXAM_DATE",
            Self::InvalidTimeRange => "INVALID_TIME_RANGE",
            Self::InvalidCapacity => "INVALID_CAPACITY",
            Self::NoSlotsAvailable => "NO_SLOTS_AVAILABLE",
            Self::ScheduleHasStudents => "SCHEDULE_HAS_STUDENTS",
            Self::InvalidReference => "INVALID_REFERENCE",
            Self::ConstraintViolation => "CONSTRAINT_VIOLATION",
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::UserInactive => "USER_INACTIVE",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            Self::RefreshTokenInvalid => "REFRESH_TOKEN_INVALID",
            Self::InsufficientRole { .. } => "INSUFFICIENT_ROLE",
            Self::StudentRequired => "STUDENT_REQUIRED",
            Self::CourseAccessDenied => "COURSE_ACCESS_DENIED",
            Self::RegistrationDisabled => "REGISTRATION_DISABLED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::StudentNotFound => "STUDENT_NOT_FOUND",
            Self::TeacherNotFound => "TEACHER_NOT_FOUND",
            Self::CourseNotFound => "COURSE_NOT_FOUND",
            Self::EnrollmentNotFound => "ENROLLMENT_NOT_FOUND",
            Self::AssignmentNotFound => "ASSIGNMENT_NOT_FOUND",
            Self::ScheduleNotFound => "SCHEDULE_NOT_FOUND",
            Self::AppointmentNotFound => "APPOINTMENT_NOT_FOUND",
            Self::RoleNotAssigned => "ROLE_NOT_ASSIGNED",
            Self::EmailExists => "EMAIL_EXISTS",
            Self::CourseCodeExists => "COURSE_CODE_EXISTS",
            Self::AlreadyEnrolled => "ALREADY_ENROLLED",
            Self::AlreadyAssigned => "ALREADY_ASSIGNED",
            Self::RoleAlreadyAssigned => "ROLE_ALREADY_ASSIGNED",
            Self::ScheduleConflict => "SCHEDULE_CONFLICT",
            Self::StudentAlreadyScheduled => "STUDENT_ALREADY_SCHEDULED",
            Self::CourseHasDependents => "COURSE_HAS_DEPENDENTS",
            Self::DuplicateResource => "DUPLICATE_RESOURCE",
            Self::FeatureNotAvailable => "FEATURE_NOT_AVAILABLE",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::MissingFields
            | Self::RefreshTokenMissing
            | Self::NoFieldsToUpdate
            | Self::UserNotStudent
            | Self::UserNotTeacher
            | Self::InvalidExamDate
            | Self::InvalidTimeRange
            | Self::InvalidCapacity
            | Self::NoSlotsAvailable
            | Self::ScheduleHasStudents
            | Self::InvalidReference
            | Self::ConstraintViolation => StatusCode::BAD_REQUEST,
            Self::InvalidApiKey
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::UserInactive
            | Self::InvalidCredentials
            | Self::RefreshTokenExpired
            | Self::RefreshTokenInvalid => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole { .. }
            | Self::StudentRequired
            | Self::CourseAccessDenied
            | Self::RegistrationDisabled => StatusCode::FORBIDDEN,
            Self::UserNotFound
            | Self::StudentNotFound
            | Self::TeacherNotFound
            | Self::CourseNotFound
            | Self::EnrollmentNotFound
            | Self::AssignmentNotFound
            | Self::ScheduleNotFound
            | Self::AppointmentNotFound
            | Self::RoleNotAssigned => StatusCode::NOT_FOUND,
            Self::EmailExists
            | Self::CourseCodeExists
            | Self::AlreadyEnrolled
            | Self::AlreadyAssigned
            | Self::RoleAlreadyAssigned
            | Self::ScheduleConflict
            | Self::StudentAlreadyScheduled
            | Self::CourseHasDependents
            | Self::DuplicateResource => StatusCode::CONFLICT,
            Self::FeatureNotAvailable => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation(fields) => Some(serde_json::json!(fields)),
            Self::InsufficientRole { required } => {
                Some(serde_json::json!({ "required_roles": required }))
            }
            Self::Internal(e) if internal_exposed() => Some(serde_json::json!(format!("{e:#}"))),
            _ => None,
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match constraint_violation(&err) {
            Some(ConstraintViolation::Unique) => Self::DuplicateResource,
            Some(ConstraintViolation::ForeignKey) => Self::InvalidReference,
            Some(ConstraintViolation::Check) => Self::ConstraintViolation,
            None => Self::Internal(anyhow::Error::new(err)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // 4xx are expected client errors and already visible in the TraceLayer span.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), code = self.code(), "internal error");
        }
        let mut body = ErrorBody::new(self.code(), self.to_string());
        if let Some(details) = self.details() {
            body = body.with_details(details);
        }
        body.into_response_with(self.status())
    }
}
