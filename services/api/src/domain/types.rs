use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use suficiencia_core::serde::to_rfc3339_ms_opt;
use suficiencia_domain::enrollment::{AssignmentType, EnrollmentStatus};
use suficiencia_domain::exam::BookingStatus;
use suficiencia_domain::parse::ParseError;
use suficiencia_domain::role::{Role, RoleSet};

use crate::error::ApiError;

/// Passing percentage applied when a course is created without one.
pub const DEFAULT_PASSING_PERCENTAGE: i32 = 70;

/// Upper bound on the "students not yet booked" listing.
pub const AVAILABLE_STUDENTS_LIMIT: u64 = 100;

/// Window counted as "new registrations" on the dashboard.
pub const NEW_REGISTRATION_WINDOW_DAYS: i64 = 7;

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
    pub activo: bool,
    pub roles: RoleSet,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_actualizacion: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombres, self.apellidos)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
    pub password_hash: Option<String>,
    pub activo: bool,
    pub roles: RoleSet,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub codigo_institucional: Option<String>,
    pub email: Option<String>,
    pub nombres: Option<String>,
    pub apellidos: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.codigo_institucional.is_none()
            && self.email.is_none()
            && self.nombres.is_none()
            && self.apellidos.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive match on names, email or institutional code.
    pub search: Option<String>,
    pub role: Option<Role>,
    pub activo: Option<bool>,
}

/// Identity vouched for by the identity provider at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub codigo_institucional: Option<String>,
    pub nombres: String,
    pub apellidos: String,
}

// ── Courses ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: Uuid,
    pub codigo_curso: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub porcentaje_minimo_examen: i32,
    pub activo: bool,
    pub creado_por: Option<Uuid>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_actualizacion: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub course: Course,
    pub total_estudiantes: u64,
    pub total_docentes: u64,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub codigo_curso: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub porcentaje_minimo_examen: i32,
    pub activo: bool,
    pub creado_por: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub codigo_curso: Option<String>,
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub porcentaje_minimo_examen: Option<i32>,
    pub activo: Option<bool>,
}

impl CoursePatch {
    pub fn is_empty(&self) -> bool {
        self.codigo_curso.is_none()
            && self.nombre.is_none()
            && self.descripcion.is_none()
            && self.porcentaje_minimo_examen.is_none()
            && self.activo.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub search: Option<String>,
    pub activo: Option<bool>,
}

/// A course as seen from one enrolled student.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentCourse {
    pub course: Course,
    pub estado: EnrollmentStatus,
    pub nota_final: Option<f64>,
    pub fecha_inscripcion: DateTime<Utc>,
    pub fecha_estado: DateTime<Utc>,
}

/// A course as seen from one assigned teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherCourse {
    pub course: Course,
    pub tipo_asignacion: AssignmentType,
    pub fecha_asignacion: DateTime<Utc>,
    pub total_estudiantes: u64,
}

pub fn validate_passing_percentage(value: i32) -> Result<(), ApiError> {
    if (0..=100).contains(&value) {
        Ok(())
    } else {
        Err(ApiError::validation(
            "porcentaje_minimo_examen",
            "must be between 0 and 100",
        ))
    }
}

// ── Enrollments & assignments ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub id: Uuid,
    pub curso_id: Uuid,
    pub usuario_id: Uuid,
    pub estado: EnrollmentStatus,
    pub nota_final: Option<f64>,
    pub fecha_inscripcion: DateTime<Utc>,
    pub fecha_estado: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnrollmentPatch {
    pub estado: Option<EnrollmentStatus>,
    pub nota_final: Option<f64>,
}

impl EnrollmentPatch {
    pub fn is_empty(&self) -> bool {
        self.estado.is_none() && self.nota_final.is_none()
    }
}

/// Enrollment row joined with the student's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseStudent {
    pub enrollment: Enrollment,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

/// Enrollment row joined with its course.
#[derive(Debug, Clone, PartialEq)]
pub struct UserEnrollment {
    pub enrollment: Enrollment,
    pub codigo_curso: String,
    pub curso_nombre: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: Uuid,
    pub curso_id: Uuid,
    pub usuario_id: Uuid,
    pub tipo_asignacion: AssignmentType,
    pub activo: bool,
    pub fecha_asignacion: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentPatch {
    pub tipo_asignacion: Option<AssignmentType>,
    pub activo: Option<bool>,
}

impl AssignmentPatch {
    pub fn is_empty(&self) -> bool {
        self.tipo_asignacion.is_none() && self.activo.is_none()
    }
}

/// Assignment row joined with the teacher's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseTeacher {
    pub assignment: Assignment,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

/// Assignment row joined with its course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAssignment {
    pub assignment: Assignment,
    pub codigo_curso: String,
    pub curso_nombre: String,
}

pub fn validate_grade(nota_final: Option<f64>) -> Result<(), ApiError> {
    match nota_final {
        Some(n) if !(0.0..=100.0).contains(&n) => Err(ApiError::validation(
            "nota_final",
            "must be between 0 and 100",
        )),
        _ => Ok(()),
    }
}

// ── Exam schedules ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSchedule {
    pub id: Uuid,
    pub fecha_examen: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub hora_fin: NaiveTime,
    pub cupos_disponibles: i32,
    pub cupos_ocupados: i32,
    pub activo: bool,
    pub creado_por: Option<Uuid>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_actualizacion: DateTime<Utc>,
}

impl ExamSchedule {
    pub fn has_free_slot(&self) -> bool {
        self.cupos_ocupados < self.cupos_disponibles
    }

    /// Case-insensitive match of `needle` against the displayed date and times.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            self.fecha_examen.format("%d/%m/%Y").to_string(),
            self.hora_inicio.format("%H:%M").to_string(),
            self.hora_fin.format("%H:%M").to_string(),
        ]
        .iter()
        .any(|text| text.contains(&needle))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExamSchedulePatch {
    pub fecha_examen: Option<NaiveDate>,
    pub hora_inicio: Option<NaiveTime>,
    pub hora_fin: Option<NaiveTime>,
    pub cupos_disponibles: Option<i32>,
    pub activo: Option<bool>,
}

impl ExamSchedulePatch {
    pub fn is_empty(&self) -> bool {
        self.fecha_examen.is_none()
            && self.hora_inicio.is_none()
            && self.hora_fin.is_none()
            && self.cupos_disponibles.is_none()
            && self.activo.is_none()
    }

    /// The schedule as it would look after this patch.
    pub fn apply_to(&self, schedule: &ExamSchedule) -> ExamSchedule {
        ExamSchedule {
            fecha_examen: self.fecha_examen.unwrap_or(schedule.fecha_examen),
            hora_inicio: self.hora_inicio.unwrap_or(schedule.hora_inicio),
            hora_fin: self.hora_fin.unwrap_or(schedule.hora_fin),
            cupos_disponibles: self.cupos_disponibles.unwrap_or(schedule.cupos_disponibles),
            activo: self.activo.unwrap_or(schedule.activo),
            ..schedule.clone()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    /// Matched against `DD/MM/YYYY` dates and `HH:MM` start and end times.
    pub search: Option<String>,
    pub fecha: Option<NaiveDate>,
    pub activo: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    pub horario_examen_id: Uuid,
    pub estudiante_id: Uuid,
    pub estado: BookingStatus,
    pub fecha_agendamiento: DateTime<Utc>,
}

/// Booking joined with the booked student's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledStudent {
    pub booking: Booking,
    pub usuario_id: Uuid,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

/// An active student with their linkage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentSummary {
    pub usuario_id: Uuid,
    pub estudiante_id: Uuid,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStats {
    pub total_horarios: u64,
    pub horarios_activos: u64,
    pub cupos_totales: u64,
    pub cupos_ocupados: u64,
    pub horarios_futuros: u64,
    pub estudiantes_agendados: u64,
}

/// Date, time range and capacity rules for a new or edited schedule.
pub fn validate_schedule_slot(
    fecha_examen: NaiveDate,
    hora_inicio: NaiveTime,
    hora_fin: NaiveTime,
    cupos_disponibles: i32,
    today: NaiveDate,
) -> Result<(), ApiError> {
    if fecha_examen < today {
        return Err(ApiError::InvalidExamDate);
    }
    if hora_fin <= hora_inicio {
        return Err(ApiError::InvalidTimeRange);
    }
    if cupos_disponibles < 1 {
        return Err(ApiError::InvalidCapacity);
    }
    Ok(())
}

/// Admission checks for a booking that are decidable from the schedule row
/// alone. Runs inside the booking transaction against the locked row.
pub fn ensure_bookable(schedule: Option<&ExamSchedule>) -> Result<&ExamSchedule, ApiError> {
    let schedule = schedule
        .filter(|s| s.activo)
        .ok_or(ApiError::ScheduleNotFound)?;
    if !schedule.has_free_slot() {
        return Err(ApiError::NoSlotsAvailable);
    }
    Ok(schedule)
}

// ── Admin statistics ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_students: u64,
    pub total_teachers: u64,
    pub total_courses: u64,
    pub active_courses: u64,
    pub new_registrations: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: u64,
    pub activos: u64,
    pub inactivos: u64,
    pub estudiantes: u64,
    pub docentes: u64,
    pub administradores: u64,
    pub nuevos_ultimo_mes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseStats {
    pub total: u64,
    pub activos: u64,
    pub inactivos: u64,
    pub total_inscripciones: u64,
    pub inscritos: u64,
    pub aprobados: u64,
    pub reprobados: u64,
    pub retirados: u64,
    pub asignaciones_activas: u64,
}

/// What an activity feed entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    UserCreated,
    CourseCreated,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserCreated => "user_created",
            Self::CourseCreated => "course_created",
        }
    }

    /// Table the entry refers to, as shown to clients.
    pub fn entity(self) -> &'static str {
        match self {
            Self::UserCreated => "usuario",
            Self::CourseCreated => "curso",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_created" => Ok(Self::UserCreated),
            "course_created" => Ok(Self::CourseCreated),
            other => Err(ParseError::new("activity kind", other)),
        }
    }
}

/// A user registration or course creation, newest first in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub tipo: ActivityKind,
    pub descripcion: String,
    pub fecha: DateTime<Utc>,
}

// ── System settings ──────────────────────────────────────────────────────────

/// Process-local platform settings exposed under `/api/admin/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub site_name: String,
    pub allow_registration: bool,
    pub email_settings: serde_json::Value,
    pub security_settings: serde_json::Value,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "to_rfc3339_ms_opt"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            site_name: "Plataforma de Suficiencia".to_owned(),
            allow_registration: true,
            email_settings: serde_json::json!({
                "smtpHost": "localhost",
                "smtpPort": 587,
                "fromEmail": "noreply@suficiencia.local"
            }),
            security_settings: serde_json::json!({
                "sessionTimeout": 1440,
                "maxLoginAttempts": 5
            }),
            updated_at: None,
        }
    }
}

/// Partial settings update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub site_name: Option<String>,
    pub allow_registration: Option<bool>,
    pub email_settings: Option<serde_json::Value>,
    pub security_settings: Option<serde_json::Value>,
}

impl SystemSettings {
    pub fn merge(&mut self, patch: SettingsPatch, now: DateTime<Utc>) {
        if let Some(v) = patch.site_name {
            self.site_name = v;
        }
        if let Some(v) = patch.allow_registration {
            self.allow_registration = v;
        }
        if let Some(v) = patch.email_settings {
            self.email_settings = v;
        }
        if let Some(v) = patch.security_settings {
            self.security_settings = v;
        }
        self.updated_at = Some(now);
    }
}

// ── Validation helpers ───────────────────────────────────────────────────────

/// Minimal structural email check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Stored form of an email address: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed, non-empty value or `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
