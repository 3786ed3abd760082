use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use suficiencia_domain::enrollment::{AssignmentType, EnrollmentStatus};
use suficiencia_domain::role::RoleSet;

use crate::domain::types::{Assignment, Course, Enrollment, User};

pub mod admin;
pub mod auth;
pub mod course;
pub mod exam_schedule;
pub mod system;
pub mod user;

// ── Shared response bodies ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
    pub activo: bool,
    pub roles: RoleSet,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_creacion: DateTime<Utc>,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_actualizacion: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            codigo_institucional: user.codigo_institucional,
            email: user.email,
            nombres: user.nombres,
            apellidos: user.apellidos,
            activo: user.activo,
            roles: user.roles,
            fecha_creacion: user.fecha_creacion,
            fecha_actualizacion: user.fecha_actualizacion,
        }
    }
}

#[derive(Serialize)]
pub struct CourseResponse {
    pub id: Uuid,
    pub codigo_curso: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub porcentaje_minimo_examen: i32,
    pub activo: bool,
    pub creado_por: Option<Uuid>,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_creacion: DateTime<Utc>,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_actualizacion: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            codigo_curso: course.codigo_curso,
            nombre: course.nombre,
            descripcion: course.descripcion,
            porcentaje_minimo_examen: course.porcentaje_minimo_examen,
            activo: course.activo,
            creado_por: course.creado_por,
            fecha_creacion: course.fecha_creacion,
            fecha_actualizacion: course.fecha_actualizacion,
        }
    }
}

#[derive(Serialize)]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub curso_id: Uuid,
    pub usuario_id: Uuid,
    pub estado: EnrollmentStatus,
    pub nota_final: Option<f64>,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_inscripcion: DateTime<Utc>,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_estado: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(e: Enrollment) -> Self {
        Self {
            id: e.id,
            curso_id: e.curso_id,
            usuario_id: e.usuario_id,
            estado: e.estado,
            nota_final: e.nota_final,
            fecha_inscripcion: e.fecha_inscripcion,
            fecha_estado: e.fecha_estado,
        }
    }
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub curso_id: Uuid,
    pub usuario_id: Uuid,
    pub tipo_asignacion: AssignmentType,
    pub activo: bool,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_asignacion: DateTime<Utc>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(a: Assignment) -> Self {
        Self {
            id: a.id,
            curso_id: a.curso_id,
            usuario_id: a.usuario_id,
            tipo_asignacion: a.tipo_asignacion,
            activo: a.activo,
            fecha_asignacion: a.fecha_asignacion,
        }
    }
}
