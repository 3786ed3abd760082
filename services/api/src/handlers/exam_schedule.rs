use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use suficiencia_auth_types::identity::Caller;
use suficiencia_domain::exam::BookingStatus;
use suficiencia_domain::pagination::Pagination;

use crate::domain::types::{
    Booking, ExamSchedule, ExamSchedulePatch, ScheduleFilter, ScheduleStats, ScheduledStudent,
    StudentSummary,
};
use crate::error::ApiError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::handlers::MessageResponse;
use crate::state::AppState;
use crate::usecase::exam_schedule::{
    AddStudentToScheduleUseCase, AvailableStudentsUseCase, CreateScheduleInput,
    CreateScheduleUseCase, DeleteScheduleUseCase, GetScheduleUseCase, ListSchedulesUseCase,
    RemoveStudentFromScheduleUseCase, ScheduleStatsUseCase, ScheduleStudentsUseCase,
    UpdateBookingStatusUseCase, UpdateScheduleUseCase,
};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub id: Uuid,
    pub fecha_examen: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub hora_fin: NaiveTime,
    pub cupos_disponibles: i32,
    pub cupos_ocupados: i32,
    pub activo: bool,
    pub creado_por: Option<Uuid>,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_creacion: DateTime<Utc>,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_actualizacion: DateTime<Utc>,
}

impl From<ExamSchedule> for ScheduleResponse {
    fn from(s: ExamSchedule) -> Self {
        Self {
            id: s.id,
            fecha_examen: s.fecha_examen,
            hora_inicio: s.hora_inicio,
            hora_fin: s.hora_fin,
            cupos_disponibles: s.cupos_disponibles,
            cupos_ocupados: s.cupos_ocupados,
            activo: s.activo,
            creado_por: s.creado_por,
            fecha_creacion: s.fecha_creacion,
            fecha_actualizacion: s.fecha_actualizacion,
        }
    }
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub horario_examen_id: Uuid,
    pub estudiante_id: Uuid,
    pub estado: BookingStatus,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_agendamiento: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            horario_examen_id: b.horario_examen_id,
            estudiante_id: b.estudiante_id,
            estado: b.estado,
            fecha_agendamiento: b.fecha_agendamiento,
        }
    }
}

// ── GET /api/admin/exam-schedules ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListSchedulesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub fecha: Option<NaiveDate>,
    pub activo: Option<bool>,
}

#[derive(Serialize)]
pub struct SchedulesResponse {
    pub horarios: Vec<ScheduleResponse>,
    pub pagination: Pagination,
}

pub async fn list_schedules(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListSchedulesQuery>,
) -> Result<Json<SchedulesResponse>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = ListSchedulesUseCase {
        repo: state.exam_repo(),
    };
    let result = usecase
        .execute(
            ScheduleFilter {
                search: query.search,
                fecha: query.fecha,
                activo: query.activo,
            },
            page,
        )
        .await?;
    Ok(Json(SchedulesResponse {
        pagination: Pagination::new(page, result.total),
        horarios: result.items.into_iter().map(Into::into).collect(),
    }))
}

// ── GET /api/admin/exam-schedules/stats ──────────────────────────────────────

pub async fn schedule_stats(
    State(state): State<AppState>,
) -> Result<Json<ScheduleStats>, ApiError> {
    let usecase = ScheduleStatsUseCase {
        repo: state.exam_repo(),
    };
    Ok(Json(usecase.execute(today()).await?))
}

// ── GET /api/admin/exam-schedules/{id} ───────────────────────────────────────

#[derive(Serialize)]
pub struct ScheduleDetailResponse {
    pub horario: ScheduleResponse,
}

pub async fn get_schedule(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ScheduleDetailResponse>, ApiError> {
    let usecase = GetScheduleUseCase {
        repo: state.exam_repo(),
    };
    let schedule = usecase.execute(id).await?;
    Ok(Json(ScheduleDetailResponse {
        horario: schedule.into(),
    }))
}

// ── POST /api/admin/exam-schedules ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub fecha_examen: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub hora_fin: NaiveTime,
    pub cupos_disponibles: i32,
    pub activo: Option<bool>,
}

#[derive(Serialize)]
pub struct ScheduleMutationResponse {
    pub message: &'static str,
    pub horario: ScheduleResponse,
}

pub async fn create_schedule(
    caller: Caller,
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleMutationResponse>), ApiError> {
    let usecase = CreateScheduleUseCase {
        repo: state.exam_repo(),
    };
    let schedule = usecase
        .execute(
            CreateScheduleInput {
                fecha_examen: body.fecha_examen,
                hora_inicio: body.hora_inicio,
                hora_fin: body.hora_fin,
                cupos_disponibles: body.cupos_disponibles,
                activo: body.activo,
            },
            caller.usuario_id,
            today(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ScheduleMutationResponse {
            message: "Horario de examen creado exitosamente",
            horario: schedule.into(),
        }),
    ))
}

// ── PUT /api/admin/exam-schedules/{id} ───────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateScheduleRequest {
    pub fecha_examen: Option<NaiveDate>,
    pub hora_inicio: Option<NaiveTime>,
    pub hora_fin: Option<NaiveTime>,
    pub cupos_disponibles: Option<i32>,
    pub activo: Option<bool>,
}

pub async fn update_schedule(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateScheduleRequest>,
) -> Result<Json<ScheduleMutationResponse>, ApiError> {
    let usecase = UpdateScheduleUseCase {
        repo: state.exam_repo(),
    };
    let schedule = usecase
        .execute(
            id,
            ExamSchedulePatch {
                fecha_examen: body.fecha_examen,
                hora_inicio: body.hora_inicio,
                hora_fin: body.hora_fin,
                cupos_disponibles: body.cupos_disponibles,
                activo: body.activo,
            },
            today(),
        )
        .await?;
    Ok(Json(ScheduleMutationResponse {
        message: "Horario de examen actualizado exitosamente",
        horario: schedule.into(),
    }))
}

// ── DELETE /api/admin/exam-schedules/{id} ────────────────────────────────────

pub async fn delete_schedule(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let usecase = DeleteScheduleUseCase {
        repo: state.exam_repo(),
    };
    usecase.execute(id).await?;
    Ok(Json(MessageResponse {
        message: "Horario de examen eliminado exitosamente",
    }))
}

// ── GET /api/admin/exam-schedules/{id}/students ──────────────────────────────

#[derive(Serialize)]
pub struct ScheduledStudentResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub usuario_id: Uuid,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

impl From<ScheduledStudent> for ScheduledStudentResponse {
    fn from(s: ScheduledStudent) -> Self {
        Self {
            booking: s.booking.into(),
            usuario_id: s.usuario_id,
            codigo_institucional: s.codigo_institucional,
            email: s.email,
            nombres: s.nombres,
            apellidos: s.apellidos,
        }
    }
}

#[derive(Serialize)]
pub struct ScheduleStudentsResponse {
    pub estudiantes: Vec<ScheduledStudentResponse>,
}

pub async fn schedule_students(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ScheduleStudentsResponse>, ApiError> {
    let usecase = ScheduleStudentsUseCase {
        repo: state.exam_repo(),
    };
    let students = usecase.execute(id).await?;
    Ok(Json(ScheduleStudentsResponse {
        estudiantes: students.into_iter().map(Into::into).collect(),
    }))
}

// ── GET /api/admin/exam-schedules/{id}/available-students ────────────────────

#[derive(Serialize)]
pub struct AvailableStudentResponse {
    pub usuario_id: Uuid,
    pub estudiante_id: Uuid,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

impl From<StudentSummary> for AvailableStudentResponse {
    fn from(s: StudentSummary) -> Self {
        Self {
            usuario_id: s.usuario_id,
            estudiante_id: s.estudiante_id,
            codigo_institucional: s.codigo_institucional,
            email: s.email,
            nombres: s.nombres,
            apellidos: s.apellidos,
        }
    }
}

#[derive(Serialize)]
pub struct AvailableStudentsResponse {
    pub estudiantes: Vec<AvailableStudentResponse>,
}

pub async fn available_students(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<AvailableStudentsResponse>, ApiError> {
    let usecase = AvailableStudentsUseCase {
        repo: state.exam_repo(),
    };
    let students = usecase.execute(id).await?;
    Ok(Json(AvailableStudentsResponse {
        estudiantes: students.into_iter().map(Into::into).collect(),
    }))
}

// ── POST /api/admin/exam-schedules/{id}/students ─────────────────────────────

#[derive(Deserialize)]
pub struct AddStudentRequest {
    #[serde(alias = "estudiante_id")]
    pub usuario_id: Uuid,
}

#[derive(Serialize)]
pub struct BookingMutationResponse {
    pub message: &'static str,
    pub agendamiento: BookingResponse,
}

pub async fn add_student(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<AddStudentRequest>,
) -> Result<(StatusCode, Json<BookingMutationResponse>), ApiError> {
    let usecase = AddStudentToScheduleUseCase {
        schedules: state.exam_repo(),
        sessions: state.session_repo(),
    };
    let booking = usecase.execute(id, body.usuario_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingMutationResponse {
            message: "Estudiante agendado exitosamente",
            agendamiento: booking.into(),
        }),
    ))
}

// ── DELETE /api/admin/exam-schedules/{id}/students/{student_id} ──────────────

pub async fn remove_student(
    State(state): State<AppState>,
    AppPath((id, usuario_id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let usecase = RemoveStudentFromScheduleUseCase {
        schedules: state.exam_repo(),
        sessions: state.session_repo(),
    };
    usecase.execute(id, usuario_id).await?;
    Ok(Json(MessageResponse {
        message: "Estudiante removido del horario exitosamente",
    }))
}

// ── PUT /api/admin/exam-schedules/{id}/students/{student_id}/status ──────────

#[derive(Deserialize)]
pub struct BookingStatusRequest {
    pub estado: BookingStatus,
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    AppPath((id, usuario_id)): AppPath<(Uuid, Uuid)>,
    AppJson(body): AppJson<BookingStatusRequest>,
) -> Result<Json<BookingMutationResponse>, ApiError> {
    let usecase = UpdateBookingStatusUseCase {
        schedules: state.exam_repo(),
        sessions: state.session_repo(),
    };
    let booking = usecase.execute(id, usuario_id, body.estado).await?;
    Ok(Json(BookingMutationResponse {
        message: "Estado del agendamiento actualizado exitosamente",
        agendamiento: booking.into(),
    }))
}
