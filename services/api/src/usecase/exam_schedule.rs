use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::info;
use uuid::Uuid;

use suficiencia_domain::exam::BookingStatus;
use suficiencia_domain::pagination::{Page, PageRequest};

use crate::domain::repository::{ExamScheduleRepository, SessionRepository};
use crate::domain::types::{
    AVAILABLE_STUDENTS_LIMIT, Booking, ExamSchedule, ExamSchedulePatch, ScheduleFilter,
    ScheduleStats, ScheduledStudent, StudentSummary, ensure_bookable, non_blank,
    validate_schedule_slot,
};
use crate::error::ApiError;

async fn existing_schedule<R: ExamScheduleRepository>(
    repo: &R,
    id: Uuid,
) -> Result<ExamSchedule, ApiError> {
    repo.find(id).await?.ok_or(ApiError::ScheduleNotFound)
}

// ── Queries ──────────────────────────────────────────────────────────────────

pub struct ListSchedulesUseCase<R: ExamScheduleRepository> {
    pub repo: R,
}

impl<R: ExamScheduleRepository> ListSchedulesUseCase<R> {
    pub async fn execute(
        &self,
        filter: ScheduleFilter,
        page: PageRequest,
    ) -> Result<Page<ExamSchedule>, ApiError> {
        let filter = ScheduleFilter {
            search: non_blank(filter.search),
            ..filter
        };
        self.repo.list(filter, page).await
    }
}

pub struct ScheduleStatsUseCase<R: ExamScheduleRepository> {
    pub repo: R,
}

impl<R: ExamScheduleRepository> ScheduleStatsUseCase<R> {
    pub async fn execute(&self, today: NaiveDate) -> Result<ScheduleStats, ApiError> {
        self.repo.stats(today).await
    }
}

pub struct GetScheduleUseCase<R: ExamScheduleRepository> {
    pub repo: R,
}

impl<R: ExamScheduleRepository> GetScheduleUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<ExamSchedule, ApiError> {
        existing_schedule(&self.repo, id).await
    }
}

pub struct ScheduleStudentsUseCase<R: ExamScheduleRepository> {
    pub repo: R,
}

impl<R: ExamScheduleRepository> ScheduleStudentsUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<Vec<ScheduledStudent>, ApiError> {
        existing_schedule(&self.repo, id).await?;
        self.repo.list_students(id).await
    }
}

pub struct AvailableStudentsUseCase<R: ExamScheduleRepository> {
    pub repo: R,
}

impl<R: ExamScheduleRepository> AvailableStudentsUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<Vec<StudentSummary>, ApiError> {
        existing_schedule(&self.repo, id).await?;
        self.repo.available_students(id, AVAILABLE_STUDENTS_LIMIT).await
    }
}

// ── CreateSchedule ───────────────────────────────────────────────────────────

pub struct CreateScheduleInput {
    pub fecha_examen: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub hora_fin: NaiveTime,
    pub cupos_disponibles: i32,
    pub activo: Option<bool>,
}

pub struct CreateScheduleUseCase<R: ExamScheduleRepository> {
    pub repo: R,
}

impl<R: ExamScheduleRepository> CreateScheduleUseCase<R> {
    /// Only an identical (date, start time) pair counts as a conflict;
    /// overlapping ranges are accepted.
    pub async fn execute(
        &self,
        input: CreateScheduleInput,
        creado_por: Uuid,
        today: NaiveDate,
    ) -> Result<ExamSchedule, ApiError> {
        validate_schedule_slot(
            input.fecha_examen,
            input.hora_inicio,
            input.hora_fin,
            input.cupos_disponibles,
            today,
        )?;
        if self
            .repo
            .exists_at(input.fecha_examen, input.hora_inicio, None)
            .await?
        {
            return Err(ApiError::ScheduleConflict);
        }
        let now = Utc::now();
        self.repo
            .create(&ExamSchedule {
                id: Uuid::now_v7(),
                fecha_examen: input.fecha_examen,
                hora_inicio: input.hora_inicio,
                hora_fin: input.hora_fin,
                cupos_disponibles: input.cupos_disponibles,
                cupos_ocupados: 0,
                activo: input.activo.unwrap_or(true),
                creado_por: Some(creado_por),
                fecha_creacion: now,
                fecha_actualizacion: now,
            })
            .await
    }
}

// ── UpdateSchedule ───────────────────────────────────────────────────────────

pub struct UpdateScheduleUseCase<R: ExamScheduleRepository> {
    pub repo: R,
}

impl<R: ExamScheduleRepository> UpdateScheduleUseCase<R> {
    /// The past-date rule applies only when the date itself changes, and the
    /// capacity may not drop below the occupied count.
    pub async fn execute(
        &self,
        id: Uuid,
        patch: ExamSchedulePatch,
        today: NaiveDate,
    ) -> Result<ExamSchedule, ApiError> {
        if patch.is_empty() {
            return Err(ApiError::NoFieldsToUpdate);
        }
        let current = existing_schedule(&self.repo, id).await?;
        let next = patch.apply_to(&current);

        if patch.fecha_examen.is_some() && next.fecha_examen < today {
            return Err(ApiError::InvalidExamDate);
        }
        if next.hora_fin <= next.hora_inicio {
            return Err(ApiError::InvalidTimeRange);
        }
        if next.cupos_disponibles < next.cupos_ocupados.max(1) {
            return Err(ApiError::InvalidCapacity);
        }
        let moved = next.fecha_examen != current.fecha_examen
            || next.hora_inicio != current.hora_inicio;
        if moved
            && self
                .repo
                .exists_at(next.fecha_examen, next.hora_inicio, Some(id))
                .await?
        {
            return Err(ApiError::ScheduleConflict);
        }
        self.repo
            .update(id, &patch)
            .await?
            .ok_or(ApiError::ScheduleNotFound)
    }
}

// ── DeleteSchedule ───────────────────────────────────────────────────────────

pub struct DeleteScheduleUseCase<R: ExamScheduleRepository> {
    pub repo: R,
}

impl<R: ExamScheduleRepository> DeleteScheduleUseCase<R> {
    /// Refused while any booking references the schedule.
    pub async fn execute(&self, id: Uuid) -> Result<(), ApiError> {
        existing_schedule(&self.repo, id).await?;
        if self.repo.booking_count(id).await? > 0 {
            return Err(ApiError::ScheduleHasStudents);
        }
        if !self.repo.delete(id).await? {
            return Err(ApiError::ScheduleNotFound);
        }
        Ok(())
    }
}

// ── Bookings ─────────────────────────────────────────────────────────────────

pub struct AddStudentToScheduleUseCase<R: ExamScheduleRepository, S: SessionRepository> {
    pub schedules: R,
    pub sessions: S,
}

impl<R: ExamScheduleRepository, S: SessionRepository> AddStudentToScheduleUseCase<R, S> {
    /// Checks run in order: schedule exists and is active, a slot is free,
    /// the user has a student record, the pair is not already booked. The
    /// repository repeats the schedule checks under lock before inserting.
    pub async fn execute(&self, horario_id: Uuid, usuario_id: Uuid) -> Result<Booking, ApiError> {
        let schedule = self.schedules.find(horario_id).await?;
        ensure_bookable(schedule.as_ref())?;
        let estudiante_id = self
            .sessions
            .student_id(usuario_id)
            .await?
            .ok_or(ApiError::StudentNotFound)?;
        let booking = self.schedules.book(horario_id, estudiante_id).await?;
        info!(
            horario_id = %horario_id,
            estudiante_id = %estudiante_id,
            "student booked on exam schedule"
        );
        Ok(booking)
    }
}

pub struct RemoveStudentFromScheduleUseCase<R: ExamScheduleRepository, S: SessionRepository> {
    pub schedules: R,
    pub sessions: S,
}

impl<R: ExamScheduleRepository, S: SessionRepository> RemoveStudentFromScheduleUseCase<R, S> {
    pub async fn execute(&self, horario_id: Uuid, usuario_id: Uuid) -> Result<(), ApiError> {
        let estudiante_id = self
            .sessions
            .student_id(usuario_id)
            .await?
            .ok_or(ApiError::AppointmentNotFound)?;
        self.schedules.unbook(horario_id, estudiante_id).await?;
        info!(
            horario_id = %horario_id,
            estudiante_id = %estudiante_id,
            "student removed from exam schedule"
        );
        Ok(())
    }
}

/// Status changes never touch the occupied count: a cancelled booking keeps
/// its slot until the student is removed.
pub struct UpdateBookingStatusUseCase<R: ExamScheduleRepository, S: SessionRepository> {
    pub schedules: R,
    pub sessions: S,
}

impl<R: ExamScheduleRepository, S: SessionRepository> UpdateBookingStatusUseCase<R, S> {
    pub async fn execute(
        &self,
        horario_id: Uuid,
        usuario_id: Uuid,
        estado: BookingStatus,
    ) -> Result<Booking, ApiError> {
        let estudiante_id = self
            .sessions
            .student_id(usuario_id)
            .await?
            .ok_or(ApiError::AppointmentNotFound)?;
        self.schedules
            .set_booking_status(horario_id, estudiante_id, estado)
            .await?
            .ok_or(ApiError::AppointmentNotFound)
    }
}
