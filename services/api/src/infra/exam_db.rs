use std::sync::Arc;

use anyhow::Context as _;
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, FromQueryResult, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Statement, TransactionTrait,
};
use uuid::Uuid;

use suficiencia_api_schema::{agendamientos_examen, horarios_examenes};
use suficiencia_core::db::{ConstraintViolation, constraint_violation};
use suficiencia_domain::exam::BookingStatus;
use suficiencia_domain::pagination::{Page, PageRequest};

use crate::domain::repository::ExamScheduleRepository;
use crate::domain::types::{
    Booking, ExamSchedule, ExamSchedulePatch, ScheduleFilter, ScheduleStats, ScheduledStudent,
    StudentSummary, ensure_bookable,
};
use crate::error::ApiError;
use crate::infra::{txn_err, unique_as};

#[derive(Clone)]
pub struct DbExamScheduleRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ExamScheduleRepository for DbExamScheduleRepository {
    async fn list(
        &self,
        filter: ScheduleFilter,
        page: PageRequest,
    ) -> Result<Page<ExamSchedule>, ApiError> {
        let mut query = horarios_examenes::Entity::find();
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            query = query.filter(Expr::cust_with_values(
                "(TO_CHAR(horarios_examenes.fecha_examen, 'DD/MM/YYYY') ILIKE ? \
                 OR TO_CHAR(horarios_examenes.hora_inicio, 'HH24:MI') ILIKE ? \
                 OR TO_CHAR(horarios_examenes.hora_fin, 'HH24:MI') ILIKE ?)",
                [pattern.clone(), pattern.clone(), pattern],
            ));
        }
        if let Some(fecha) = filter.fecha {
            query = query.filter(horarios_examenes::Column::FechaExamen.eq(fecha));
        }
        if let Some(activo) = filter.activo {
            query = query.filter(horarios_examenes::Column::Activo.eq(activo));
        }
        let total = query
            .clone()
            .count(&*self.db)
            .await
            .context("count exam schedules")?;
        let models = query
            .order_by_asc(horarios_examenes::Column::FechaExamen)
            .order_by_asc(horarios_examenes::Column::HoraInicio)
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(&*self.db)
            .await
            .context("list exam schedules")?;
        Ok(Page {
            items: models.into_iter().map(schedule_from_model).collect(),
            total,
        })
    }

    async fn stats(&self, today: NaiveDate) -> Result<ScheduleStats, ApiError> {
        let total_horarios = horarios_examenes::Entity::find()
            .count(&*self.db)
            .await
            .context("count schedules")?;
        let horarios_activos = horarios_examenes::Entity::find()
            .filter(horarios_examenes::Column::Activo.eq(true))
            .count(&*self.db)
            .await
            .context("count active schedules")?;
        let horarios_futuros = horarios_examenes::Entity::find()
            .filter(horarios_examenes::Column::FechaExamen.gte(today))
            .count(&*self.db)
            .await
            .context("count upcoming schedules")?;
        let estudiantes_agendados: Option<i64> = agendamientos_examen::Entity::find()
            .select_only()
            .column_as(
                SimpleExpr::from(Func::count_distinct(Expr::col(
                    agendamientos_examen::Column::EstudianteId,
                ))),
                "total",
            )
            .filter(agendamientos_examen::Column::Estado.ne(BookingStatus::Cancelled.as_str()))
            .into_tuple()
            .one(&*self.db)
            .await
            .context("count scheduled students")?;
        Ok(ScheduleStats {
            total_horarios,
            horarios_activos,
            cupos_totales: self.sum(horarios_examenes::Column::CuposDisponibles).await?,
            cupos_ocupados: self.sum(horarios_examenes::Column::CuposOcupados).await?,
            horarios_futuros,
            estudiantes_agendados: estudiantes_agendados
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0),
        })
    }

    async fn find(&self, id: Uuid) -> Result<Option<ExamSchedule>, ApiError> {
        let model = horarios_examenes::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find exam schedule")?;
        Ok(model.map(schedule_from_model))
    }

    async fn exists_at(
        &self,
        fecha_examen: NaiveDate,
        hora_inicio: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<bool, ApiError> {
        let mut query = horarios_examenes::Entity::find()
            .filter(horarios_examenes::Column::FechaExamen.eq(fecha_examen))
            .filter(horarios_examenes::Column::HoraInicio.eq(hora_inicio));
        if let Some(id) = exclude {
            query = query.filter(horarios_examenes::Column::Id.ne(id));
        }
        let n = query
            .count(&*self.db)
            .await
            .context("check schedule conflict")?;
        Ok(n > 0)
    }

    async fn create(&self, schedule: &ExamSchedule) -> Result<ExamSchedule, ApiError> {
        let model = horarios_examenes::ActiveModel {
            id: Set(schedule.id),
            fecha_examen: Set(schedule.fecha_examen),
            hora_inicio: Set(schedule.hora_inicio),
            hora_fin: Set(schedule.hora_fin),
            cupos_disponibles: Set(schedule.cupos_disponibles),
            cupos_ocupados: Set(schedule.cupos_ocupados),
            activo: Set(schedule.activo),
            creado_por: Set(schedule.creado_por),
            fecha_creacion: Set(schedule.fecha_creacion),
            fecha_actualizacion: Set(schedule.fecha_actualizacion),
        }
        .insert(&*self.db)
        .await?;
        Ok(schedule_from_model(model))
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &ExamSchedulePatch,
    ) -> Result<Option<ExamSchedule>, ApiError> {
        let Some(model) = horarios_examenes::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find exam schedule for update")?
        else {
            return Ok(None);
        };
        let mut active = model.into_active_model();
        if let Some(v) = patch.fecha_examen {
            active.fecha_examen = Set(v);
        }
        if let Some(v) = patch.hora_inicio {
            active.hora_inicio = Set(v);
        }
        if let Some(v) = patch.hora_fin {
            active.hora_fin = Set(v);
        }
        if let Some(v) = patch.cupos_disponibles {
            active.cupos_disponibles = Set(v);
        }
        if let Some(v) = patch.activo {
            active.activo = Set(v);
        }
        active.fecha_actualizacion = Set(Utc::now());
        let model = active.update(&*self.db).await?;
        Ok(Some(schedule_from_model(model)))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = horarios_examenes::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| match constraint_violation(&e) {
                Some(ConstraintViolation::ForeignKey) => ApiError::ScheduleHasStudents,
                _ => ApiError::from(e),
            })?;
        Ok(result.rows_affected > 0)
    }

    async fn booking_count(&self, id: Uuid) -> Result<u64, ApiError> {
        let n = agendamientos_examen::Entity::find()
            .filter(agendamientos_examen::Column::HorarioExamenId.eq(id))
            .count(&*self.db)
            .await
            .context("count schedule bookings")?;
        Ok(n)
    }

    async fn list_students(&self, id: Uuid) -> Result<Vec<ScheduledStudent>, ApiError> {
        #[derive(Debug, FromQueryResult)]
        struct Row {
            id: Uuid,
            horario_examen_id: Uuid,
            estudiante_id: Uuid,
            estado: String,
            fecha_agendamiento: chrono::DateTime<Utc>,
            usuario_id: Uuid,
            codigo_institucional: Option<String>,
            email: String,
            nombres: String,
            apellidos: String,
        }

        let sql = r#"
            SELECT a.id, a.horario_examen_id, a.estudiante_id, a.estado, a.fecha_agendamiento,
                   u.id AS usuario_id, u.codigo_institucional, u.email, u.nombres, u.apellidos
            FROM agendamientos_examen a
            JOIN estudiantes e ON e.id = a.estudiante_id
            JOIN usuarios u ON u.id = e.usuario_id
            WHERE a.horario_examen_id = $1
            ORDER BY u.apellidos, u.nombres
        "#;
        let rows = Row::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            sql,
            [id.into()],
        ))
        .all(&*self.db)
        .await
        .context("list scheduled students")?;

        rows.into_iter()
            .map(|r| {
                Ok(ScheduledStudent {
                    booking: Booking {
                        id: r.id,
                        horario_examen_id: r.horario_examen_id,
                        estudiante_id: r.estudiante_id,
                        estado: r
                            .estado
                            .parse::<BookingStatus>()
                            .context("stored booking status")?,
                        fecha_agendamiento: r.fecha_agendamiento,
                    },
                    usuario_id: r.usuario_id,
                    codigo_institucional: r.codigo_institucional,
                    email: r.email,
                    nombres: r.nombres,
                    apellidos: r.apellidos,
                })
            })
            .collect()
    }

    async fn available_students(
        &self,
        id: Uuid,
        limit: u64,
    ) -> Result<Vec<StudentSummary>, ApiError> {
        #[derive(Debug, FromQueryResult)]
        struct Row {
            usuario_id: Uuid,
            estudiante_id: Uuid,
            codigo_institucional: Option<String>,
            email: String,
            nombres: String,
            apellidos: String,
        }

        let sql = r#"
            SELECT u.id AS usuario_id, e.id AS estudiante_id,
                   u.codigo_institucional, u.email, u.nombres, u.apellidos
            FROM estudiantes e
            JOIN usuarios u ON u.id = e.usuario_id
            WHERE u.activo = true
              AND EXISTS (
                  SELECT 1 FROM usuario_roles r
                  WHERE r.usuario_id = u.id AND r.rol = 'estudiante'
              )
              AND NOT EXISTS (
                  SELECT 1 FROM agendamientos_examen a
                  WHERE a.estudiante_id = e.id AND a.horario_examen_id = $1
              )
            ORDER BY u.apellidos, u.nombres
            LIMIT $2
        "#;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = Row::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            sql,
            [id.into(), limit.into()],
        ))
        .all(&*self.db)
        .await
        .context("list students available for schedule")?;

        Ok(rows
            .into_iter()
            .map(|r| StudentSummary {
                usuario_id: r.usuario_id,
                estudiante_id: r.estudiante_id,
                codigo_institucional: r.codigo_institucional,
                email: r.email,
                nombres: r.nombres,
                apellidos: r.apellidos,
            })
            .collect())
    }

    async fn book(&self, horario_id: Uuid, estudiante_id: Uuid) -> Result<Booking, ApiError> {
        self.db
            .transaction::<_, Booking, ApiError>(|txn| {
                Box::pin(async move {
                    let schedule = horarios_examenes::Entity::find_by_id(horario_id)
                        .lock_exclusive()
                        .one(txn)
                        .await?
                        .map(schedule_from_model);
                    ensure_bookable(schedule.as_ref())?;

                    let now = Utc::now();
                    let model = agendamientos_examen::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        horario_examen_id: Set(horario_id),
                        estudiante_id: Set(estudiante_id),
                        estado: Set(BookingStatus::Booked.as_str().to_owned()),
                        fecha_agendamiento: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| unique_as(e, ApiError::StudentAlreadyScheduled))?;

                    horarios_examenes::Entity::update_many()
                        .col_expr(
                            horarios_examenes::Column::CuposOcupados,
                            Expr::col(horarios_examenes::Column::CuposOcupados).add(1),
                        )
                        .col_expr(horarios_examenes::Column::FechaActualizacion, Expr::value(now))
                        .filter(horarios_examenes::Column::Id.eq(horario_id))
                        .exec(txn)
                        .await?;

                    booking_from_model(model)
                })
            })
            .await
            .map_err(txn_err)
    }

    async fn unbook(&self, horario_id: Uuid, estudiante_id: Uuid) -> Result<(), ApiError> {
        self.db
            .transaction::<_, (), ApiError>(|txn| {
                Box::pin(async move {
                    let schedule = horarios_examenes::Entity::find_by_id(horario_id)
                        .lock_exclusive()
                        .one(txn)
                        .await?
                        .ok_or(ApiError::AppointmentNotFound)?;

                    let deleted = agendamientos_examen::Entity::delete_many()
                        .filter(agendamientos_examen::Column::HorarioExamenId.eq(horario_id))
                        .filter(agendamientos_examen::Column::EstudianteId.eq(estudiante_id))
                        .exec(txn)
                        .await?;
                    if deleted.rows_affected == 0 {
                        return Err(ApiError::AppointmentNotFound);
                    }

                    let occupied = (schedule.cupos_ocupados - 1).max(0);
                    let mut active = schedule.into_active_model();
                    active.cupos_ocupados = Set(occupied);
                    active.fecha_actualizacion = Set(Utc::now());
                    active.update(txn).await?;
                    Ok(())
                })
            })
            .await
            .map_err(txn_err)
    }

    async fn set_booking_status(
        &self,
        horario_id: Uuid,
        estudiante_id: Uuid,
        estado: BookingStatus,
    ) -> Result<Option<Booking>, ApiError> {
        let Some(model) = agendamientos_examen::Entity::find()
            .filter(agendamientos_examen::Column::HorarioExamenId.eq(horario_id))
            .filter(agendamientos_examen::Column::EstudianteId.eq(estudiante_id))
            .one(&*self.db)
            .await
            .context("find booking")?
        else {
            return Ok(None);
        };
        let mut active = model.into_active_model();
        active.estado = Set(estado.as_str().to_owned());
        let model = active.update(&*self.db).await?;
        booking_from_model(model).map(Some)
    }
}

impl DbExamScheduleRepository {
    async fn sum(&self, column: horarios_examenes::Column) -> Result<u64, ApiError> {
        let total: Option<Option<i64>> = horarios_examenes::Entity::find()
            .select_only()
            .column_as(Expr::col(column).sum(), "total")
            .into_tuple()
            .one(&*self.db)
            .await
            .context("sum schedule slots")?;
        Ok(total
            .flatten()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0))
    }
}

fn schedule_from_model(model: horarios_examenes::Model) -> ExamSchedule {
    ExamSchedule {
        id: model.id,
        fecha_examen: model.fecha_examen,
        hora_inicio: model.hora_inicio,
        hora_fin: model.hora_fin,
        cupos_disponibles: model.cupos_disponibles,
        cupos_ocupados: model.cupos_ocupados,
        activo: model.activo,
        creado_por: model.creado_por,
        fecha_creacion: model.fecha_creacion,
        fecha_actualizacion: model.fecha_actualizacion,
    }
}

fn booking_from_model(model: agendamientos_examen::Model) -> Result<Booking, ApiError> {
    Ok(Booking {
        id: model.id,
        horario_examen_id: model.horario_examen_id,
        estudiante_id: model.estudiante_id,
        estado: model
            .estado
            .parse::<BookingStatus>()
            .context("stored booking status")?,
        fecha_agendamiento: model.fecha_agendamiento,
    })
}
