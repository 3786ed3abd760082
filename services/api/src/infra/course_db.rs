use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, FromQueryResult, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use suficiencia_api_schema::{curso_docentes, curso_estudiantes, cursos, usuarios};
use suficiencia_core::db::{ConstraintViolation, constraint_violation};
use suficiencia_domain::enrollment::{AssignmentType, EnrollmentStatus};
use suficiencia_domain::pagination::{Page, PageRequest};

use crate::domain::repository::{AssignmentRepository, CourseRepository, EnrollmentRepository};
use crate::domain::types::{
    Assignment, AssignmentPatch, Course, CourseFilter, CoursePatch, CourseStudent, CourseSummary,
    CourseTeacher, Enrollment, EnrollmentPatch, NewCourse, StudentCourse, TeacherCourse,
    UserAssignment, UserEnrollment,
};
use crate::error::ApiError;
use crate::infra::db::lower_like;
use crate::infra::unique_as;

// ── Course repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbCourseRepository {
    pub db: Arc<DatabaseConnection>,
}

impl CourseRepository for DbCourseRepository {
    async fn list(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<Page<CourseSummary>, ApiError> {
        let mut query = cursos::Entity::find();
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(lower_like(cursos::Column::CodigoCurso, &pattern))
                    .add(lower_like(cursos::Column::Nombre, &pattern)),
            );
        }
        if let Some(activo) = filter.activo {
            query = query.filter(cursos::Column::Activo.eq(activo));
        }

        let total = query
            .clone()
            .count(&*self.db)
            .await
            .context("count courses")?;
        let models = query
            .order_by_desc(cursos::Column::FechaCreacion)
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(&*self.db)
            .await
            .context("list courses")?;
        Ok(Page {
            items: course_summaries(&*self.db, models).await?,
            total,
        })
    }

    async fn find(&self, id: Uuid) -> Result<Option<Course>, ApiError> {
        let model = cursos::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find course")?;
        Ok(model.map(course_from_model))
    }

    async fn create(&self, course: &NewCourse) -> Result<Course, ApiError> {
        let now = Utc::now();
        let model = cursos::ActiveModel {
            id: Set(Uuid::new_v4()),
            codigo_curso: Set(course.codigo_curso.clone()),
            nombre: Set(course.nombre.clone()),
            descripcion: Set(course.descripcion.clone()),
            porcentaje_minimo_examen: Set(course.porcentaje_minimo_examen),
            activo: Set(course.activo),
            creado_por: Set(course.creado_por),
            fecha_creacion: Set(now),
            fecha_actualizacion: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| unique_as(e, ApiError::CourseCodeExists))?;
        Ok(course_from_model(model))
    }

    async fn update(&self, id: Uuid, patch: &CoursePatch) -> Result<Option<Course>, ApiError> {
        let Some(model) = cursos::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find course for update")?
        else {
            return Ok(None);
        };
        let mut active = model.into_active_model();
        if let Some(v) = &patch.codigo_curso {
            active.codigo_curso = Set(v.clone());
        }
        if let Some(v) = &patch.nombre {
            active.nombre = Set(v.clone());
        }
        if let Some(v) = &patch.descripcion {
            active.descripcion = Set(Some(v.clone()));
        }
        if let Some(v) = patch.porcentaje_minimo_examen {
            active.porcentaje_minimo_examen = Set(v);
        }
        if let Some(v) = patch.activo {
            active.activo = Set(v);
        }
        active.fecha_actualizacion = Set(Utc::now());
        let model = active
            .update(&*self.db)
            .await
            .map_err(|e| unique_as(e, ApiError::CourseCodeExists))?;
        Ok(Some(course_from_model(model)))
    }

    async fn dependents(&self, id: Uuid) -> Result<u64, ApiError> {
        let enrollments = curso_estudiantes::Entity::find()
            .filter(curso_estudiantes::Column::CursoId.eq(id))
            .count(&*self.db)
            .await
            .context("count course enrollments")?;
        let assignments = curso_docentes::Entity::find()
            .filter(curso_docentes::Column::CursoId.eq(id))
            .count(&*self.db)
            .await
            .context("count course assignments")?;
        Ok(enrollments + assignments)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = cursos::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| match constraint_violation(&e) {
                // A dependent row slipped in after the count.
                Some(ConstraintViolation::ForeignKey) => ApiError::CourseHasDependents,
                _ => ApiError::from(e),
            })?;
        Ok(result.rows_affected > 0)
    }

    async fn student_courses(
        &self,
        usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<StudentCourse>, ApiError> {
        let query = curso_estudiantes::Entity::find()
            .filter(curso_estudiantes::Column::UsuarioId.eq(usuario_id));
        let total = query
            .clone()
            .count(&*self.db)
            .await
            .context("count student courses")?;
        let rows = query
            .find_also_related(cursos::Entity)
            .order_by_desc(curso_estudiantes::Column::FechaInscripcion)
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(&*self.db)
            .await
            .context("list student courses")?;

        let mut items = Vec::with_capacity(rows.len());
        for (row, course) in rows {
            let Some(course) = course else { continue };
            let enrollment = enrollment_from_model(row)?;
            items.push(StudentCourse {
                course: course_from_model(course),
                estado: enrollment.estado,
                nota_final: enrollment.nota_final,
                fecha_inscripcion: enrollment.fecha_inscripcion,
                fecha_estado: enrollment.fecha_estado,
            });
        }
        Ok(Page { items, total })
    }

    async fn teacher_courses(
        &self,
        usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<TeacherCourse>, ApiError> {
        let query = curso_docentes::Entity::find()
            .filter(curso_docentes::Column::UsuarioId.eq(usuario_id))
            .filter(curso_docentes::Column::Activo.eq(true));
        let total = query
            .clone()
            .count(&*self.db)
            .await
            .context("count teacher courses")?;
        let rows = query
            .find_also_related(cursos::Entity)
            .order_by_desc(curso_docentes::Column::FechaAsignacion)
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(&*self.db)
            .await
            .context("list teacher courses")?;

        let ids: Vec<Uuid> = rows.iter().map(|(a, _)| a.curso_id).collect();
        let students = count_by_course::<curso_estudiantes::Entity, _>(
            &*self.db,
            curso_estudiantes::Column::CursoId,
            &ids,
        )
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for (row, course) in rows {
            let Some(course) = course else { continue };
            let assignment = assignment_from_model(row)?;
            items.push(TeacherCourse {
                total_estudiantes: students.get(&course.id).copied().unwrap_or(0),
                course: course_from_model(course),
                tipo_asignacion: assignment.tipo_asignacion,
                fecha_asignacion: assignment.fecha_asignacion,
            });
        }
        Ok(Page { items, total })
    }
}

// ── Enrollment repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEnrollmentRepository {
    pub db: Arc<DatabaseConnection>,
}

impl EnrollmentRepository for DbEnrollmentRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Enrollment>, ApiError> {
        curso_estudiantes::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find enrollment")?
            .map(enrollment_from_model)
            .transpose()
    }

    async fn find_pair(
        &self,
        curso_id: Uuid,
        usuario_id: Uuid,
    ) -> Result<Option<Enrollment>, ApiError> {
        curso_estudiantes::Entity::find()
            .filter(curso_estudiantes::Column::CursoId.eq(curso_id))
            .filter(curso_estudiantes::Column::UsuarioId.eq(usuario_id))
            .one(&*self.db)
            .await
            .context("find enrollment by pair")?
            .map(enrollment_from_model)
            .transpose()
    }

    async fn insert(&self, enrollment: &Enrollment) -> Result<Enrollment, ApiError> {
        let model = curso_estudiantes::ActiveModel {
            id: Set(enrollment.id),
            curso_id: Set(enrollment.curso_id),
            usuario_id: Set(enrollment.usuario_id),
            estado: Set(enrollment.estado.as_str().to_owned()),
            nota_final: Set(enrollment.nota_final),
            fecha_inscripcion: Set(enrollment.fecha_inscripcion),
            fecha_estado: Set(enrollment.fecha_estado),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| unique_as(e, ApiError::AlreadyEnrolled))?;
        enrollment_from_model(model)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: EnrollmentPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, ApiError> {
        let Some(model) = curso_estudiantes::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find enrollment for update")?
        else {
            return Ok(None);
        };
        let mut active = model.into_active_model();
        if let Some(estado) = patch.estado {
            active.estado = Set(estado.as_str().to_owned());
        }
        if let Some(nota) = patch.nota_final {
            active.nota_final = Set(Some(nota));
        }
        active.fecha_estado = Set(now);
        let model = active.update(&*self.db).await?;
        enrollment_from_model(model).map(Some)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = curso_estudiantes::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .context("delete enrollment")?;
        Ok(result.rows_affected > 0)
    }

    async fn list_for_course(
        &self,
        curso_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CourseStudent>, ApiError> {
        let query = curso_estudiantes::Entity::find()
            .filter(curso_estudiantes::Column::CursoId.eq(curso_id));
        let total = query
            .clone()
            .count(&*self.db)
            .await
            .context("count course students")?;
        let rows = query
            .find_also_related(usuarios::Entity)
            .order_by_asc(usuarios::Column::Apellidos)
            .order_by_asc(usuarios::Column::Nombres)
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(&*self.db)
            .await
            .context("list course students")?;

        let mut items = Vec::with_capacity(rows.len());
        for (row, user) in rows {
            let Some(user) = user else { continue };
            items.push(CourseStudent {
                enrollment: enrollment_from_model(row)?,
                codigo_institucional: user.codigo_institucional,
                email: user.email,
                nombres: user.nombres,
                apellidos: user.apellidos,
            });
        }
        Ok(Page { items, total })
    }

    async fn list_for_users(&self, usuario_ids: &[Uuid]) -> Result<Vec<UserEnrollment>, ApiError> {
        if usuario_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = curso_estudiantes::Entity::find()
            .filter(curso_estudiantes::Column::UsuarioId.is_in(usuario_ids.iter().copied()))
            .find_also_related(cursos::Entity)
            .order_by_desc(curso_estudiantes::Column::FechaInscripcion)
            .all(&*self.db)
            .await
            .context("list enrollments for users")?;

        let mut items = Vec::with_capacity(rows.len());
        for (row, course) in rows {
            let Some(course) = course else { continue };
            items.push(UserEnrollment {
                enrollment: enrollment_from_model(row)?,
                codigo_curso: course.codigo_curso,
                curso_nombre: course.nombre,
            });
        }
        Ok(items)
    }
}

// ── Assignment repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAssignmentRepository {
    pub db: Arc<DatabaseConnection>,
}

impl AssignmentRepository for DbAssignmentRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Assignment>, ApiError> {
        curso_docentes::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find assignment")?
            .map(assignment_from_model)
            .transpose()
    }

    async fn insert(&self, assignment: &Assignment) -> Result<Assignment, ApiError> {
        let model = curso_docentes::ActiveModel {
            id: Set(assignment.id),
            curso_id: Set(assignment.curso_id),
            usuario_id: Set(assignment.usuario_id),
            tipo_asignacion: Set(assignment.tipo_asignacion.as_str().to_owned()),
            activo: Set(assignment.activo),
            fecha_asignacion: Set(assignment.fecha_asignacion),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| unique_as(e, ApiError::AlreadyAssigned))?;
        assignment_from_model(model)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: AssignmentPatch,
    ) -> Result<Option<Assignment>, ApiError> {
        let Some(model) = curso_docentes::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find assignment for update")?
        else {
            return Ok(None);
        };
        let mut active = model.into_active_model();
        if let Some(tipo) = patch.tipo_asignacion {
            active.tipo_asignacion = Set(tipo.as_str().to_owned());
        }
        if let Some(activo) = patch.activo {
            active.activo = Set(activo);
        }
        let model = active.update(&*self.db).await?;
        assignment_from_model(model).map(Some)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = curso_docentes::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .context("delete assignment")?;
        Ok(result.rows_affected > 0)
    }

    async fn list_for_course(&self, curso_id: Uuid) -> Result<Vec<CourseTeacher>, ApiError> {
        let rows = curso_docentes::Entity::find()
            .filter(curso_docentes::Column::CursoId.eq(curso_id))
            .find_also_related(usuarios::Entity)
            .order_by_asc(curso_docentes::Column::FechaAsignacion)
            .all(&*self.db)
            .await
            .context("list course teachers")?;

        let mut items = Vec::with_capacity(rows.len());
        for (row, user) in rows {
            let Some(user) = user else { continue };
            items.push(CourseTeacher {
                assignment: assignment_from_model(row)?,
                codigo_institucional: user.codigo_institucional,
                email: user.email,
                nombres: user.nombres,
                apellidos: user.apellidos,
            });
        }
        Ok(items)
    }

    async fn list_for_users(
        &self,
        usuario_ids: &[Uuid],
    ) -> Result<Vec<UserAssignment>, ApiError> {
        if usuario_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = curso_docentes::Entity::find()
            .filter(curso_docentes::Column::UsuarioId.is_in(usuario_ids.iter().copied()))
            .find_also_related(cursos::Entity)
            .order_by_desc(curso_docentes::Column::FechaAsignacion)
            .all(&*self.db)
            .await
            .context("list assignments for users")?;

        let mut items = Vec::with_capacity(rows.len());
        for (row, course) in rows {
            let Some(course) = course else { continue };
            items.push(UserAssignment {
                assignment: assignment_from_model(row)?,
                codigo_curso: course.codigo_curso,
                curso_nombre: course.nombre,
            });
        }
        Ok(items)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

#[derive(Debug, FromQueryResult)]
struct CourseCount {
    curso_id: Uuid,
    total: i64,
}

/// Row counts of `E` grouped by its course column.
async fn count_by_course<E, C>(
    conn: &C,
    column: E::Column,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, u64>, ApiError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = E::find()
        .select_only()
        .column_as(column, "curso_id")
        .column_as(Expr::col(column).count(), "total")
        .filter(column.is_in(ids.iter().copied()))
        .group_by(column)
        .into_model::<CourseCount>()
        .all(conn)
        .await
        .context("count rows per course")?;
    Ok(rows
        .into_iter()
        .map(|r| (r.curso_id, u64::try_from(r.total).unwrap_or(0)))
        .collect())
}

/// Attach student and teacher counts to course rows.
pub(crate) async fn course_summaries<C: ConnectionTrait>(
    conn: &C,
    models: Vec<cursos::Model>,
) -> Result<Vec<CourseSummary>, ApiError> {
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let students = count_by_course::<curso_estudiantes::Entity, _>(
        conn,
        curso_estudiantes::Column::CursoId,
        &ids,
    )
    .await?;
    let teachers =
        count_by_course::<curso_docentes::Entity, _>(conn, curso_docentes::Column::CursoId, &ids)
            .await?;
    Ok(models
        .into_iter()
        .map(|m| CourseSummary {
            total_estudiantes: students.get(&m.id).copied().unwrap_or(0),
            total_docentes: teachers.get(&m.id).copied().unwrap_or(0),
            course: course_from_model(m),
        })
        .collect())
}

fn course_from_model(model: cursos::Model) -> Course {
    Course {
        id: model.id,
        codigo_curso: model.codigo_curso,
        nombre: model.nombre,
        descripcion: model.descripcion,
        porcentaje_minimo_examen: model.porcentaje_minimo_examen,
        activo: model.activo,
        creado_por: model.creado_por,
        fecha_creacion: model.fecha_creacion,
        fecha_actualizacion: model.fecha_actualizacion,
    }
}

fn enrollment_from_model(model: curso_estudiantes::Model) -> Result<Enrollment, ApiError> {
    Ok(Enrollment {
        id: model.id,
        curso_id: model.curso_id,
        usuario_id: model.usuario_id,
        estado: model
            .estado
            .parse::<EnrollmentStatus>()
            .context("stored enrollment status")?,
        nota_final: model.nota_final,
        fecha_inscripcion: model.fecha_inscripcion,
        fecha_estado: model.fecha_estado,
    })
}

fn assignment_from_model(model: curso_docentes::Model) -> Result<Assignment, ApiError> {
    Ok(Assignment {
        id: model.id,
        curso_id: model.curso_id,
        usuario_id: model.usuario_id,
        tipo_asignacion: model
            .tipo_asignacion
            .parse::<AssignmentType>()
            .context("stored assignment type")?,
        activo: model.activo,
        fecha_asignacion: model.fecha_asignacion,
    })
}
