use uuid::Uuid;

use suficiencia_domain::pagination::{Page, PageRequest};

use crate::domain::repository::{AssignmentRepository, CourseRepository, EnrollmentRepository};
use crate::domain::types::{
    Course, CourseFilter, CoursePatch, CourseStudent, CourseSummary, CourseTeacher,
    DEFAULT_PASSING_PERCENTAGE, NewCourse, StudentCourse, TeacherCourse, non_blank,
    validate_passing_percentage,
};
use crate::error::{ApiError, FieldError};

async fn existing_course<C: CourseRepository>(courses: &C, id: Uuid) -> Result<Course, ApiError> {
    courses.find(id).await?.ok_or(ApiError::CourseNotFound)
}

// ── ListCourses ──────────────────────────────────────────────────────────────

pub struct ListCoursesUseCase<C: CourseRepository> {
    pub repo: C,
}

impl<C: CourseRepository> ListCoursesUseCase<C> {
    pub async fn execute(
        &self,
        filter: CourseFilter,
        page: PageRequest,
    ) -> Result<Page<CourseSummary>, ApiError> {
        let filter = CourseFilter {
            search: non_blank(filter.search),
            ..filter
        };
        self.repo.list(&filter, page).await
    }
}

// ── GetCourse ────────────────────────────────────────────────────────────────

pub struct GetCourseUseCase<C: CourseRepository> {
    pub repo: C,
}

impl<C: CourseRepository> GetCourseUseCase<C> {
    pub async fn execute(&self, id: Uuid) -> Result<Course, ApiError> {
        existing_course(&self.repo, id).await
    }
}

// ── CreateCourse ─────────────────────────────────────────────────────────────

pub struct CreateCourseInput {
    pub codigo_curso: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub porcentaje_minimo_examen: Option<i32>,
    pub activo: Option<bool>,
}

pub struct CreateCourseUseCase<C: CourseRepository> {
    pub repo: C,
}

impl<C: CourseRepository> CreateCourseUseCase<C> {
    pub async fn execute(
        &self,
        input: CreateCourseInput,
        creado_por: Uuid,
    ) -> Result<Course, ApiError> {
        let codigo_curso = input.codigo_curso.trim().to_owned();
        let nombre = input.nombre.trim().to_owned();
        let mut errors = Vec::new();
        if codigo_curso.is_empty() {
            errors.push(FieldError::new("codigo_curso", "must not be empty"));
        }
        if nombre.is_empty() {
            errors.push(FieldError::new("nombre", "must not be empty"));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        let porcentaje = input
            .porcentaje_minimo_examen
            .unwrap_or(DEFAULT_PASSING_PERCENTAGE);
        validate_passing_percentage(porcentaje)?;

        self.repo
            .create(&NewCourse {
                codigo_curso,
                nombre,
                descripcion: non_blank(input.descripcion),
                porcentaje_minimo_examen: porcentaje,
                activo: input.activo.unwrap_or(true),
                creado_por: Some(creado_por),
            })
            .await
    }
}

// ── UpdateCourse ─────────────────────────────────────────────────────────────

pub struct UpdateCourseUseCase<C: CourseRepository> {
    pub repo: C,
}

impl<C: CourseRepository> UpdateCourseUseCase<C> {
    pub async fn execute(&self, id: Uuid, patch: CoursePatch) -> Result<Course, ApiError> {
        let patch = CoursePatch {
            codigo_curso: non_blank(patch.codigo_curso),
            nombre: non_blank(patch.nombre),
            ..patch
        };
        if patch.is_empty() {
            return Err(ApiError::NoFieldsToUpdate);
        }
        if let Some(p) = patch.porcentaje_minimo_examen {
            validate_passing_percentage(p)?;
        }
        self.repo
            .update(id, &patch)
            .await?
            .ok_or(ApiError::CourseNotFound)
    }
}

// ── DeleteCourse ─────────────────────────────────────────────────────────────

pub struct DeleteCourseUseCase<C: CourseRepository> {
    pub repo: C,
}

impl<C: CourseRepository> DeleteCourseUseCase<C> {
    /// Refused while enrollments or teacher assignments reference the course.
    pub async fn execute(&self, id: Uuid) -> Result<(), ApiError> {
        existing_course(&self.repo, id).await?;
        if self.repo.dependents(id).await? > 0 {
            return Err(ApiError::CourseHasDependents);
        }
        if !self.repo.delete(id).await? {
            return Err(ApiError::CourseNotFound);
        }
        Ok(())
    }
}

// ── Course members ───────────────────────────────────────────────────────────

pub struct CourseStudentsUseCase<C: CourseRepository, E: EnrollmentRepository> {
    pub courses: C,
    pub enrollments: E,
}

impl<C: CourseRepository, E: EnrollmentRepository> CourseStudentsUseCase<C, E> {
    pub async fn execute(
        &self,
        curso_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CourseStudent>, ApiError> {
        existing_course(&self.courses, curso_id).await?;
        self.enrollments.list_for_course(curso_id, page).await
    }
}

pub struct CourseTeachersUseCase<C: CourseRepository, A: AssignmentRepository> {
    pub courses: C,
    pub assignments: A,
}

impl<C: CourseRepository, A: AssignmentRepository> CourseTeachersUseCase<C, A> {
    pub async fn execute(&self, curso_id: Uuid) -> Result<Vec<CourseTeacher>, ApiError> {
        existing_course(&self.courses, curso_id).await?;
        self.assignments.list_for_course(curso_id).await
    }
}

// ── Own courses ──────────────────────────────────────────────────────────────

pub struct StudentCoursesUseCase<C: CourseRepository> {
    pub repo: C,
}

impl<C: CourseRepository> StudentCoursesUseCase<C> {
    pub async fn execute(
        &self,
        usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<StudentCourse>, ApiError> {
        self.repo.student_courses(usuario_id, page).await
    }
}

pub struct TeacherCoursesUseCase<C: CourseRepository> {
    pub repo: C,
}

impl<C: CourseRepository> TeacherCoursesUseCase<C> {
    pub async fn execute(
        &self,
        usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<TeacherCourse>, ApiError> {
        self.repo.teacher_courses(usuario_id, page).await
    }
}
