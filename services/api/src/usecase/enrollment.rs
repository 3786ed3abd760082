use chrono::Utc;
use uuid::Uuid;

use suficiencia_domain::enrollment::{AssignmentType, EnrollmentStatus};
use suficiencia_domain::role::Role;

use crate::domain::repository::{
    AssignmentRepository, CourseRepository, EnrollmentRepository, UserRepository,
};
use crate::domain::types::{
    Assignment, AssignmentPatch, Enrollment, EnrollmentPatch, validate_grade,
};
use crate::error::ApiError;

// ── Enroll ───────────────────────────────────────────────────────────────────

pub struct EnrollStudentUseCase<C, U, E>
where
    C: CourseRepository,
    U: UserRepository,
    E: EnrollmentRepository,
{
    pub courses: C,
    pub users: U,
    pub enrollments: E,
}

impl<C, U, E> EnrollStudentUseCase<C, U, E>
where
    C: CourseRepository,
    U: UserRepository,
    E: EnrollmentRepository,
{
    /// Create an `inscrito` enrollment for an active student in an active course.
    pub async fn execute(&self, curso_id: Uuid, usuario_id: Uuid) -> Result<Enrollment, ApiError> {
        self.courses
            .find(curso_id)
            .await?
            .filter(|c| c.activo)
            .ok_or(ApiError::CourseNotFound)?;
        self.users
            .find_by_id(usuario_id)
            .await?
            .filter(|u| u.activo && u.roles.contains(Role::Student))
            .ok_or(ApiError::StudentNotFound)?;
        if self.enrollments.find_pair(curso_id, usuario_id).await?.is_some() {
            return Err(ApiError::AlreadyEnrolled);
        }

        let now = Utc::now();
        // A concurrent duplicate still hits the unique constraint and maps to
        // AlreadyEnrolled.
        self.enrollments
            .insert(&Enrollment {
                id: Uuid::now_v7(),
                curso_id,
                usuario_id,
                estado: EnrollmentStatus::Enrolled,
                nota_final: None,
                fecha_inscripcion: now,
                fecha_estado: now,
            })
            .await
    }
}

pub struct AssignStudentUseCase<C, U, E>
where
    C: CourseRepository,
    U: UserRepository,
    E: EnrollmentRepository,
{
    pub enroll: EnrollStudentUseCase<C, U, E>,
}

impl<C, U, E> AssignStudentUseCase<C, U, E>
where
    C: CourseRepository,
    U: UserRepository,
    E: EnrollmentRepository,
{
    /// Admin enrollment: names a missing student role explicitly before
    /// enrolling.
    pub async fn execute(&self, curso_id: Uuid, usuario_id: Uuid) -> Result<Enrollment, ApiError> {
        let user = self
            .enroll
            .users
            .find_by_id(usuario_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        if !user.roles.contains(Role::Student) {
            return Err(ApiError::UserNotStudent);
        }
        self.enroll.execute(curso_id, usuario_id).await
    }
}

// ── Status ───────────────────────────────────────────────────────────────────

/// Administrative status change. Any state may move to any other state; the
/// prior state is not checked.
pub struct UpdateEnrollmentStatusUseCase<E: EnrollmentRepository> {
    pub repo: E,
}

impl<E: EnrollmentRepository> UpdateEnrollmentStatusUseCase<E> {
    pub async fn execute(
        &self,
        curso_id: Uuid,
        usuario_id: Uuid,
        patch: EnrollmentPatch,
    ) -> Result<Enrollment, ApiError> {
        check_enrollment_patch(&patch)?;
        let enrollment = self
            .repo
            .find_pair(curso_id, usuario_id)
            .await?
            .ok_or(ApiError::EnrollmentNotFound)?;
        self.repo
            .update(enrollment.id, patch, Utc::now())
            .await?
            .ok_or(ApiError::EnrollmentNotFound)
    }
}

pub struct UpdateEnrollmentUseCase<E: EnrollmentRepository> {
    pub repo: E,
}

impl<E: EnrollmentRepository> UpdateEnrollmentUseCase<E> {
    pub async fn execute(&self, id: Uuid, patch: EnrollmentPatch) -> Result<Enrollment, ApiError> {
        check_enrollment_patch(&patch)?;
        self.repo
            .update(id, patch, Utc::now())
            .await?
            .ok_or(ApiError::EnrollmentNotFound)
    }
}

fn check_enrollment_patch(patch: &EnrollmentPatch) -> Result<(), ApiError> {
    if patch.is_empty() {
        return Err(ApiError::NoFieldsToUpdate);
    }
    validate_grade(patch.nota_final)
}

pub struct RemoveEnrollmentUseCase<E: EnrollmentRepository> {
    pub repo: E,
}

impl<E: EnrollmentRepository> RemoveEnrollmentUseCase<E> {
    pub async fn execute(&self, id: Uuid) -> Result<(), ApiError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(ApiError::EnrollmentNotFound)
        }
    }
}

// ── Teacher assignments ──────────────────────────────────────────────────────

pub struct AssignTeacherUseCase<C, U, A>
where
    C: CourseRepository,
    U: UserRepository,
    A: AssignmentRepository,
{
    pub courses: C,
    pub users: U,
    pub assignments: A,
}

impl<C, U, A> AssignTeacherUseCase<C, U, A>
where
    C: CourseRepository,
    U: UserRepository,
    A: AssignmentRepository,
{
    pub async fn execute(
        &self,
        curso_id: Uuid,
        usuario_id: Uuid,
        tipo_asignacion: Option<AssignmentType>,
    ) -> Result<Assignment, ApiError> {
        self.courses
            .find(curso_id)
            .await?
            .ok_or(ApiError::CourseNotFound)?;
        let user = self
            .users
            .find_by_id(usuario_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        if !user.roles.contains(Role::Teacher) {
            return Err(ApiError::UserNotTeacher);
        }
        self.assignments
            .insert(&Assignment {
                id: Uuid::now_v7(),
                curso_id,
                usuario_id,
                tipo_asignacion: tipo_asignacion.unwrap_or_default(),
                activo: true,
                fecha_asignacion: Utc::now(),
            })
            .await
    }
}

pub struct UpdateAssignmentUseCase<A: AssignmentRepository> {
    pub repo: A,
}

impl<A: AssignmentRepository> UpdateAssignmentUseCase<A> {
    pub async fn execute(&self, id: Uuid, patch: AssignmentPatch) -> Result<Assignment, ApiError> {
        if patch.is_empty() {
            return Err(ApiError::NoFieldsToUpdate);
        }
        self.repo
            .update(id, patch)
            .await?
            .ok_or(ApiError::AssignmentNotFound)
    }
}

pub struct RemoveAssignmentUseCase<A: AssignmentRepository> {
    pub repo: A,
}

impl<A: AssignmentRepository> RemoveAssignmentUseCase<A> {
    pub async fn execute(&self, id: Uuid) -> Result<(), ApiError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(ApiError::AssignmentNotFound)
        }
    }
}
