#![allow(async_fn_in_trait)]

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use suficiencia_domain::enrollment::CourseRelation;
use suficiencia_domain::exam::BookingStatus;
use suficiencia_domain::pagination::{Page, PageRequest};
use suficiencia_domain::role::{Role, RoleSet};

use crate::domain::types::{
    ActivityEntry, ActivityKind, Assignment, AssignmentPatch, Booking, Course, CourseFilter,
    CoursePatch, CourseStats, CourseStudent, CourseSummary, CourseTeacher, DashboardStats,
    Enrollment, EnrollmentPatch, ExamSchedule, ExamSchedulePatch, NewCourse, NewUser,
    ScheduleFilter, ScheduleStats, ScheduledStudent, StudentCourse, StudentSummary, TeacherCourse,
    User, UserAssignment, UserEnrollment, UserFilter, UserPatch, UserStats, VerifiedIdentity,
};
use crate::error::ApiError;

/// Lookups the request gates run on every protected call.
pub trait SessionRepository: Send + Sync {
    /// `None` when the user row does not exist.
    async fn user_active(&self, usuario_id: Uuid) -> Result<Option<bool>, ApiError>;

    /// The student linkage id of a user, if any.
    async fn student_id(&self, usuario_id: Uuid) -> Result<Option<Uuid>, ApiError>;

    /// How the user relates to a course. An active teacher assignment wins over
    /// an enrollment; withdrawn enrollments do not count.
    async fn course_relation(
        &self,
        usuario_id: Uuid,
        curso_id: Uuid,
    ) -> Result<Option<CourseRelation>, ApiError>;
}

/// Repository for users and their role memberships.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError>;

    /// The user matching `email` or, when given, the institutional code.
    async fn find_by_login(
        &self,
        email: &str,
        codigo_institucional: Option<&str>,
    ) -> Result<Option<User>, ApiError>;

    /// Insert the user, its roles and (for students) its student linkage in one
    /// transaction. Fails with `EmailExists` on a duplicate email.
    async fn create(&self, user: &NewUser) -> Result<User, ApiError>;

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, ApiError>;

    /// Reactivate the user, bump its update timestamp and grant the student role
    /// when it holds none.
    async fn touch_login(&self, id: Uuid) -> Result<User, ApiError>;

    async fn set_active(&self, id: Uuid, activo: bool) -> Result<Option<User>, ApiError>;

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, ApiError>;

    /// Fails with `RoleAlreadyAssigned` when the membership exists.
    async fn add_role(&self, id: Uuid, role: Role) -> Result<RoleSet, ApiError>;

    /// Fails with `RoleNotAssigned` when the membership does not exist.
    async fn remove_role(&self, id: Uuid, role: Role) -> Result<RoleSet, ApiError>;

    async fn replace_roles(&self, id: Uuid, roles: &RoleSet) -> Result<RoleSet, ApiError>;
}

/// Repository for courses.
pub trait CourseRepository: Send + Sync {
    async fn list(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<Page<CourseSummary>, ApiError>;

    async fn find(&self, id: Uuid) -> Result<Option<Course>, ApiError>;

    /// Fails with `CourseCodeExists` on a duplicate code.
    async fn create(&self, course: &NewCourse) -> Result<Course, ApiError>;

    async fn update(&self, id: Uuid, patch: &CoursePatch) -> Result<Option<Course>, ApiError>;

    /// Enrollments plus teacher assignments referencing the course.
    async fn dependents(&self, id: Uuid) -> Result<u64, ApiError>;

    /// Returns `true` if a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, ApiError>;

    async fn student_courses(
        &self,
        usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<StudentCourse>, ApiError>;

    async fn teacher_courses(
        &self,
        usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<TeacherCourse>, ApiError>;
}

/// Repository for student enrollments.
pub trait EnrollmentRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Enrollment>, ApiError>;

    async fn find_pair(
        &self,
        curso_id: Uuid,
        usuario_id: Uuid,
    ) -> Result<Option<Enrollment>, ApiError>;

    /// Fails with `AlreadyEnrolled` when the (course, student) pair exists.
    async fn insert(&self, enrollment: &Enrollment) -> Result<Enrollment, ApiError>;

    /// Apply `patch` and stamp the status-change timestamp.
    async fn update(
        &self,
        id: Uuid,
        patch: EnrollmentPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, ApiError>;

    /// Returns `true` if a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, ApiError>;

    async fn list_for_course(
        &self,
        curso_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CourseStudent>, ApiError>;

    async fn list_for_users(&self, usuario_ids: &[Uuid]) -> Result<Vec<UserEnrollment>, ApiError>;
}

/// Repository for teacher assignments.
pub trait AssignmentRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Assignment>, ApiError>;

    /// Fails with `AlreadyAssigned` when the (course, teacher) pair exists.
    async fn insert(&self, assignment: &Assignment) -> Result<Assignment, ApiError>;

    async fn update(
        &self,
        id: Uuid,
        patch: AssignmentPatch,
    ) -> Result<Option<Assignment>, ApiError>;

    /// Returns `true` if a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, ApiError>;

    async fn list_for_course(&self, curso_id: Uuid) -> Result<Vec<CourseTeacher>, ApiError>;

    async fn list_for_users(&self, usuario_ids: &[Uuid])
    -> Result<Vec<UserAssignment>, ApiError>;
}

/// Repository for exam schedules and their bookings.
pub trait ExamScheduleRepository: Send + Sync {
    async fn list(
        &self,
        filter: ScheduleFilter,
        page: PageRequest,
    ) -> Result<Page<ExamSchedule>, ApiError>;

    async fn stats(&self, today: NaiveDate) -> Result<ScheduleStats, ApiError>;

    async fn find(&self, id: Uuid) -> Result<Option<ExamSchedule>, ApiError>;

    /// Whether another schedule starts at exactly this date and time.
    async fn exists_at(
        &self,
        fecha_examen: NaiveDate,
        hora_inicio: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<bool, ApiError>;

    async fn create(&self, schedule: &ExamSchedule) -> Result<ExamSchedule, ApiError>;

    async fn update(
        &self,
        id: Uuid,
        patch: &ExamSchedulePatch,
    ) -> Result<Option<ExamSchedule>, ApiError>;

    /// Returns `true` if a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, ApiError>;

    async fn booking_count(&self, id: Uuid) -> Result<u64, ApiError>;

    async fn list_students(&self, id: Uuid) -> Result<Vec<ScheduledStudent>, ApiError>;

    /// Active students without a booking on the schedule.
    async fn available_students(
        &self,
        id: Uuid,
        limit: u64,
    ) -> Result<Vec<StudentSummary>, ApiError>;

    /// Insert a booking and increment the occupied count as one atomic unit.
    ///
    /// The schedule row is re-read under lock and checked with
    /// [`ensure_bookable`](crate::domain::types::ensure_bookable). Fails with
    /// `StudentAlreadyScheduled` when the pair is already booked.
    async fn book(&self, horario_id: Uuid, estudiante_id: Uuid) -> Result<Booking, ApiError>;

    /// Delete a booking and decrement the occupied count (floored at 0) as one
    /// atomic unit. Fails with `AppointmentNotFound` when no booking exists.
    async fn unbook(&self, horario_id: Uuid, estudiante_id: Uuid) -> Result<(), ApiError>;

    /// Change a booking's status. The occupied count is left untouched.
    async fn set_booking_status(
        &self,
        horario_id: Uuid,
        estudiante_id: Uuid,
        estado: BookingStatus,
    ) -> Result<Option<Booking>, ApiError>;
}

/// Aggregate counts for the admin dashboard and reports.
pub trait StatsRepository: Send + Sync {
    async fn dashboard(&self, since: DateTime<Utc>) -> Result<DashboardStats, ApiError>;
    async fn users(&self, since: DateTime<Utc>) -> Result<UserStats, ApiError>;
    async fn courses(&self) -> Result<CourseStats, ApiError>;
    async fn user_report(&self) -> Result<Vec<User>, ApiError>;
    async fn course_report(&self) -> Result<Vec<CourseSummary>, ApiError>;

    /// Active users created at or after `since`, newest first.
    async fn recent_registrations(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<User>, ApiError>;

    /// Users and courses created at or after `since`, newest first.
    async fn activity(
        &self,
        since: DateTime<Utc>,
        tipo: Option<ActivityKind>,
        page: PageRequest,
    ) -> Result<Page<ActivityEntry>, ApiError>;
}

/// Port to whoever vouches for login credentials.
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the credentials are rejected.
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedIdentity>, ApiError>;
}
