use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use suficiencia_domain::pagination::{Page, PageRequest};
use suficiencia_domain::parse::ParseError;
use suficiencia_domain::role::Role;

use crate::domain::repository::{CourseRepository, StatsRepository, UserRepository};
use crate::domain::types::{
    ActivityEntry, ActivityKind, CourseStats, CourseSummary, DashboardStats,
    NEW_REGISTRATION_WINDOW_DAYS, StudentCourse, TeacherCourse, User, UserStats,
};
use crate::error::ApiError;

/// Window counted as "new this month" in user statistics.
const RECENT_USERS_WINDOW_DAYS: i64 = 30;

/// Window the activity feed looks back over.
pub const ACTIVITY_WINDOW_DAYS: i64 = 30;

pub const DEFAULT_REGISTRATION_DAYS: u32 = 7;
pub const MAX_REGISTRATION_DAYS: u32 = 365;
pub const DEFAULT_REGISTRATION_LIMIT: u64 = 50;
pub const MAX_REGISTRATION_LIMIT: u64 = 200;

// ── Statistics ───────────────────────────────────────────────────────────────

pub struct DashboardStatsUseCase<S: StatsRepository> {
    pub repo: S,
}

impl<S: StatsRepository> DashboardStatsUseCase<S> {
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<DashboardStats, ApiError> {
        self.repo
            .dashboard(now - Duration::days(NEW_REGISTRATION_WINDOW_DAYS))
            .await
    }
}

pub struct UserStatsUseCase<S: StatsRepository> {
    pub repo: S,
}

impl<S: StatsRepository> UserStatsUseCase<S> {
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<UserStats, ApiError> {
        self.repo
            .users(now - Duration::days(RECENT_USERS_WINDOW_DAYS))
            .await
    }
}

pub struct CourseStatsUseCase<S: StatsRepository> {
    pub repo: S,
}

impl<S: StatsRepository> CourseStatsUseCase<S> {
    pub async fn execute(&self) -> Result<CourseStats, ApiError> {
        self.repo.courses().await
    }
}

// ── Recent activity ──────────────────────────────────────────────────────────

pub struct RecentRegistrations {
    pub users: Vec<User>,
    pub days: u32,
}

pub struct RecentRegistrationsUseCase<S: StatsRepository> {
    pub repo: S,
}

impl<S: StatsRepository> RecentRegistrationsUseCase<S> {
    /// Active users registered within the last `days` days, newest first.
    pub async fn execute(
        &self,
        days: Option<u32>,
        limit: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<RecentRegistrations, ApiError> {
        let days = days
            .unwrap_or(DEFAULT_REGISTRATION_DAYS)
            .clamp(1, MAX_REGISTRATION_DAYS);
        let limit = limit
            .unwrap_or(DEFAULT_REGISTRATION_LIMIT)
            .clamp(1, MAX_REGISTRATION_LIMIT);
        let users = self
            .repo
            .recent_registrations(now - Duration::days(i64::from(days)), limit)
            .await?;
        Ok(RecentRegistrations { users, days })
    }
}

pub struct RecentActivityUseCase<S: StatsRepository> {
    pub repo: S,
}

impl<S: StatsRepository> RecentActivityUseCase<S> {
    pub async fn execute(
        &self,
        tipo: Option<ActivityKind>,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<ActivityEntry>, ApiError> {
        self.repo
            .activity(now - Duration::days(ACTIVITY_WINDOW_DAYS), tipo, page)
            .await
    }
}

// ── Member courses ───────────────────────────────────────────────────────────

/// The user when it exists, is active and holds `role`.
async fn active_member<U: UserRepository>(
    users: &U,
    id: Uuid,
    role: Role,
) -> Result<Option<User>, ApiError> {
    Ok(users
        .find_by_id(id)
        .await?
        .filter(|u| u.activo && u.roles.contains(role)))
}

pub struct AdminStudentCoursesUseCase<U: UserRepository, C: CourseRepository> {
    pub users: U,
    pub courses: C,
}

impl<U: UserRepository, C: CourseRepository> AdminStudentCoursesUseCase<U, C> {
    pub async fn execute(
        &self,
        usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<(User, Page<StudentCourse>), ApiError> {
        let student = active_member(&self.users, usuario_id, Role::Student)
            .await?
            .ok_or(ApiError::StudentNotFound)?;
        let courses = self.courses.student_courses(usuario_id, page).await?;
        Ok((student, courses))
    }
}

pub struct AdminTeacherCoursesUseCase<U: UserRepository, C: CourseRepository> {
    pub users: U,
    pub courses: C,
}

impl<U: UserRepository, C: CourseRepository> AdminTeacherCoursesUseCase<U, C> {
    pub async fn execute(
        &self,
        usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<(User, Page<TeacherCourse>), ApiError> {
        let teacher = active_member(&self.users, usuario_id, Role::Teacher)
            .await?
            .ok_or(ApiError::TeacherNotFound)?;
        let courses = self.courses.teacher_courses(usuario_id, page).await?;
        Ok((teacher, courses))
    }
}

// ── Reports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    #[serde(rename = "usuarios")]
    Users,
    #[serde(rename = "cursos")]
    Courses,
    #[serde(rename = "actividad")]
    Activity,
}

impl FromStr for ReportKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usuarios" => Ok(Self::Users),
            "cursos" => Ok(Self::Courses),
            "actividad" => Ok(Self::Activity),
            other => Err(ParseError::new("report type", other)),
        }
    }
}

pub enum ReportData {
    Users { stats: UserStats, users: Vec<User> },
    Courses { stats: CourseStats, courses: Vec<CourseSummary> },
}

pub struct Report {
    pub id: Uuid,
    pub tipo: ReportKind,
    pub fecha_generacion: DateTime<Utc>,
    pub datos: ReportData,
}

pub struct GenerateReportUseCase<S: StatsRepository> {
    pub repo: S,
}

impl<S: StatsRepository> GenerateReportUseCase<S> {
    /// Users and courses reports are built from live counts; the activity
    /// report is not available.
    pub async fn execute(&self, tipo: ReportKind, now: DateTime<Utc>) -> Result<Report, ApiError> {
        let datos = match tipo {
            ReportKind::Users => ReportData::Users {
                stats: self
                    .repo
                    .users(now - Duration::days(RECENT_USERS_WINDOW_DAYS))
                    .await?,
                users: self.repo.user_report().await?,
            },
            ReportKind::Courses => ReportData::Courses {
                stats: self.repo.courses().await?,
                courses: self.repo.course_report().await?,
            },
            ReportKind::Activity => return Err(ApiError::FeatureNotAvailable),
        };
        Ok(Report {
            id: Uuid::now_v7(),
            tipo,
            fecha_generacion: now,
            datos,
        })
    }
}
