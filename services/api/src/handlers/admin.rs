use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use suficiencia_domain::enrollment::AssignmentType;
use suficiencia_domain::pagination::Pagination;
use suficiencia_domain::role::{Role, RoleSet};

use crate::domain::types::{
    ActivityEntry, ActivityKind, AssignmentPatch, CourseStats, DashboardStats, SettingsPatch,
    SystemSettings, UserAssignment, UserEnrollment, UserFilter, UserPatch, UserStats,
};
use crate::error::ApiError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::handlers::course::{
    CourseSummaryResponse, PageQuery, StudentCourseResponse, TeacherCourseResponse,
    UpdateEnrollmentRequest,
};
use crate::handlers::{AssignmentResponse, EnrollmentResponse, MessageResponse, UserResponse};
use crate::state::AppState;
use crate::usecase::admin::{
    AdminStudentCoursesUseCase, AdminTeacherCoursesUseCase, CourseStatsUseCase,
    DashboardStatsUseCase, GenerateReportUseCase, RecentActivityUseCase,
    RecentRegistrationsUseCase, ReportData, ReportKind, UserStatsUseCase,
};
use crate::usecase::enrollment::{
    RemoveAssignmentUseCase, RemoveEnrollmentUseCase, UpdateAssignmentUseCase,
    UpdateEnrollmentUseCase,
};
use crate::usecase::user::{
    AddRoleUseCase, CreateUserInput, CreateUserUseCase, GetUserUseCase, ListStudentsUseCase,
    ListTeachersUseCase, ListUsersUseCase, RemoveRoleUseCase, ReplaceRolesUseCase,
    SetUserStatusUseCase, UpdateUserUseCase,
};

// ── Statistics ───────────────────────────────────────────────────────────────

pub async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    let usecase = DashboardStatsUseCase {
        repo: state.stats_repo(),
    };
    Ok(Json(usecase.execute(Utc::now()).await?))
}

pub async fn user_stats(State(state): State<AppState>) -> Result<Json<UserStats>, ApiError> {
    let usecase = UserStatsUseCase {
        repo: state.stats_repo(),
    };
    Ok(Json(usecase.execute(Utc::now()).await?))
}

pub async fn course_stats(State(state): State<AppState>) -> Result<Json<CourseStats>, ApiError> {
    let usecase = CourseStatsUseCase {
        repo: state.stats_repo(),
    };
    Ok(Json(usecase.execute().await?))
}

// ── GET /api/admin/users ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub activo: Option<bool>,
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub usuarios: Vec<UserResponse>,
    pub pagination: Pagination,
}

pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListUsersQuery>,
) -> Result<Json<UsersResponse>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = ListUsersUseCase {
        repo: state.user_repo(),
    };
    let result = usecase
        .execute(
            UserFilter {
                search: query.search,
                role: query.role,
                activo: query.activo,
            },
            page,
        )
        .await?;
    Ok(Json(UsersResponse {
        pagination: Pagination::new(page, result.total),
        usuarios: result.items.into_iter().map(Into::into).collect(),
    }))
}

// ── /api/admin/users/{id} ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UserDetailResponse {
    pub usuario: UserResponse,
}

pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let usecase = GetUserUseCase {
        repo: state.user_repo(),
    };
    let user = usecase.execute(id).await?;
    Ok(Json(UserDetailResponse {
        usuario: user.into(),
    }))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
    pub password: Option<String>,
    pub roles: Option<Vec<Role>>,
    pub activo: Option<bool>,
}

#[derive(Serialize)]
pub struct UserMutationResponse {
    pub message: &'static str,
    pub usuario: UserResponse,
}

pub async fn create_user(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserMutationResponse>), ApiError> {
    let usecase = CreateUserUseCase {
        repo: state.user_repo(),
        bcrypt_cost: state.bcrypt_cost,
    };
    let user = usecase
        .execute(CreateUserInput {
            codigo_institucional: body.codigo_institucional,
            email: body.email,
            nombres: body.nombres,
            apellidos: body.apellidos,
            password: body.password,
            roles: body.roles,
            activo: body.activo,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(UserMutationResponse {
            message: "Usuario creado exitosamente",
            usuario: user.into(),
        }),
    ))
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub codigo_institucional: Option<String>,
    pub email: Option<String>,
    pub nombres: Option<String>,
    pub apellidos: Option<String>,
}

pub async fn update_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateUserRequest>,
) -> Result<Json<UserMutationResponse>, ApiError> {
    let usecase = UpdateUserUseCase {
        repo: state.user_repo(),
    };
    let user = usecase
        .execute(
            id,
            UserPatch {
                codigo_institucional: body.codigo_institucional,
                email: body.email,
                nombres: body.nombres,
                apellidos: body.apellidos,
            },
        )
        .await?;
    Ok(Json(UserMutationResponse {
        message: "Usuario actualizado exitosamente",
        usuario: user.into(),
    }))
}

/// Deactivates; the row and its memberships are kept.
pub async fn delete_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let usecase = SetUserStatusUseCase {
        repo: state.user_repo(),
    };
    usecase.execute(id, false).await?;
    Ok(Json(MessageResponse {
        message: "Usuario desactivado exitosamente",
    }))
}

#[derive(Deserialize)]
pub struct UserStatusRequest {
    pub activo: bool,
}

pub async fn set_user_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UserStatusRequest>,
) -> Result<Json<UserMutationResponse>, ApiError> {
    let usecase = SetUserStatusUseCase {
        repo: state.user_repo(),
    };
    let user = usecase.execute(id, body.activo).await?;
    let message = if user.activo {
        "Usuario activado exitosamente"
    } else {
        "Usuario desactivado exitosamente"
    };
    Ok(Json(UserMutationResponse {
        message,
        usuario: user.into(),
    }))
}

// ── /api/admin/users/{id}/roles ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct RolesResponse {
    pub usuario_id: Uuid,
    pub roles: RoleSet,
}

#[derive(Serialize)]
pub struct RolesMutationResponse {
    pub message: &'static str,
    pub usuario_id: Uuid,
    pub roles: RoleSet,
}

pub async fn get_roles(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<RolesResponse>, ApiError> {
    let usecase = GetUserUseCase {
        repo: state.user_repo(),
    };
    let user = usecase.execute(id).await?;
    Ok(Json(RolesResponse {
        usuario_id: user.id,
        roles: user.roles,
    }))
}

#[derive(Deserialize)]
pub struct AddRoleRequest {
    pub rol: Role,
}

pub async fn add_role(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<AddRoleRequest>,
) -> Result<(StatusCode, Json<RolesMutationResponse>), ApiError> {
    let usecase = AddRoleUseCase {
        repo: state.user_repo(),
    };
    let roles = usecase.execute(id, body.rol).await?;
    Ok((
        StatusCode::CREATED,
        Json(RolesMutationResponse {
            message: "Rol asignado exitosamente",
            usuario_id: id,
            roles,
        }),
    ))
}

#[derive(Deserialize)]
pub struct ReplaceRolesRequest {
    pub roles: Vec<Role>,
}

pub async fn replace_roles(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<ReplaceRolesRequest>,
) -> Result<Json<RolesMutationResponse>, ApiError> {
    let usecase = ReplaceRolesUseCase {
        repo: state.user_repo(),
    };
    let roles = usecase.execute(id, body.roles).await?;
    Ok(Json(RolesMutationResponse {
        message: "Roles actualizados exitosamente",
        usuario_id: id,
        roles,
    }))
}

pub async fn remove_role(
    State(state): State<AppState>,
    AppPath((id, role)): AppPath<(Uuid, Role)>,
) -> Result<Json<RolesMutationResponse>, ApiError> {
    let usecase = RemoveRoleUseCase {
        repo: state.user_repo(),
    };
    let roles = usecase.execute(id, role).await?;
    Ok(Json(RolesMutationResponse {
        message: "Rol removido exitosamente",
        usuario_id: id,
        roles,
    }))
}

// ── GET /api/admin/students, /api/admin/teachers ─────────────────────────────

#[derive(Deserialize)]
pub struct ListStudentsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub include_enrollments: Option<bool>,
}

#[derive(Serialize)]
pub struct UserEnrollmentResponse {
    #[serde(flatten)]
    pub enrollment: EnrollmentResponse,
    pub codigo_curso: String,
    pub curso_nombre: String,
}

impl From<UserEnrollment> for UserEnrollmentResponse {
    fn from(e: UserEnrollment) -> Self {
        Self {
            enrollment: e.enrollment.into(),
            codigo_curso: e.codigo_curso,
            curso_nombre: e.curso_nombre,
        }
    }
}

#[derive(Serialize)]
pub struct StudentListingResponse {
    #[serde(flatten)]
    pub usuario: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inscripciones: Option<Vec<UserEnrollmentResponse>>,
}

#[derive(Serialize)]
pub struct StudentsResponse {
    pub estudiantes: Vec<StudentListingResponse>,
    pub pagination: Pagination,
}

pub async fn list_students(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListStudentsQuery>,
) -> Result<Json<StudentsResponse>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = ListStudentsUseCase {
        users: state.user_repo(),
        enrollments: state.enrollment_repo(),
    };
    let result = usecase
        .execute(
            query.search,
            query.include_enrollments.unwrap_or(false),
            page,
        )
        .await?;
    Ok(Json(StudentsResponse {
        pagination: Pagination::new(page, result.total),
        estudiantes: result
            .items
            .into_iter()
            .map(|s| StudentListingResponse {
                usuario: s.user.into(),
                inscripciones: s
                    .enrollments
                    .map(|all| all.into_iter().map(Into::into).collect()),
            })
            .collect(),
    }))
}

#[derive(Deserialize)]
pub struct ListTeachersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub include_assignments: Option<bool>,
}

#[derive(Serialize)]
pub struct UserAssignmentResponse {
    #[serde(flatten)]
    pub assignment: AssignmentResponse,
    pub codigo_curso: String,
    pub curso_nombre: String,
}

impl From<UserAssignment> for UserAssignmentResponse {
    fn from(a: UserAssignment) -> Self {
        Self {
            assignment: a.assignment.into(),
            codigo_curso: a.codigo_curso,
            curso_nombre: a.curso_nombre,
        }
    }
}

#[derive(Serialize)]
pub struct TeacherListingResponse {
    #[serde(flatten)]
    pub usuario: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asignaciones: Option<Vec<UserAssignmentResponse>>,
}

#[derive(Serialize)]
pub struct TeachersResponse {
    pub docentes: Vec<TeacherListingResponse>,
    pub pagination: Pagination,
}

pub async fn list_teachers(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListTeachersQuery>,
) -> Result<Json<TeachersResponse>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = ListTeachersUseCase {
        users: state.user_repo(),
        assignments: state.assignment_repo(),
    };
    let result = usecase
        .execute(
            query.search,
            query.include_assignments.unwrap_or(false),
            page,
        )
        .await?;
    Ok(Json(TeachersResponse {
        pagination: Pagination::new(page, result.total),
        docentes: result
            .items
            .into_iter()
            .map(|t| TeacherListingResponse {
                usuario: t.user.into(),
                asignaciones: t
                    .assignments
                    .map(|all| all.into_iter().map(Into::into).collect()),
            })
            .collect(),
    }))
}

// ── GET /api/admin/students/{id}/courses, /api/admin/teachers/{id}/courses ──

#[derive(Serialize)]
pub struct AdminStudentCoursesResponse {
    pub estudiante: UserResponse,
    pub cursos: Vec<StudentCourseResponse>,
    pub pagination: Pagination,
}

pub async fn student_courses(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<AdminStudentCoursesResponse>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = AdminStudentCoursesUseCase {
        users: state.user_repo(),
        courses: state.course_repo(),
    };
    let (student, courses) = usecase.execute(id, page).await?;
    Ok(Json(AdminStudentCoursesResponse {
        estudiante: student.into(),
        pagination: Pagination::new(page, courses.total),
        cursos: courses.items.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Serialize)]
pub struct AdminTeacherCoursesResponse {
    pub docente: UserResponse,
    pub cursos: Vec<TeacherCourseResponse>,
    pub pagination: Pagination,
}

pub async fn teacher_courses(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<AdminTeacherCoursesResponse>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = AdminTeacherCoursesUseCase {
        users: state.user_repo(),
        courses: state.course_repo(),
    };
    let (teacher, courses) = usecase.execute(id, page).await?;
    Ok(Json(AdminTeacherCoursesResponse {
        docente: teacher.into(),
        pagination: Pagination::new(page, courses.total),
        cursos: courses.items.into_iter().map(Into::into).collect(),
    }))
}

// ── GET /api/admin/registrations/recent ──────────────────────────────────────

#[derive(Deserialize)]
pub struct RecentRegistrationsQuery {
    pub days: Option<u32>,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct RecentRegistrationsResponse {
    pub registros: Vec<UserResponse>,
    pub periodo_dias: u32,
    pub total: usize,
}

pub async fn recent_registrations(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RecentRegistrationsQuery>,
) -> Result<Json<RecentRegistrationsResponse>, ApiError> {
    let usecase = RecentRegistrationsUseCase {
        repo: state.stats_repo(),
    };
    let recent = usecase.execute(query.days, query.limit, Utc::now()).await?;
    Ok(Json(RecentRegistrationsResponse {
        total: recent.users.len(),
        periodo_dias: recent.days,
        registros: recent.users.into_iter().map(Into::into).collect(),
    }))
}

// ── GET /api/admin/activity ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ActivityQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(alias = "type")]
    pub tipo: Option<ActivityKind>,
}

#[derive(Serialize)]
pub struct ActivityEntryResponse {
    pub tipo: ActivityKind,
    pub descripcion: String,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha: DateTime<Utc>,
    pub entidad: &'static str,
}

impl From<ActivityEntry> for ActivityEntryResponse {
    fn from(e: ActivityEntry) -> Self {
        Self {
            entidad: e.tipo.entity(),
            tipo: e.tipo,
            descripcion: e.descripcion,
            fecha: e.fecha,
        }
    }
}

#[derive(Serialize)]
pub struct ActivityResponse {
    pub actividad: Vec<ActivityEntryResponse>,
    pub pagination: Pagination,
}

pub async fn recent_activity(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ActivityQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = RecentActivityUseCase {
        repo: state.stats_repo(),
    };
    let feed = usecase.execute(query.tipo, page, Utc::now()).await?;
    Ok(Json(ActivityResponse {
        pagination: Pagination::new(page, feed.total),
        actividad: feed.items.into_iter().map(Into::into).collect(),
    }))
}

// ── /api/admin/student-enrollments/{id} ──────────────────────────────────────

#[derive(Serialize)]
pub struct EnrollmentMutationResponse {
    pub message: &'static str,
    pub enrollment: EnrollmentResponse,
}

pub async fn update_enrollment(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateEnrollmentRequest>,
) -> Result<Json<EnrollmentMutationResponse>, ApiError> {
    let usecase = UpdateEnrollmentUseCase {
        repo: state.enrollment_repo(),
    };
    let enrollment = usecase.execute(id, body.into()).await?;
    Ok(Json(EnrollmentMutationResponse {
        message: "Inscripción actualizada exitosamente",
        enrollment: enrollment.into(),
    }))
}

pub async fn delete_enrollment(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let usecase = RemoveEnrollmentUseCase {
        repo: state.enrollment_repo(),
    };
    usecase.execute(id).await?;
    Ok(Json(MessageResponse {
        message: "Inscripción eliminada exitosamente",
    }))
}

// ── /api/admin/teacher-assignments/{id} ──────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateAssignmentRequest {
    pub tipo_asignacion: Option<AssignmentType>,
    pub activo: Option<bool>,
}

#[derive(Serialize)]
pub struct AssignmentMutationResponse {
    pub message: &'static str,
    pub asignacion: AssignmentResponse,
}

pub async fn update_assignment(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateAssignmentRequest>,
) -> Result<Json<AssignmentMutationResponse>, ApiError> {
    let usecase = UpdateAssignmentUseCase {
        repo: state.assignment_repo(),
    };
    let assignment = usecase
        .execute(
            id,
            AssignmentPatch {
                tipo_asignacion: body.tipo_asignacion,
                activo: body.activo,
            },
        )
        .await?;
    Ok(Json(AssignmentMutationResponse {
        message: "Asignación actualizada exitosamente",
        asignacion: assignment.into(),
    }))
}

pub async fn delete_assignment(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let usecase = RemoveAssignmentUseCase {
        repo: state.assignment_repo(),
    };
    usecase.execute(id).await?;
    Ok(Json(MessageResponse {
        message: "Asignación eliminada exitosamente",
    }))
}

// ── /api/admin/config ────────────────────────────────────────────────────────

pub async fn get_config(State(state): State<AppState>) -> Json<SystemSettings> {
    Json(state.settings.read().await.clone())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateResponse {
    pub message: &'static str,
    pub config: SystemSettings,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

pub async fn update_config(
    State(state): State<AppState>,
    AppJson(patch): AppJson<SettingsPatch>,
) -> Json<ConfigUpdateResponse> {
    let now = Utc::now();
    let config = {
        let mut settings = state.settings.write().await;
        settings.merge(patch, now);
        settings.clone()
    };
    Json(ConfigUpdateResponse {
        message: "Configuración actualizada exitosamente",
        config,
        updated_at: now,
    })
}

// ── POST /api/admin/reports/generate ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct GenerateReportRequest {
    pub tipo: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum ReportDataResponse {
    Users {
        estadisticas: UserStats,
        usuarios: Vec<UserResponse>,
    },
    Courses {
        estadisticas: CourseStats,
        cursos: Vec<CourseSummaryResponse>,
    },
}

impl From<ReportData> for ReportDataResponse {
    fn from(data: ReportData) -> Self {
        match data {
            ReportData::Users { stats, users } => Self::Users {
                estadisticas: stats,
                usuarios: users.into_iter().map(Into::into).collect(),
            },
            ReportData::Courses { stats, courses } => Self::Courses {
                estadisticas: stats,
                cursos: courses.into_iter().map(Into::into).collect(),
            },
        }
    }
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub id: Uuid,
    pub tipo: ReportKind,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_generacion: DateTime<Utc>,
    pub estado: &'static str,
    pub datos: ReportDataResponse,
}

pub async fn generate_report(
    State(state): State<AppState>,
    AppJson(body): AppJson<GenerateReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let tipo: ReportKind = body
        .tipo
        .parse()
        .map_err(|_| ApiError::validation("tipo", "must be one of usuarios, cursos, actividad"))?;
    let usecase = GenerateReportUseCase {
        repo: state.stats_repo(),
    };
    let report = usecase.execute(tipo, Utc::now()).await?;
    Ok(Json(ReportResponse {
        id: report.id,
        tipo: report.tipo,
        fecha_generacion: report.fecha_generacion,
        estado: "completado",
        datos: report.datos.into(),
    }))
}

// ── Backup, restore, logs, audit, notifications ──────────────────────────────

pub async fn unavailable() -> ApiError {
    ApiError::FeatureNotAvailable
}
