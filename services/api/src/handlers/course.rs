use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use suficiencia_auth_types::identity::Caller;
use suficiencia_domain::enrollment::{AssignmentType, CourseRelation, EnrollmentStatus};
use suficiencia_domain::pagination::Pagination;

use crate::domain::types::{
    CourseFilter, CoursePatch, CourseStudent, CourseSummary, CourseTeacher, EnrollmentPatch,
    StudentCourse, TeacherCourse,
};
use crate::error::ApiError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::handlers::{AssignmentResponse, CourseResponse, EnrollmentResponse, MessageResponse};
use crate::middleware::CourseContext;
use crate::state::AppState;
use crate::usecase::course::{
    CourseStudentsUseCase, CourseTeachersUseCase, CreateCourseInput, CreateCourseUseCase,
    DeleteCourseUseCase, GetCourseUseCase, ListCoursesUseCase, StudentCoursesUseCase,
    TeacherCoursesUseCase, UpdateCourseUseCase,
};
use crate::usecase::enrollment::{
    AssignStudentUseCase, AssignTeacherUseCase, EnrollStudentUseCase,
    UpdateEnrollmentStatusUseCase,
};

// ── GET /api/courses ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListCoursesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub activo: Option<bool>,
}

#[derive(Serialize)]
pub struct CourseSummaryResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub total_estudiantes: u64,
    pub total_docentes: u64,
}

impl From<CourseSummary> for CourseSummaryResponse {
    fn from(s: CourseSummary) -> Self {
        Self {
            course: s.course.into(),
            total_estudiantes: s.total_estudiantes,
            total_docentes: s.total_docentes,
        }
    }
}

#[derive(Serialize)]
pub struct CoursesResponse<T> {
    pub cursos: Vec<T>,
    pub pagination: Pagination,
}

pub async fn list_courses(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListCoursesQuery>,
) -> Result<Json<CoursesResponse<CourseSummaryResponse>>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = ListCoursesUseCase {
        repo: state.course_repo(),
    };
    let result = usecase
        .execute(
            CourseFilter {
                search: query.search,
                activo: query.activo,
            },
            page,
        )
        .await?;
    Ok(Json(CoursesResponse {
        pagination: Pagination::new(page, result.total),
        cursos: result.items.into_iter().map(Into::into).collect(),
    }))
}

// ── POST /api/courses ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateCourseRequest {
    pub codigo_curso: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub porcentaje_minimo_examen: Option<i32>,
    pub activo: Option<bool>,
}

#[derive(Serialize)]
pub struct CourseMutationResponse {
    pub message: &'static str,
    pub curso: CourseResponse,
}

pub async fn create_course(
    caller: Caller,
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseMutationResponse>), ApiError> {
    let usecase = CreateCourseUseCase {
        repo: state.course_repo(),
    };
    let course = usecase
        .execute(
            CreateCourseInput {
                codigo_curso: body.codigo_curso,
                nombre: body.nombre,
                descripcion: body.descripcion,
                porcentaje_minimo_examen: body.porcentaje_minimo_examen,
                activo: body.activo,
            },
            caller.usuario_id,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CourseMutationResponse {
            message: "Curso creado exitosamente",
            curso: course.into(),
        }),
    ))
}

// ── GET /api/courses/{id} ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CourseDetailResponse {
    pub curso: CourseResponse,
    /// How the caller is related to the course.
    pub acceso: CourseRelation,
}

pub async fn get_course(
    Extension(access): Extension<CourseContext>,
    State(state): State<AppState>,
) -> Result<Json<CourseDetailResponse>, ApiError> {
    let usecase = GetCourseUseCase {
        repo: state.course_repo(),
    };
    let course = usecase.execute(access.curso_id).await?;
    Ok(Json(CourseDetailResponse {
        curso: course.into(),
        acceso: access.relation,
    }))
}

// ── PUT /api/courses/{id} ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateCourseRequest {
    pub codigo_curso: Option<String>,
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub porcentaje_minimo_examen: Option<i32>,
    pub activo: Option<bool>,
}

pub async fn update_course(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateCourseRequest>,
) -> Result<Json<CourseMutationResponse>, ApiError> {
    let usecase = UpdateCourseUseCase {
        repo: state.course_repo(),
    };
    let course = usecase
        .execute(
            id,
            CoursePatch {
                codigo_curso: body.codigo_curso,
                nombre: body.nombre,
                descripcion: body.descripcion,
                porcentaje_minimo_examen: body.porcentaje_minimo_examen,
                activo: body.activo,
            },
        )
        .await?;
    Ok(Json(CourseMutationResponse {
        message: "Curso actualizado exitosamente",
        curso: course.into(),
    }))
}

// ── DELETE /api/courses/{id} ─────────────────────────────────────────────────

pub async fn delete_course(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let usecase = DeleteCourseUseCase {
        repo: state.course_repo(),
    };
    usecase.execute(id).await?;
    Ok(Json(MessageResponse {
        message: "Curso eliminado exitosamente",
    }))
}

// ── GET /api/courses/{id}/students ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct CourseStudentResponse {
    #[serde(flatten)]
    pub enrollment: EnrollmentResponse,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

impl From<CourseStudent> for CourseStudentResponse {
    fn from(s: CourseStudent) -> Self {
        Self {
            enrollment: s.enrollment.into(),
            codigo_institucional: s.codigo_institucional,
            email: s.email,
            nombres: s.nombres,
            apellidos: s.apellidos,
        }
    }
}

#[derive(Serialize)]
pub struct CourseStudentsResponse {
    pub estudiantes: Vec<CourseStudentResponse>,
    pub pagination: Pagination,
}

pub async fn course_students(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<CourseStudentsResponse>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = CourseStudentsUseCase {
        courses: state.course_repo(),
        enrollments: state.enrollment_repo(),
    };
    let result = usecase.execute(id, page).await?;
    Ok(Json(CourseStudentsResponse {
        pagination: Pagination::new(page, result.total),
        estudiantes: result.items.into_iter().map(Into::into).collect(),
    }))
}

// ── GET /api/courses/{id}/teachers ───────────────────────────────────────────

#[derive(Serialize)]
pub struct CourseTeacherResponse {
    #[serde(flatten)]
    pub assignment: AssignmentResponse,
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
}

impl From<CourseTeacher> for CourseTeacherResponse {
    fn from(t: CourseTeacher) -> Self {
        Self {
            assignment: t.assignment.into(),
            codigo_institucional: t.codigo_institucional,
            email: t.email,
            nombres: t.nombres,
            apellidos: t.apellidos,
        }
    }
}

#[derive(Serialize)]
pub struct CourseTeachersResponse {
    pub docentes: Vec<CourseTeacherResponse>,
}

pub async fn course_teachers(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<CourseTeachersResponse>, ApiError> {
    let usecase = CourseTeachersUseCase {
        courses: state.course_repo(),
        assignments: state.assignment_repo(),
    };
    let teachers = usecase.execute(id).await?;
    Ok(Json(CourseTeachersResponse {
        docentes: teachers.into_iter().map(Into::into).collect(),
    }))
}

// ── POST /api/courses/{id}/assign-teacher ────────────────────────────────────

#[derive(Deserialize)]
pub struct AssignTeacherRequest {
    #[serde(alias = "docente_id")]
    pub usuario_id: Uuid,
    pub tipo_asignacion: Option<AssignmentType>,
}

#[derive(Serialize)]
pub struct AssignTeacherResponse {
    pub message: &'static str,
    pub asignacion: AssignmentResponse,
}

pub async fn assign_teacher(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<AssignTeacherRequest>,
) -> Result<(StatusCode, Json<AssignTeacherResponse>), ApiError> {
    let usecase = AssignTeacherUseCase {
        courses: state.course_repo(),
        users: state.user_repo(),
        assignments: state.assignment_repo(),
    };
    let assignment = usecase
        .execute(id, body.usuario_id, body.tipo_asignacion)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AssignTeacherResponse {
            message: "Docente asignado exitosamente",
            asignacion: assignment.into(),
        }),
    ))
}

// ── POST /api/courses/{id}/assign-student, /enroll-student ───────────────────

#[derive(Deserialize)]
pub struct EnrollStudentRequest {
    #[serde(alias = "estudiante_id")]
    pub usuario_id: Uuid,
}

#[derive(Serialize)]
pub struct EnrollmentMutationResponse {
    pub message: &'static str,
    pub enrollment: EnrollmentResponse,
}

pub async fn assign_student(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<EnrollStudentRequest>,
) -> Result<(StatusCode, Json<EnrollmentMutationResponse>), ApiError> {
    let usecase = AssignStudentUseCase {
        enroll: EnrollStudentUseCase {
            courses: state.course_repo(),
            users: state.user_repo(),
            enrollments: state.enrollment_repo(),
        },
    };
    let enrollment = usecase.execute(id, body.usuario_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(EnrollmentMutationResponse {
            message: "Estudiante asignado exitosamente",
            enrollment: enrollment.into(),
        }),
    ))
}

pub async fn enroll_student(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<EnrollStudentRequest>,
) -> Result<(StatusCode, Json<EnrollmentMutationResponse>), ApiError> {
    let usecase = EnrollStudentUseCase {
        courses: state.course_repo(),
        users: state.user_repo(),
        enrollments: state.enrollment_repo(),
    };
    let enrollment = usecase.execute(id, body.usuario_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(EnrollmentMutationResponse {
            message: "Estudiante inscrito exitosamente",
            enrollment: enrollment.into(),
        }),
    ))
}

// ── PUT /api/courses/{id}/students/{student_id} ──────────────────────────────

#[derive(Deserialize)]
pub struct UpdateEnrollmentRequest {
    pub estado: Option<EnrollmentStatus>,
    pub nota_final: Option<f64>,
}

impl From<UpdateEnrollmentRequest> for EnrollmentPatch {
    fn from(body: UpdateEnrollmentRequest) -> Self {
        Self {
            estado: body.estado,
            nota_final: body.nota_final,
        }
    }
}

pub async fn update_student_status(
    State(state): State<AppState>,
    AppPath((id, usuario_id)): AppPath<(Uuid, Uuid)>,
    AppJson(body): AppJson<UpdateEnrollmentRequest>,
) -> Result<Json<EnrollmentMutationResponse>, ApiError> {
    let usecase = UpdateEnrollmentStatusUseCase {
        repo: state.enrollment_repo(),
    };
    let enrollment = usecase.execute(id, usuario_id, body.into()).await?;
    Ok(Json(EnrollmentMutationResponse {
        message: "Estado del estudiante actualizado exitosamente",
        enrollment: enrollment.into(),
    }))
}

// ── GET /api/courses/student ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StudentCourseResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub estado: EnrollmentStatus,
    pub nota_final: Option<f64>,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_inscripcion: DateTime<Utc>,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_estado: DateTime<Utc>,
}

impl From<StudentCourse> for StudentCourseResponse {
    fn from(c: StudentCourse) -> Self {
        Self {
            course: c.course.into(),
            estado: c.estado,
            nota_final: c.nota_final,
            fecha_inscripcion: c.fecha_inscripcion,
            fecha_estado: c.fecha_estado,
        }
    }
}

pub async fn student_courses(
    caller: Caller,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<CoursesResponse<StudentCourseResponse>>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = StudentCoursesUseCase {
        repo: state.course_repo(),
    };
    let result = usecase.execute(caller.usuario_id, page).await?;
    Ok(Json(CoursesResponse {
        pagination: Pagination::new(page, result.total),
        cursos: result.items.into_iter().map(Into::into).collect(),
    }))
}

// ── GET /api/courses/teacher ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct TeacherCourseResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub tipo_asignacion: AssignmentType,
    #[serde(serialize_with = "suficiencia_core::serde::to_rfc3339_ms")]
    pub fecha_asignacion: DateTime<Utc>,
    pub total_estudiantes: u64,
}

impl From<TeacherCourse> for TeacherCourseResponse {
    fn from(c: TeacherCourse) -> Self {
        Self {
            course: c.course.into(),
            tipo_asignacion: c.tipo_asignacion,
            fecha_asignacion: c.fecha_asignacion,
            total_estudiantes: c.total_estudiantes,
        }
    }
}

pub async fn teacher_courses(
    caller: Caller,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<CoursesResponse<TeacherCourseResponse>>, ApiError> {
    let page = state.page(query.page, query.limit);
    let usecase = TeacherCoursesUseCase {
        repo: state.course_repo(),
    };
    let result = usecase.execute(caller.usuario_id, page).await?;
    Ok(Json(CoursesResponse {
        pagination: Pagination::new(page, result.total),
        cursos: result.items.into_iter().map(Into::into).collect(),
    }))
}
