use axum::{
    Router,
    extract::Request,
    middleware::{Next, from_fn, from_fn_with_state},
    routing::{any, delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use suficiencia_core::error::route_not_found;
use suficiencia_core::middleware::{propagate_request_id_layer, request_id_layer};
use suficiencia_domain::role::Role;

use crate::handlers::{admin, auth, course, exam_schedule, system, user};
use crate::middleware::{
    authenticate, require_api_key, require_course_access, require_roles, require_student,
};
use crate::state::AppState;

const STUDENT: &[Role] = &[Role::Student];
const TEACHER: &[Role] = &[Role::Teacher];
const STAFF: &[Role] = &[Role::Teacher, Role::Administrator];
const ADMIN: &[Role] = &[Role::Administrator];

/// Route layers run last-added first, so authentication is always applied
/// after (outside) the role or resource gate.
fn authenticated(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.route_layer(from_fn_with_state(state.clone(), authenticate))
}

fn with_roles(router: Router<AppState>, allowed: &'static [Role]) -> Router<AppState> {
    router.route_layer(from_fn(move |req: Request, next: Next| {
        require_roles(allowed, req, next)
    }))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        // System
        .route("/", get(system::root))
        .route("/health", get(system::health))
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/refresh", post(auth::refresh))
}

fn session_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        // Auth
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/verify", get(auth::verify))
        // Profile
        .route("/api/users/profile", get(user::get_profile))
        .route("/api/users/profile", put(user::update_profile))
        // Courses
        .route("/api/courses", get(course::list_courses));
    authenticated(router, state)
}

fn student_routes(state: &AppState) -> Router<AppState> {
    let enroll = Router::new()
        .route("/api/users/enroll/{id}", post(user::enroll_self))
        .route_layer(from_fn_with_state(state.clone(), require_student));
    let own_courses = with_roles(
        Router::new().route("/api/courses/student", get(course::student_courses)),
        STUDENT,
    );
    authenticated(enroll.merge(own_courses), state)
}

fn course_routes(state: &AppState) -> Router<AppState> {
    let access = Router::new()
        .route("/api/courses/{id}", get(course::get_course))
        .route_layer(from_fn_with_state(state.clone(), require_course_access));

    let teacher = with_roles(
        Router::new().route("/api/courses/teacher", get(course::teacher_courses)),
        TEACHER,
    );

    let staff = with_roles(
        Router::new()
            .route("/api/courses", post(course::create_course))
            .route("/api/courses/{id}", put(course::update_course))
            .route("/api/courses/{id}/students", get(course::course_students))
            .route("/api/courses/{id}/enroll-student", post(course::enroll_student))
            .route(
                "/api/courses/{id}/students/{student_id}",
                put(course::update_student_status),
            ),
        STAFF,
    );

    let admin_only = with_roles(
        Router::new()
            .route("/api/courses/{id}", delete(course::delete_course))
            .route("/api/courses/{id}/teachers", get(course::course_teachers))
            .route("/api/courses/{id}/assign-teacher", post(course::assign_teacher))
            .route("/api/courses/{id}/assign-student", post(course::assign_student)),
        ADMIN,
    );

    authenticated(access.merge(teacher).merge(staff).merge(admin_only), state)
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        // Statistics
        .route("/dashboard/stats", get(admin::dashboard_stats))
        .route("/users/stats", get(admin::user_stats))
        .route("/courses/stats", get(admin::course_stats))
        .route("/activity", get(admin::recent_activity))
        .route("/registrations/recent", get(admin::recent_registrations))
        // Users
        .route("/users", get(admin::list_users))
        .route("/users", post(admin::create_user))
        .route("/users/{id}", get(admin::get_user))
        .route("/users/{id}", put(admin::update_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/status", put(admin::set_user_status))
        // Roles
        .route("/users/{id}/roles", get(admin::get_roles))
        .route("/users/{id}/roles", post(admin::add_role))
        .route("/users/{id}/roles", put(admin::replace_roles))
        .route("/users/{id}/roles/{role}", delete(admin::remove_role))
        // Students & teachers
        .route("/students", get(admin::list_students))
        .route("/teachers", get(admin::list_teachers))
        .route("/students/{id}/courses", get(admin::student_courses))
        .route("/teachers/{id}/courses", get(admin::teacher_courses))
        .route("/courses/{id}/enroll-student", post(course::assign_student))
        .route("/student-enrollments/{id}", put(admin::update_enrollment))
        .route("/student-enrollments/{id}", delete(admin::delete_enrollment))
        .route("/teacher-assignments/{id}", put(admin::update_assignment))
        .route("/teacher-assignments/{id}", delete(admin::delete_assignment))
        // Exam schedules
        .route("/exam-schedules", get(exam_schedule::list_schedules))
        .route("/exam-schedules", post(exam_schedule::create_schedule))
        .route("/exam-schedules/stats", get(exam_schedule::schedule_stats))
        .route("/exam-schedules/{id}", get(exam_schedule::get_schedule))
        .route("/exam-schedules/{id}", put(exam_schedule::update_schedule))
        .route("/exam-schedules/{id}", delete(exam_schedule::delete_schedule))
        .route(
            "/exam-schedules/{id}/students",
            get(exam_schedule::schedule_students),
        )
        .route("/exam-schedules/{id}/students", post(exam_schedule::add_student))
        .route(
            "/exam-schedules/{id}/available-students",
            get(exam_schedule::available_students),
        )
        .route(
            "/exam-schedules/{id}/students/{student_id}",
            delete(exam_schedule::remove_student),
        )
        .route(
            "/exam-schedules/{id}/students/{student_id}/status",
            put(exam_schedule::update_booking_status),
        )
        // Settings & reports
        .route("/config", get(admin::get_config))
        .route("/config", put(admin::update_config))
        .route("/reports/generate", post(admin::generate_report))
        // Not available
        .route("/backup", any(admin::unavailable))
        .route("/backup/{id}/restore", any(admin::unavailable))
        .route("/logs", any(admin::unavailable))
        .route("/audit", any(admin::unavailable))
        .route("/notifications", any(admin::unavailable));
    authenticated(with_roles(router, ADMIN), state)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(session_routes(&state))
        .merge(student_routes(&state))
        .merge(course_routes(&state))
        .nest("/api/admin", admin_routes(&state))
        .fallback(route_not_found)
        .layer(from_fn_with_state(state.clone(), require_api_key))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(request_id_layer())
        .with_state(state)
}
