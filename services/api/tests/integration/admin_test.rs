use chrono::{Duration, Utc};
use uuid::Uuid;

use suficiencia_api::domain::types::{ActivityKind, Enrollment};
use suficiencia_api::error::ApiError;
use suficiencia_api::usecase::admin::{
    AdminStudentCoursesUseCase, AdminTeacherCoursesUseCase, DashboardStatsUseCase,
    GenerateReportUseCase, RecentActivityUseCase, RecentRegistrationsUseCase, ReportData,
    ReportKind,
};
use suficiencia_api::usecase::user::{AddRoleUseCase, ListStudentsUseCase, ReplaceRolesUseCase};
use suficiencia_domain::enrollment::EnrollmentStatus;
use suficiencia_domain::pagination::PageRequest;
use suficiencia_domain::role::Role;

use crate::helpers::{
    MockCourseRepo, MockEnrollmentRepo, MockStatsRepo, MockUserRepo, test_course, test_user,
};

fn first_page() -> PageRequest {
    PageRequest { page: 1, limit: 20 }
}

// ── Reports ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_build_users_report_from_live_data() {
    let users = vec![test_user(&[Role::Student]), test_user(&[Role::Teacher])];
    let usecase = GenerateReportUseCase {
        repo: MockStatsRepo {
            users,
            ..MockStatsRepo::default()
        },
    };

    let report = usecase.execute(ReportKind::Users, Utc::now()).await.unwrap();

    assert_eq!(report.tipo, ReportKind::Users);
    match report.datos {
        ReportData::Users { stats, users } => {
            assert_eq!(stats.total, 2);
            assert_eq!(users.len(), 2);
        }
        ReportData::Courses { .. } => panic!("expected a users report"),
    }
}

#[tokio::test]
async fn should_not_generate_activity_report() {
    let usecase = GenerateReportUseCase {
        repo: MockStatsRepo::default(),
    };

    let result = usecase.execute(ReportKind::Activity, Utc::now()).await;
    assert!(matches!(result, Err(ApiError::FeatureNotAvailable)));
}

// ── Statistics ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_count_only_recent_registrations() {
    let recent = test_user(&[Role::Student]);
    let mut old = test_user(&[Role::Student]);
    old.fecha_creacion = Utc::now() - Duration::days(90);
    let usecase = DashboardStatsUseCase {
        repo: MockStatsRepo {
            users: vec![recent, old],
            ..MockStatsRepo::default()
        },
    };

    let stats = usecase.execute(Utc::now()).await.unwrap();

    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.new_registrations, 1);
}

// ── Recent activity ──────────────────────────────────────────────────────────

#[tokio::test]
async fn should_list_recent_active_registrations_within_window() {
    let fresh = test_user(&[Role::Student]);
    let mut older = test_user(&[Role::Teacher]);
    older.fecha_creacion = Utc::now() - Duration::days(10);
    let mut inactive = test_user(&[Role::Student]);
    inactive.activo = false;
    let fresh_id = fresh.id;
    let usecase = RecentRegistrationsUseCase {
        repo: MockStatsRepo {
            users: vec![older, fresh, inactive],
            ..MockStatsRepo::default()
        },
    };

    let week = usecase.execute(None, None, Utc::now()).await.unwrap();
    assert_eq!(week.days, 7);
    assert_eq!(week.users.len(), 1);
    assert_eq!(week.users[0].id, fresh_id);

    let month = usecase.execute(Some(30), None, Utc::now()).await.unwrap();
    assert_eq!(month.users.len(), 2);
    assert_eq!(month.users[0].id, fresh_id);

    let clamped = usecase.execute(Some(0), Some(0), Utc::now()).await.unwrap();
    assert_eq!(clamped.days, 1);
    assert_eq!(clamped.users.len(), 1);
}

#[tokio::test]
async fn should_merge_users_and_courses_in_activity_feed() {
    let user = test_user(&[Role::Student]);
    let mut stale = test_user(&[Role::Student]);
    stale.fecha_creacion = Utc::now() - Duration::days(45);
    let mut course = test_course();
    course.fecha_creacion = Utc::now() + Duration::seconds(1);
    let usecase = RecentActivityUseCase {
        repo: MockStatsRepo {
            users: vec![user, stale],
            courses: vec![course],
        },
    };

    let feed = usecase.execute(None, first_page(), Utc::now()).await.unwrap();
    assert_eq!(feed.total, 2);
    assert_eq!(feed.items[0].tipo, ActivityKind::CourseCreated);
    assert_eq!(feed.items[0].descripcion, "Cálculo I");
    assert_eq!(feed.items[1].descripcion, "Ana Pérez");

    let users_only = usecase
        .execute(Some(ActivityKind::UserCreated), first_page(), Utc::now())
        .await
        .unwrap();
    assert_eq!(users_only.total, 1);
    assert_eq!(users_only.items[0].tipo.entity(), "usuario");
}

// ── Member courses ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_list_courses_of_active_student_only() {
    let student = test_user(&[Role::Student]);
    let teacher = test_user(&[Role::Teacher]);
    let mut inactive = test_user(&[Role::Student]);
    inactive.activo = false;
    let (student_id, teacher_id, inactive_id) = (student.id, teacher.id, inactive.id);
    let usecase = AdminStudentCoursesUseCase {
        users: MockUserRepo::new(vec![student, teacher, inactive]),
        courses: MockCourseRepo::new(vec![test_course()]),
    };

    let (found, courses) = usecase.execute(student_id, first_page()).await.unwrap();
    assert_eq!(found.id, student_id);
    assert_eq!(courses.total, 1);
    assert_eq!(courses.items[0].estado, EnrollmentStatus::Enrolled);

    for id in [teacher_id, inactive_id, Uuid::now_v7()] {
        let result = usecase.execute(id, first_page()).await;
        assert!(matches!(result, Err(ApiError::StudentNotFound)));
    }
}

#[tokio::test]
async fn should_report_missing_teacher_for_course_listing() {
    let teacher = test_user(&[Role::Teacher, Role::Administrator]);
    let student = test_user(&[Role::Student]);
    let (teacher_id, student_id) = (teacher.id, student.id);
    let usecase = AdminTeacherCoursesUseCase {
        users: MockUserRepo::new(vec![teacher, student]),
        courses: MockCourseRepo::new(vec![test_course(), test_course()]),
    };

    let (_, courses) = usecase.execute(teacher_id, first_page()).await.unwrap();
    assert_eq!(courses.total, 2);

    let result = usecase.execute(student_id, first_page()).await;
    assert!(matches!(result, Err(ApiError::TeacherNotFound)));
    assert_eq!(ApiError::TeacherNotFound.code(), "TEACHER_NOT_FOUND");
}

// ── Roles ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_empty_role_replacement() {
    let user = test_user(&[Role::Student]);
    let id = user.id;
    let usecase = ReplaceRolesUseCase {
        repo: MockUserRepo::new(vec![user]),
    };

    let result = usecase.execute(id, vec![]).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn should_replace_roles_and_collapse_duplicates() {
    let user = test_user(&[Role::Student]);
    let id = user.id;
    let usecase = ReplaceRolesUseCase {
        repo: MockUserRepo::new(vec![user]),
    };

    let roles = usecase
        .execute(id, vec![Role::Teacher, Role::Teacher, Role::Administrator])
        .await
        .unwrap();

    assert_eq!(roles.len(), 2);
    assert!(!roles.contains(Role::Student));
}

#[tokio::test]
async fn should_reject_duplicate_role_grant() {
    let user = test_user(&[Role::Teacher]);
    let id = user.id;
    let usecase = AddRoleUseCase {
        repo: MockUserRepo::new(vec![user]),
    };

    let roles = usecase.execute(id, Role::Administrator).await.unwrap();
    assert!(roles.contains(Role::Administrator));

    let again = usecase.execute(id, Role::Teacher).await;
    assert!(matches!(again, Err(ApiError::RoleAlreadyAssigned)));

    let missing = usecase.execute(Uuid::now_v7(), Role::Teacher).await;
    assert!(matches!(missing, Err(ApiError::UserNotFound)));
}

// ── Student listing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn should_attach_enrollments_only_when_requested() {
    let ana = test_user(&[Role::Student]);
    let luis = test_user(&[Role::Student]);
    let teacher = test_user(&[Role::Teacher]);
    let enrollments = MockEnrollmentRepo::default();
    enrollments.enrollments_handle().lock().unwrap().push(Enrollment {
        id: Uuid::now_v7(),
        curso_id: Uuid::now_v7(),
        usuario_id: ana.id,
        estado: EnrollmentStatus::Enrolled,
        nota_final: None,
        fecha_inscripcion: Utc::now(),
        fecha_estado: Utc::now(),
    });
    let ana_id = ana.id;
    let usecase = ListStudentsUseCase {
        users: MockUserRepo::new(vec![ana, luis, teacher]),
        enrollments,
    };

    let plain = usecase.execute(None, false, first_page()).await.unwrap();
    assert_eq!(plain.total, 2);
    assert!(plain.items.iter().all(|s| s.enrollments.is_none()));

    let detailed = usecase.execute(None, true, first_page()).await.unwrap();
    for listing in &detailed.items {
        let count = listing.enrollments.as_ref().map(Vec::len);
        let expected = if listing.user.id == ana_id { 1 } else { 0 };
        assert_eq!(count, Some(expected));
    }
}
