use chrono::{Duration, Utc};
use uuid::Uuid;

use suficiencia_api::domain::types::{Booking, ExamSchedule, ExamSchedulePatch, ScheduleFilter};
use suficiencia_api::error::ApiError;
use suficiencia_api::usecase::exam_schedule::{
    AddStudentToScheduleUseCase, CreateScheduleInput, CreateScheduleUseCase,
    DeleteScheduleUseCase, ListSchedulesUseCase, RemoveStudentFromScheduleUseCase,
    ScheduleStatsUseCase, UpdateBookingStatusUseCase, UpdateScheduleUseCase,
};
use suficiencia_domain::exam::BookingStatus;
use suficiencia_domain::pagination::PageRequest;

use crate::helpers::{MockExamScheduleRepo, MockSessionRepo, at, test_schedule, tomorrow};

/// Three students with their (usuario_id, estudiante_id) pairs.
fn three_students() -> (MockSessionRepo, Vec<(Uuid, Uuid)>) {
    let pairs: Vec<(Uuid, Uuid)> = (0..3).map(|_| (Uuid::now_v7(), Uuid::now_v7())).collect();
    let sessions = pairs
        .iter()
        .fold(MockSessionRepo::default(), |repo, (u, e)| repo.with_student(*u, *e));
    (sessions, pairs)
}

fn occupied(repo: &MockExamScheduleRepo, id: Uuid) -> i32 {
    repo.schedules_handle()
        .lock()
        .unwrap()
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.cupos_ocupados)
        .unwrap()
}

fn slot_input(cupos: i32) -> CreateScheduleInput {
    CreateScheduleInput {
        fecha_examen: tomorrow(),
        hora_inicio: at(9),
        hora_fin: at(11),
        cupos_disponibles: cupos,
        activo: None,
    }
}

fn booking(horario_examen_id: Uuid, estudiante_id: Uuid, estado: BookingStatus) -> Booking {
    Booking {
        id: Uuid::now_v7(),
        horario_examen_id,
        estudiante_id,
        estado,
        fecha_agendamiento: Utc::now(),
    }
}

// ── ListSchedulesUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_search_schedules_by_displayed_date_and_time() {
    let morning = test_schedule(5);
    let afternoon = ExamSchedule {
        id: Uuid::now_v7(),
        hora_inicio: at(14),
        hora_fin: at(16),
        ..test_schedule(5)
    };
    let afternoon_id = afternoon.id;
    let usecase = ListSchedulesUseCase {
        repo: MockExamScheduleRepo::new(vec![morning, afternoon]),
    };
    let page = PageRequest { page: 1, limit: 20 };
    let search = |text: &str| ScheduleFilter {
        search: Some(text.to_owned()),
        ..ScheduleFilter::default()
    };

    let by_time = usecase.execute(search("14:"), page).await.unwrap();
    assert_eq!(by_time.total, 1);
    assert_eq!(by_time.items[0].id, afternoon_id);

    let by_date = tomorrow().format("%d/%m/%Y").to_string();
    let both = usecase.execute(search(&by_date), page).await.unwrap();
    assert_eq!(both.total, 2);

    let blank = usecase.execute(search("   "), page).await.unwrap();
    assert_eq!(blank.total, 2);

    let none = usecase.execute(search("23:59"), page).await.unwrap();
    assert_eq!(none.total, 0);
}

// ── ScheduleStatsUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_count_each_scheduled_student_once() {
    let (first, second) = (test_schedule(5), test_schedule(5));
    let (a, b) = (first.id, second.id);
    let repo = MockExamScheduleRepo::new(vec![first, second]);
    let (ana, luis, eva) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
    repo.bookings_handle().lock().unwrap().extend([
        booking(a, ana, BookingStatus::Booked),
        booking(b, ana, BookingStatus::Confirmed),
        booking(a, luis, BookingStatus::Completed),
        booking(b, eva, BookingStatus::Cancelled),
    ]);
    let usecase = ScheduleStatsUseCase { repo };

    let stats = usecase.execute(Utc::now().date_naive()).await.unwrap();

    assert_eq!(stats.total_horarios, 2);
    assert_eq!(stats.estudiantes_agendados, 2);
}

// ── AddStudentToScheduleUseCase ──────────────────────────────────────────────

#[tokio::test]
async fn should_fill_schedule_up_to_capacity() {
    let schedule = test_schedule(2);
    let horario_id = schedule.id;
    let (sessions, students) = three_students();
    let usecase = AddStudentToScheduleUseCase {
        schedules: MockExamScheduleRepo::new(vec![schedule]),
        sessions,
    };

    usecase.execute(horario_id, students[0].0).await.unwrap();
    usecase.execute(horario_id, students[1].0).await.unwrap();
    let third = usecase.execute(horario_id, students[2].0).await;

    assert!(
        matches!(third, Err(ApiError::NoSlotsAvailable)),
        "expected NoSlotsAvailable, got {:?}",
        third.err()
    );
    assert_eq!(occupied(&usecase.schedules, horario_id), 2);
    assert_eq!(usecase.schedules.bookings_handle().lock().unwrap().len(), 2);
}

#[tokio::test]
async fn should_reject_booking_twice() {
    let schedule = test_schedule(5);
    let horario_id = schedule.id;
    let (sessions, students) = three_students();
    let usecase = AddStudentToScheduleUseCase {
        schedules: MockExamScheduleRepo::new(vec![schedule]),
        sessions,
    };

    usecase.execute(horario_id, students[0].0).await.unwrap();
    let again = usecase.execute(horario_id, students[0].0).await;

    assert!(matches!(again, Err(ApiError::StudentAlreadyScheduled)));
    assert_eq!(occupied(&usecase.schedules, horario_id), 1);
}

#[tokio::test]
async fn should_not_book_inactive_schedule() {
    let mut schedule = test_schedule(5);
    schedule.activo = false;
    let horario_id = schedule.id;
    let (sessions, students) = three_students();
    let usecase = AddStudentToScheduleUseCase {
        schedules: MockExamScheduleRepo::new(vec![schedule]),
        sessions,
    };

    let result = usecase.execute(horario_id, students[0].0).await;
    assert!(matches!(result, Err(ApiError::ScheduleNotFound)));
}

#[tokio::test]
async fn should_check_capacity_before_resolving_student() {
    let mut schedule = test_schedule(1);
    schedule.cupos_ocupados = 1;
    let horario_id = schedule.id;
    let usecase = AddStudentToScheduleUseCase {
        schedules: MockExamScheduleRepo::new(vec![schedule]),
        sessions: MockSessionRepo::default(),
    };

    let result = usecase.execute(horario_id, Uuid::now_v7()).await;
    assert!(matches!(result, Err(ApiError::NoSlotsAvailable)));
}

#[tokio::test]
async fn should_require_student_record_for_booking() {
    let schedule = test_schedule(1);
    let horario_id = schedule.id;
    let usecase = AddStudentToScheduleUseCase {
        schedules: MockExamScheduleRepo::new(vec![schedule]),
        sessions: MockSessionRepo::default(),
    };

    let result = usecase.execute(horario_id, Uuid::now_v7()).await;
    assert!(matches!(result, Err(ApiError::StudentNotFound)));
}

// ── Booking status ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_keep_slot_for_cancelled_booking() {
    let schedule = test_schedule(1);
    let horario_id = schedule.id;
    let (sessions, students) = three_students();
    let repo = MockExamScheduleRepo::new(vec![schedule]);
    let schedules = repo.schedules_handle();
    let bookings = repo.bookings_handle();
    let add = AddStudentToScheduleUseCase {
        schedules: repo,
        sessions,
    };
    add.execute(horario_id, students[0].0).await.unwrap();

    let status = UpdateBookingStatusUseCase {
        schedules: MockExamScheduleRepo {
            schedules: schedules.clone(),
            bookings: bookings.clone(),
        },
        sessions: add.sessions,
    };
    let booking = status
        .execute(horario_id, students[0].0, BookingStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(booking.estado, BookingStatus::Cancelled);
    assert_eq!(schedules.lock().unwrap()[0].cupos_ocupados, 1);

    let add = AddStudentToScheduleUseCase {
        schedules: MockExamScheduleRepo {
            schedules: schedules.clone(),
            bookings,
        },
        sessions: status.sessions,
    };
    let result = add.execute(horario_id, students[1].0).await;
    assert!(matches!(result, Err(ApiError::NoSlotsAvailable)));
}

// ── RemoveStudentFromScheduleUseCase ─────────────────────────────────────────

#[tokio::test]
async fn should_release_slot_once_on_double_removal() {
    let schedule = test_schedule(3);
    let horario_id = schedule.id;
    let (sessions, students) = three_students();
    let repo = MockExamScheduleRepo::new(vec![schedule]);
    let (schedules, bookings) = (repo.schedules_handle(), repo.bookings_handle());
    let add = AddStudentToScheduleUseCase {
        schedules: repo,
        sessions,
    };
    add.execute(horario_id, students[0].0).await.unwrap();
    add.execute(horario_id, students[1].0).await.unwrap();

    let remove = RemoveStudentFromScheduleUseCase {
        schedules: MockExamScheduleRepo {
            schedules: schedules.clone(),
            bookings,
        },
        sessions: add.sessions,
    };
    remove.execute(horario_id, students[0].0).await.unwrap();
    assert_eq!(schedules.lock().unwrap()[0].cupos_ocupados, 1);

    let again = remove.execute(horario_id, students[0].0).await;
    assert!(matches!(again, Err(ApiError::AppointmentNotFound)));
    assert_eq!(schedules.lock().unwrap()[0].cupos_ocupados, 1);
}

// ── CreateScheduleUseCase ────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_exact_slot_conflict_but_allow_overlap() {
    let usecase = CreateScheduleUseCase {
        repo: MockExamScheduleRepo::default(),
    };
    let today = Utc::now().date_naive();

    let created = usecase
        .execute(slot_input(10), Uuid::now_v7(), today)
        .await
        .unwrap();
    assert_eq!(created.cupos_ocupados, 0);
    assert!(created.activo);

    let conflict = usecase.execute(slot_input(10), Uuid::now_v7(), today).await;
    assert!(matches!(conflict, Err(ApiError::ScheduleConflict)));

    let overlapping = CreateScheduleInput {
        hora_inicio: at(10),
        hora_fin: at(12),
        ..slot_input(10)
    };
    assert!(
        usecase
            .execute(overlapping, Uuid::now_v7(), today)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn should_validate_new_schedule_slot() {
    let usecase = CreateScheduleUseCase {
        repo: MockExamScheduleRepo::default(),
    };
    let today = Utc::now().date_naive();

    let past = CreateScheduleInput {
        fecha_examen: today - Duration::days(1),
        ..slot_input(10)
    };
    assert!(matches!(
        usecase.execute(past, Uuid::now_v7(), today).await,
        Err(ApiError::InvalidExamDate)
    ));

    let inverted = CreateScheduleInput {
        hora_inicio: at(11),
        hora_fin: at(9),
        ..slot_input(10)
    };
    assert!(matches!(
        usecase.execute(inverted, Uuid::now_v7(), today).await,
        Err(ApiError::InvalidTimeRange)
    ));

    assert!(matches!(
        usecase.execute(slot_input(0), Uuid::now_v7(), today).await,
        Err(ApiError::InvalidCapacity)
    ));
}

// ── UpdateScheduleUseCase ────────────────────────────────────────────────────

#[tokio::test]
async fn should_not_shrink_capacity_below_occupied() {
    let mut schedule = test_schedule(5);
    schedule.cupos_ocupados = 3;
    let id = schedule.id;
    let usecase = UpdateScheduleUseCase {
        repo: MockExamScheduleRepo::new(vec![schedule]),
    };
    let today = Utc::now().date_naive();

    let shrink = ExamSchedulePatch {
        cupos_disponibles: Some(2),
        ..ExamSchedulePatch::default()
    };
    assert!(matches!(
        usecase.execute(id, shrink, today).await,
        Err(ApiError::InvalidCapacity)
    ));

    let exact = ExamSchedulePatch {
        cupos_disponibles: Some(3),
        ..ExamSchedulePatch::default()
    };
    let updated = usecase.execute(id, exact, today).await.unwrap();
    assert_eq!(updated.cupos_disponibles, 3);
}

#[tokio::test]
async fn should_allow_editing_past_schedule_without_moving_it() {
    let mut schedule: ExamSchedule = test_schedule(5);
    schedule.fecha_examen = Utc::now().date_naive() - Duration::days(3);
    let id = schedule.id;
    let usecase = UpdateScheduleUseCase {
        repo: MockExamScheduleRepo::new(vec![schedule]),
    };
    let today = Utc::now().date_naive();

    let deactivate = ExamSchedulePatch {
        activo: Some(false),
        ..ExamSchedulePatch::default()
    };
    let updated = usecase.execute(id, deactivate, today).await.unwrap();
    assert!(!updated.activo);

    let still_past = ExamSchedulePatch {
        fecha_examen: Some(today - Duration::days(1)),
        ..ExamSchedulePatch::default()
    };
    assert!(matches!(
        usecase.execute(id, still_past, today).await,
        Err(ApiError::InvalidExamDate)
    ));
}

// ── DeleteScheduleUseCase ────────────────────────────────────────────────────

#[tokio::test]
async fn should_delete_schedule_only_after_students_removed() {
    let schedule = test_schedule(2);
    let horario_id = schedule.id;
    let (sessions, students) = three_students();
    let repo = MockExamScheduleRepo::new(vec![schedule]);
    let (schedules, bookings) = (repo.schedules_handle(), repo.bookings_handle());
    let add = AddStudentToScheduleUseCase {
        schedules: repo,
        sessions,
    };
    add.execute(horario_id, students[0].0).await.unwrap();

    let delete = DeleteScheduleUseCase {
        repo: MockExamScheduleRepo {
            schedules: schedules.clone(),
            bookings: bookings.clone(),
        },
    };
    assert!(matches!(
        delete.execute(horario_id).await,
        Err(ApiError::ScheduleHasStudents)
    ));

    let remove = RemoveStudentFromScheduleUseCase {
        schedules: MockExamScheduleRepo {
            schedules: schedules.clone(),
            bookings,
        },
        sessions: add.sessions,
    };
    remove.execute(horario_id, students[0].0).await.unwrap();

    delete.execute(horario_id).await.unwrap();
    assert!(schedules.lock().unwrap().is_empty());
}
