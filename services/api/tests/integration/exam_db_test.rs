use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Transaction, Value,
};
use uuid::Uuid;

use suficiencia_api::domain::repository::ExamScheduleRepository;
use suficiencia_api::domain::types::ScheduleFilter;
use suficiencia_api::error::ApiError;
use suficiencia_api::infra::exam_db::DbExamScheduleRepository;
use suficiencia_api_schema::{agendamientos_examen, horarios_examenes};
use suficiencia_domain::exam::BookingStatus;
use suficiencia_domain::pagination::PageRequest;
use suficiencia_testing::db::unique_violation;

use crate::helpers::{at, tomorrow};

fn schedule_row(
    id: Uuid,
    cupos_disponibles: i32,
    cupos_ocupados: i32,
) -> horarios_examenes::Model {
    horarios_examenes::Model {
        id,
        fecha_examen: tomorrow(),
        hora_inicio: at(9),
        hora_fin: at(11),
        cupos_disponibles,
        cupos_ocupados,
        activo: true,
        creado_por: None,
        fecha_creacion: Utc::now(),
        fecha_actualizacion: Utc::now(),
    }
}

fn booking_row(horario_examen_id: Uuid, estudiante_id: Uuid) -> agendamientos_examen::Model {
    agendamientos_examen::Model {
        id: Uuid::new_v4(),
        horario_examen_id,
        estudiante_id,
        estado: BookingStatus::Booked.as_str().to_owned(),
        fecha_agendamiento: Utc::now(),
    }
}

fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

fn repo(db: DatabaseConnection) -> DbExamScheduleRepository {
    DbExamScheduleRepository { db: Arc::new(db) }
}

/// Statements of every transaction the repository ran, in order.
fn transactions(repo: DbExamScheduleRepository) -> Vec<Vec<String>> {
    let Ok(db) = Arc::try_unwrap(repo.db) else {
        panic!("repository handle still shared");
    };
    db.into_transaction_log()
        .iter()
        .map(Transaction::statements)
        .map(|stmts| stmts.iter().map(|s| s.sql.clone()).collect())
        .collect()
}

fn scalar(column: &str, n: i64) -> BTreeMap<String, Value> {
    BTreeMap::from([(column.to_owned(), Value::BigInt(Some(n)))])
}

fn count(stmts: &[String], prefix: &str) -> usize {
    stmts.iter().filter(|sql| sql.starts_with(prefix)).count()
}

// ── book ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_insert_booking_and_bump_counter_in_one_transaction() {
    let (horario_id, estudiante_id) = (Uuid::now_v7(), Uuid::now_v7());
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![schedule_row(horario_id, 2, 1)]])
        .append_query_results([vec![booking_row(horario_id, estudiante_id)]])
        .append_exec_results([exec(1)])
        .into_connection();
    let repo = repo(db);

    let booking = repo.book(horario_id, estudiante_id).await.unwrap();
    assert_eq!(booking.estudiante_id, estudiante_id);
    assert_eq!(booking.estado, BookingStatus::Booked);

    let log = transactions(repo);
    assert_eq!(log.len(), 1);
    let stmts = &log[0];
    assert_eq!(stmts.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(stmts.last().map(String::as_str), Some("COMMIT"));
    assert!(stmts[1].starts_with("SELECT") && stmts[1].ends_with("FOR UPDATE"));
    assert_eq!(count(stmts, "INSERT INTO \"agendamientos_examen\""), 1);
    assert_eq!(count(stmts, "UPDATE \"horarios_examenes\""), 1);
}

#[tokio::test]
async fn should_map_duplicate_booking_without_touching_counter() {
    let (horario_id, estudiante_id) = (Uuid::now_v7(), Uuid::now_v7());
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![schedule_row(horario_id, 5, 1)]])
        .append_query_errors([unique_violation()])
        .into_connection();
    let repo = repo(db);

    let result = repo.book(horario_id, estudiante_id).await;
    assert!(
        matches!(result, Err(ApiError::StudentAlreadyScheduled)),
        "expected StudentAlreadyScheduled, got {:?}",
        result.err()
    );

    let log = transactions(repo);
    assert_eq!(log.len(), 1);
    assert_eq!(count(&log[0], "UPDATE"), 0);
    assert_eq!(count(&log[0], "COMMIT"), 0);
}

#[tokio::test]
async fn should_recheck_capacity_under_lock() {
    let (horario_id, estudiante_id) = (Uuid::now_v7(), Uuid::now_v7());
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![schedule_row(horario_id, 2, 2)]])
        .into_connection();
    let repo = repo(db);

    let result = repo.book(horario_id, estudiante_id).await;
    assert!(matches!(result, Err(ApiError::NoSlotsAvailable)));

    let log = transactions(repo);
    assert_eq!(count(&log[0], "INSERT"), 0);
    assert_eq!(count(&log[0], "UPDATE \"horarios_examenes\""), 0);
}

// ── unbook ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_delete_booking_and_release_slot_in_one_transaction() {
    let (horario_id, estudiante_id) = (Uuid::now_v7(), Uuid::now_v7());
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![schedule_row(horario_id, 2, 1)]])
        .append_exec_results([exec(1)])
        .append_query_results([vec![schedule_row(horario_id, 2, 0)]])
        .into_connection();
    let repo = repo(db);

    repo.unbook(horario_id, estudiante_id).await.unwrap();

    let log = transactions(repo);
    assert_eq!(log.len(), 1);
    let stmts = &log[0];
    assert_eq!(count(stmts, "DELETE FROM \"agendamientos_examen\""), 1);
    assert_eq!(count(stmts, "UPDATE \"horarios_examenes\""), 1);
    assert_eq!(stmts.last().map(String::as_str), Some("COMMIT"));
}

#[tokio::test]
async fn should_not_release_slot_for_missing_booking() {
    let (horario_id, estudiante_id) = (Uuid::now_v7(), Uuid::now_v7());
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![schedule_row(horario_id, 2, 1)]])
        .append_exec_results([exec(0)])
        .into_connection();
    let repo = repo(db);

    let result = repo.unbook(horario_id, estudiante_id).await;
    assert!(matches!(result, Err(ApiError::AppointmentNotFound)));

    let log = transactions(repo);
    assert_eq!(count(&log[0], "UPDATE"), 0);
}

// ── list / stats ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_search_displayed_date_and_times() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[scalar("num_items", 0)]])
        .append_query_results([Vec::<horarios_examenes::Model>::new()])
        .into_connection();
    let repo = repo(db);
    let filter = ScheduleFilter {
        search: Some("09:".to_owned()),
        ..ScheduleFilter::default()
    };

    let page = repo.list(filter, PageRequest { page: 1, limit: 20 }).await.unwrap();
    assert_eq!(page.total, 0);

    let log = transactions(repo);
    let select = log.last().and_then(|t| t.first()).unwrap();
    assert!(select.contains("TO_CHAR(horarios_examenes.fecha_examen, 'DD/MM/YYYY') ILIKE $1"));
    assert!(select.contains("TO_CHAR(horarios_examenes.hora_fin, 'HH24:MI') ILIKE $3"));
}

#[tokio::test]
async fn should_count_distinct_students_without_cancelled_bookings() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([
            [scalar("num_items", 4)],
            [scalar("num_items", 3)],
            [scalar("num_items", 2)],
            [scalar("total", 5)],
            [scalar("total", 40)],
            [scalar("total", 7)],
        ])
        .into_connection();
    let repo = repo(db);

    let stats = repo.stats(Utc::now().date_naive()).await.unwrap();
    assert_eq!(stats.total_horarios, 4);
    assert_eq!(stats.estudiantes_agendados, 5);
    assert_eq!(stats.cupos_totales, 40);
    assert_eq!(stats.cupos_ocupados, 7);

    let log = transactions(repo);
    let students = log
        .iter()
        .flatten()
        .find(|sql| sql.contains("agendamientos_examen"))
        .unwrap();
    assert!(students.contains("COUNT(DISTINCT \"agendamientos_examen\".\"estudiante_id\")"));
    assert!(students.contains("\"estado\" <> $1"));
}
