mod helpers;

mod admin_test;
mod auth_test;
mod exam_db_test;
mod exam_schedule_test;
mod router_test;
