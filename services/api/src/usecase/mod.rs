pub mod admin;
pub mod auth;
pub mod course;
pub mod enrollment;
pub mod exam_schedule;
pub mod session;
pub mod user;
