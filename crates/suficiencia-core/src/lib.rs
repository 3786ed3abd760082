//! Web plumbing shared by Suficiencia services: error envelope, health
//! payload, request ids, tracing setup and environment config loading.

pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
