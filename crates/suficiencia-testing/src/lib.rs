//! Test utilities for Suficiencia services.
//!
//! Import from `[dev-dependencies]` only.

pub mod auth;
pub mod db;
