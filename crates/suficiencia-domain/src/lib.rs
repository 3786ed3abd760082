//! Domain types shared across the Suficiencia workspace.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; the `infra/` layer converts
//! stored strings into these types at the store boundary.

pub mod enrollment;
pub mod exam;
pub mod pagination;
pub mod parse;
pub mod role;
