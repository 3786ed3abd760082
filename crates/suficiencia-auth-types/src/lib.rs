//! Auth types shared across Suficiencia crates.
//!
//! Provides the access/refresh [`token::TokenService`], duration parsing for
//! token lifetimes, bearer extraction and the [`identity::Caller`] extractor.

pub mod identity;
pub mod token;
