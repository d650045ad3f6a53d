//! # quill-core
//!
//! Core types, errors, and domain logic for the quill research-assistant
//! backend.
//!
//! This crate holds everything that does not touch the database or the HTTP
//! layer: the shared error taxonomy, domain models, the phase-status
//! derivation used by the dashboard, document version-number arithmetic,
//! citation formatting, BibTeX parsing, and password hashing.

pub mod bibtex;
pub mod citation;
pub mod error;
pub mod logging;
pub mod models;
pub mod password;
pub mod phases;
pub mod versioning;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use phases::{
    derive_phase_status, phase_overview, reference_now, reference_offset, PhaseFacts,
    PhaseStatus, CANONICAL_PHASE_TITLES, DEADLINE_WARNING_DAYS,
};
pub use versioning::VersionNumber;

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// UUIDv7 embeds a Unix timestamp in the first 48 bits, so primary keys
/// generated later sort after earlier ones. Every table in quill uses these.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
