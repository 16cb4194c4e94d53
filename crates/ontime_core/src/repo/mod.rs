//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the appointment store, classification registry and audit history
//!   contracts consumed by services and presentation layers.
//! - Isolate SQLite query details from use-case orchestration.
//!
//! # Invariants
//! - Writes call `Appointment::validate()` before any SQL mutation.
//! - Repository APIs return semantic errors (`NotFound`, `Validation`,
//!   `Unavailable`) in addition to DB transport errors.

pub mod appointment_repo;
pub mod audit_repo;
pub mod classification_repo;
mod schema;
pub mod stream;
