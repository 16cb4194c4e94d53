//! Domain model for appointments, their classifications and audit history.
//!
//! # Invariants
//! - Appointments are identified by store-assigned integer ids.
//! - Audit snapshots are append-only and denormalized.

pub mod appointment;
pub mod audit;
pub mod classification;
