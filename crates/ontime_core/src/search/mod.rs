//! Free-text search criteria for appointments and audit history.
//!
//! # Responsibility
//! - Turn raw query strings into criteria that are either active or absent.
//! - Own the case-insensitive substring matching used by every search path.

pub mod criteria;
