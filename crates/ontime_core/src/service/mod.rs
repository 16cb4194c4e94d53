//! Use-case services consumed by presentation layers.
//!
//! # Responsibility
//! - Turn raw request input (query strings, optional page numbers) into
//!   repository calls.
//! - Keep presentation layers decoupled from storage details.

pub mod appointment_service;
pub mod history_service;
