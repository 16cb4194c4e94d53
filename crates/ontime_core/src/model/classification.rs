//! Classification registry model.
//!
//! # Invariants
//! - `name` is non-blank and unique across the registry.
//! - Canonical names keep their historical spelling (`Succesfull`), since
//!   persisted audit rows reference them verbatim.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of a classification row.
pub type ClassificationId = i64;

/// Lifecycle/status tag attached to every appointment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    pub id: ClassificationId,
    pub name: String,
}

impl Classification {
    pub fn new(id: ClassificationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Canonical classification vocabulary seeded by the initial migration.
pub struct ClassificationTypes;

impl ClassificationTypes {
    pub const AWAITING: &'static str = "Awaiting";
    pub const SUCCESFULL: &'static str = "Succesfull";
    pub const MISSED: &'static str = "Missed";

    /// All seeded names in registry (id) order.
    pub const ALL: [&'static str; 3] = [Self::AWAITING, Self::SUCCESFULL, Self::MISSED];

    /// Classification assigned to freshly scheduled appointments.
    pub fn initial() -> &'static str {
        Self::AWAITING
    }
}

/// Validation failures for administrative classification updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationValidationError {
    EmptyName,
    DuplicateName(String),
}

impl Display for ClassificationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "classification name cannot be empty"),
            Self::DuplicateName(name) => write!(f, "classification `{name}` already exists"),
        }
    }
}

impl Error for ClassificationValidationError {}

/// Trims a classification name, rejecting blank input.
pub fn normalize_classification_name(
    name: &str,
) -> Result<String, ClassificationValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ClassificationValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}
