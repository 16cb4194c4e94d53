//! Appointment domain model.
//!
//! # Responsibility
//! - Define the canonical appointment record owned by the appointment store.
//! - Enforce write-side validation before any persistence happens.
//!
//! # Invariants
//! - `id == 0` means "not persisted yet"; persisted ids are stable.
//! - `objective` must be non-blank.
//! - `classification_id` must point at an existing classification; the
//!   repository checks existence, `validate()` only rejects unset ids.

use crate::model::classification::{Classification, ClassificationId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Integer identity assigned by the store on creation.
pub type AppointmentId = i64;

/// Marker value for appointments that have not been stored yet.
pub const UNSET_APPOINTMENT_ID: AppointmentId = 0;

/// Schedulable record tagged with a classification.
///
/// Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub objective: String,
    pub reason: Option<String>,
    pub additional_info: Option<String>,
    /// When the appointment takes place.
    pub appointment_at: i64,
    /// When the record was created or last posted. `0` lets the store stamp it.
    pub posted_at: i64,
    pub classification_id: ClassificationId,
    /// Resolved on every read; ignored on writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

/// Validation failures rejected before an appointment reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentValidationError {
    EmptyObjective,
    MissingClassification,
    UnknownClassificationId(ClassificationId),
    UnknownClassification(String),
}

impl Display for AppointmentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyObjective => write!(f, "appointment objective cannot be empty"),
            Self::MissingClassification => write!(f, "appointment classification is not set"),
            Self::UnknownClassificationId(id) => write!(f, "unknown classification id: {id}"),
            Self::UnknownClassification(name) => write!(f, "unknown classification: `{name}`"),
        }
    }
}

impl Error for AppointmentValidationError {}

impl Appointment {
    /// Creates an unsaved appointment with the required fields set.
    pub fn new(
        objective: impl Into<String>,
        appointment_at: i64,
        classification_id: ClassificationId,
    ) -> Self {
        Self {
            objective: objective.into(),
            appointment_at,
            classification_id,
            ..Self::default()
        }
    }

    /// Checks field-level invariants that do not require storage access.
    pub fn validate(&self) -> Result<(), AppointmentValidationError> {
        if self.objective.trim().is_empty() {
            return Err(AppointmentValidationError::EmptyObjective);
        }
        if self.classification_id <= 0 {
            return Err(AppointmentValidationError::MissingClassification);
        }
        Ok(())
    }

    pub fn is_persisted(&self) -> bool {
        self.id != UNSET_APPOINTMENT_ID
    }

    /// Name of the resolved classification, when loaded from storage.
    pub fn classification_name(&self) -> Option<&str> {
        self.classification.as_ref().map(|value| value.name.as_str())
    }

    /// Free-text fields matched by appointment search.
    pub(crate) fn searchable_fields(&self) -> [Option<&str>; 3] {
        [
            Some(self.objective.as_str()),
            self.reason.as_deref(),
            self.additional_info.as_deref(),
        ]
    }
}
