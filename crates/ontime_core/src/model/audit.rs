//! Appointment audit snapshot model.
//!
//! # Invariants
//! - Audit records are append-only: no API mutates or deletes them.
//! - `classification` is a denormalized name, not a foreign key, so renaming
//!   or removing classifications never rewrites history.

use crate::model::appointment::Appointment;
use serde::{Deserialize, Serialize};

/// Identity of one audit row.
pub type AuditId = i64;

/// Kind of mutating action captured by an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditActionType {
    Add,
    Edit,
    Update,
    Delete,
}

impl AuditActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Edit => "EDIT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADD" => Some(Self::Add),
            "EDIT" => Some(Self::Edit),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Immutable snapshot of an appointment at the moment of a mutating action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentAudit {
    pub id: AuditId,
    /// When the audited action happened (epoch ms).
    pub action_at: i64,
    /// Copied from the audited appointment.
    pub posted_at: i64,
    pub action_type: AuditActionType,
    pub objective: String,
    pub reason: Option<String>,
    pub additional_info: Option<String>,
    pub classification: String,
}

impl AppointmentAudit {
    /// Builds an unsaved snapshot of `appointment`.
    ///
    /// `classification` is passed explicitly because writes carry only the
    /// classification id; the recorder resolves the name inside the same
    /// transaction as the mutation.
    pub fn snapshot(
        action_type: AuditActionType,
        appointment: &Appointment,
        classification: impl Into<String>,
        action_at: i64,
    ) -> Self {
        Self {
            id: 0,
            action_at,
            posted_at: appointment.posted_at,
            action_type,
            objective: appointment.objective.clone(),
            reason: appointment.reason.clone(),
            additional_info: appointment.additional_info.clone(),
            classification: classification.into(),
        }
    }

    pub(crate) fn searchable_fields(&self) -> [Option<&str>; 4] {
        [
            Some(self.objective.as_str()),
            self.reason.as_deref(),
            self.additional_info.as_deref(),
            Some(self.classification.as_str()),
        ]
    }
}
