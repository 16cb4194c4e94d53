//! Core appointment query & audit logic for OnTime.
//! This crate is the single source of truth for appointment invariants:
//! ordering, pagination arithmetic, classification scoping and audit history.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::appointment::{
    Appointment, AppointmentId, AppointmentValidationError, UNSET_APPOINTMENT_ID,
};
pub use model::audit::{AppointmentAudit, AuditActionType, AuditId};
pub use model::classification::{
    Classification, ClassificationId, ClassificationTypes, ClassificationValidationError,
};
pub use pagination::{
    normalize_page_number, paginate, paginate_stream, Page, PaginationError, PaginationInfo,
    PaginationResult, DEFAULT_PAGE_SIZE,
};
pub use repo::appointment_repo::{
    AppointmentRepository, AppointmentStream, RepoError, RepoResult, SqliteAppointmentRepository,
};
pub use repo::audit_repo::{AuditRepository, AuditStream, SqliteAuditRepository};
pub use repo::classification_repo::{ClassificationRepository, SqliteClassificationRepository};
pub use search::criteria::{AuditSearchCriteria, SearchCriteria};
pub use service::appointment_service::{
    AppointmentListing, AppointmentService, ClassificationChoices, ServiceError, ServiceResult,
};
pub use service::history_service::{HistoryListing, HistoryService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
