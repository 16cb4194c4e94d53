//! Appointment history use-cases.
//!
//! # Invariants
//! - Listings are ordered newest first (`action_at DESC, id DESC`) even if
//!   the repository yields another order.
//! - A blank search term never reaches the audit search; it serves the
//!   unfiltered history instead.

use crate::model::audit::AppointmentAudit;
use crate::repo::audit_repo::AuditRepository;
use crate::search::criteria::AuditSearchCriteria;
use crate::service::appointment_service::ServiceResult;
use futures::TryStreamExt;
use log::info;
use serde::Serialize;

/// History view model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryListing {
    pub records: Vec<AppointmentAudit>,
    /// Whether `records` were narrowed by a search term.
    pub search_request: bool,
    /// Normalized term used for narrowing; empty for the full history.
    pub search_criteria: String,
}

/// History service facade over an audit repository.
pub struct HistoryService<A: AuditRepository> {
    audits: A,
}

impl<A: AuditRepository> HistoryService<A> {
    pub fn new(audits: A) -> Self {
        Self { audits }
    }

    /// Full audit history.
    pub async fn history(&self) -> ServiceResult<HistoryListing> {
        let records: Vec<AppointmentAudit> =
            self.audits.get_all_audits_stream().try_collect().await?;
        Ok(HistoryListing {
            records: newest_first(records),
            search_request: false,
            search_criteria: String::new(),
        })
    }

    /// Audit records matching `raw_term`, or the full history for blank input.
    pub async fn search_history(&self, raw_term: Option<&str>) -> ServiceResult<HistoryListing> {
        let Some(criteria) = AuditSearchCriteria::from_query(raw_term) else {
            info!("event=history_search module=service status=skipped reason=blank_term");
            return self.history().await;
        };

        let records: Vec<AppointmentAudit> = self
            .audits
            .search_audits_stream(&criteria)
            .try_collect()
            .await?;
        info!(
            "event=history_search module=service status=ok term_len={} results={}",
            criteria.term().chars().count(),
            records.len()
        );
        Ok(HistoryListing {
            records: newest_first(records),
            search_request: true,
            search_criteria: criteria.term().to_string(),
        })
    }
}

fn newest_first(mut records: Vec<AppointmentAudit>) -> Vec<AppointmentAudit> {
    records.sort_by(|left, right| {
        right
            .action_at
            .cmp(&left.action_at)
            .then_with(|| right.id.cmp(&left.id))
    });
    records
}
