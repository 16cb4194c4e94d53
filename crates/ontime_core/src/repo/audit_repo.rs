//! Append-only appointment audit log.
//!
//! # Responsibility
//! - Append one snapshot per appointment mutation, inside the mutation's
//!   transaction.
//! - Serve full history and free-text history search, newest first.
//!
//! # Invariants
//! - Reads are ordered `action_at DESC, id DESC`.
//! - No API updates or deletes audit rows; the schema also aborts such
//!   statements via triggers.

use crate::model::appointment::Appointment;
use crate::model::audit::{AppointmentAudit, AuditActionType, AuditId};
use crate::repo::appointment_repo::{RepoError, RepoResult};
use crate::repo::schema::{ensure_connection_ready, TableRequirement};
use crate::repo::stream::{keyset_stream, Batch, STREAM_BATCH_SIZE};
use crate::search::criteria::AuditSearchCriteria;
use futures::stream::LocalBoxStream;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};

const AUDIT_SELECT_SQL: &str = "SELECT
    id,
    action_at,
    posted_at,
    action_type,
    objective,
    reason,
    additional_info,
    classification
FROM appointment_audits";

const REQUIRED_TABLES: &[TableRequirement] = &[TableRequirement {
    table: "appointment_audits",
    columns: &[
        "id",
        "action_at",
        "posted_at",
        "action_type",
        "objective",
        "reason",
        "additional_info",
        "classification",
    ],
}];

/// Lazy, single-pass sequence of audit records, newest first.
pub type AuditStream<'a> = LocalBoxStream<'a, RepoResult<AppointmentAudit>>;

/// History query contract over the audit log.
pub trait AuditRepository {
    fn get_all_audits(&self) -> RepoResult<Vec<AppointmentAudit>>;
    fn get_all_audits_stream(&self) -> AuditStream<'_>;
    fn search_audits(&self, criteria: &AuditSearchCriteria) -> RepoResult<Vec<AppointmentAudit>>;
    fn search_audits_stream<'a>(&'a self, criteria: &'a AuditSearchCriteria) -> AuditStream<'a>;
}

#[derive(Debug, Clone, Copy)]
struct AuditCursor {
    action_at: i64,
    id: AuditId,
}

/// SQLite-backed audit history reader.
pub struct SqliteAuditRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    fn query_audits(
        &self,
        after: Option<&AuditCursor>,
        limit: Option<u32>,
    ) -> RepoResult<Vec<AppointmentAudit>> {
        let mut sql = format!("{AUDIT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(cursor) = after {
            sql.push_str(" AND (action_at < ? OR (action_at = ? AND id < ?))");
            bind_values.extend([
                Value::Integer(cursor.action_at),
                Value::Integer(cursor.action_at),
                Value::Integer(cursor.id),
            ]);
        }

        sql.push_str(" ORDER BY action_at DESC, id DESC");
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut audits = Vec::new();
        while let Some(row) = rows.next()? {
            audits.push(parse_audit_row(row)?);
        }
        Ok(audits)
    }

    fn stream_matching<'a>(&'a self, criteria: Option<&'a AuditSearchCriteria>) -> AuditStream<'a> {
        keyset_stream(move |cursor: Option<&AuditCursor>| {
            let rows = self.query_audits(cursor, Some(STREAM_BATCH_SIZE))?;
            let exhausted = rows.len() < STREAM_BATCH_SIZE as usize;
            let next_cursor = rows.last().map(|audit| AuditCursor {
                action_at: audit.action_at,
                id: audit.id,
            });
            debug!(
                "event=audit_stream_batch module=repo status=ok rows={} exhausted={}",
                rows.len(),
                exhausted
            );

            let items = match criteria {
                Some(criteria) => rows
                    .into_iter()
                    .filter(|audit| criteria.matches(&audit.searchable_fields()))
                    .collect(),
                None => rows,
            };
            Ok(Batch {
                items,
                next_cursor,
                exhausted,
            })
        })
    }
}

impl AuditRepository for SqliteAuditRepository<'_> {
    fn get_all_audits(&self) -> RepoResult<Vec<AppointmentAudit>> {
        self.query_audits(None, None)
    }

    fn get_all_audits_stream(&self) -> AuditStream<'_> {
        self.stream_matching(None)
    }

    fn search_audits(&self, criteria: &AuditSearchCriteria) -> RepoResult<Vec<AppointmentAudit>> {
        let mut audits = self.query_audits(None, None)?;
        audits.retain(|audit| criteria.matches(&audit.searchable_fields()));
        Ok(audits)
    }

    fn search_audits_stream<'a>(&'a self, criteria: &'a AuditSearchCriteria) -> AuditStream<'a> {
        self.stream_matching(Some(criteria))
    }
}

/// Appends one snapshot of `appointment` to the audit log.
///
/// Must run inside the transaction of the mutation being audited, so the
/// record commits or rolls back together with it.
pub(crate) fn record_audit(
    tx: &Transaction<'_>,
    action_type: AuditActionType,
    appointment: &Appointment,
    classification: &str,
    action_at: i64,
) -> RepoResult<AuditId> {
    let audit = AppointmentAudit::snapshot(action_type, appointment, classification, action_at);
    tx.execute(
        "INSERT INTO appointment_audits (
            action_at,
            posted_at,
            action_type,
            objective,
            reason,
            additional_info,
            classification
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            audit.action_at,
            audit.posted_at,
            audit.action_type.as_str(),
            audit.objective.as_str(),
            audit.reason.as_deref(),
            audit.additional_info.as_deref(),
            audit.classification.as_str(),
        ],
    )?;
    let audit_id = tx.last_insert_rowid();

    debug!(
        "event=audit_append module=repo status=ok audit_id={} action_type={}",
        audit_id,
        action_type.as_str()
    );
    Ok(audit_id)
}

fn parse_audit_row(row: &Row<'_>) -> RepoResult<AppointmentAudit> {
    let action_text: String = row.get("action_type")?;
    let action_type = AuditActionType::parse(&action_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid action type `{action_text}` in appointment_audits.action_type"
        ))
    })?;

    Ok(AppointmentAudit {
        id: row.get("id")?,
        action_at: row.get("action_at")?,
        posted_at: row.get("posted_at")?,
        action_type,
        objective: row.get("objective")?,
        reason: row.get("reason")?,
        additional_info: row.get("additional_info")?,
        classification: row.get("classification")?,
    })
}
