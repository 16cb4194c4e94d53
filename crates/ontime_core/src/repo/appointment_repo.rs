//! Appointment store and query engine over SQLite.
//!
//! # Responsibility
//! - Provide add/update/remove/lookup APIs over the `appointments` table.
//! - Serve classification-scoped filter and free-text search queries, both
//!   eagerly and as lazy streams.
//! - Append one audit snapshot per successful mutation.
//!
//! # Invariants
//! - Every mutation and its audit append share one transaction; a failed
//!   mutation leaves neither a row change nor an audit record.
//! - Query results are ordered `appointment_at DESC, posted_at DESC, id ASC`.
//! - Classification names match exactly (case-sensitive).

use crate::clock::{system_clock, Clock};
use crate::db::DbError;
use crate::model::appointment::{Appointment, AppointmentId, AppointmentValidationError};
use crate::model::audit::AuditActionType;
use crate::model::classification::{Classification, ClassificationId, ClassificationValidationError};
use crate::repo::audit_repo::record_audit;
use crate::repo::classification_repo::{find_classification_by_id, find_classification_by_name};
use crate::repo::schema::{ensure_connection_ready, TableRequirement};
use crate::repo::stream::{keyset_stream, Batch, STREAM_BATCH_SIZE};
use crate::search::criteria::SearchCriteria;
use futures::stream::LocalBoxStream;
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const APPOINTMENT_SELECT_SQL: &str = "SELECT
    a.id AS id,
    a.objective AS objective,
    a.reason AS reason,
    a.additional_info AS additional_info,
    a.appointment_at AS appointment_at,
    a.posted_at AS posted_at,
    a.classification_id AS classification_id,
    c.name AS classification_name
FROM appointments a
INNER JOIN classifications c ON c.id = a.classification_id";

const APPOINTMENT_ORDER_SQL: &str =
    " ORDER BY a.appointment_at DESC, a.posted_at DESC, a.id ASC";

const REQUIRED_TABLES: &[TableRequirement] = &[
    TableRequirement {
        table: "classifications",
        columns: &["id", "name"],
    },
    TableRequirement {
        table: "appointments",
        columns: &[
            "id",
            "objective",
            "reason",
            "additional_info",
            "appointment_at",
            "posted_at",
            "classification_id",
        ],
    },
    TableRequirement {
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
    },
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Lazy, single-pass sequence of appointments in query order.
pub type AppointmentStream<'a> = LocalBoxStream<'a, RepoResult<Appointment>>;

/// Repository error shared by appointment, classification and audit stores.
#[derive(Debug)]
pub enum RepoError {
    /// Appointment rejected before storage.
    Validation(AppointmentValidationError),
    /// Classification rename rejected before storage.
    ClassificationValidation(ClassificationValidationError),
    /// Non-retryable storage failure.
    Db(DbError),
    /// Storage temporarily unreachable (busy, locked, I/O). Safe to retry.
    Unavailable(DbError),
    NotFound(AppointmentId),
    ClassificationNotFound(ClassificationId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Returns whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Returns whether the target record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::ClassificationNotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ClassificationValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(err) => write!(f, "store unavailable: {err}"),
            Self::NotFound(id) => write!(f, "appointment not found: {id}"),
            Self::ClassificationNotFound(id) => write!(f, "classification not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind required {expected_version}; open it via db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::ClassificationValidation(err) => Some(err),
            Self::Db(err) | Self::Unavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AppointmentValidationError> for RepoError {
    fn from(value: AppointmentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ClassificationValidationError> for RepoError {
    fn from(value: ClassificationValidationError) -> Self {
        Self::ClassificationValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_unavailable() {
            Self::Unavailable(value)
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

/// Appointment store plus query engine contract.
///
/// Stream variants follow the same filtering and ordering contract as their
/// eager counterparts.
pub trait AppointmentRepository {
    /// Validates and stores a new appointment, returning its assigned id.
    fn add_appointment(&self, appointment: &Appointment) -> RepoResult<AppointmentId>;
    /// Replaces objective/reason/additional info/classification by id.
    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()>;
    /// Deletes one appointment by id.
    fn remove_by_id(&self, id: AppointmentId) -> RepoResult<()>;
    /// Moves one appointment to the classification with `classification` name.
    fn set_classification(&self, id: AppointmentId, classification: &str) -> RepoResult<()>;
    /// Point lookup; `Ok(None)` on miss.
    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<Appointment>>;
    /// Whole live collection. Ordering is not part of the contract.
    fn all_appointments(&self) -> RepoResult<Vec<Appointment>>;
    fn filter_appointments(&self, classification: &str) -> RepoResult<Vec<Appointment>>;
    fn filter_appointments_stream<'a>(&'a self, classification: &'a str) -> AppointmentStream<'a>;
    fn search_appointments(
        &self,
        criteria: &SearchCriteria,
        classification: &str,
    ) -> RepoResult<Vec<Appointment>>;
    fn search_appointments_stream<'a>(
        &'a self,
        criteria: &'a SearchCriteria,
        classification: &'a str,
    ) -> AppointmentStream<'a>;
}

/// Keyset position inside the appointment ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AppointmentCursor {
    appointment_at: i64,
    posted_at: i64,
    id: AppointmentId,
}

impl AppointmentCursor {
    fn after(appointment: &Appointment) -> Self {
        Self {
            appointment_at: appointment.appointment_at,
            posted_at: appointment.posted_at,
            id: appointment.id,
        }
    }
}

/// SQLite-backed appointment repository.
pub struct SqliteAppointmentRepository<'conn> {
    conn: &'conn Connection,
    clock: Clock,
}

impl<'conn> SqliteAppointmentRepository<'conn> {
    /// Constructs a repository from a migrated connection using the system clock.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_clock(conn, system_clock)
    }

    /// Constructs a repository that stamps `posted_at`/`action_at` via `clock`.
    pub fn with_clock(conn: &'conn Connection, clock: Clock) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn, clock })
    }

    fn resolve_for_write(&self, classification_id: ClassificationId) -> RepoResult<Classification> {
        find_classification_by_id(self.conn, classification_id)?.ok_or(RepoError::Validation(
            AppointmentValidationError::UnknownClassificationId(classification_id),
        ))
    }

    fn load_appointment(&self, id: AppointmentId) -> RepoResult<Option<Appointment>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{APPOINTMENT_SELECT_SQL} WHERE a.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_appointment_row(row)?)),
            None => Ok(None),
        }
    }

    /// Reads appointments of one classification in query order.
    ///
    /// `after` resumes strictly after a keyset position; `limit = None` reads
    /// to the end.
    fn query_classification(
        &self,
        classification_id: ClassificationId,
        after: Option<&AppointmentCursor>,
        limit: Option<u32>,
    ) -> RepoResult<Vec<Appointment>> {
        let mut sql = format!("{APPOINTMENT_SELECT_SQL} WHERE a.classification_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Integer(classification_id)];

        if let Some(cursor) = after {
            sql.push_str(
                " AND (a.appointment_at < ?
                    OR (a.appointment_at = ?
                        AND (a.posted_at < ?
                            OR (a.posted_at = ? AND a.id > ?))))",
            );
            bind_values.extend([
                Value::Integer(cursor.appointment_at),
                Value::Integer(cursor.appointment_at),
                Value::Integer(cursor.posted_at),
                Value::Integer(cursor.posted_at),
                Value::Integer(cursor.id),
            ]);
        }

        sql.push_str(APPOINTMENT_ORDER_SQL);
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut appointments = Vec::new();
        while let Some(row) = rows.next()? {
            appointments.push(parse_appointment_row(row)?);
        }
        Ok(appointments)
    }

    fn query_matching(
        &self,
        criteria: Option<&SearchCriteria>,
        classification: &str,
    ) -> RepoResult<Vec<Appointment>> {
        let Some(resolved) = find_classification_by_name(self.conn, classification)? else {
            debug!("event=appointment_query module=repo status=ok result=unknown_classification");
            return Ok(Vec::new());
        };

        let mut appointments = self.query_classification(resolved.id, None, None)?;
        if let Some(criteria) = criteria {
            appointments.retain(|appointment| criteria.matches(&appointment.searchable_fields()));
        }
        Ok(appointments)
    }

    fn stream_matching<'a>(
        &'a self,
        criteria: Option<&'a SearchCriteria>,
        classification: &'a str,
    ) -> AppointmentStream<'a> {
        let mut resolved: Option<Option<ClassificationId>> = None;

        keyset_stream(move |cursor: Option<&AppointmentCursor>| {
            let classification_id = match resolved {
                Some(id) => id,
                None => {
                    let id = find_classification_by_name(self.conn, classification)?
                        .map(|value| value.id);
                    resolved = Some(id);
                    id
                }
            };
            let Some(classification_id) = classification_id else {
                return Ok(Batch {
                    items: Vec::new(),
                    next_cursor: None,
                    exhausted: true,
                });
            };

            let rows =
                self.query_classification(classification_id, cursor, Some(STREAM_BATCH_SIZE))?;
            let exhausted = rows.len() < STREAM_BATCH_SIZE as usize;
            let next_cursor = rows.last().map(AppointmentCursor::after);
            debug!(
                "event=appointment_stream_batch module=repo status=ok rows={} exhausted={}",
                rows.len(),
                exhausted
            );

            let items = match criteria {
                Some(criteria) => rows
                    .into_iter()
                    .filter(|appointment| criteria.matches(&appointment.searchable_fields()))
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

impl AppointmentRepository for SqliteAppointmentRepository<'_> {
    fn add_appointment(&self, appointment: &Appointment) -> RepoResult<AppointmentId> {
        if let Err(err) = appointment.validate() {
            warn!("event=appointment_add module=repo status=rejected reason={err}");
            return Err(err.into());
        }

        let tx = self.conn.unchecked_transaction()?;
        let classification = self.resolve_for_write(appointment.classification_id)?;
        let now = (self.clock)();

        let mut stored = appointment.clone();
        if stored.posted_at == 0 {
            stored.posted_at = now;
        }

        tx.execute(
            "INSERT INTO appointments (
                objective,
                reason,
                additional_info,
                appointment_at,
                posted_at,
                classification_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                stored.objective.as_str(),
                stored.reason.as_deref(),
                stored.additional_info.as_deref(),
                stored.appointment_at,
                stored.posted_at,
                stored.classification_id,
            ],
        )?;
        stored.id = tx.last_insert_rowid();

        record_audit(&tx, AuditActionType::Add, &stored, &classification.name, now)?;
        tx.commit()?;

        info!(
            "event=appointment_add module=repo status=ok appointment_id={} classification_id={}",
            stored.id, stored.classification_id
        );
        Ok(stored.id)
    }

    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()> {
        if let Err(err) = appointment.validate() {
            warn!(
                "event=appointment_update module=repo status=rejected appointment_id={} reason={err}",
                appointment.id
            );
            return Err(err.into());
        }
        if !appointment.is_persisted() {
            return Err(RepoError::NotFound(appointment.id));
        }

        let tx = self.conn.unchecked_transaction()?;
        let classification = self.resolve_for_write(appointment.classification_id)?;
        let now = (self.clock)();

        let changed = tx.execute(
            "UPDATE appointments
             SET
                objective = ?1,
                reason = ?2,
                additional_info = ?3,
                classification_id = ?4,
                posted_at = ?5
             WHERE id = ?6;",
            params![
                appointment.objective.as_str(),
                appointment.reason.as_deref(),
                appointment.additional_info.as_deref(),
                appointment.classification_id,
                now,
                appointment.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(appointment.id));
        }

        let updated = self
            .load_appointment(appointment.id)?
            .ok_or(RepoError::NotFound(appointment.id))?;
        record_audit(&tx, AuditActionType::Edit, &updated, &classification.name, now)?;
        tx.commit()?;

        info!(
            "event=appointment_update module=repo status=ok appointment_id={}",
            appointment.id
        );
        Ok(())
    }

    fn remove_by_id(&self, id: AppointmentId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(prior) = self.load_appointment(id)? else {
            return Err(RepoError::NotFound(id));
        };
        let classification = prior.classification_name().unwrap_or_default().to_string();

        tx.execute("DELETE FROM appointments WHERE id = ?1;", [id])?;
        record_audit(
            &tx,
            AuditActionType::Delete,
            &prior,
            &classification,
            (self.clock)(),
        )?;
        tx.commit()?;

        info!("event=appointment_remove module=repo status=ok appointment_id={id}");
        Ok(())
    }

    fn set_classification(&self, id: AppointmentId, classification: &str) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(target) = find_classification_by_name(self.conn, classification)? else {
            return Err(RepoError::Validation(
                AppointmentValidationError::UnknownClassification(classification.to_string()),
            ));
        };

        let changed = tx.execute(
            "UPDATE appointments SET classification_id = ?1 WHERE id = ?2;",
            params![target.id, id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        let updated = self.load_appointment(id)?.ok_or(RepoError::NotFound(id))?;
        record_audit(
            &tx,
            AuditActionType::Update,
            &updated,
            &target.name,
            (self.clock)(),
        )?;
        tx.commit()?;

        info!(
            "event=appointment_classify module=repo status=ok appointment_id={id} classification_id={}",
            target.id
        );
        Ok(())
    }

    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<Appointment>> {
        self.load_appointment(id)
    }

    fn all_appointments(&self) -> RepoResult<Vec<Appointment>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{APPOINTMENT_SELECT_SQL} ORDER BY a.id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut appointments = Vec::new();
        while let Some(row) = rows.next()? {
            appointments.push(parse_appointment_row(row)?);
        }
        Ok(appointments)
    }

    fn filter_appointments(&self, classification: &str) -> RepoResult<Vec<Appointment>> {
        self.query_matching(None, classification)
    }

    fn filter_appointments_stream<'a>(&'a self, classification: &'a str) -> AppointmentStream<'a> {
        self.stream_matching(None, classification)
    }

    fn search_appointments(
        &self,
        criteria: &SearchCriteria,
        classification: &str,
    ) -> RepoResult<Vec<Appointment>> {
        self.query_matching(active(criteria), classification)
    }

    fn search_appointments_stream<'a>(
        &'a self,
        criteria: &'a SearchCriteria,
        classification: &'a str,
    ) -> AppointmentStream<'a> {
        self.stream_matching(active(criteria), classification)
    }
}

fn active(criteria: &SearchCriteria) -> Option<&SearchCriteria> {
    if criteria.is_empty() {
        None
    } else {
        Some(criteria)
    }
}

fn parse_appointment_row(row: &Row<'_>) -> RepoResult<Appointment> {
    let classification_id: ClassificationId = row.get("classification_id")?;
    let appointment = Appointment {
        id: row.get("id")?,
        objective: row.get("objective")?,
        reason: row.get("reason")?,
        additional_info: row.get("additional_info")?,
        appointment_at: row.get("appointment_at")?,
        posted_at: row.get("posted_at")?,
        classification_id,
        classification: Some(Classification::new(
            classification_id,
            row.get::<_, String>("classification_name")?,
        )),
    };

    appointment.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "appointment {} failed validation: {err}",
            appointment.id
        ))
    })?;
    Ok(appointment)
}

