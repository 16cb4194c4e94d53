//! Classification registry repository.
//!
//! # Responsibility
//! - Enumerate the classification vocabulary in registry (id) order.
//! - Resolve names and ids for the appointment store.
//! - Support explicit administrative renames.
//!
//! # Invariants
//! - Name lookups are exact and case-sensitive.
//! - Renames never touch audit rows; they keep the name recorded at the time.

use crate::model::classification::{
    normalize_classification_name, Classification, ClassificationId,
    ClassificationValidationError,
};
use crate::repo::appointment_repo::{RepoError, RepoResult};
use crate::repo::schema::{ensure_connection_ready, TableRequirement};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

const REQUIRED_TABLES: &[TableRequirement] = &[TableRequirement {
    table: "classifications",
    columns: &["id", "name"],
}];

/// Read/administer the classification vocabulary.
pub trait ClassificationRepository {
    /// All classifications ordered by id.
    fn get_all_classifications(&self) -> RepoResult<Vec<Classification>>;
    fn get_classification(&self, id: ClassificationId) -> RepoResult<Option<Classification>>;
    fn get_classification_by_name(&self, name: &str) -> RepoResult<Option<Classification>>;
    /// Renames one classification. Existing appointments follow the new name.
    fn rename_classification(&self, id: ClassificationId, name: &str) -> RepoResult<()>;
}

/// SQLite-backed classification registry.
pub struct SqliteClassificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteClassificationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl ClassificationRepository for SqliteClassificationRepository<'_> {
    fn get_all_classifications(&self) -> RepoResult<Vec<Classification>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, name FROM classifications ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut classifications = Vec::new();
        while let Some(row) = rows.next()? {
            classifications.push(parse_classification_row(row)?);
        }
        Ok(classifications)
    }

    fn get_classification(&self, id: ClassificationId) -> RepoResult<Option<Classification>> {
        find_classification_by_id(self.conn, id)
    }

    fn get_classification_by_name(&self, name: &str) -> RepoResult<Option<Classification>> {
        find_classification_by_name(self.conn, name)
    }

    fn rename_classification(&self, id: ClassificationId, name: &str) -> RepoResult<()> {
        let name = normalize_classification_name(name)?;

        let tx = self.conn.unchecked_transaction()?;
        if let Some(existing) = find_classification_by_name(self.conn, &name)? {
            if existing.id == id {
                return Ok(());
            }
            return Err(ClassificationValidationError::DuplicateName(name).into());
        }

        let changed = tx.execute(
            "UPDATE classifications SET name = ?1 WHERE id = ?2;",
            params![name.as_str(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::ClassificationNotFound(id));
        }
        tx.commit()?;

        info!("event=classification_rename module=repo status=ok classification_id={id}");
        Ok(())
    }
}

pub(crate) fn find_classification_by_id(
    conn: &Connection,
    id: ClassificationId,
) -> RepoResult<Option<Classification>> {
    let mut stmt = conn.prepare_cached("SELECT id, name FROM classifications WHERE id = ?1;")?;
    let classification = stmt
        .query_row([id], |row| {
            Ok(Classification::new(row.get("id")?, row.get::<_, String>("name")?))
        })
        .optional()?;
    Ok(classification)
}

pub(crate) fn find_classification_by_name(
    conn: &Connection,
    name: &str,
) -> RepoResult<Option<Classification>> {
    let mut stmt =
        conn.prepare_cached("SELECT id, name FROM classifications WHERE name = ?1;")?;
    let classification = stmt
        .query_row([name], |row| {
            Ok(Classification::new(row.get("id")?, row.get::<_, String>("name")?))
        })
        .optional()?;
    Ok(classification)
}

fn parse_classification_row(row: &Row<'_>) -> RepoResult<Classification> {
    let classification = Classification::new(row.get("id")?, row.get::<_, String>("name")?);
    if classification.name.trim().is_empty() {
        return Err(RepoError::InvalidData(format!(
            "blank classification name for id {}",
            classification.id
        )));
    }
    Ok(classification)
}
