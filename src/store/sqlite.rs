//! `SQLite` store.
//!
//! The `(experiment_id, user_id)` uniqueness and the variant foreign key are
//! enforced by the schema; variant-set replacement runs in one transaction.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::AssignmentStore;
use crate::experiment::{normalize_key, Assignment, Variant, VariantDraft};
use crate::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS variants (
    id            TEXT PRIMARY KEY,
    experiment_id TEXT NOT NULL,
    key           TEXT NOT NULL,
    weight        INTEGER NOT NULL CHECK (weight BETWEEN 0 AND 100),
    created_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_variants_experiment ON variants (experiment_id);

CREATE TABLE IF NOT EXISTS assignments (
    id            TEXT PRIMARY KEY,
    experiment_id TEXT NOT NULL,
    user_id       TEXT NOT NULL,
    variant_id    TEXT NOT NULL REFERENCES variants (id) ON DELETE RESTRICT,
    created_at    TEXT NOT NULL,
    UNIQUE (experiment_id, user_id)
);
CREATE INDEX IF NOT EXISTS idx_assignments_created ON assignments (experiment_id, created_at);
";

const ASSIGNMENT_COLUMNS: &str =
    "a.id, a.experiment_id, a.user_id, a.variant_id, v.key, a.created_at";

fn to_persistence(op: &str) -> impl Fn(rusqlite::Error) -> Error + '_ {
    move |e| Error::persistence(format!("{op}: {e}"))
}

fn timestamp(at: DateTime<Utc>) -> String {
    // Fixed precision keeps lexicographic order equal to time order.
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::persistence(format!("bad timestamp {raw:?}: {e}")))
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn is_foreign_key_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

type AssignmentRow = (String, String, String, String, String, String);

fn read_assignment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_assignment(row: AssignmentRow) -> Result<Assignment> {
    let (id, experiment_id, user_id, variant_id, variant_key, created_at) = row;
    Ok(Assignment::from_parts(
        id,
        experiment_id,
        user_id,
        variant_id,
        variant_key,
        parse_timestamp(&created_at)?,
    ))
}

fn load_variants(conn: &Connection, experiment_id: &str) -> Result<Vec<Variant>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, key, weight, created_at FROM variants
             WHERE experiment_id = ?1 ORDER BY rowid ASC",
        )
        .map_err(to_persistence("prepare variants"))?;

    let rows = stmt
        .query_map(params![experiment_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(to_persistence("query variants"))?;

    let mut variants = Vec::new();
    for row in rows {
        let (id, key, weight, created_at) = row.map_err(to_persistence("read variant"))?;
        variants.push(
            Variant::builder(experiment_id, &key, weight)
                .id(id)
                .created_at(parse_timestamp(&created_at)?)
                .build(),
        );
    }
    Ok(variants)
}

/// Durable store backed by a single `SQLite` connection.
///
/// `SQLite` allows one writer at a time, so the connection sits behind a
/// mutex; statements are short and never held across an await.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file cannot be opened or the
    /// schema cannot be applied.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(to_persistence("open sqlite"))?;
        Self::initialize(conn)
    }

    /// Open a private in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(to_persistence("open sqlite"))?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(to_persistence("enable foreign keys"))?;
        conn.execute_batch(SCHEMA)
            .map_err(to_persistence("apply schema"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::persistence("sqlite connection mutex poisoned"))
    }

    fn query_assignment(
        conn: &Connection,
        experiment_id: &str,
        user_id: &str,
    ) -> Result<Option<Assignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a
             JOIN variants v ON v.id = a.variant_id
             WHERE a.experiment_id = ?1 AND a.user_id = ?2
             LIMIT 1"
        );
        conn.query_row(&sql, params![experiment_id, user_id], read_assignment_row)
            .optional()
            .map_err(to_persistence("query assignment"))?
            .map(into_assignment)
            .transpose()
    }
}

impl AssignmentStore for SqliteStore {
    async fn find_assignment(&self, experiment_id: &str, user_id: &str) -> Result<Option<Assignment>> {
        let conn = self.lock()?;
        Self::query_assignment(&conn, experiment_id, user_id)
    }

    async fn create_assignment(
        &self,
        experiment_id: &str,
        user_id: &str,
        variant_id: &str,
    ) -> Result<Assignment> {
        let conn = self.lock()?;

        let key: Option<String> = conn
            .query_row(
                "SELECT key FROM variants WHERE id = ?1 AND experiment_id = ?2",
                params![variant_id, experiment_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(to_persistence("lookup variant"))?;
        let key = key.ok_or_else(|| {
            Error::persistence(format!(
                "variant {variant_id} not found in experiment {experiment_id}"
            ))
        })?;

        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let inserted = conn.execute(
            "INSERT INTO assignments (id, experiment_id, user_id, variant_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, experiment_id, user_id, variant_id, timestamp(created_at)],
        );

        match inserted {
            Ok(_) => Ok(Assignment::from_parts(
                id,
                experiment_id.to_string(),
                user_id.to_string(),
                variant_id.to_string(),
                key,
                created_at,
            )),
            Err(e) if is_unique_violation(&e) => Err(Error::Conflict {
                experiment_id: experiment_id.to_string(),
                user_id: user_id.to_string(),
            }),
            Err(e) => Err(to_persistence("insert assignment")(e)),
        }
    }

    async fn list_assignments(&self, experiment_id: &str) -> Result<Vec<Assignment>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a
             JOIN variants v ON v.id = a.variant_id
             WHERE a.experiment_id = ?1
             ORDER BY a.created_at DESC, a.rowid DESC"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(to_persistence("prepare assignments"))?;
        let rows = stmt
            .query_map(params![experiment_id], read_assignment_row)
            .map_err(to_persistence("query assignments"))?;

        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(into_assignment(
                row.map_err(to_persistence("read assignment"))?,
            )?);
        }
        Ok(assignments)
    }

    async fn find_variants(&self, experiment_id: &str) -> Result<Vec<Variant>> {
        let conn = self.lock()?;
        load_variants(&conn, experiment_id)
    }

    async fn replace_variant_set(
        &self,
        experiment_id: &str,
        desired: Vec<VariantDraft>,
    ) -> Result<Vec<Variant>> {
        let mut conn = self.lock()?;
        // Dropping the transaction without commit rolls it back.
        let tx = conn
            .transaction()
            .map_err(to_persistence("begin variant save"))?;

        let existing: HashSet<String> = load_variants(&tx, experiment_id)?
            .into_iter()
            .map(|v| v.id().to_string())
            .collect();

        let mut incoming = HashSet::new();
        for id in desired.iter().filter_map(|draft| draft.id.as_deref()) {
            if !existing.contains(id) {
                return Err(Error::validation(format!(
                    "variant {id} does not belong to experiment {experiment_id}"
                )));
            }
            if !incoming.insert(id) {
                return Err(Error::validation(format!("variant {id} listed twice")));
            }
        }

        for id in existing.iter().filter(|id| !incoming.contains(id.as_str())) {
            tx.execute("DELETE FROM variants WHERE id = ?1", params![id])
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        Error::persistence(format!(
                            "variant {id} is still referenced by assignments"
                        ))
                    } else {
                        to_persistence("delete variant")(e)
                    }
                })?;
        }

        for draft in &desired {
            match draft.id.as_deref() {
                Some(id) => {
                    tx.execute(
                        "UPDATE variants SET key = ?1, weight = ?2 WHERE id = ?3",
                        params![normalize_key(&draft.key), draft.weight, id],
                    )
                    .map_err(to_persistence("update variant"))?;
                }
                None => {
                    let fresh = Variant::new(experiment_id, &draft.key, draft.weight);
                    tx.execute(
                        "INSERT INTO variants (id, experiment_id, key, weight, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            fresh.id(),
                            experiment_id,
                            fresh.key(),
                            fresh.weight(),
                            timestamp(fresh.created_at())
                        ],
                    )
                    .map_err(to_persistence("insert variant"))?;
                }
            }
        }

        let saved = load_variants(&tx, experiment_id)?;
        tx.commit().map_err(to_persistence("commit variant save"))?;

        debug!(
            experiment_id,
            variants = saved.len(),
            deleted = existing.len() - incoming.len(),
            "replaced variant set"
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_schema_applies_twice() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
    }

    #[test]
    fn test_timestamp_round_trip_keeps_nanos() {
        let now = Utc::now();
        assert_eq!(parse_timestamp(&timestamp(now)).unwrap(), now);
    }

    #[tokio::test]
    async fn test_sqlite_unique_violation_maps_to_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        let saved = store
            .replace_variant_set(
                "exp",
                vec![VariantDraft::new("A", 50), VariantDraft::new("B", 50)],
            )
            .await
            .unwrap();

        store
            .create_assignment("exp", "user", saved[0].id())
            .await
            .unwrap();
        let err = store
            .create_assignment("exp", "user", saved[1].id())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
