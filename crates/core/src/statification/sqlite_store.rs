//! SQLite-backed statification store implementation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    CreateStatificationRequest, LifecycleAction, LifecycleEvent, Statification,
    StatificationFilter, StatificationStatus, StatificationStore, StoreConnector, StoreError,
};

const STATIFICATION_COLUMNS: &str =
    "id, content_hash, designation, description, status, item_count, created_at, updated_at";

/// SQLite-backed statification store.
pub struct SqliteStatificationStore {
    conn: Mutex<Connection>,
}

impl SqliteStatificationStore {
    /// Open the database file, creating it and its tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS statifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_hash TEXT NOT NULL DEFAULT '',
                designation TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status INTEGER NOT NULL,
                item_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lifecycle_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                statification_id INTEGER NOT NULL REFERENCES statifications(id),
                content_hash TEXT NOT NULL,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_statifications_hash ON statifications(content_hash);
            CREATE INDEX IF NOT EXISTS idx_statifications_status ON statifications(status);
            CREATE INDEX IF NOT EXISTS idx_events_statification ON lifecycle_events(statification_id);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn timestamp(now: DateTime<Utc>) -> String {
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_statification(row: &rusqlite::Row) -> rusqlite::Result<Statification> {
        let status_ordinal: i64 = row.get(4)?;
        let created_at_str: String = row.get(6)?;
        let updated_at_str: String = row.get(7)?;

        let status = StatificationStatus::from_ordinal(status_ordinal).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Integer,
                format!("invalid status ordinal {}", status_ordinal).into(),
            )
        })?;

        Ok(Statification {
            id: row.get(0)?,
            content_hash: row.get(1)?,
            designation: row.get(2)?,
            description: row.get(3)?,
            status,
            item_count: row.get(5)?,
            created_at: Self::parse_timestamp(&created_at_str),
            updated_at: Self::parse_timestamp(&updated_at_str),
        })
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<LifecycleEvent> {
        let action_str: String = row.get(4)?;
        let created_at_str: String = row.get(5)?;

        let action = LifecycleAction::parse(&action_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("invalid lifecycle action {}", action_str).into(),
            )
        })?;

        Ok(LifecycleEvent {
            id: row.get(0)?,
            statification_id: row.get(1)?,
            content_hash: row.get(2)?,
            actor: row.get(3)?,
            action,
            created_at: Self::parse_timestamp(&created_at_str),
        })
    }
}

impl StatificationStore for SqliteStatificationStore {
    fn create(&self, request: CreateStatificationRequest) -> Result<Statification, StoreError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let status = StatificationStatus::Created;

        conn.execute(
            "INSERT INTO statifications (content_hash, designation, description, status, item_count, created_at, updated_at) VALUES ('', ?, ?, ?, 0, ?, ?)",
            params![
                request.designation,
                request.description,
                status.ordinal(),
                Self::timestamp(now),
                Self::timestamp(now),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Statification {
            id: conn.last_insert_rowid(),
            content_hash: String::new(),
            designation: request.designation,
            description: request.description,
            status,
            item_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_by_hash(&self, content_hash: &str) -> Result<Option<Statification>, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT {} FROM statifications WHERE content_hash = ? ORDER BY id DESC LIMIT 1",
                STATIFICATION_COLUMNS
            ),
            params![content_hash],
            Self::row_to_statification,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn latest(&self, n: i64) -> Result<Vec<Statification>, StoreError> {
        self.list(&StatificationFilter::new().with_limit(n))
    }

    fn list(&self, filter: &StatificationFilter) -> Result<Vec<Statification>, StoreError> {
        let conn = self.conn.lock().unwrap();

        // The order column comes from a closed enum, never from user text.
        let query = format!(
            "SELECT {} FROM statifications ORDER BY {} DESC, id DESC LIMIT ? OFFSET ?",
            STATIFICATION_COLUMNS,
            filter.order.column()
        );

        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![filter.limit, filter.offset],
                Self::row_to_statification,
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut statifications = Vec::new();
        for row in rows {
            statifications.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(statifications)
    }

    fn count(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row("SELECT COUNT(*) FROM statifications", [], |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn switch_status(
        &self,
        from: StatificationStatus,
        to: StatificationStatus,
    ) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "UPDATE statifications SET status = ?, updated_at = ? WHERE status = ?",
            params![to.ordinal(), Self::timestamp(Utc::now()), from.ordinal()],
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn update_hash(&self, old_hash: &str, new_hash: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE statifications SET content_hash = ?, updated_at = ? WHERE content_hash = ?",
                params![new_hash, Self::timestamp(Utc::now()), old_hash],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if rows == 0 {
            return Err(StoreError::NotFound(old_hash.to_string()));
        }
        Ok(())
    }

    fn update_status(
        &self,
        content_hash: &str,
        status: StatificationStatus,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE statifications SET status = ?, updated_at = ? WHERE id = (SELECT MAX(id) FROM statifications WHERE content_hash = ?)",
                params![status.ordinal(), Self::timestamp(Utc::now()), content_hash],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if rows == 0 {
            return Err(StoreError::NotFound(content_hash.to_string()));
        }
        Ok(())
    }

    fn complete_crawl(&self, id: i64, item_count: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE statifications SET status = ?, item_count = ?, updated_at = ? WHERE id = ? AND status = ?",
                params![
                    StatificationStatus::Statified.ordinal(),
                    item_count,
                    Self::timestamp(Utc::now()),
                    id,
                    StatificationStatus::Created.ordinal(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows > 0)
    }

    fn append_event(
        &self,
        statification_id: i64,
        actor: &str,
        action: LifecycleAction,
    ) -> Result<LifecycleEvent, StoreError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let content_hash: String = conn
            .query_row(
                "SELECT content_hash FROM statifications WHERE id = ?",
                params![statification_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?
            .ok_or_else(|| StoreError::NotFound(format!("id {}", statification_id)))?;

        conn.execute(
            "INSERT INTO lifecycle_events (statification_id, content_hash, actor, action, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                statification_id,
                content_hash,
                actor,
                action.as_str(),
                Self::timestamp(now),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(LifecycleEvent {
            id: conn.last_insert_rowid(),
            statification_id,
            content_hash,
            actor: actor.to_string(),
            action,
            created_at: now,
        })
    }

    fn events_for(&self, statification_id: i64) -> Result<Vec<LifecycleEvent>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, statification_id, content_hash, actor, action, created_at FROM lifecycle_events WHERE statification_id = ? ORDER BY id ASC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![statification_id], Self::row_to_event)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(events)
    }
}

/// Opens a fresh SQLite connection to a database file per call.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreConnector for SqliteConnector {
    fn connect(&self) -> Result<Box<dyn StatificationStore>, StoreError> {
        Ok(Box::new(SqliteStatificationStore::new(&self.path)?))
    }
}
