use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use log::info;
use rusqlite::{params, Connection};

use crate::error::StoreError;
use crate::models::{HourEntry, HourSlot, TagList};
use crate::store::{EntryStore, UserId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS hour_entries (
    user_id TEXT NOT NULL,
    date    TEXT NOT NULL,
    hour    INTEGER NOT NULL CHECK (hour BETWEEN 0 AND 23),
    tags    TEXT NOT NULL,
    details TEXT,
    PRIMARY KEY (user_id, date, hour)
);
";

/// `EntryStore` over a single SQLite connection. Calls run on tokio's
/// blocking pool.
#[derive(Clone)]
pub struct SqliteEntryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntryStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!("Opened entry store at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, task: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = match conn.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            task(&guard)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn query_range(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HourSlot>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT date, hour FROM hour_entries
                 WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date, hour",
            )?;
            let rows = stmt.query_map(params![user.to_string(), from, to], |row| {
                Ok(HourSlot {
                    date: row.get(0)?,
                    hour: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn query_exact(
        &self,
        user: UserId,
        date: NaiveDate,
    ) -> Result<Vec<HourEntry>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT date, hour, tags, details FROM hour_entries
                 WHERE user_id = ?1 AND date = ?2
                 ORDER BY hour",
            )?;
            let rows = stmt.query_map(params![user.to_string(), date], |row| {
                Ok((
                    row.get::<_, NaiveDate>(0)?,
                    row.get::<_, u8>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;

            let mut entries = Vec::new();
            for row in rows {
                let (date, hour, tags_json, details) = row?;
                entries.push(HourEntry {
                    date,
                    hour,
                    tags: serde_json::from_str::<TagList>(&tags_json)?,
                    details,
                });
            }
            Ok(entries)
        })
        .await
    }

    async fn upsert(
        &self,
        user: UserId,
        date: NaiveDate,
        hour: u8,
        tags: &TagList,
        details: Option<&str>,
    ) -> Result<(), StoreError> {
        if tags.is_empty() {
            return Err(StoreError::EmptyTags { date, hour });
        }
        let tags_json = serde_json::to_string(tags)?;
        let details = details.map(str::to_string);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO hour_entries (user_id, date, hour, tags, details)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id, date, hour) DO UPDATE SET
                    tags = excluded.tags,
                    details = excluded.details",
                params![user.to_string(), date, hour, tags_json, details],
            )?;
            Ok(())
        })
        .await
    }
}
