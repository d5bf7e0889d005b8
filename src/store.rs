use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{HourEntry, HourSlot, TagList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row storage for hour entries. Rows are unique on (user, date, hour).
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Every filled slot with `from <= date <= to`.
    async fn query_range(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HourSlot>, StoreError>;

    /// Full rows for a single date.
    async fn query_exact(&self, user: UserId, date: NaiveDate)
        -> Result<Vec<HourEntry>, StoreError>;

    /// Inserts or replaces the row keyed by (user, date, hour). An empty
    /// `tags` is refused with `StoreError::EmptyTags`, so every stored row is
    /// a filled slot.
    async fn upsert(
        &self,
        user: UserId,
        date: NaiveDate,
        hour: u8,
        tags: &TagList,
        details: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// Source of the signed-in user.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn current_user(&self) -> Option<UserId>;
}

/// Fixed identity, e.g. resolved from a request header.
#[derive(Debug, Clone, Copy)]
pub struct StaticIdentity(pub Option<UserId>);

#[async_trait]
impl Identity for StaticIdentity {
    async fn current_user(&self) -> Option<UserId> {
        self.0
    }
}

type RowKey = (UserId, NaiveDate, u8);

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntryStore {
    rows: Arc<Mutex<BTreeMap<RowKey, HourEntry>>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<RowKey, HourEntry>> {
        match self.rows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn query_range(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HourSlot>, StoreError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .rows()
            .range((user, from, 0)..=(user, to, u8::MAX))
            .map(|(_, entry)| HourSlot {
                date: entry.date,
                hour: entry.hour,
            })
            .collect())
    }

    async fn query_exact(
        &self,
        user: UserId,
        date: NaiveDate,
    ) -> Result<Vec<HourEntry>, StoreError> {
        Ok(self
            .rows()
            .range((user, date, 0)..=(user, date, u8::MAX))
            .map(|(_, entry)| entry.clone())
            .collect())
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
        let entry = HourEntry {
            date,
            hour,
            tags: tags.clone(),
            details: details.map(str::to_string),
        };
        self.rows().insert((user, date, hour), entry);
        Ok(())
    }
}
