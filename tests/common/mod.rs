#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Notify, Semaphore};

use hour_tracker::models::{HourEntry, HourSlot, TagList};
use hour_tracker::store::{EntryStore, MemoryEntryStore, UserId};
use hour_tracker::StoreError;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Holds one query open until released.
pub struct Gate {
    entered: Notify,
    release: Semaphore,
}

impl Gate {
    fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    /// Resolves once the gated query is waiting.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.add_permits(1);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        let _ = self.release.acquire().await;
    }
}

/// `MemoryEntryStore` with call counters, failure switches and gates.
/// Gates are keyed by the queried date (the range start for range queries)
/// and apply to the next query only.
#[derive(Default)]
pub struct ScriptedStore {
    inner: MemoryEntryStore,
    pub range_calls: AtomicUsize,
    pub exact_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    range_gates: Mutex<HashMap<NaiveDate, Arc<Gate>>>,
    exact_gates: Mutex<HashMap<NaiveDate, Arc<Gate>>>,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn hold_range(&self, from: NaiveDate) -> Arc<Gate> {
        let gate = Arc::new(Gate::new());
        self.range_gates.lock().unwrap().insert(from, Arc::clone(&gate));
        gate
    }

    pub fn hold_exact(&self, date: NaiveDate) -> Arc<Gate> {
        let gate = Arc::new(Gate::new());
        self.exact_gates.lock().unwrap().insert(date, Arc::clone(&gate));
        gate
    }

    pub fn range_calls(&self) -> usize {
        self.range_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    fn read_failure(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("reads disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EntryStore for ScriptedStore {
    async fn query_range(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HourSlot>, StoreError> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.range_gates.lock().unwrap().remove(&from);
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.read_failure()?;
        self.inner.query_range(user, from, to).await
    }

    async fn query_exact(
        &self,
        user: UserId,
        date: NaiveDate,
    ) -> Result<Vec<HourEntry>, StoreError> {
        self.exact_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.exact_gates.lock().unwrap().remove(&date);
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.read_failure()?;
        self.inner.query_exact(user, date).await
    }

    async fn upsert(
        &self,
        user: UserId,
        date: NaiveDate,
        hour: u8,
        tags: &TagList,
        details: Option<&str>,
    ) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.inner.upsert(user, date, hour, tags, details).await
    }
}
