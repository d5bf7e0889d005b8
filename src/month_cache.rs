use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, warn};
use tokio::sync::OnceCell;

use crate::error::StoreError;
use crate::generation::Generation;
use crate::models::{MonthKey, MonthSummary};
use crate::store::{EntryStore, UserId};

type Slot = Arc<OnceCell<MonthSummary>>;

/// Per-month hour counts for one user, backing the calendar heatmap.
///
/// Each month owns a once-initialised slot; concurrent `ensure` calls for the
/// same month await the same fetch instead of issuing another range query.
/// `invalidate` detaches the slot, so a fetch still in flight completes into
/// a slot nobody will read again. Entries are never evicted otherwise.
pub struct MonthSummaryCache {
    store: Arc<dyn EntryStore>,
    user: UserId,
    slots: Mutex<HashMap<MonthKey, Slot>>,
}

impl MonthSummaryCache {
    pub fn new(store: Arc<dyn EntryStore>, user: UserId) -> Self {
        Self {
            store,
            user,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<MonthKey, Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Cached summary, if any. Never fetches.
    pub fn get(&self, key: MonthKey) -> Option<MonthSummary> {
        self.slots().get(&key).and_then(|slot| slot.get().cloned())
    }

    /// Cached summary, or a freshly aggregated one. A failed fetch yields an
    /// empty summary and caches nothing.
    pub async fn ensure(&self, key: MonthKey) -> MonthSummary {
        let slot = Arc::clone(self.slots().entry(key).or_default());

        if let Some(summary) = slot.get() {
            debug!("Month {} served from cache", key);
            return summary.clone();
        }

        match slot.get_or_try_init(|| self.fetch(key)).await {
            Ok(summary) => summary.clone(),
            Err(err) => {
                warn!("Failed to load month {}: {}", key, err);
                MonthSummary::empty()
            }
        }
    }

    /// Drops the month so the next `ensure` recomputes it.
    pub fn invalidate(&self, key: MonthKey) {
        if self.slots().remove(&key).is_some() {
            debug!("Invalidated month {}", key);
        }
    }

    /// Number of months holding a summary.
    pub fn cached_months(&self) -> usize {
        self.slots().values().filter(|slot| slot.initialized()).count()
    }

    async fn fetch(&self, key: MonthKey) -> Result<MonthSummary, StoreError> {
        debug!("Fetching month {} for {}", key, self.user);
        let slots = self
            .store
            .query_range(self.user, key.first_day(), key.last_day())
            .await?;
        Ok(MonthSummary::from_slots(slots))
    }
}

#[derive(Debug, Clone)]
struct NavState {
    current: MonthKey,
    displayed: Option<(MonthKey, MonthSummary)>,
}

/// The month the calendar is showing. Only the most recent navigation may
/// publish a summary; results of superseded navigations are dropped.
pub struct MonthNavigator {
    cache: Arc<MonthSummaryCache>,
    generation: Generation,
    state: Mutex<NavState>,
}

impl MonthNavigator {
    pub fn new(cache: Arc<MonthSummaryCache>, start: MonthKey) -> Self {
        Self {
            cache,
            generation: Generation::new(),
            state: Mutex::new(NavState {
                current: start,
                displayed: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, NavState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn current(&self) -> MonthKey {
        self.state().current
    }

    /// Last summary published, with the month it belongs to.
    pub fn displayed(&self) -> Option<(MonthKey, MonthSummary)> {
        self.state().displayed.clone()
    }

    /// Navigates to `key`. Returns `None` when a later navigation started
    /// before this one resolved.
    pub async fn show(&self, key: MonthKey) -> Option<MonthSummary> {
        let ticket = self.generation.advance();
        self.state().current = key;

        let summary = self.cache.ensure(key).await;

        if !self.generation.is_current(ticket) {
            debug!("Discarding stale summary for {}", key);
            return None;
        }
        self.state().displayed = Some((key, summary.clone()));
        Some(summary)
    }

    /// Moves `delta` months from the current month.
    pub async fn shift(&self, delta: i32) -> Option<MonthSummary> {
        let target = self.current().shift(delta)?;
        self.show(target).await
    }

    /// Re-reads the current month through the cache.
    pub async fn refresh(&self) -> Option<MonthSummary> {
        self.show(self.current()).await
    }
}
