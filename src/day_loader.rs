use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use log::{debug, warn};

use crate::generation::Generation;
use crate::models::DayEntries;
use crate::store::{EntryStore, UserId};

/// Holds the entries of the one selected day.
pub struct DayDetailLoader {
    store: Arc<dyn EntryStore>,
    user: UserId,
    generation: Generation,
    loaded: Mutex<Option<(NaiveDate, DayEntries)>>,
}

impl DayDetailLoader {
    pub fn new(store: Arc<dyn EntryStore>, user: UserId) -> Self {
        Self {
            store,
            user,
            generation: Generation::new(),
            loaded: Mutex::new(None),
        }
    }

    fn loaded(&self) -> MutexGuard<'_, Option<(NaiveDate, DayEntries)>> {
        match self.loaded.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fetches `date` and replaces the held day with it. Query failures load
    /// as an empty day.
    ///
    /// Returns `None` if another `load` (or `clear`) started while this one
    /// was in flight; its result is discarded.
    pub async fn load(&self, date: NaiveDate) -> Option<DayEntries> {
        let ticket = self.generation.advance();

        let entries = match self.store.query_exact(self.user, date).await {
            Ok(rows) => DayEntries::from_entries(rows),
            Err(err) => {
                warn!("Failed to load entries for {}: {}", date, err);
                DayEntries::empty()
            }
        };

        if !self.generation.is_current(ticket) {
            debug!("Discarding superseded load of {}", date);
            return None;
        }
        *self.loaded() = Some((date, entries.clone()));
        Some(entries)
    }

    /// The held day, if it is `date`.
    pub fn entries_for(&self, date: NaiveDate) -> Option<DayEntries> {
        match &*self.loaded() {
            Some((held, entries)) if *held == date => Some(entries.clone()),
            _ => None,
        }
    }

    pub fn loaded_date(&self) -> Option<NaiveDate> {
        self.loaded().as_ref().map(|(date, _)| *date)
    }

    /// Drops the held day and any load still in flight.
    pub fn clear(&self) {
        self.generation.advance();
        *self.loaded() = None;
    }
}
