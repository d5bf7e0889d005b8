use std::sync::Arc;

use chrono::NaiveDate;
use log::{error, info};

use crate::day_loader::DayDetailLoader;
use crate::error::StoreError;
use crate::models::{is_valid_hour, DayEntries, HourEntry, MonthKey, MonthSummary, TagList};
use crate::month_cache::MonthSummaryCache;
use crate::store::{EntryStore, UserId};

/// Unsaved edits for the selected hour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingEntry {
    pub tags: TagList,
    pub details: String,
}

impl WorkingEntry {
    fn from_entry(entry: Option<&HourEntry>) -> Self {
        match entry {
            Some(entry) => Self {
                tags: entry.tags.clone(),
                details: entry.details.clone().unwrap_or_default(),
            },
            None => Self::default(),
        }
    }

    fn details_for_store(&self) -> Option<&str> {
        if self.details.trim().is_empty() {
            None
        } else {
            Some(self.details.as_str())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    HourUnselected {
        date: NaiveDate,
    },
    HourSelected {
        date: NaiveDate,
        hour: u8,
        working: WorkingEntry,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveRejection {
    NoHourSelected,
    EmptyTags,
}

#[derive(Debug)]
pub enum SaveOutcome {
    /// Written; the day and its month have been re-read.
    Saved {
        entry: HourEntry,
        day: Option<DayEntries>,
        month: MonthSummary,
    },
    /// Nothing was sent to the store; state is unchanged.
    Rejected(SaveRejection),
    /// The store refused the write; the working entry is kept for a retry.
    Failed(StoreError),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

/// Editor for the 24 hours of one day.
///
/// `Closed` -> `HourUnselected` on `open`, -> `HourSelected` on
/// `select_hour`, back to `HourUnselected` on a successful `save` or
/// `cancel`, and to `Closed` on `close` from anywhere.
pub struct HourEditor {
    store: Arc<dyn EntryStore>,
    user: UserId,
    cache: Arc<MonthSummaryCache>,
    loader: Arc<DayDetailLoader>,
    predefined_tags: Vec<String>,
    state: EditorState,
}

impl HourEditor {
    pub fn new(
        store: Arc<dyn EntryStore>,
        user: UserId,
        cache: Arc<MonthSummaryCache>,
        predefined_tags: Vec<String>,
    ) -> Self {
        Self {
            loader: Arc::new(DayDetailLoader::new(Arc::clone(&store), user)),
            store,
            user,
            cache,
            predefined_tags,
            state: EditorState::Closed,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn predefined_tags(&self) -> &[String] {
        &self.predefined_tags
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match &self.state {
            EditorState::Closed => None,
            EditorState::HourUnselected { date } | EditorState::HourSelected { date, .. } => {
                Some(*date)
            }
        }
    }

    pub fn selected_hour(&self) -> Option<u8> {
        match &self.state {
            EditorState::HourSelected { hour, .. } => Some(*hour),
            _ => None,
        }
    }

    pub fn working(&self) -> Option<&WorkingEntry> {
        match &self.state {
            EditorState::HourSelected { working, .. } => Some(working),
            _ => None,
        }
    }

    fn working_mut(&mut self) -> Option<&mut WorkingEntry> {
        match &mut self.state {
            EditorState::HourSelected { working, .. } => Some(working),
            _ => None,
        }
    }

    /// The loader behind the open day, for callers that fetch a day without
    /// holding the editor.
    pub fn loader(&self) -> &Arc<DayDetailLoader> {
        &self.loader
    }

    /// Entries of the open day as last loaded.
    pub fn day(&self) -> Option<DayEntries> {
        self.date().and_then(|date| self.loader.entries_for(date))
    }

    /// Opens `date`, dropping any unsaved edits, and loads its entries.
    pub async fn open(&mut self, date: NaiveDate) -> DayEntries {
        self.state = EditorState::HourUnselected { date };
        self.loader.load(date).await.unwrap_or_default()
    }

    /// Opens `date` using whatever the loader already holds for it, without
    /// fetching. Drops any unsaved edits.
    pub fn open_loaded(&mut self, date: NaiveDate) -> DayEntries {
        self.state = EditorState::HourUnselected { date };
        self.loader.entries_for(date).unwrap_or_default()
    }

    /// Starts editing `hour`, seeded from its saved entry. Returns false when
    /// no day is open or the hour is out of range.
    pub fn select_hour(&mut self, hour: u8) -> bool {
        let Some(date) = self.date() else {
            return false;
        };
        if !is_valid_hour(hour) {
            return false;
        }

        let day = self.loader.entries_for(date).unwrap_or_default();
        self.state = EditorState::HourSelected {
            date,
            hour,
            working: WorkingEntry::from_entry(day.get(hour)),
        };
        true
    }

    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        match self.working_mut() {
            Some(working) => {
                working.tags.toggle(tag);
                true
            }
            None => false,
        }
    }

    /// Adds a trimmed custom tag; blanks and duplicates are ignored.
    pub fn add_custom_tag(&mut self, raw: &str) -> bool {
        self.working_mut()
            .map(|working| working.tags.add_custom(raw))
            .unwrap_or(false)
    }

    /// Replaces the working tags wholesale, trimming each and dropping blanks
    /// and duplicates.
    pub fn replace_tags<'a, I: IntoIterator<Item = &'a str>>(&mut self, tags: I) -> bool {
        match self.working_mut() {
            Some(working) => {
                working.tags = TagList::new();
                for tag in tags {
                    working.tags.add_custom(tag);
                }
                true
            }
            None => false,
        }
    }

    pub fn set_details(&mut self, details: &str) -> bool {
        match self.working_mut() {
            Some(working) => {
                working.details = details.to_string();
                true
            }
            None => false,
        }
    }

    pub fn can_save(&self) -> bool {
        self.working().map(|w| !w.tags.is_empty()).unwrap_or(false)
    }

    pub async fn save(&mut self) -> SaveOutcome {
        let (date, hour, working) = match &self.state {
            EditorState::HourSelected {
                date,
                hour,
                working,
            } => (*date, *hour, working.clone()),
            _ => return SaveOutcome::Rejected(SaveRejection::NoHourSelected),
        };
        if working.tags.is_empty() {
            return SaveOutcome::Rejected(SaveRejection::EmptyTags);
        }

        let details = working.details_for_store();
        if let Err(err) = self
            .store
            .upsert(self.user, date, hour, &working.tags, details)
            .await
        {
            error!("Failed to save {} {:02}:00: {}", date, hour, err);
            return SaveOutcome::Failed(err);
        }
        info!("Saved {} {:02}:00 with {} tag(s)", date, hour, working.tags.len());

        let month = MonthKey::of(date);
        self.cache.invalidate(month);

        let entry = HourEntry {
            date,
            hour,
            details: details.map(str::to_string),
            tags: working.tags,
        };
        self.state = EditorState::HourUnselected { date };

        let day = self.loader.load(date).await;
        let month = self.cache.ensure(month).await;
        SaveOutcome::Saved { entry, day, month }
    }

    /// Drops unsaved edits and returns to the hour list.
    pub fn cancel(&mut self) {
        if let EditorState::HourSelected { date, .. } = self.state {
            self.state = EditorState::HourUnselected { date };
        }
    }

    pub fn close(&mut self) {
        self.state = EditorState::Closed;
        self.loader.clear();
    }
}
