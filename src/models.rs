use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

pub const HOURS_PER_DAY: u8 = 24;

pub fn is_valid_hour(hour: u8) -> bool {
    hour < HOURS_PER_DAY
}

/// `09:00 - 10:00`; the last slot ends at `00:00`.
pub fn slot_label(hour: u8) -> String {
    format!("{:02}:00 - {:02}:00", hour, (hour + 1) % HOURS_PER_DAY)
}

/// Activity tags for one hour.
/// Ordered for display, unique for membership. Comparison is case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagList(Vec<String>);

impl TagList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Removes the tag if present, appends it otherwise.
    pub fn toggle(&mut self, tag: &str) {
        if self.contains(tag) {
            self.0.retain(|t| t != tag);
        } else {
            self.0.push(tag.to_string());
        }
    }

    /// Appends a trimmed custom tag. Returns false (and changes nothing) when
    /// the trimmed text is empty or already present.
    pub fn add_custom(&mut self, raw: &str) -> bool {
        let tag = raw.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    /// Short label used in the hour list.
    pub fn summary_label(&self) -> Option<String> {
        match self.0.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            [first, second] => Some(format!("{}, {}", first, second)),
            [first, ..] => Some(format!("{} +...", first)),
        }
    }
}

impl From<Vec<String>> for TagList {
    fn from(tags: Vec<String>) -> Self {
        let mut list = TagList::new();
        for tag in tags {
            if !list.contains(&tag) {
                list.0.push(tag);
            }
        }
        list
    }
}

impl From<TagList> for Vec<String> {
    fn from(tags: TagList) -> Self {
        tags.0
    }
}

impl<'a> FromIterator<&'a str> for TagList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        TagList::from(iter.into_iter().map(str::to_string).collect::<Vec<_>>())
    }
}

/// One hour of one day. Identity is (user, date, hour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourEntry {
    pub date: NaiveDate,
    pub hour: u8,
    pub tags: TagList,
    pub details: Option<String>,
}

impl HourEntry {
    pub fn is_filled(&self) -> bool {
        !self.tags.is_empty()
    }
}

/// The (date, hour) projection returned by range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourSlot {
    pub date: NaiveDate,
    pub hour: u8,
}

/// A calendar month, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    first: NaiveDate,
}

impl MonthKey {
    /// `month` is 1-based.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self { first })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            first: date - chrono::Days::new(u64::from(date.day0())),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn days_in_month(&self) -> u32 {
        match self.month() {
            4 | 6 | 9 | 11 => 30,
            2 if NaiveDate::from_ymd_opt(self.year(), 2, 29).is_some() => 29,
            2 => 28,
            _ => 31,
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first + chrono::Days::new(u64::from(self.days_in_month() - 1))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        MonthKey::of(date) == *self
    }

    /// Moves `delta` months forward (or back), rolling the year over.
    pub fn shift(&self, delta: i32) -> Option<Self> {
        let months = Months::new(delta.unsigned_abs());
        let first = if delta >= 0 {
            self.first.checked_add_months(months)?
        } else {
            self.first.checked_sub_months(months)?
        };
        Some(Self { first })
    }

    /// e.g. `March 2024`.
    pub fn title(&self) -> String {
        self.first.format("%B %Y").to_string()
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year(), self.month())
    }
}

/// Per-date count of hours that carry at least one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MonthSummary {
    counts: BTreeMap<NaiveDate, u32>,
}

impl MonthSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Counts distinct hours per date; duplicate slots count once.
    pub fn from_slots<I: IntoIterator<Item = HourSlot>>(slots: I) -> Self {
        let mut hours: BTreeMap<NaiveDate, BTreeSet<u8>> = BTreeMap::new();
        for slot in slots {
            hours.entry(slot.date).or_default().insert(slot.hour);
        }

        Self {
            counts: hours
                .into_iter()
                .map(|(date, set)| (date, set.len() as u32))
                .collect(),
        }
    }

    pub fn count_for(&self, date: NaiveDate) -> u32 {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.counts.iter().map(|(date, count)| (*date, *count))
    }
}

/// The entries of one day keyed by hour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DayEntries {
    by_hour: BTreeMap<u8, HourEntry>,
}

impl DayEntries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A later row for the same hour replaces an earlier one.
    pub fn from_entries<I: IntoIterator<Item = HourEntry>>(entries: I) -> Self {
        Self {
            by_hour: entries.into_iter().map(|e| (e.hour, e)).collect(),
        }
    }

    pub fn get(&self, hour: u8) -> Option<&HourEntry> {
        self.by_hour.get(&hour)
    }

    pub fn is_filled(&self, hour: u8) -> bool {
        self.get(hour).map(HourEntry::is_filled).unwrap_or(false)
    }

    pub fn filled_hours(&self) -> usize {
        self.by_hour.values().filter(|e| e.is_filled()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hour.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_hour.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HourEntry> {
        self.by_hour.values()
    }
}

/// One row of the editor's hour list.
#[derive(Debug, Clone, Serialize)]
pub struct HourSlotView {
    pub hour: u8,
    pub label: String,
    pub filled: bool,
    pub tag_summary: Option<String>,
    pub tags: Vec<String>,
    pub details: Option<String>,
}

impl DayEntries {
    /// All 24 slots, filled or not.
    pub fn slot_views(&self) -> Vec<HourSlotView> {
        (0..HOURS_PER_DAY)
            .map(|hour| {
                let entry = self.get(hour);
                HourSlotView {
                    hour,
                    label: slot_label(hour),
                    filled: self.is_filled(hour),
                    tag_summary: entry.and_then(|e| e.tags.summary_label()),
                    tags: entry.map(|e| e.tags.as_slice().to_vec()).unwrap_or_default(),
                    details: entry.and_then(|e| e.details.clone()),
                }
            })
            .collect()
    }
}

/// Body of `PUT /days/:date/hours/:hour`
#[derive(Debug, Deserialize)]
pub struct SaveHourInput {
    pub tags: Vec<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// API Response
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}
