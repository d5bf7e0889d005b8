use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{MonthKey, MonthSummary, HOURS_PER_DAY};

pub const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Heatmap bucket for a day's tracked hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Progress {
    Empty,
    Low,
    Medium,
    High,
}

impl Progress {
    pub const ALL: [Progress; 4] = [
        Progress::Empty,
        Progress::Low,
        Progress::Medium,
        Progress::High,
    ];

    pub fn from_hours(hours: u32) -> Self {
        match hours {
            0 => Progress::Empty,
            1..=7 => Progress::Low,
            8..=15 => Progress::Medium,
            _ => Progress::High,
        }
    }

    pub fn legend(&self) -> &'static str {
        match self {
            Progress::Empty => "No entries",
            Progress::Low => "1-7 hours",
            Progress::Medium => "8-15 hours",
            Progress::High => "16-24 hours",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub day: u32,
    pub hours: u32,
    pub progress: Progress,
    pub is_today: bool,
    /// `"5/24"`, absent for untracked days.
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CalendarCell {
    Blank,
    Day(DayCell),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarGrid {
    pub year: i32,
    pub month: u32,
    pub title: String,
    pub weekdays: [&'static str; 7],
    pub cells: Vec<CalendarCell>,
}

impl CalendarGrid {
    pub fn days(&self) -> impl Iterator<Item = &DayCell> {
        self.cells.iter().filter_map(|cell| match cell {
            CalendarCell::Day(day) => Some(day),
            CalendarCell::Blank => None,
        })
    }

    pub fn leading_blanks(&self) -> usize {
        self.cells
            .iter()
            .take_while(|cell| matches!(cell, CalendarCell::Blank))
            .count()
    }
}

/// Lays out `month` as a Sunday-first grid: blanks up to the weekday of the
/// 1st, then one cell per day classified by its tracked hours. `today` is
/// only marked when it falls inside `month`.
pub fn present(month: MonthKey, summary: &MonthSummary, today: NaiveDate) -> CalendarGrid {
    let first = month.first_day();
    let blanks = first.weekday().num_days_from_sunday() as usize;

    let mut cells = Vec::with_capacity(blanks + month.days_in_month() as usize);
    cells.extend(std::iter::repeat(CalendarCell::Blank).take(blanks));

    for date in first.iter_days().take(month.days_in_month() as usize) {
        let hours = summary.count_for(date);
        cells.push(CalendarCell::Day(DayCell {
            date,
            day: date.day(),
            hours,
            progress: Progress::from_hours(hours),
            is_today: date == today,
            label: (hours > 0).then(|| format!("{}/{}", hours, HOURS_PER_DAY)),
        }));
    }

    CalendarGrid {
        year: month.year(),
        month: month.month(),
        title: month.title(),
        weekdays: WEEKDAYS,
        cells,
    }
}
