use std::sync::Arc;

use chrono::{Local, NaiveDate};
use log::info;
use tokio::sync::{Mutex, MutexGuard};

use crate::calendar::{self, CalendarGrid};
use crate::day_loader::DayDetailLoader;
use crate::editor::{HourEditor, SaveOutcome, SaveRejection};
use crate::error::SessionError;
use crate::models::{DayEntries, MonthKey};
use crate::month_cache::{MonthNavigator, MonthSummaryCache};
use crate::store::{EntryStore, Identity, UserId};

/// Everything one signed-in user works with: the month cache, the calendar
/// position and the hour editor. The cache lives and dies with the session.
pub struct Session {
    user: UserId,
    cache: Arc<MonthSummaryCache>,
    navigator: MonthNavigator,
    loader: Arc<DayDetailLoader>,
    editor: Mutex<HourEditor>,
}

impl Session {
    pub async fn start(
        identity: &dyn Identity,
        store: Arc<dyn EntryStore>,
        predefined_tags: Vec<String>,
        start_month: MonthKey,
    ) -> Result<Self, SessionError> {
        let user = identity
            .current_user()
            .await
            .ok_or(SessionError::NotAuthenticated)?;
        info!("Starting session for {}", user);

        let cache = Arc::new(MonthSummaryCache::new(Arc::clone(&store), user));
        let editor = HourEditor::new(store, user, Arc::clone(&cache), predefined_tags);
        Ok(Self {
            user,
            navigator: MonthNavigator::new(Arc::clone(&cache), start_month),
            loader: Arc::clone(editor.loader()),
            editor: Mutex::new(editor),
            cache,
        })
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn cache(&self) -> &Arc<MonthSummaryCache> {
        &self.cache
    }

    pub fn navigator(&self) -> &MonthNavigator {
        &self.navigator
    }

    pub async fn editor(&self) -> MutexGuard<'_, HourEditor> {
        self.editor.lock().await
    }

    /// Navigates to `month` and lays it out. `None` if a newer navigation
    /// overtook this one.
    pub async fn show_month(&self, month: MonthKey) -> Option<CalendarGrid> {
        let summary = self.navigator.show(month).await?;
        Some(calendar::present(month, &summary, today()))
    }

    pub async fn change_month(&self, delta: i32) -> Option<CalendarGrid> {
        let target = self.navigator.current().shift(delta)?;
        self.show_month(target).await
    }

    /// The calendar as last published.
    pub fn calendar(&self) -> Option<CalendarGrid> {
        self.navigator
            .displayed()
            .map(|(month, summary)| calendar::present(month, &summary, today()))
    }

    /// Loads `date` and opens it in the editor. The fetch runs without the
    /// editor lock, so a later selection overtakes this one; the overtaken
    /// selection returns `None` and leaves the editor alone.
    pub async fn select_date(&self, date: NaiveDate) -> Option<DayEntries> {
        let day = self.loader.load(date).await?;
        self.editor.lock().await.open_loaded(date);
        Some(day)
    }

    pub async fn close_day(&self) {
        self.editor.lock().await.close();
    }

    /// Saves the editor's working hour and, when it belongs to the month on
    /// screen, republishes that month.
    pub async fn save(&self) -> SaveOutcome {
        let outcome = self.editor.lock().await.save().await;
        self.after_save(&outcome).await;
        outcome
    }

    /// Opens `date` if needed, replaces `hour` with `tags` and `details`, and
    /// saves.
    pub async fn save_hour(
        &self,
        date: NaiveDate,
        hour: u8,
        tags: &[String],
        details: Option<&str>,
    ) -> SaveOutcome {
        let outcome = {
            let mut editor = self.editor.lock().await;
            if editor.date() != Some(date) {
                editor.open(date).await;
            }
            if !editor.select_hour(hour) {
                return SaveOutcome::Rejected(SaveRejection::NoHourSelected);
            }
            editor.replace_tags(tags.iter().map(String::as_str));
            editor.set_details(details.unwrap_or_default());
            editor.save().await
        };
        self.after_save(&outcome).await;
        outcome
    }

    async fn after_save(&self, outcome: &SaveOutcome) {
        if let SaveOutcome::Saved { entry, .. } = outcome {
            if self.navigator.current().contains(entry.date) {
                self.navigator.refresh().await;
            }
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
