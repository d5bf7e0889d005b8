mod common;

use std::sync::Arc;

use common::{date, ScriptedStore};
use hour_tracker::editor::{EditorState, HourEditor, SaveOutcome, SaveRejection};
use hour_tracker::models::{MonthKey, TagList};
use hour_tracker::month_cache::MonthSummaryCache;
use hour_tracker::session::Session;
use hour_tracker::store::{EntryStore, StaticIdentity, UserId};
use hour_tracker::StoreError;

struct Fixture {
    store: Arc<ScriptedStore>,
    cache: Arc<MonthSummaryCache>,
    editor: HourEditor,
}

fn fixture() -> Fixture {
    let store = ScriptedStore::new();
    let user = UserId::new();
    let dyn_store: Arc<dyn EntryStore> = store.clone();
    let cache = Arc::new(MonthSummaryCache::new(Arc::clone(&dyn_store), user));
    let editor = HourEditor::new(dyn_store, user, Arc::clone(&cache), Vec::new());
    Fixture {
        store,
        cache,
        editor,
    }
}

#[tokio::test]
async fn test_saved_hour_counts_toward_its_month() {
    let Fixture {
        cache, mut editor, ..
    } = fixture();
    let march = MonthKey::new(2024, 3).unwrap();
    let d = date(2024, 3, 15);

    editor.open(d).await;
    editor.select_hour(9);
    editor.toggle_tag("Work");
    assert!(editor.save().await.is_saved());

    let summary = cache.get(march).unwrap();
    assert_eq!(summary.count_for(d), 1);
    assert_eq!(summary.len(), 1);
}

#[tokio::test]
async fn test_cache_is_empty_between_write_and_refetch() {
    let Fixture {
        store,
        cache,
        mut editor,
    } = fixture();
    let march = MonthKey::new(2024, 3).unwrap();
    let d = date(2024, 3, 15);

    cache.ensure(march).await;
    assert!(cache.get(march).is_some());

    editor.open(d).await;
    editor.select_hour(9);
    editor.toggle_tag("Work");

    let gate = store.hold_range(march.first_day());
    let (outcome, stale) = tokio::join!(editor.save(), async {
        gate.entered().await;
        let seen = cache.get(march);
        gate.open();
        seen
    });

    assert!(outcome.is_saved());
    assert_eq!(stale, None);
    assert_eq!(cache.get(march).unwrap().count_for(d), 1);
}

#[tokio::test]
async fn test_saved_tags_round_trip_in_order() {
    let Fixture { mut editor, .. } = fixture();
    let cases = [
        (date(2024, 1, 1), 0, vec!["Sleep"]),
        (date(2024, 2, 29), 12, vec!["Meals", "With Friends"]),
        (date(2024, 12, 31), 23, vec!["Travel", "Fun", "Other", "Study"]),
    ];

    for (d, hour, tags) in cases {
        editor.open(d).await;
        editor.select_hour(hour);
        for tag in &tags {
            editor.toggle_tag(tag);
        }
        let SaveOutcome::Saved { day, .. } = editor.save().await else {
            panic!("save failed for {} {}", d, hour);
        };

        let reloaded = editor.open(d).await;
        assert_eq!(day.unwrap(), reloaded);
        let entry = reloaded.get(hour).unwrap();
        assert_eq!(entry.tags.as_slice(), tags.as_slice());
    }
}

#[tokio::test]
async fn test_saving_same_entry_twice_is_idempotent() {
    let Fixture { mut editor, .. } = fixture();
    let d = date(2024, 5, 5);

    let mut days = Vec::new();
    for _ in 0..2 {
        editor.open(d).await;
        editor.select_hour(7);
        editor.replace_tags(["Exercise", "Fun"]);
        editor.set_details("run");
        assert!(editor.save().await.is_saved());
        days.push(editor.open(d).await);
    }

    assert_eq!(days[0], days[1]);
    assert_eq!(days[0].len(), 1);
}

#[tokio::test]
async fn test_empty_save_never_reaches_store() {
    let Fixture {
        store, mut editor, ..
    } = fixture();
    let d = date(2024, 3, 15);

    editor.open(d).await;
    editor.select_hour(9);
    editor.toggle_tag("Work");
    editor.toggle_tag("Work");

    let outcome = editor.save().await;
    assert!(matches!(outcome, SaveOutcome::Rejected(SaveRejection::EmptyTags)));
    assert_eq!(store.upsert_calls(), 0);
    assert!(matches!(
        editor.state(),
        EditorState::HourSelected { hour: 9, .. }
    ));
}

#[tokio::test]
async fn test_failed_write_keeps_working_state_and_cache() {
    let Fixture {
        store,
        cache,
        mut editor,
    } = fixture();
    let march = MonthKey::new(2024, 3).unwrap();
    let d = date(2024, 3, 15);
    cache.ensure(march).await;

    editor.open(d).await;
    editor.select_hour(9);
    editor.toggle_tag("Work");
    editor.add_custom_tag("Deep Focus");
    editor.set_details("quarterly plan");

    store.fail_writes(true);
    let outcome = editor.save().await;
    assert!(matches!(outcome, SaveOutcome::Failed(StoreError::Unavailable(_))));

    let working = editor.working().unwrap();
    assert_eq!(working.tags.as_slice(), ["Work", "Deep Focus"]);
    assert_eq!(working.details, "quarterly plan");
    assert_eq!(editor.selected_hour(), Some(9));
    assert!(cache.get(march).is_some());
    assert_eq!(store.range_calls(), 1);

    // retry without re-entering anything
    store.fail_writes(false);
    assert!(editor.save().await.is_saved());
    assert_eq!(store.upsert_calls(), 2);
    assert_eq!(cache.get(march).unwrap().count_for(d), 1);
}

#[tokio::test]
async fn test_closing_discards_unsaved_hour() {
    let Fixture {
        store, mut editor, ..
    } = fixture();
    let d = date(2024, 3, 15);

    editor.open(d).await;
    editor.select_hour(9);
    editor.toggle_tag("Work");
    editor.close();

    assert_eq!(editor.state(), &EditorState::Closed);
    editor.open(d).await;
    assert!(editor.select_hour(9));
    assert!(editor.working().unwrap().tags.is_empty());
    assert_eq!(store.upsert_calls(), 0);
}

#[tokio::test]
async fn test_session_keeps_calendar_and_editor_consistent() {
    let store = ScriptedStore::new();
    let march = MonthKey::new(2024, 3).unwrap();
    let session = Session::start(
        &StaticIdentity(Some(UserId::new())),
        store.clone(),
        Vec::new(),
        march,
    )
    .await
    .unwrap();

    session.show_month(march).await.unwrap();
    let d = date(2024, 3, 15);
    session.select_date(d).await.unwrap();
    {
        let mut editor = session.editor().await;
        for hour in 8..16 {
            editor.select_hour(hour);
            editor.toggle_tag("Work");
            // the editor's own save leaves the calendar to the session
            assert!(editor.save().await.is_saved());
        }
    }
    session.select_date(d).await.unwrap();
    {
        let mut editor = session.editor().await;
        editor.select_hour(16);
        editor.toggle_tag("Meals");
    }
    assert!(session.save().await.is_saved());

    let grid = session.calendar().unwrap();
    let cell = grid.days().find(|c| c.date == d).unwrap();
    assert_eq!(cell.hours, 9);
    assert_eq!(cell.label.as_deref(), Some("9/24"));
    assert_eq!(session.editor().await.day().unwrap().filled_hours(), 9);
}

#[tokio::test]
async fn test_overtaken_day_selection_leaves_editor_on_newer_day() {
    let store = ScriptedStore::new();
    let user = UserId::new();
    let tags: TagList = ["Fun"].into_iter().collect();
    store.upsert(user, date(2024, 3, 15), 20, &tags, None).await.unwrap();
    store.upsert(user, date(2024, 3, 16), 21, &tags, None).await.unwrap();

    let session = Session::start(
        &StaticIdentity(Some(user)),
        store.clone(),
        Vec::new(),
        MonthKey::new(2024, 3).unwrap(),
    )
    .await
    .unwrap();
    let gate = store.hold_exact(date(2024, 3, 15));

    let (first, second) = tokio::join!(session.select_date(date(2024, 3, 15)), async {
        gate.entered().await;
        let day = session.select_date(date(2024, 3, 16)).await;
        gate.open();
        day
    });

    assert_eq!(first, None);
    assert!(second.unwrap().is_filled(21));
    let editor = session.editor().await;
    assert_eq!(editor.date(), Some(date(2024, 3, 16)));
    assert!(editor.day().unwrap().is_filled(21));
}
