//! The diff engine (§4.4): turns `(current, synced, new_last_event_per_task)` into an ordered
//! sequence of `(task, event_kind)` tuples the planner consumes.

use std::collections::HashMap;

use crate::config::Config;
use crate::entities::event::EventType;
use crate::entities::{Due, Event, Task};
use crate::error::WaypointError;
use crate::event_log::EventLog;
use crate::ids::TaskId;
use crate::remote::Client;

/// The transition kind a task was observed undergoing this tick (§4.4's `status`). Distinct from
/// [`crate::planner::status::PlanTaskStatus`]: this is what happened to the task remotely; that is
/// where the task currently stands inside one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEventKind {
    Added,
    Updated,
    Completed,
    Uncompleted,
    Deleted,
    /// Synthetic kind used only when (re)seeding a plan from the full current-task set, never
    /// produced by [`classify_tasks`] itself (§4.5 rollover, §4.7 seeding).
    Loaded,
}

impl From<EventType> for TaskEventKind {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Added => TaskEventKind::Added,
            EventType::Updated => TaskEventKind::Updated,
            EventType::Completed => TaskEventKind::Completed,
            EventType::Uncompleted => TaskEventKind::Uncompleted,
            EventType::Deleted => TaskEventKind::Deleted,
            // Archived/unarchived/shared/left have no direct plan-state counterpart; treat them
            // as a plain attribute update.
            _ => TaskEventKind::Updated,
        }
    }
}

/// Classifies every task id touched by `last_events`, per the four rules of §4.4.
pub async fn classify_tasks(
    current: &HashMap<TaskId, Task>,
    synced: &HashMap<TaskId, Task>,
    last_events: &HashMap<String, Event>,
    event_log: &EventLog,
    remote: &Client,
    config: &Config,
) -> Result<Vec<(Task, TaskEventKind)>, WaypointError> {
    let mut out = Vec::new();

    for (task_id_str, event) in last_events {
        let task_id = TaskId::from(task_id_str.clone());

        match (current.get(&task_id), synced.get(&task_id)) {
            // Rule 1: not in current, event suggests it still exists remotely -> fetch & add.
            (None, _) if event.event_type() != EventType::Deleted => {
                match remote.get_task(&task_id, config).await? {
                    Some(task) => out.push((task, TaskEventKind::Added)),
                    // Rule 4: fetch returned null (too old, permanently gone) -> skip with a
                    // warning; it will not be reprocessed since the next tick won't re-emit it.
                    None => log::warn!(
                        "task {task_id} had a {:?} event but could not be fetched; skipping",
                        event.event_type()
                    ),
                }
            }

            // Rule 2: in current but not synced -> completed or deleted remotely. Reconstruct
            // from the ordered event stream.
            (Some(current_task), None) => {
                let history = event_log.by_object_id(task_id.as_str());
                let reconstructed = reconstruct_task_from_events(current_task, &history, config);
                out.push((reconstructed, TaskEventKind::from(event.event_type())));
            }

            // Rule 3: in both -> classify by the most recent event type, suppressing a
            // due.string-only change.
            (Some(current_task), Some(synced_task)) => {
                if !current_task.differs_ignoring_due_string(synced_task) {
                    continue;
                }
                out.push((synced_task.clone(), TaskEventKind::from(event.event_type())));
            }

            // Not in current and the event says deleted: nothing locally to reconcile.
            (None, _) => {}
        }
    }

    Ok(out)
}

/// Folds a task's reconstructed state from its ordered (ascending) event history (§4.7
/// `update_current_task_from_events`). Idempotent: re-folding the same prefix produces the same
/// result (§8).
pub fn reconstruct_task_from_events(base: &Task, history: &[&Event], config: &Config) -> Task {
    let mut task = base.clone();

    for event in history {
        match event.event_type() {
            EventType::Deleted => {
                task.set_is_deleted(true);
                break;
            }
            EventType::Completed => task.set_is_completed(true),
            EventType::Uncompleted => task.set_is_completed(false),
            EventType::Updated => {
                if let Some(last_content) = event.last_value("content") {
                    if !last_content.is_null() {
                        if let Some(content) = event.current_value("content").and_then(|v| v.as_str()) {
                            task.set_content(content.to_string());
                        }
                    }
                }
                if let Some(last_description) = event.last_value("description") {
                    if !last_description.is_null() {
                        if let Some(description) = event.current_value("description").and_then(|v| v.as_str()) {
                            task.set_description(description.to_string());
                        }
                    }
                }
                if let Some(last_due_date) = event.last_value("due_date") {
                    if !last_due_date.is_null() {
                        if let Some(date_str) = event.current_value("due_date").and_then(|v| v.as_str()) {
                            if let Ok(date) = Due::parse_date(date_str, config) {
                                task.set_due(Some(Due {
                                    date,
                                    datetime: None,
                                    is_recurring: false,
                                    string: String::new(),
                                    timezone: None,
                                }));
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    task
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EventId, ProjectId};
    use chrono::NaiveDateTime;
    use std::collections::HashMap as StdHashMap;

    fn task(id: &str) -> Task {
        Task::new(
            TaskId::from(id),
            "content".to_string(),
            "".to_string(),
            1,
            ProjectId::from("p1"),
            None,
            None,
            Default::default(),
            None,
            false,
            false,
        )
    }

    fn event(event_type: EventType, extra: StdHashMap<String, serde_json::Value>) -> Event {
        Event::new(
            EventId::from("e1"),
            NaiveDateTime::parse_from_str("2025-03-15T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            event_type,
            crate::entities::event::ObjectType::Item,
            "t1".to_string(),
            extra,
            None,
            None,
            None,
        )
    }

    #[test]
    fn folding_deleted_stops_further_folding() {
        let config = Config::for_tests();
        let base = task("t1");
        let deleted = event(EventType::Deleted, StdHashMap::new());
        let completed_after = event(EventType::Completed, StdHashMap::new());
        let history = vec![&deleted, &completed_after];
        let result = reconstruct_task_from_events(&base, &history, &config);
        assert!(result.is_deleted());
        assert!(!result.is_completed());
    }

    #[test]
    fn folding_updated_applies_last_content_when_present() {
        let config = Config::for_tests();
        let base = task("t1");
        let mut extra = StdHashMap::new();
        extra.insert("last_content".to_string(), serde_json::json!("old"));
        extra.insert("content".to_string(), serde_json::json!("new"));
        let updated = event(EventType::Updated, extra);
        let history = vec![&updated];
        let result = reconstruct_task_from_events(&base, &history, &config);
        assert_eq!(result.content(), "new");
    }

    #[test]
    fn folding_is_idempotent_on_repeated_prefix() {
        let config = Config::for_tests();
        let base = task("t1");
        let completed = event(EventType::Completed, StdHashMap::new());
        let history = vec![&completed];
        let once = reconstruct_task_from_events(&base, &history, &config);
        let twice = reconstruct_task_from_events(&once, &history, &config);
        assert_eq!(once, twice);
    }

    /// Rule 3 (§4.4, §8 Scenario 3): a task present in both snapshots with only `due.string`
    /// differing must not be classified at all — no row is pushed for the planner to see.
    #[tokio::test]
    async fn due_string_only_change_is_suppressed_end_to_end() {
        let config = Config::for_tests();
        let remote = Client::new(&config).unwrap();
        let event_log = EventLog::new(
            NaiveDateTime::parse_from_str("2025-03-15T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
        );

        let due_date = chrono::NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let mut current_task = task("t1");
        current_task.set_due(Some(Due {
            date: due_date,
            datetime: None,
            is_recurring: false,
            string: "".to_string(),
            timezone: None,
        }));
        let mut synced_task = current_task.clone();
        synced_task.set_due(Some(Due {
            date: due_date,
            datetime: None,
            is_recurring: false,
            string: "tomorrow at noon".to_string(),
            timezone: None,
        }));

        let current = StdHashMap::from([(TaskId::from("t1"), current_task)]);
        let synced = StdHashMap::from([(TaskId::from("t1"), synced_task)]);
        let last_events = StdHashMap::from([("t1".to_string(), event(EventType::Updated, StdHashMap::new()))]);

        let out = classify_tasks(&current, &synced, &last_events, &event_log, &remote, &config)
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
