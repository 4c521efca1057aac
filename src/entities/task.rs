//! Tasks, and the derived predicates computed from their core fields.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::ids::{LabelId, ProjectId, SectionId, TaskId};

use super::due::Due;

/// A task mirrored from the remote workspace.
///
/// This is the value-type replacement for a source class that subclassed the remote API's task
/// model purely to bolt on `is_deleted` and a handful of computed booleans: here those booleans
/// are plain methods over an ordinary struct, recomputed on demand rather than cached as fields,
/// so they can never drift out of sync with the core attributes they're derived from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    content: String,
    description: String,
    priority: u8,
    project_id: ProjectId,
    section_id: Option<SectionId>,
    parent_id: Option<TaskId>,
    labels: HashSet<String>,
    due: Option<Due>,
    is_completed: bool,
    is_deleted: bool,
}

impl Task {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TaskId,
        content: String,
        description: String,
        priority: u8,
        project_id: ProjectId,
        section_id: Option<SectionId>,
        parent_id: Option<TaskId>,
        labels: HashSet<String>,
        due: Option<Due>,
        is_completed: bool,
        is_deleted: bool,
    ) -> Self {
        Self {
            id,
            content,
            description,
            priority,
            project_id,
            section_id,
            parent_id,
            labels,
            due,
            is_completed,
            is_deleted,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }
    pub fn content(&self) -> &str {
        &self.content
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn priority(&self) -> u8 {
        self.priority
    }
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }
    pub fn section_id(&self) -> Option<&SectionId> {
        self.section_id.as_ref()
    }
    pub fn parent_id(&self) -> Option<&TaskId> {
        self.parent_id.as_ref()
    }
    pub fn labels(&self) -> &HashSet<String> {
        &self.labels
    }
    pub fn due(&self) -> Option<&Due> {
        self.due.as_ref()
    }
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }
    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn has_label(&self, label_id: &LabelId) -> bool {
        self.labels.contains(label_id.as_str())
    }

    /// `is_goal` ≡ task carries the configured GOAL label.
    pub fn is_goal(&self, config: &Config) -> bool {
        self.labels.contains(&config.special_labels.goal)
    }

    /// `is_active_goal` ≡ not completed ∧ is_goal ∧ priority ∈ {3,4}.
    pub fn is_active_goal(&self, config: &Config) -> bool {
        !self.is_completed && self.is_goal(config) && matches!(self.priority, 3 | 4)
    }

    /// `is_active_with_due` ≡ not completed ∧ priority ∈ {3,4} ∧ due present.
    pub fn is_active_with_due(&self) -> bool {
        !self.is_completed && matches!(self.priority, 3 | 4) && self.due.is_some()
    }

    /// `is_active_no_due` ≡ not completed ∧ priority ∈ {2,4} ∧ no due.
    pub fn is_active_no_due(&self) -> bool {
        !self.is_completed && matches!(self.priority, 2 | 4) && self.due.is_none()
    }

    /// `is_active` ≡ any of `is_active_with_due`, `is_active_no_due`, `is_active_goal`.
    pub fn is_active(&self, config: &Config) -> bool {
        !self.is_completed
            && (self.is_active_with_due() || self.is_active_no_due() || self.is_active_goal(config))
    }

    /// `is_in_focus` ≡ not completed ∧ not goal ∧ (is_active_no_due ∨ (is_active_with_due ∧
    /// due.date ≤ today)).
    pub fn is_in_focus(&self, config: &Config, today: NaiveDate) -> bool {
        if self.is_completed || self.is_goal(config) {
            return false;
        }
        if self.is_active_no_due() {
            return true;
        }
        if self.is_active_with_due() {
            return self.due.as_ref().map(|d| d.date <= today).unwrap_or(false);
        }
        false
    }

    /// Applies a reconstructed attribute in place, used while folding the event stream for a
    /// task absent from `synced` (§4.7 `update_current_task_from_events`).
    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }
    pub fn set_description(&mut self, description: String) {
        self.description = description;
    }
    pub fn set_due(&mut self, due: Option<Due>) {
        self.due = due;
    }
    pub fn set_is_completed(&mut self, is_completed: bool) {
        self.is_completed = is_completed;
    }
    pub fn set_is_deleted(&mut self, is_deleted: bool) {
        self.is_deleted = is_deleted;
    }

    /// True when `self` and `other` differ only in `due.string` (or not at all) — the case §4.1's
    /// `updated_diff` must suppress.
    pub fn differs_ignoring_due_string(&self, other: &Task) -> bool {
        if self.content != other.content
            || self.description != other.description
            || self.priority != other.priority
            || self.project_id != other.project_id
            || self.section_id != other.section_id
            || self.parent_id != other.parent_id
            || self.labels != other.labels
            || self.is_completed != other.is_completed
            || self.is_deleted != other.is_deleted
        {
            return true;
        }
        match (&self.due, &other.due) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            (Some(a), Some(b)) => a.differs_ignoring_string(b),
        }
    }

    /// Truncates [`Task::content`] to [`Config::task_content_len_threshold`] characters, for log
    /// lines (§10).
    pub fn truncated_content(&self, config: &Config) -> String {
        let max = config.task_content_len_threshold;
        if self.content.chars().count() <= max {
            self.content.clone()
        } else {
            let truncated: String = self.content.chars().take(max).collect();
            format!("{truncated}...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base_task(priority: u8, labels: &[&str], due: Option<Due>, completed: bool) -> Task {
        Task::new(
            TaskId::from("t1"),
            "content".to_string(),
            "".to_string(),
            priority,
            ProjectId::from("p1"),
            None,
            None,
            labels.iter().map(|s| s.to_string()).collect(),
            due,
            completed,
            false,
        )
    }

    fn due_on(date: &str) -> Due {
        Due {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            datetime: None,
            is_recurring: false,
            string: "".to_string(),
            timezone: None,
        }
    }

    #[test]
    fn active_with_due_requires_high_priority() {
        let config = Config::for_tests();
        let task = base_task(4, &[], Some(due_on("2025-03-15")), false);
        assert!(task.is_active_with_due());
        assert!(task.is_active(&config));

        let low_priority = base_task(1, &[], Some(due_on("2025-03-15")), false);
        assert!(!low_priority.is_active_with_due());
    }

    #[test]
    fn goal_detection_uses_configured_label() {
        let config = Config::for_tests();
        let task = base_task(4, &["GOAL"], None, false);
        assert!(task.is_goal(&config));
        assert!(task.is_active_goal(&config));
    }

    #[test]
    fn in_focus_excludes_goals_and_completed() {
        let config = Config::for_tests();
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let plain = base_task(4, &[], None, false);
        assert!(plain.is_in_focus(&config, today));

        let goal = base_task(4, &["GOAL"], None, false);
        assert!(!goal.is_in_focus(&config, today));

        let overdue = base_task(4, &[], Some(due_on("2025-03-10")), false);
        assert!(overdue.is_in_focus(&config, today));

        let future = base_task(4, &[], Some(due_on("2025-03-20")), false);
        assert!(!future.is_in_focus(&config, today));
    }

    #[test]
    fn due_string_only_change_is_ignored() {
        let mut a = base_task(4, &[], Some(due_on("2025-03-15")), false);
        let b = a.clone();
        a.due.as_mut().unwrap().string = "different rendering".to_string();
        assert!(!a.differs_ignoring_due_string(&b));
    }
}
