//! The plan-local task status (§3 "plan-task record"): where a task currently stands inside one
//! plan, as opposed to [`crate::diff_engine::TaskEventKind`], which is what happened to it
//! remotely this tick.

use serde::{Deserialize, Serialize};

/// The five values a plan-task record's `status` column ever actually holds (§4.5). The upstream
/// transition dict this is ported from also carries `added`/`loaded` keys, but those name
/// incoming event kinds, not a status a task is ever stored under — see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTaskStatus {
    Planned,
    Postponed,
    Completed,
    CompletedRecurring,
    Deleted,
}

impl PlanTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTaskStatus::Planned => "planned",
            PlanTaskStatus::Postponed => "postponed",
            PlanTaskStatus::Completed => "completed",
            PlanTaskStatus::CompletedRecurring => "completed_recurring",
            PlanTaskStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for PlanTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
