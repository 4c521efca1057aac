//! A single horizon-bounded plan (§3 `Plan`, §4.5). Ported from the upstream `Plan` class, with
//! DB access split out: this type holds only the in-memory state machine over one plan's
//! plan-task records; [`crate::db::Db`] is responsible for loading/persisting them.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::config::{Config, Horizon};
use crate::diff_engine::TaskEventKind;
use crate::entities::Task;
use crate::ids::{PlanId, TaskId};

use super::report::Report;
use super::status::PlanTaskStatus;

/// `end(horizon, today)` — end-of-week is Sunday, end-of-month/quarter is the last day of the
/// relevant month, end-of-year is Dec 31, end-of-day is today itself (§4.5 rollover).
pub fn horizon_end(horizon: Horizon, today: NaiveDate) -> NaiveDate {
    match horizon {
        Horizon::Day => today,
        Horizon::Week => {
            let days_to_sunday = 6 - today.weekday().num_days_from_monday() as i64;
            today + chrono::Duration::days(days_to_sunday)
        }
        Horizon::Month => end_of_month(today.year(), today.month()),
        Horizon::Quarter => {
            let last_month_of_quarter = ((today.month() - 1) / 3 + 1) * 3;
            end_of_month(today.year(), last_month_of_quarter)
        }
        Horizon::Year => NaiveDate::from_ymd_opt(today.year(), 12, 31).expect("Dec 31 is always valid"),
    }
}

fn end_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first-of-month is always valid")
        .pred_opt()
        .expect("first-of-month always has a predecessor")
}

/// One horizon's active (or just-rolled-over) plan. `tasks` is an append-only, per-task-id log of
/// `(status, timestamp)` pairs; the last entry is that task's current plan-local status (§3).
pub struct Plan {
    id: PlanId,
    horizon: Horizon,
    active: bool,
    start: NaiveDate,
    end: NaiveDate,
    tasks: HashMap<TaskId, Vec<(PlanTaskStatus, NaiveDateTime)>>,
    /// Records appended since the last [`Plan::take_pending`], awaiting persistence by
    /// [`crate::db::Db`] (`increment` mode, §4.1).
    pending: Vec<(TaskId, PlanTaskStatus, NaiveDateTime)>,
}

impl Plan {
    pub fn new(id: PlanId, horizon: Horizon, active: bool, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id,
            horizon,
            active,
            start,
            end,
            tasks: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Drains and returns every plan-task record appended since the last call, for the
    /// orchestrator to persist.
    pub fn take_pending(&mut self) -> Vec<(TaskId, PlanTaskStatus, NaiveDateTime)> {
        std::mem::take(&mut self.pending)
    }

    /// A fresh plan for `horizon` starting `start`, with `end` derived via [`horizon_end`]. The id
    /// is a placeholder until [`crate::db::Db`] assigns the real one on insert.
    pub fn create(horizon: Horizon, start: NaiveDate) -> Self {
        Self::new(PlanId(0), horizon, true, start, horizon_end(horizon, start))
    }

    pub fn id(&self) -> PlanId {
        self.id
    }
    pub fn set_id(&mut self, id: PlanId) {
        self.id = id;
    }
    pub fn horizon(&self) -> Horizon {
        self.horizon
    }
    pub fn active(&self) -> bool {
        self.active
    }
    pub fn start(&self) -> NaiveDate {
        self.start
    }
    pub fn end(&self) -> NaiveDate {
        self.end
    }
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Restores a plan-task log loaded from the DB, replacing whatever is in memory.
    pub fn load_tasks(&mut self, tasks: HashMap<TaskId, Vec<(PlanTaskStatus, NaiveDateTime)>>) {
        self.tasks = tasks;
    }

    pub fn tasks(&self) -> &HashMap<TaskId, Vec<(PlanTaskStatus, NaiveDateTime)>> {
        &self.tasks
    }

    fn current_status(&self, task_id: &TaskId) -> Option<PlanTaskStatus> {
        self.tasks.get(task_id).and_then(|log| log.last()).map(|(status, _)| *status)
    }

    /// Appends a plan-task record. The caller (the orchestrator, via [`crate::db::Db`]) is
    /// responsible for also persisting it; this only updates the in-memory log used by
    /// subsequent `process_task` calls within the same tick.
    fn add_task_to_plan(&mut self, task_id: TaskId, status: PlanTaskStatus, now: NaiveDateTime) {
        log::debug!("{} plan - task {task_id} is added as {status:?}", self.horizon);
        self.tasks.entry(task_id.clone()).or_default().push((status, now));
        self.pending.push((task_id, status, now));
    }

    /// `_task_fits_the_plan` (§4.5's fit-criteria table): day/week require a due date at or before
    /// `end`; month/quarter/year require the configured GOAL label.
    pub fn fits(&self, task: &Task, config: &Config) -> bool {
        match self.horizon {
            Horizon::Day | Horizon::Week => self.check_task_by_due_date(task),
            Horizon::Month | Horizon::Quarter | Horizon::Year => task.is_goal(config),
        }
    }

    fn check_task_by_due_date(&self, task: &Task) -> bool {
        task.due().map(|due| due.date <= self.end).unwrap_or(false)
    }

    /// Runs one `(task, status)` pair through this plan's state machine. Returns whether the plan
    /// was changed. Broken invariants (a task the transition table says shouldn't already be here)
    /// are logged and treated as a no-op for this horizon rather than propagated — a sibling
    /// horizon's processing must not be blocked by one horizon's inconsistent history.
    pub fn process_task(&mut self, task: &Task, status: TaskEventKind, now: NaiveDateTime, config: &Config) -> bool {
        log::debug!(
            "{} plan - processing task {} ({}) as {status:?}",
            self.horizon,
            task.id(),
            task.truncated_content(config)
        );

        let fits = self.fits(task, config);
        let is_recurring = task.due().map(|d| d.is_recurring).unwrap_or(false);
        let curr_status = self.current_status(task.id());

        if curr_status == Some(PlanTaskStatus::Deleted) {
            return false;
        }

        let target_statuses: HashSet<PlanTaskStatus> = match curr_status {
            Some(status) => config.transition_table().get(&status).cloned().unwrap_or_default(),
            None => HashSet::from([PlanTaskStatus::Planned]),
        };

        if matches!(status, TaskEventKind::Added | TaskEventKind::Loaded) && fits {
            if curr_status.is_some() {
                log::warn!(
                    "{:?} task {} is already present in the {} plan",
                    status,
                    task.id(),
                    self.horizon
                );
                return false;
            }

            let plan_status = if task.is_deleted() {
                PlanTaskStatus::Deleted
            } else if task.is_completed() {
                PlanTaskStatus::Completed
            } else {
                PlanTaskStatus::Planned
            };
            self.add_task_to_plan(task.id().clone(), plan_status, now);
            log::info!("{:?} task {} is planned to the {} plan", status, task.id(), self.horizon);
            return true;
        }

        if matches!(status, TaskEventKind::Updated | TaskEventKind::Uncompleted | TaskEventKind::Completed) {
            let mut reschedule_recurring = false;
            if status == TaskEventKind::Completed
                && !task.is_completed()
                && curr_status.is_some()
                && curr_status != Some(PlanTaskStatus::CompletedRecurring)
                && is_recurring
            {
                self.add_task_to_plan(task.id().clone(), PlanTaskStatus::CompletedRecurring, now);
                log::info!("recurring task {} from the {} plan is completed", task.id(), self.horizon);
                reschedule_recurring = true;
            }

            if fits {
                if (target_statuses.contains(&PlanTaskStatus::Planned) || reschedule_recurring)
                    && !(task.is_completed() || task.is_deleted())
                {
                    self.add_task_to_plan(task.id().clone(), PlanTaskStatus::Planned, now);
                    log::info!("task {} is planned to the {} plan", task.id(), self.horizon);
                } else if target_statuses.contains(&PlanTaskStatus::Completed) && task.is_completed() {
                    self.add_task_to_plan(task.id().clone(), PlanTaskStatus::Completed, now);
                    log::info!("task {} from the {} plan is completed", task.id(), self.horizon);
                }
            } else if target_statuses.contains(&PlanTaskStatus::Postponed) && !(task.is_completed() || is_recurring) {
                self.add_task_to_plan(task.id().clone(), PlanTaskStatus::Postponed, now);
                log::info!("task {} is postponed from the {} plan", task.id(), self.horizon);
            }

            return true;
        }

        if status == TaskEventKind::Deleted && fits && target_statuses.contains(&PlanTaskStatus::Deleted) {
            self.add_task_to_plan(task.id().clone(), PlanTaskStatus::Deleted, now);
            log::info!("task {} from the {} plan is deleted", task.id(), self.horizon);
            return true;
        }

        log::debug!("task {} state for the {} plan was not changed", task.id(), self.horizon);
        false
    }

    /// Seeds a freshly (re)created plan by reprocessing every current task as `loaded` (§4.5
    /// rollover seeding).
    pub fn fill_from_tasks(&mut self, tasks: &HashMap<TaskId, Task>, now: NaiveDateTime, config: &Config) {
        for task in tasks.values() {
            self.process_task(task, TaskEventKind::Loaded, now, config);
        }
    }

    /// `get_count_by_status`: every historical `completed_recurring` occurrence counts, plus each
    /// task's final status counts once more; `completed_recurring`'s total then folds into
    /// `completed` (§4.5 report).
    pub fn get_count_by_status(&self) -> HashMap<PlanTaskStatus, u32> {
        let mut counts: HashMap<PlanTaskStatus, u32> = HashMap::new();

        for history in self.tasks.values() {
            let mut last_status = None;
            for (status, _) in history {
                last_status = Some(*status);
                if *status == PlanTaskStatus::CompletedRecurring {
                    *counts.entry(*status).or_insert(0) += 1;
                }
            }
            if let Some(status) = last_status {
                if status != PlanTaskStatus::CompletedRecurring {
                    *counts.entry(status).or_insert(0) += 1;
                }
            }
        }

        let recurring = counts.get(&PlanTaskStatus::CompletedRecurring).copied().unwrap_or(0);
        *counts.entry(PlanTaskStatus::Completed).or_insert(0) += recurring;
        counts
    }

    /// `report()`: counts by terminal status plus `compl_ratio`, `0` on division by zero.
    pub fn report(&self) -> Report {
        let counts = self.get_count_by_status();
        let completed = counts.get(&PlanTaskStatus::Completed).copied().unwrap_or(0);
        let planned = counts.get(&PlanTaskStatus::Planned).copied().unwrap_or(0);
        let postponed = counts.get(&PlanTaskStatus::Postponed).copied().unwrap_or(0);
        let deleted = counts.get(&PlanTaskStatus::Deleted).copied().unwrap_or(0);
        let overall_planned = completed + planned + postponed + deleted;
        let compl_ratio = if completed + planned == 0 {
            0.0
        } else {
            (completed as f64 / (completed + planned) as f64) * 100.0
        };

        Report {
            horizon: self.horizon,
            completed,
            planned,
            postponed,
            deleted,
            overall_planned,
            compl_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProjectId;

    fn task(id: &str, priority: u8, due: Option<crate::entities::Due>, completed: bool, labels: &[&str]) -> Task {
        Task::new(
            TaskId::from(id),
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

    fn due_on(date: &str) -> crate::entities::Due {
        crate::entities::Due {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            datetime: None,
            is_recurring: false,
            string: "".to_string(),
            timezone: None,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-03-15T12:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn horizon_end_week_lands_on_sunday() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(horizon_end(Horizon::Week, monday).weekday(), chrono::Weekday::Sun);
    }

    #[test]
    fn horizon_end_month_is_last_day() {
        let mid_feb = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        assert_eq!(horizon_end(Horizon::Month, mid_feb), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn added_task_that_fits_is_planned() {
        let config = Config::for_tests();
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut plan = Plan::create(Horizon::Week, start);
        let t = task("t1", 4, Some(due_on("2025-03-12")), false, &[]);

        assert!(plan.process_task(&t, TaskEventKind::Added, now(), &config));
        assert_eq!(plan.current_status(t.id()), Some(PlanTaskStatus::Planned));
    }

    #[test]
    fn added_task_that_does_not_fit_is_ignored() {
        let config = Config::for_tests();
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let plan = {
            let mut p = Plan::create(Horizon::Week, start);
            let t = task("t1", 4, None, false, &[]);
            p.process_task(&t, TaskEventKind::Added, now(), &config);
            p
        };
        assert!(plan.tasks().is_empty());
    }

    #[test]
    fn re_adding_an_already_planned_task_is_a_noop_with_warning() {
        let config = Config::for_tests();
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut plan = Plan::create(Horizon::Week, start);
        let t = task("t1", 4, Some(due_on("2025-03-12")), false, &[]);
        assert!(plan.process_task(&t, TaskEventKind::Added, now(), &config));
        assert!(!plan.process_task(&t, TaskEventKind::Added, now(), &config));
        assert_eq!(plan.tasks().get(t.id()).unwrap().len(), 1);
    }

    #[test]
    fn completed_task_that_fits_moves_to_completed() {
        let config = Config::for_tests();
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut plan = Plan::create(Horizon::Week, start);
        let t = task("t1", 4, Some(due_on("2025-03-12")), false, &[]);
        plan.process_task(&t, TaskEventKind::Added, now(), &config);

        let completed = task("t1", 4, Some(due_on("2025-03-12")), true, &[]);
        plan.process_task(&completed, TaskEventKind::Completed, now(), &config);
        assert_eq!(plan.current_status(completed.id()), Some(PlanTaskStatus::Completed));
    }

    #[test]
    fn no_longer_fitting_task_is_postponed() {
        let config = Config::for_tests();
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut plan = Plan::create(Horizon::Week, start);
        let t = task("t1", 4, Some(due_on("2025-03-12")), false, &[]);
        plan.process_task(&t, TaskEventKind::Added, now(), &config);

        let pushed_out = task("t1", 4, Some(due_on("2025-04-01")), false, &[]);
        plan.process_task(&pushed_out, TaskEventKind::Updated, now(), &config);
        assert_eq!(plan.current_status(pushed_out.id()), Some(PlanTaskStatus::Postponed));
    }

    #[test]
    fn month_horizon_uses_goal_label_not_due_date() {
        let config = Config::for_tests();
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut plan = Plan::create(Horizon::Month, start);
        let with_due_only = task("t1", 4, Some(due_on("2025-03-15")), false, &[]);
        assert!(!plan.fits(&with_due_only, &config));

        let goal = task("t2", 4, None, false, &["GOAL"]);
        assert!(plan.fits(&goal, &config));
        plan.process_task(&goal, TaskEventKind::Added, now(), &config);
        assert_eq!(plan.current_status(goal.id()), Some(PlanTaskStatus::Planned));
    }

    #[test]
    fn get_count_by_status_folds_completed_recurring_into_completed() {
        let config = Config::for_tests();
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut plan = Plan::create(Horizon::Week, start);
        let recurring_due = crate::entities::Due {
            is_recurring: true,
            ..due_on("2025-03-12")
        };
        let t = task("t1", 4, Some(recurring_due.clone()), false, &[]);
        plan.process_task(&t, TaskEventKind::Added, now(), &config);

        let completed_occurrence = task("t1", 4, Some(recurring_due), true, &[]);
        plan.process_task(&completed_occurrence, TaskEventKind::Completed, now(), &config);

        let counts = plan.get_count_by_status();
        assert_eq!(counts.get(&PlanTaskStatus::Completed).copied().unwrap_or(0), 1);
    }
}
