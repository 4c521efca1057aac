//! The planner (§4.5): owns one active [`Plan`] per [`Horizon`], fans `(task, status)` pairs out
//! to all of them, and runs the daily rollover. Ported from the upstream `Planner`/`Plan` pair,
//! which folds DB access into the same class; here that split into [`Plan`] (pure state machine)
//! and [`crate::db::Db`] (persistence).

pub mod plan;
pub mod report;
pub mod status;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::{Config, Horizon};
use crate::db::Db;
use crate::diff_engine::TaskEventKind;
use crate::entities::{Entity as _, Task};
use crate::error::WaypointError;
use crate::ids::{PlanId, TaskId};

pub use plan::Plan;
pub use report::Report;
pub use status::PlanTaskStatus;

/// Owns one active plan per horizon and routes task classifications into all of them.
pub struct Planner {
    plans: HashMap<Horizon, Plan>,
}

impl Planner {
    pub fn new() -> Self {
        Self { plans: HashMap::new() }
    }

    pub fn plan(&self, horizon: Horizon) -> Option<&Plan> {
        self.plans.get(&horizon)
    }

    /// Loads (or creates) every horizon's active plan, rolling over any whose `end < today` first
    /// (§4.5 rollover). Returns one [`Report`] per horizon that rolled over this call.
    pub async fn refresh_plans(
        &mut self,
        db: &Db,
        current_tasks: &HashMap<TaskId, Task>,
        today: NaiveDate,
        now: NaiveDateTime,
        config: &Config,
    ) -> Result<HashMap<Horizon, Report>, WaypointError> {
        let mut reports = HashMap::new();

        for horizon in Horizon::ALL {
            let loaded = db.load_active_plan(horizon).await?;

            let plan = match loaded {
                Some(mut plan) if plan.end() < today => {
                    log::info!("plan for the {horizon} is outdated; creating a report and a new plan");
                    reports.insert(horizon, plan.report());
                    plan.deactivate();
                    db.deactivate_plan(plan.id()).await?;
                    self.create_plan_from_scratch(db, horizon, today, current_tasks, now, config).await?
                }
                Some(plan) => {
                    log::info!("plan for the {horizon} loaded from the DB");
                    plan
                }
                None => {
                    log::info!("no active plan for the {horizon}; creating one");
                    self.create_plan_from_scratch(db, horizon, today, current_tasks, now, config).await?
                }
            };

            self.plans.insert(horizon, plan);
        }

        Ok(reports)
    }

    async fn create_plan_from_scratch(
        &self,
        db: &Db,
        horizon: Horizon,
        today: NaiveDate,
        current_tasks: &HashMap<TaskId, Task>,
        now: NaiveDateTime,
        config: &Config,
    ) -> Result<Plan, WaypointError> {
        let mut plan = Plan::create(horizon, today);
        let id = db.insert_plan(&plan).await?;
        plan.set_id(id);
        plan.fill_from_tasks(current_tasks, now, config);
        Ok(plan)
    }

    /// Runs one task through every horizon's plan. A horizon whose state machine rejects the
    /// transition is logged and skipped; the others still run (§4.5 `Planner.process_task`).
    pub fn process_task(&mut self, task: &Task, status: TaskEventKind, now: NaiveDateTime, config: &Config) -> bool {
        let mut any_planned = false;
        for (horizon, plan) in self.plans.iter_mut() {
            log::debug!("calling {horizon} task processing for {}", task.id());
            any_planned = plan.process_task(task, status, now, config) || any_planned;
        }
        any_planned
    }

    /// Drains every horizon's pending plan-task records, keyed by the horizon's plan id, for the
    /// orchestrator to persist with [`crate::db::Db::insert_plan_task_records`].
    pub fn take_pending(&mut self) -> HashMap<PlanId, Vec<(TaskId, PlanTaskStatus, NaiveDateTime)>> {
        self.plans.values_mut().map(|plan| (plan.id(), plan.take_pending())).collect()
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}
