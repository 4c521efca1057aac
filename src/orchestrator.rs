//! Ties every component together into the periodic tick and daily rollover of §4.7/§5. Adapted
//! from the teacher's [`crate::provider::Provider::sync`], which runs one big, sequentially
//! logged pass over its sources per call; here that shape becomes `Orchestrator::tick`, with a
//! sibling `Orchestrator::rollover` serialized against it by the same mutex per §5's
//! "advance-state" critical section.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use tokio::sync::{watch, Mutex};

use crate::analyzer;
use crate::config::Config;
use crate::db::Db;
use crate::diff_engine::{self, TaskEventKind};
use crate::entities::Task;
use crate::error::WaypointError;
use crate::event_log::EventLog;
use crate::managers::{LabelManager, ProjectManager, SectionManager, TaskManager};
use crate::notifier::Notifier;
use crate::planner::Planner;
use crate::remote::Client;

const TABLES_CREATED_PARAM: &str = "tables_created";
const INITIAL_FILL_COMPLETE_PARAM: &str = "initial_tables_fill_complete";

/// Owns every component for one process lifetime: the remote client, the DB handle, the
/// notifier, the per-kind managers, the event log, and the planner.
pub struct Orchestrator {
    config: Config,
    remote: Client,
    db: Db,
    notifier: Notifier,
    tasks: TaskManager,
    projects: ProjectManager,
    sections: SectionManager,
    labels: LabelManager,
    event_log: EventLog,
    planner: Planner,
}

impl Orchestrator {
    /// Connects to the DB, runs migrations, and loads the initial state: entity stores from the
    /// DB, reference data (sections/labels) and the active plans (possibly seeding them for the
    /// very first time) from the remote. Fatal failures here (DB unreachable, bad credentials)
    /// are the process's only non-zero exit path (§6).
    pub async fn bootstrap(config: Config) -> Result<Self, WaypointError> {
        let db = Db::connect(&config).await?;
        db.migrate().await?;

        let remote = Client::new(&config)?;
        let notifier = Notifier::new(&config);

        let mut tasks = TaskManager::new();
        let mut projects = ProjectManager::new();
        let mut sections = SectionManager::new();
        let mut labels = LabelManager::new();

        tasks.load(&db).await?;
        projects.load(&db).await?;
        sections.load(&db).await?;
        labels.load(&db).await?;

        let now = Local::now().naive_local();
        let hwm = db.event_hwm(now).await?;
        let event_log = EventLog::new(hwm);

        let mut orchestrator = Self {
            config,
            remote,
            db,
            notifier,
            tasks,
            projects,
            sections,
            labels,
            event_log,
            planner: Planner::new(),
        };

        if orchestrator.db.system_param(TABLES_CREATED_PARAM).await?.is_none() {
            orchestrator.db.set_system_param(TABLES_CREATED_PARAM, "true").await?;
        }

        orchestrator.sync_reference_data().await?;
        orchestrator
            .planner
            .refresh_plans(&orchestrator.db, orchestrator.tasks.store().current(), now.date(), now, &orchestrator.config)
            .await?;

        if orchestrator.db.system_param(INITIAL_FILL_COMPLETE_PARAM).await?.is_none() {
            orchestrator.db.set_system_param(INITIAL_FILL_COMPLETE_PARAM, "true").await?;
        }

        Ok(orchestrator)
    }

    /// Sections and labels are synced on demand, not every tick (§4.7 step 2) — only at bootstrap
    /// here, since nothing in this crate's scope needs them refreshed more often.
    async fn sync_reference_data(&mut self) -> Result<(), WaypointError> {
        self.sections.sync(&self.remote).await?;
        self.db.replace_all_sections(self.sections.store().synced().values().cloned().collect::<Vec<_>>().as_slice()).await?;

        self.labels.sync(&self.remote).await?;
        self.db.replace_all_labels(self.labels.store().synced().values().cloned().collect::<Vec<_>>().as_slice()).await?;

        Ok(())
    }

    /// One periodic tick (§4.7, steps 1-8). Errors from individual steps are returned, not
    /// swallowed here — the caller (the tick loop in [`run`]) is the single place that downgrades
    /// a tick failure into a log line, per §7's "never exits on a tick failure".
    pub async fn tick(&mut self) -> Result<(), WaypointError> {
        let now = Local::now().naive_local();
        log::info!("tick starting at {now}");

        // Step 1: stores are already loaded from the previous tick / bootstrap; `current` only
        // needs to be refreshed when a prior tick's DB write actually changed it, which it always
        // does below, so no separate reload is necessary here.

        // Step 2: sync tasks, events, projects.
        self.tasks.sync(&self.remote, &self.config).await?;
        self.projects.sync(&self.remote).await?;
        self.db.replace_all_projects(self.projects.store().synced().values().cloned().collect::<Vec<_>>().as_slice()).await?;
        self.event_log.sync(&self.remote, &self.config, now).await?;

        // Step 3: the analyzer, over this tick's freshly synced projects+tasks snapshot.
        let reports = analyzer::analyze_projects(self.tasks.store().synced(), self.projects.store().synced(), &self.config);
        for report in reports.values() {
            for warning in &report.warnings {
                self.notifier.send(warning, false, true).await;
            }
            for goal in report.goals.values() {
                for warning in &goal.warnings {
                    self.notifier.send(warning, false, true).await;
                }
            }
        }

        // Step 4: last event per task.
        let last_events = self.event_log.new_last_event_for_task_by_date();
        log::debug!("{} tasks touched by new events", last_events.len());

        // Step 5: classify.
        let classified = diff_engine::classify_tasks(
            self.tasks.store().current(),
            self.tasks.store().synced(),
            &last_events,
            &self.event_log,
            &self.remote,
            &self.config,
        )
        .await?;

        // Step 6: feed every classified task into the planner.
        for (task, status) in &classified {
            self.planner.process_task(task, *status, now, &self.config);
        }

        // Step 7: persist tasks_to_update (`update`) and tasks_to_insert (`increment`), and this
        // tick's plan-task records.
        let (tasks_to_insert, tasks_to_update) = partition_by_event_kind(&classified);
        self.db.insert_tasks(&tasks_to_insert).await?;
        self.db.update_tasks(&tasks_to_update).await?;

        for (plan_id, records) in self.planner.take_pending() {
            if !records.is_empty() {
                self.db.insert_plan_task_records(plan_id, &records).await?;
            }
        }

        // Step 8: persist new events; advance the HWM.
        self.db.insert_events(self.event_log.new_events().into_iter().cloned().collect::<Vec<_>>().as_slice()).await?;
        self.event_log.advance_hwm();

        log::info!("tick complete at {}", Local::now().naive_local());
        Ok(())
    }

    /// The daily rollover (§4.5, §4.7): re-derives every horizon's active plan, rolling over any
    /// whose `end < today` and dispatching that horizon's final [`crate::planner::Report`] to the
    /// notifier before seeding the fresh plan.
    pub async fn rollover(&mut self) -> Result<(), WaypointError> {
        let now = Local::now().naive_local();
        log::info!("daily rollover starting at {now}");

        let reports = self
            .planner
            .refresh_plans(&self.db, self.tasks.store().current(), now.date(), now, &self.config)
            .await?;

        for (horizon, report) in &reports {
            log::info!("{horizon} plan rolled over: {report:?}");
            self.notifier.send(&report.display_text(), true, true).await;
        }

        for (plan_id, records) in self.planner.take_pending() {
            if !records.is_empty() {
                self.db.insert_plan_task_records(plan_id, &records).await?;
            }
        }

        Ok(())
    }
}

fn partition_by_event_kind(classified: &[(Task, TaskEventKind)]) -> (Vec<Task>, Vec<Task>) {
    let mut to_insert = Vec::new();
    let mut to_update = Vec::new();
    for (task, kind) in classified {
        match kind {
            TaskEventKind::Added | TaskEventKind::Loaded => to_insert.push(task.clone()),
            _ => to_update.push(task.clone()),
        }
    }
    (to_insert, to_update)
}

/// Runs the main loop: a fixed-interval tick plus a background daily-rollover worker, serialized
/// against each other by a single mutex around the "advance-state" critical section (§5). Returns
/// once `shutdown` reports `true`, after the in-flight tick (if any) has completed.
pub async fn run(orchestrator: Orchestrator, mut shutdown: watch::Receiver<bool>) {
    let rollover_minute = orchestrator.config.rollover_minute_of_day();
    let tick_interval = orchestrator.config.sync_timeout;

    let state = Arc::new(Mutex::new(orchestrator));

    let rollover_state = state.clone();
    let mut rollover_shutdown = shutdown.clone();
    let rollover_task = tokio::spawn(async move {
        loop {
            let sleep_for = duration_until_minute_of_day(rollover_minute);
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {
                    let mut guard = rollover_state.lock().await;
                    if let Err(err) = guard.rollover().await {
                        log::error!("daily rollover failed: {err}");
                    }
                }
                _ = rollover_shutdown.changed() => {
                    if *rollover_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let mut guard = state.lock().await;
                match tokio::time::timeout(tick_interval, guard.tick()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        log::error!("tick failed: {err}");
                        if err.is_fatal() {
                            log::error!("fatal error, exiting");
                            break;
                        }
                    }
                    Err(_) => {
                        log::error!("tick exceeded {tick_interval:?}, abandoning");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    log::info!("shutdown requested; exiting after current tick");
                    break;
                }
            }
        }
    }

    rollover_task.abort();
}

/// Seconds from now (local wall-clock) until the next time `minute_of_day` is reached, today if
/// still ahead, tomorrow otherwise.
fn duration_until_minute_of_day(minute_of_day: u32) -> Duration {
    let now = Local::now().naive_local();
    let now_minute_of_day = now.hour() * 60 + now.minute();

    let minutes_ahead = if minute_of_day > now_minute_of_day {
        minute_of_day - now_minute_of_day
    } else {
        (24 * 60 - now_minute_of_day) + minute_of_day
    };

    Duration::from_secs(minutes_ahead as u64 * 60).saturating_sub(Duration::from_secs(now.second() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_splits_added_from_everything_else() {
        use crate::ids::{ProjectId, TaskId};
        let t = |id: &str| {
            Task::new(
                TaskId::from(id),
                "c".to_string(),
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
        };
        let classified =
            vec![(t("t1"), TaskEventKind::Added), (t("t2"), TaskEventKind::Updated), (t("t3"), TaskEventKind::Deleted)];
        let (insert, update) = partition_by_event_kind(&classified);
        assert_eq!(insert.len(), 1);
        assert_eq!(update.len(), 2);
    }

    #[test]
    fn rollover_minute_duration_never_exceeds_a_day() {
        let d = duration_until_minute_of_day(0);
        assert!(d <= Duration::from_secs(24 * 60 * 60));
    }
}
