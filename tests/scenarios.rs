//! The six literal end-to-end scenarios of §8, exercised against the planner's state machine,
//! the diff engine's event-folding, and the analyzer — the parts of the tick that don't require a
//! live remote server or database.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use waypoint::analyzer;
use waypoint::config::{Config, Horizon};
use waypoint::diff_engine::{reconstruct_task_from_events, TaskEventKind};
use waypoint::entities::event::{EventType, ObjectType};
use waypoint::entities::{Due, Event, Project, Task};
use waypoint::ids::{EventId, ProjectId, TaskId};
use waypoint::planner::{Plan, PlanTaskStatus};

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2025-03-15T08:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
}

fn due(date: &str, is_recurring: bool) -> Due {
    due_with_string(date, is_recurring, "")
}

fn due_with_string(date: &str, is_recurring: bool, string: &str) -> Due {
    Due {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        datetime: None,
        is_recurring,
        string: string.to_string(),
        timezone: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn task(id: &str, project: &str, parent: Option<&str>, priority: u8, labels: &[&str], due: Option<Due>, completed: bool) -> Task {
    Task::new(
        TaskId::from(id),
        "content".to_string(),
        "".to_string(),
        priority,
        ProjectId::from(project),
        None,
        parent.map(TaskId::from),
        labels.iter().map(|s| s.to_string()).collect(),
        due,
        completed,
        false,
    )
}

/// Scenario 1: add a high-priority dated task while the active week plan ends the next day.
#[test]
fn adding_a_high_priority_dated_task_plans_it_in_week_but_not_month() {
    let config = Config::for_tests();
    let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

    let mut week_plan = Plan::create(Horizon::Week, start);
    let mut month_plan = Plan::create(Horizon::Month, start);

    let t1 = task("t1", "p1", None, 4, &[], Some(due("2025-03-15", false)), false);

    assert!(week_plan.process_task(&t1, TaskEventKind::Added, now(), &config));
    assert_eq!(week_plan.tasks().get(t1.id()).unwrap().last().unwrap().0, PlanTaskStatus::Planned);

    month_plan.process_task(&t1, TaskEventKind::Added, now(), &config);
    assert!(month_plan.tasks().is_empty(), "a task without the GOAL label must not enter the month plan");
}

/// Scenario 2: a recurring task completes; the day plan gains `completed_recurring` then a fresh
/// `planned` record for the next occurrence.
#[test]
fn recurring_completion_yields_completed_recurring_then_planned() {
    let config = Config::for_tests();
    let start = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
    let mut day_plan = Plan::create(Horizon::Day, start);

    let t2 = task("t2", "p1", None, 4, &[], Some(due("2025-03-15", true)), false);
    day_plan.process_task(&t2, TaskEventKind::Added, now(), &config);

    let next_occurrence = task("t2", "p1", None, 4, &[], Some(due("2025-03-16", true)), false);
    day_plan.process_task(&next_occurrence, TaskEventKind::Completed, now(), &config);

    let history = &day_plan.tasks()[&TaskId::from("t2")];
    let statuses: Vec<PlanTaskStatus> = history.iter().map(|(s, _)| *s).collect();
    assert_eq!(statuses, vec![PlanTaskStatus::Planned, PlanTaskStatus::CompletedRecurring]);
}

/// Scenario 3: only `due.string` differs between ticks — `differs_ignoring_due_string` must say
/// nothing changed, so the diff engine never emits a planner call for this task.
#[test]
fn spurious_due_string_change_is_not_a_diff() {
    let current = task("t3", "p1", None, 1, &[], Some(due("2025-03-20", false)), false);
    let synced = task("t3", "p1", None, 1, &[], Some(due_with_string("2025-03-20", false, "tomorrow at noon")), false);
    assert!(!current.differs_ignoring_due_string(&synced));
}

/// Scenario 4: a task absent from `synced` this tick, with a `deleted` event, is reconstructed
/// with `is_deleted=true` and that's what the day/week plans see.
#[test]
fn deleted_task_not_in_synced_is_reconstructed_and_planned_as_deleted() {
    let config = Config::for_tests();
    let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let mut week_plan = Plan::create(Horizon::Week, start);

    let t4 = task("t4", "p1", None, 4, &[], Some(due("2025-03-12", false)), false);
    week_plan.process_task(&t4, TaskEventKind::Added, now(), &config);

    let deleted_event = Event::new(
        EventId::from("e1"),
        now(),
        EventType::Deleted,
        ObjectType::Item,
        "t4".to_string(),
        HashMap::new(),
        None,
        None,
        None,
    );
    let reconstructed = reconstruct_task_from_events(&t4, &[&deleted_event], &config);
    assert!(reconstructed.is_deleted());

    week_plan.process_task(&reconstructed, TaskEventKind::Deleted, now(), &config);
    assert_eq!(week_plan.tasks()[&TaskId::from("t4")].last().unwrap().0, PlanTaskStatus::Deleted);
}

/// Scenario 5: a goal with no subtasks gets a warning and no start/end date is set.
#[test]
fn goal_without_subtasks_is_warned_and_has_no_planned_duration() {
    let config = Config::for_tests();
    let p1 = Project::new(ProjectId::from("p1"), "P1".to_string(), Some(ProjectId::from("root")), "".to_string(), false, false);
    let goal = task("g1", "p1", None, 4, &["GOAL"], None, false);

    let mut tasks = HashMap::new();
    tasks.insert(goal.id().clone(), goal.clone());
    let mut projects = HashMap::new();
    projects.insert(p1.id().clone(), p1.clone());

    let reports = analyzer::analyze_projects(&tasks, &projects, &config);
    let report = &reports[p1.id()];

    assert!(report.goals[goal.id()].warnings.iter().any(|w| w.contains("Goal without subtasks")));
    assert!(report.goals[goal.id()].warnings.iter().any(|w| w.contains(goal.id().as_str())));
    assert!(report.start_date.is_none());
    assert!(report.end_date.is_none());
}

/// Scenario 6: rollover reports the outgoing plan's counts, then a fresh plan starts at `today`.
#[test]
fn rollover_report_matches_literal_counts() {
    let config = Config::for_tests();
    let start = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
    let mut day_plan = Plan::create(Horizon::Day, start);

    let completed: Vec<Task> = (0..3).map(|i| task(&format!("c{i}"), "p1", None, 4, &[], Some(due("2025-03-14", false)), true)).collect();
    let planned: Vec<Task> = (0..2).map(|i| task(&format!("p{i}"), "p1", None, 4, &[], Some(due("2025-03-14", false)), false)).collect();
    let postponed = task("pp0", "p1", None, 4, &[], Some(due("2025-03-14", false)), false);

    for t in &completed {
        day_plan.process_task(t, TaskEventKind::Added, now(), &config);
    }
    for t in &planned {
        day_plan.process_task(t, TaskEventKind::Added, now(), &config);
    }
    day_plan.process_task(&postponed, TaskEventKind::Added, now(), &config);
    let pushed_out = task("pp0", "p1", None, 4, &[], Some(due("2025-04-01", false)), false);
    day_plan.process_task(&pushed_out, TaskEventKind::Updated, now(), &config);

    let report = day_plan.report();
    assert_eq!(report.completed, 3);
    assert_eq!(report.planned, 2);
    assert_eq!(report.postponed, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.overall_planned, 6);
    assert!((report.compl_ratio - 60.0).abs() < f64::EPSILON);

    let new_start = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
    let new_plan = Plan::create(Horizon::Day, new_start);
    assert_eq!(new_plan.start(), new_start);
    assert_eq!(new_plan.end(), new_start);
}
