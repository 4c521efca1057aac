//! The project/goal consistency analyzer (§4.6). Ported from the upstream `GTDHandler`, which
//! walks the synced task/project snapshots and emits structural warnings rather than failing —
//! dangling or malformed goal structures are findings to report, never crashes (§3 invariants).

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::config::Config;
use crate::entities::{Due, Project, Task};
use crate::ids::{ProjectId, TaskId};

/// A single active goal's envelope, success-labeled subtasks, and any warnings about its shape.
#[derive(Debug, Clone, Default)]
pub struct GoalReport {
    pub content: String,
    pub earliest: Option<TaskId>,
    pub latest: Option<TaskId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub success: HashSet<TaskId>,
    pub warnings: Vec<String>,
}

/// One project's consistency report (§4.6).
#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub name: String,
    pub color: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub goals: HashMap<TaskId, GoalReport>,
    pub warnings: Vec<String>,
}

/// Runs the analyzer over every synced project, returning one [`ProjectReport`] each.
pub fn analyze_projects(
    tasks: &HashMap<TaskId, Task>,
    projects: &HashMap<ProjectId, Project>,
    config: &Config,
) -> HashMap<ProjectId, ProjectReport> {
    projects
        .values()
        .map(|project| (project.id().clone(), parse_project(project, tasks, config)))
        .collect()
}

fn parse_project(project: &Project, tasks: &HashMap<TaskId, Task>, config: &Config) -> ProjectReport {
    let root_project = project.is_root();

    let active_goals: Vec<&Task> = tasks
        .values()
        .filter(|t| t.project_id() == project.id() && t.is_active_goal(config))
        .collect();

    let mut goals = HashMap::new();
    let mut earliest_candidates: HashMap<TaskId, &Task> = HashMap::new();
    let mut latest_candidates: HashMap<TaskId, &Task> = HashMap::new();
    let mut warnings = Vec::new();

    for goal in &active_goals {
        let goal_report = parse_goal(goal, tasks, config);

        if let Some(earliest_id) = &goal_report.earliest {
            if let Some(t) = tasks.get(earliest_id) {
                earliest_candidates.insert(earliest_id.clone(), t);
            }
        }
        if let Some(latest_id) = &goal_report.latest {
            if let Some(t) = tasks.get(latest_id) {
                latest_candidates.insert(latest_id.clone(), t);
            }
        }

        goals.insert(goal.id().clone(), goal_report);
    }

    let project_earliest = extreme_due(earliest_candidates.values().copied(), false);
    let project_latest = extreme_due(latest_candidates.values().copied(), true);

    let mut start_date = None;
    let mut end_date = None;

    if !root_project {
        match (project_earliest, project_latest) {
            (Some(earliest), Some(latest)) => {
                start_date = earliest.due().map(|d| d.date);
                end_date = latest.due().map(|d| d.date);
            }
            (None, None) => {
                warnings.push(project_warning(project, "Project with no planned duration"));
            }
            _ => {}
        }

        if active_goals.is_empty() {
            warnings.push(project_warning(project, "Project with no active goals"));
        }
    }

    ProjectReport {
        name: project.name().to_string(),
        color: project.color().to_string(),
        start_date,
        end_date,
        goals,
        warnings,
    }
}

fn parse_goal(goal: &Task, tasks: &HashMap<TaskId, Task>, config: &Config) -> GoalReport {
    let mut report = GoalReport {
        content: goal.content().to_string(),
        ..Default::default()
    };

    let subtasks: Vec<&Task> = tasks.values().filter(|t| t.parent_id() == Some(goal.id())).collect();

    if subtasks.is_empty() {
        report.warnings.push(goal_warning(goal, "Goal without subtasks"));
        return report;
    }

    let earliest_task = extreme_due(subtasks.iter().copied(), false);
    let latest_task = extreme_due(subtasks.iter().copied(), true);

    if let (Some(earliest), Some(latest)) = (earliest_task, latest_task) {
        report.earliest = Some(earliest.id().clone());
        report.latest = Some(latest.id().clone());
        report.start_date = earliest.due().map(|d| d.date);
        report.end_date = latest.due().map(|d| d.date);
    }

    if let Some(latest) = latest_task {
        let latest_due_date = latest.due().map(|d| d.date);

        match goal.due() {
            None => report.warnings.push(goal_warning(goal, "Goal doesn't have due, steps have")),
            Some(goal_due) if Some(goal_due.date) != latest_due_date => {
                report.warnings.push(goal_warning(goal, "Goal due is not equal to the last step due"))
            }
            _ => {}
        }

        let success_subtasks: Vec<&Task> =
            subtasks.iter().copied().filter(|t| t.labels().contains(&config.special_labels.success)).collect();

        if !success_subtasks.is_empty() {
            report.success = success_subtasks.iter().map(|t| t.id().clone()).collect();
            if let Some(latest_success) = extreme_due(success_subtasks.into_iter(), true) {
                if latest_success.due().map(|d| d.date) != latest_due_date {
                    report.warnings.push(goal_warning(goal, "\"Success\" step is not the last"));
                }
            }
        }
    }

    report
}

/// Picks the earliest (or latest, by `latest`) subtask by `due.date`; on ties a subtask with a
/// `due.datetime` wins over one without; on further ties, `due.datetime` itself (§4.6).
fn extreme_due<'a>(candidates: impl Iterator<Item = &'a Task>, latest: bool) -> Option<&'a Task> {
    candidates.filter(|t| t.due().is_some()).max_by(|a, b| {
        let da = a.due().expect("filtered to due.is_some()");
        let db = b.due().expect("filtered to due.is_some()");
        let date_cmp = if latest { da.date.cmp(&db.date) } else { db.date.cmp(&da.date) };
        date_cmp
            .then_with(|| da.datetime.is_some().cmp(&db.datetime.is_some()))
            .then_with(|| da.datetime.cmp(&db.datetime))
    })
}

fn goal_warning(goal: &Task, msg: &str) -> String {
    log::warn!("{}: {}. {msg}", goal.id(), goal.content());
    format!("<a href=\"{}\">{}</a>. {msg}", task_url(goal.id()), goal.content())
}

fn project_warning(project: &Project, msg: &str) -> String {
    log::warn!("{}: {}. {msg}", project.id(), project.name());
    format!("<a href=\"{}\">{}</a>. {msg}", project_url(project.id()), project.name())
}

fn task_url(id: &TaskId) -> String {
    format!("/tasks/{id}")
}

fn project_url(id: &ProjectId) -> String {
    format!("/projects/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ProjectId as PId, TaskId as TId};

    fn due_on(date: &str, datetime: bool) -> Due {
        Due {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            datetime: if datetime {
                Some(chrono::NaiveDateTime::parse_from_str(&format!("{date}T10:00:00"), "%Y-%m-%dT%H:%M:%S").unwrap())
            } else {
                None
            },
            is_recurring: false,
            string: "".to_string(),
            timezone: None,
        }
    }

    fn task(id: &str, project: &str, parent: Option<&str>, priority: u8, labels: &[&str], due: Option<Due>, completed: bool) -> Task {
        Task::new(
            TId::from(id),
            "content".to_string(),
            "".to_string(),
            priority,
            PId::from(project),
            None,
            parent.map(TId::from),
            labels.iter().map(|s| s.to_string()).collect(),
            due,
            completed,
            false,
        )
    }

    fn project(id: &str, parent: Option<&str>) -> Project {
        Project::new(PId::from(id), "Project".to_string(), parent.map(PId::from), "".to_string(), false, false)
    }

    #[test]
    fn goal_without_subtasks_warns() {
        let config = Config::for_tests();
        let goal = task("g1", "p1", None, 4, &["GOAL"], None, false);
        let tasks: HashMap<TId, Task> = [(goal.id().clone(), goal.clone())].into_iter().collect();
        let report = parse_goal(&goal, &tasks, &config);
        assert!(report.warnings.iter().any(|w| w.contains("Goal without subtasks")));
    }

    #[test]
    fn success_not_last_is_flagged() {
        let config = Config::for_tests();
        let goal = task("g1", "p1", None, 4, &["GOAL"], Some(due_on("2025-03-20", false)), false);
        let success_sub = task("s1", "p1", Some("g1"), 1, &["SUCCESS"], Some(due_on("2025-03-15", false)), false);
        let last_sub = task("s2", "p1", Some("g1"), 1, &[], Some(due_on("2025-03-20", false)), false);

        let mut tasks: HashMap<TId, Task> = HashMap::new();
        for t in [&goal, &success_sub, &last_sub] {
            tasks.insert(t.id().clone(), t.clone());
        }

        let report = parse_goal(&goal, &tasks, &config);
        assert!(report.warnings.iter().any(|w| w.contains("is not the last")));
    }

    #[test]
    fn extreme_due_prefers_datetime_on_date_tie() {
        let a = task("a", "p1", None, 1, &[], Some(due_on("2025-03-20", false)), false);
        let b = task("b", "p1", None, 1, &[], Some(due_on("2025-03-20", true)), false);
        let picked = extreme_due([&a, &b].into_iter(), true).unwrap();
        assert_eq!(picked.id().as_str(), "b");
    }

    #[test]
    fn root_project_is_exempt_from_duration_and_goal_warnings() {
        let config = Config::for_tests();
        let root = project("p1", None);
        let tasks: HashMap<TId, Task> = HashMap::new();
        let report = parse_project(&root, &tasks, &config);
        assert!(report.warnings.is_empty());
    }
}
