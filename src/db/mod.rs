//! Persistence (§4.1, §6, §10): a `sqlx` `PgPool` plus one method per persistence-contract
//! operation. Kept to runtime `query`/`query_as` rather than the `query!` macros, which need a
//! live database at compile time — there is no such thing in this workspace.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Row};

use crate::config::{Config, Horizon};
use crate::entities::event::{EventType, ObjectType};
use crate::entities::{Due, Event, Label, Project, Section, Task};
use crate::error::WaypointError;
use crate::ids::{EventId, LabelId, PlanId, ProjectId, SectionId, TaskId};
use crate::planner::status::PlanTaskStatus;
use crate::planner::Plan;

/// Owns the connection pool and every table-level read/write the rest of the crate needs.
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(config: &Config) -> Result<Self, WaypointError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Runs every pending migration under `migrations/` (§10).
    pub async fn migrate(&self) -> Result<(), WaypointError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| WaypointError::Storage(e.to_string()))
    }

    // ---- tasks ----------------------------------------------------------------------------

    pub async fn load_tasks(&self) -> Result<Vec<Task>, WaypointError> {
        let rows = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(TaskRow::into_task).collect())
    }

    pub async fn load_task(&self, id: &TaskId) -> Result<Option<Task>, WaypointError> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TaskRow::into_task))
    }

    /// `increment`: insert every task whose id isn't already present (§4.1).
    pub async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), WaypointError> {
        for task in tasks {
            self.upsert_task(task, false).await?;
        }
        Ok(())
    }

    /// `update`: per-id update on known attributes (§4.1).
    pub async fn update_tasks(&self, tasks: &[Task]) -> Result<(), WaypointError> {
        for task in tasks {
            self.upsert_task(task, true).await?;
        }
        Ok(())
    }

    async fn upsert_task(&self, task: &Task, update_on_conflict: bool) -> Result<(), WaypointError> {
        let labels: Vec<String> = task.labels().iter().cloned().collect();
        let conflict_clause = if update_on_conflict {
            "ON CONFLICT (id) DO UPDATE SET content = EXCLUDED.content, description = EXCLUDED.description, \
             priority = EXCLUDED.priority, project_id = EXCLUDED.project_id, section_id = EXCLUDED.section_id, \
             parent_id = EXCLUDED.parent_id, labels = EXCLUDED.labels, due_date = EXCLUDED.due_date, \
             due_datetime = EXCLUDED.due_datetime, due_is_recurring = EXCLUDED.due_is_recurring, \
             due_string = EXCLUDED.due_string, due_timezone = EXCLUDED.due_timezone, \
             is_completed = EXCLUDED.is_completed, is_deleted = EXCLUDED.is_deleted"
        } else {
            "ON CONFLICT (id) DO NOTHING"
        };

        sqlx::query(&format!(
            "INSERT INTO tasks (id, content, description, priority, project_id, section_id, parent_id, labels, \
             due_date, due_datetime, due_is_recurring, due_string, due_timezone, is_completed, is_deleted) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15) {conflict_clause}"
        ))
        .bind(task.id().as_str())
        .bind(task.content())
        .bind(task.description())
        .bind(task.priority() as i16)
        .bind(task.project_id().as_str())
        .bind(task.section_id().map(|s| s.as_str()))
        .bind(task.parent_id().map(|p| p.as_str()))
        .bind(&labels)
        .bind(task.due().map(|d| d.date))
        .bind(task.due().and_then(|d| d.datetime))
        .bind(task.due().map(|d| d.is_recurring).unwrap_or(false))
        .bind(task.due().map(|d| d.string.as_str()).unwrap_or(""))
        .bind(task.due().and_then(|d| d.timezone.as_deref()))
        .bind(task.is_completed())
        .bind(task.is_deleted())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- projects / sections / labels (delete_all each tick, §4.1) -------------------------

    pub async fn load_projects(&self) -> Result<Vec<Project>, WaypointError> {
        let rows = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ProjectRow::into_project).collect())
    }

    pub async fn replace_all_projects(&self, projects: &[Project]) -> Result<(), WaypointError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM projects").execute(&mut *tx).await?;
        for project in projects {
            sqlx::query(
                "INSERT INTO projects (id, name, parent_id, color, is_inbox, is_favorite) VALUES ($1,$2,$3,$4,$5,$6)",
            )
            .bind(project.id().as_str())
            .bind(project.name())
            .bind(project.parent_id().map(|p| p.as_str()))
            .bind(project.color())
            .bind(project.is_inbox())
            .bind(project.is_favorite())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn load_sections(&self) -> Result<Vec<Section>, WaypointError> {
        let rows = sqlx::query_as::<_, SectionRow>("SELECT * FROM sections").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(SectionRow::into_section).collect())
    }

    pub async fn replace_all_sections(&self, sections: &[Section]) -> Result<(), WaypointError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM sections").execute(&mut *tx).await?;
        for section in sections {
            sqlx::query("INSERT INTO sections (id, name, project_id, section_order) VALUES ($1,$2,$3,$4)")
                .bind(section.id().as_str())
                .bind(section.name())
                .bind(section.project_id().as_str())
                .bind(section.order())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn load_labels(&self) -> Result<Vec<Label>, WaypointError> {
        let rows = sqlx::query_as::<_, LabelRow>("SELECT * FROM labels").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(LabelRow::into_label).collect())
    }

    pub async fn replace_all_labels(&self, labels: &[Label]) -> Result<(), WaypointError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM labels").execute(&mut *tx).await?;
        for label in labels {
            sqlx::query("INSERT INTO labels (id, name, color, is_favorite) VALUES ($1,$2,$3,$4)")
                .bind(label.id().as_str())
                .bind(label.name())
                .bind(label.color())
                .bind(label.is_favorite())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ---- events -----------------------------------------------------------------------------

    /// The high-water mark: `max(event_date)`, or [`crate::event_log::EventLog::default_hwm`] on
    /// an empty table (§4.2, §8).
    pub async fn event_hwm(&self, now: NaiveDateTime) -> Result<NaiveDateTime, WaypointError> {
        let row = sqlx::query("SELECT max(event_date) AS hwm FROM events").fetch_one(&self.pool).await?;
        let hwm: Option<NaiveDateTime> = row.try_get("hwm")?;
        Ok(hwm.unwrap_or_else(|| crate::event_log::EventLog::default_hwm(now)))
    }

    /// `increment`: events are insert-only (§4.2).
    pub async fn insert_events(&self, events: &[Event]) -> Result<(), WaypointError> {
        for event in events {
            sqlx::query(
                "INSERT INTO events (id, event_date, event_type, object_type, object_id, extra_data, \
                 initiator_id, parent_item_id, parent_project_id) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(event.id().as_str())
            .bind(event.event_date())
            .bind(event_type_str(event.event_type()))
            .bind(object_type_str(event.object_type()))
            .bind(event.object_id())
            .bind(serde_json::to_value(event.extra_data())?)
            .bind(event.initiator_id())
            .bind(event.parent_item_id())
            .bind(event.parent_project_id())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    // ---- plans / tasks_in_plans ---------------------------------------------------------------

    /// The currently active plan for `horizon`, with its `tasks_in_plans` log loaded, if any.
    pub async fn load_active_plan(&self, horizon: Horizon) -> Result<Option<Plan>, WaypointError> {
        let row = sqlx::query_as::<_, PlanRow>(
            "SELECT id, horizon, active, start_date, end_date FROM plans WHERE active = true AND horizon = $1",
        )
        .bind(horizon.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let mut plan = Plan::new(PlanId(row.id), horizon, row.active, row.start_date, row.end_date);
        plan.load_tasks(self.load_tasks_in_plan(PlanId(row.id)).await?);
        Ok(Some(plan))
    }

    async fn load_tasks_in_plan(
        &self,
        plan_id: PlanId,
    ) -> Result<HashMap<TaskId, Vec<(PlanTaskStatus, NaiveDateTime)>>, WaypointError> {
        let rows = sqlx::query_as::<_, TaskInPlanRow>(
            "SELECT task_id, status, timestamp FROM tasks_in_plans WHERE plan_id = $1 ORDER BY task_id, timestamp",
        )
        .bind(plan_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut log: HashMap<TaskId, Vec<(PlanTaskStatus, NaiveDateTime)>> = HashMap::new();
        for row in rows {
            log.entry(TaskId::from(row.task_id)).or_default().push((parse_plan_status(&row.status)?, row.timestamp));
        }
        Ok(log)
    }

    pub async fn insert_plan(&self, plan: &Plan) -> Result<PlanId, WaypointError> {
        let row = sqlx::query(
            "INSERT INTO plans (horizon, active, start_date, end_date) VALUES ($1,$2,$3,$4) RETURNING id",
        )
        .bind(plan.horizon().as_str())
        .bind(plan.active())
        .bind(plan.start())
        .bind(plan.end())
        .fetch_one(&self.pool)
        .await?;
        Ok(PlanId(row.try_get("id")?))
    }

    pub async fn deactivate_plan(&self, id: PlanId) -> Result<(), WaypointError> {
        sqlx::query("UPDATE plans SET active = false WHERE id = $1").bind(id.0).execute(&self.pool).await?;
        Ok(())
    }

    /// Persists every plan-task record a tick's planner calls produced (`increment`, §4.1).
    pub async fn insert_plan_task_records(
        &self,
        plan_id: PlanId,
        records: &[(TaskId, PlanTaskStatus, NaiveDateTime)],
    ) -> Result<(), WaypointError> {
        for (task_id, status, timestamp) in records {
            sqlx::query("INSERT INTO tasks_in_plans (task_id, plan_id, status, timestamp) VALUES ($1,$2,$3,$4)")
                .bind(task_id.as_str())
                .bind(plan_id.0)
                .bind(status.as_str())
                .bind(timestamp)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    // ---- system_params ------------------------------------------------------------------------

    pub async fn system_param(&self, key: &str) -> Result<Option<String>, WaypointError> {
        let row = sqlx::query("SELECT value FROM system_params WHERE param = $1").bind(key).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| r.try_get::<String, _>("value")).transpose()?)
    }

    pub async fn set_system_param(&self, key: &str, value: &str) -> Result<(), WaypointError> {
        sqlx::query(
            "INSERT INTO system_params (param, value) VALUES ($1,$2) \
             ON CONFLICT (param) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: String,
    content: String,
    description: String,
    priority: i16,
    project_id: String,
    section_id: Option<String>,
    parent_id: Option<String>,
    labels: Vec<String>,
    due_date: Option<NaiveDate>,
    due_datetime: Option<NaiveDateTime>,
    due_is_recurring: Option<bool>,
    due_string: Option<String>,
    due_timezone: Option<String>,
    is_completed: bool,
    is_deleted: bool,
}

impl TaskRow {
    fn into_task(self) -> Task {
        let due = self.due_date.map(|date| Due {
            date,
            datetime: self.due_datetime,
            is_recurring: self.due_is_recurring.unwrap_or(false),
            string: self.due_string.unwrap_or_default(),
            timezone: self.due_timezone,
        });
        Task::new(
            TaskId::from(self.id),
            self.content,
            self.description,
            self.priority as u8,
            ProjectId::from(self.project_id),
            self.section_id.map(SectionId::from),
            self.parent_id.map(TaskId::from),
            self.labels.into_iter().collect::<HashSet<_>>(),
            due,
            self.is_completed,
            self.is_deleted,
        )
    }
}

#[derive(FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    parent_id: Option<String>,
    color: String,
    is_inbox: bool,
    is_favorite: bool,
}

impl ProjectRow {
    fn into_project(self) -> Project {
        Project::new(
            ProjectId::from(self.id),
            self.name,
            self.parent_id.map(ProjectId::from),
            self.color,
            self.is_inbox,
            self.is_favorite,
        )
    }
}

#[derive(FromRow)]
struct SectionRow {
    id: String,
    name: String,
    project_id: String,
    section_order: i32,
}

impl SectionRow {
    fn into_section(self) -> Section {
        Section::new(SectionId::from(self.id), self.name, ProjectId::from(self.project_id), self.section_order)
    }
}

#[derive(FromRow)]
struct LabelRow {
    id: String,
    name: String,
    color: String,
    is_favorite: bool,
}

impl LabelRow {
    fn into_label(self) -> Label {
        Label::new(LabelId::from(self.id), self.name, self.color, self.is_favorite)
    }
}

#[derive(FromRow)]
struct PlanRow {
    id: i32,
    #[allow(dead_code)]
    horizon: String,
    active: bool,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(FromRow)]
struct TaskInPlanRow {
    task_id: String,
    status: String,
    timestamp: NaiveDateTime,
}

fn parse_plan_status(raw: &str) -> Result<PlanTaskStatus, WaypointError> {
    Ok(match raw {
        "planned" => PlanTaskStatus::Planned,
        "postponed" => PlanTaskStatus::Postponed,
        "completed" => PlanTaskStatus::Completed,
        "completed_recurring" => PlanTaskStatus::CompletedRecurring,
        "deleted" => PlanTaskStatus::Deleted,
        other => return Err(WaypointError::Format(format!("unknown plan-task status {other:?} in DB"))),
    })
}

fn event_type_str(t: EventType) -> &'static str {
    match t {
        EventType::Added => "added",
        EventType::Updated => "updated",
        EventType::Deleted => "deleted",
        EventType::Completed => "completed",
        EventType::Uncompleted => "uncompleted",
        EventType::Archived => "archived",
        EventType::Unarchived => "unarchived",
        EventType::Shared => "shared",
        EventType::Left => "left",
    }
}

fn object_type_str(t: ObjectType) -> &'static str {
    match t {
        ObjectType::Item => "item",
        ObjectType::Project => "project",
        ObjectType::Section => "section",
        ObjectType::Label => "label",
    }
}
