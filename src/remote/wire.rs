//! Wire DTOs for the remote task service (§6) and their conversion into entities.
//!
//! Kept separate from `entities::*` because the wire shape (nullable fields, `due.*` structure,
//! string timestamps) is a serialization detail, not part of the domain model.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::config::Config;
use crate::entities::{Due, Event, Label, Project, Section, Task};
use crate::entities::event::{EventType, ObjectType};
use crate::error::WaypointError;
use crate::ids::{EventId, LabelId, ProjectId, SectionId, TaskId};

#[derive(Debug, Deserialize)]
pub struct WireDue {
    pub date: String,
    pub datetime: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub string: String,
    pub timezone: Option<String>,
}

impl WireDue {
    pub fn into_due(self, config: &Config) -> Result<Due, WaypointError> {
        let datetime = match &self.datetime {
            Some(raw) => Some(Due::parse_datetime(raw, config)?),
            None => None,
        };
        Ok(Due {
            date: Due::parse_date(&self.date, config)?,
            datetime,
            is_recurring: self.is_recurring,
            string: self.string,
            timezone: self.timezone,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WireTask {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub description: String,
    pub priority: u8,
    pub project_id: String,
    pub section_id: Option<String>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub labels: HashSet<String>,
    pub due: Option<WireDue>,
    pub is_completed: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl WireTask {
    pub fn into_task(self, config: &Config) -> Result<Task, WaypointError> {
        let due = self.due.map(|d| d.into_due(config)).transpose()?;
        Ok(Task::new(
            TaskId::from(self.id),
            self.content,
            self.description,
            self.priority,
            ProjectId::from(self.project_id),
            self.section_id.map(SectionId::from),
            self.parent_id.map(TaskId::from),
            self.labels,
            due,
            self.is_completed,
            self.is_deleted,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct WireProject {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub is_inbox: bool,
    #[serde(default)]
    pub is_favorite: bool,
}

impl From<WireProject> for Project {
    fn from(w: WireProject) -> Self {
        Project::new(
            ProjectId::from(w.id),
            w.name,
            w.parent_id.map(ProjectId::from),
            w.color,
            w.is_inbox,
            w.is_favorite,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct WireSection {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub order: i32,
}

impl From<WireSection> for Section {
    fn from(w: WireSection) -> Self {
        Section::new(SectionId::from(w.id), w.name, ProjectId::from(w.project_id), w.order)
    }
}

#[derive(Debug, Deserialize)]
pub struct WireLabel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub is_favorite: bool,
}

impl From<WireLabel> for Label {
    fn from(w: WireLabel) -> Self {
        Label::new(LabelId::from(w.id), w.name, w.color, w.is_favorite)
    }
}

#[derive(Debug, Deserialize)]
pub struct WireEvent {
    pub id: String,
    pub event_date: String,
    pub event_type: String,
    pub object_type: String,
    pub object_id: String,
    #[serde(default)]
    pub extra_data: HashMap<String, serde_json::Value>,
    pub initiator_id: Option<String>,
    pub parent_item_id: Option<String>,
    pub parent_project_id: Option<String>,
}

impl WireEvent {
    pub fn into_event(self, config: &Config) -> Result<Event, WaypointError> {
        // Activity timestamps, unlike due-datetimes, never arrive bare-date-only; surface a
        // format error naming the offending field rather than silently reusing `today`.
        let event_date = Due::parse_datetime(&self.event_date, config).map_err(|_| {
            WaypointError::Format(format!(
                "event_date {:?} did not match any configured datetime format",
                self.event_date
            ))
        })?;
        let event_type = parse_event_type(&self.event_type)?;
        let object_type = parse_object_type(&self.object_type)?;
        Ok(Event::new(
            EventId::from(self.id),
            event_date,
            event_type,
            object_type,
            self.object_id,
            self.extra_data,
            self.initiator_id,
            self.parent_item_id,
            self.parent_project_id,
        ))
    }
}

fn parse_event_type(raw: &str) -> Result<EventType, WaypointError> {
    Ok(match raw {
        "added" => EventType::Added,
        "updated" => EventType::Updated,
        "deleted" => EventType::Deleted,
        "completed" => EventType::Completed,
        "uncompleted" => EventType::Uncompleted,
        "archived" => EventType::Archived,
        "unarchived" => EventType::Unarchived,
        "shared" => EventType::Shared,
        "left" => EventType::Left,
        other => return Err(WaypointError::Format(format!("unknown event_type {other:?}"))),
    })
}

fn parse_object_type(raw: &str) -> Result<ObjectType, WaypointError> {
    Ok(match raw {
        "item" => ObjectType::Item,
        "project" => ObjectType::Project,
        "section" => ObjectType::Section,
        "label" => ObjectType::Label,
        other => return Err(WaypointError::Format(format!("unknown object_type {other:?}"))),
    })
}

#[derive(Debug, Deserialize)]
pub struct ActivityPage {
    pub events: Vec<WireEvent>,
    pub count: u32,
}
