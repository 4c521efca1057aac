//! Activity events: the append-only feed the diff engine classifies remote mutations from.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::EventId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Added,
    Updated,
    Deleted,
    Completed,
    Uncompleted,
    Archived,
    Unarchived,
    Shared,
    Left,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Item,
    Project,
    Section,
    Label,
}

/// A single activity-log entry, as mirrored locally (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    event_date: NaiveDateTime,
    event_type: EventType,
    object_type: ObjectType,
    object_id: String,
    /// Free-form payload: `last_content`, `last_due_date`, `last_description`, and the
    /// corresponding post-mutation values, whichever the remote service chose to include.
    extra_data: HashMap<String, serde_json::Value>,
    initiator_id: Option<String>,
    parent_item_id: Option<String>,
    parent_project_id: Option<String>,
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EventId,
        event_date: NaiveDateTime,
        event_type: EventType,
        object_type: ObjectType,
        object_id: String,
        extra_data: HashMap<String, serde_json::Value>,
        initiator_id: Option<String>,
        parent_item_id: Option<String>,
        parent_project_id: Option<String>,
    ) -> Self {
        Self {
            id,
            event_date,
            event_type,
            object_type,
            object_id,
            extra_data,
            initiator_id,
            parent_item_id,
            parent_project_id,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }
    pub fn event_date(&self) -> NaiveDateTime {
        self.event_date
    }
    pub fn event_type(&self) -> EventType {
        self.event_type
    }
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }
    pub fn object_id(&self) -> &str {
        &self.object_id
    }
    pub fn extra_data(&self) -> &HashMap<String, serde_json::Value> {
        &self.extra_data
    }
    pub fn initiator_id(&self) -> Option<&str> {
        self.initiator_id.as_deref()
    }
    pub fn parent_item_id(&self) -> Option<&str> {
        self.parent_item_id.as_deref()
    }
    pub fn parent_project_id(&self) -> Option<&str> {
        self.parent_project_id.as_deref()
    }

    /// Reads `extra_data.last_<attr>`, the §4.7 folding rule's "was this attribute actually
    /// touched by this event" signal.
    pub fn last_value(&self, attr: &str) -> Option<&serde_json::Value> {
        self.extra_data.get(&format!("last_{attr}"))
    }

    /// Reads `extra_data.<attr>`, the post-mutation value to fold in.
    pub fn current_value(&self, attr: &str) -> Option<&serde_json::Value> {
        self.extra_data.get(attr)
    }
}
