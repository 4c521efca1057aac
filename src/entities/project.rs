//! Projects.

use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    name: String,
    parent_id: Option<ProjectId>,
    color: String,
    is_inbox: bool,
    is_favorite: bool,
}

impl Project {
    pub fn new(
        id: ProjectId,
        name: String,
        parent_id: Option<ProjectId>,
        color: String,
        is_inbox: bool,
        is_favorite: bool,
    ) -> Self {
        Self {
            id,
            name,
            parent_id,
            color,
            is_inbox,
            is_favorite,
        }
    }

    pub fn id(&self) -> &ProjectId {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn parent_id(&self) -> Option<&ProjectId> {
        self.parent_id.as_ref()
    }
    pub fn color(&self) -> &str {
        &self.color
    }
    pub fn is_inbox(&self) -> bool {
        self.is_inbox
    }
    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    /// A project with no parent is the analyzer's "root" and is exempt from the "no active
    /// goals"/"no planned duration" warnings (§4.6).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
