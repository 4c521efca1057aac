//! Sections.

use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, SectionId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    id: SectionId,
    name: String,
    project_id: ProjectId,
    order: i32,
}

impl Section {
    pub fn new(id: SectionId, name: String, project_id: ProjectId, order: i32) -> Self {
        Self {
            id,
            name,
            project_id,
            order,
        }
    }

    pub fn id(&self) -> &SectionId {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }
    pub fn order(&self) -> i32 {
        self.order
    }
}
