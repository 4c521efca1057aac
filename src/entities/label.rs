//! Labels.

use serde::{Deserialize, Serialize};

use crate::ids::LabelId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Label {
    id: LabelId,
    name: String,
    color: String,
    is_favorite: bool,
}

impl Label {
    pub fn new(id: LabelId, name: String, color: String, is_favorite: bool) -> Self {
        Self {
            id,
            name,
            color,
            is_favorite,
        }
    }

    pub fn id(&self) -> &LabelId {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn color(&self) -> &str {
        &self.color
    }
    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }
}
