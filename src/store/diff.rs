//! Per-kind equality-for-diffing rules.
//!
//! Plain derived `PartialEq` would work for every kind except [`crate::entities::Task`], whose
//! `due.string` field is re-rendered by the remote service at midnight even when nothing else
//! changed (§4.1, §8). Rather than special-case `Task` inside [`super::Store::updated_diff`],
//! each kind says for itself what "differs" means.

use crate::entities::{Entity, Label, Project, Section, Task};

pub trait DiffRule: Entity {
    /// True when `self` and `other` (assumed to share the same id) differ enough to be reported
    /// by [`super::Store::updated_diff`].
    fn differs(&self, other: &Self) -> bool;
}

impl DiffRule for Task {
    fn differs(&self, other: &Self) -> bool {
        self.differs_ignoring_due_string(other)
    }
}

impl DiffRule for Project {
    fn differs(&self, other: &Self) -> bool {
        self != other
    }
}

impl DiffRule for Section {
    fn differs(&self, other: &Self) -> bool {
        self != other
    }
}

impl DiffRule for Label {
    fn differs(&self, other: &Self) -> bool {
        self != other
    }
}
