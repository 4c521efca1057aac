//! The entity store (§4.1): a typed local mirror of one entity kind, with the `current`/`synced`
//! set algebra the diff engine and orchestrator build on.
//!
//! This generalizes the teacher's `Provider`/`CalDavSource` current-vs-remote dichotomy: there,
//! `local` and `remote` are both full `CompleteCalendar`s kept in lockstep by a bidirectional
//! sync. Here there is no bidirectional push (the core is read-only against the remote, §1), so a
//! single [`Store`] just holds the two named snapshots and the pure, on-demand views over them.

pub mod diff;

use std::collections::HashMap;

use crate::entities::Entity;
use diff::DiffRule;

/// Two named snapshots of one entity kind: `current` (from the DB) and `synced` (from the
/// remote), plus the pure set-algebra views over them (§4.1).
#[derive(Debug, Clone, Default)]
pub struct Store<E: Entity> {
    current: HashMap<E::Id, E>,
    synced: HashMap<E::Id, E>,
}

impl<E: Entity> Store<E> {
    pub fn new() -> Self {
        Self {
            current: HashMap::new(),
            synced: HashMap::new(),
        }
    }

    pub fn current(&self) -> &HashMap<E::Id, E> {
        &self.current
    }

    pub fn synced(&self) -> &HashMap<E::Id, E> {
        &self.synced
    }

    /// Replaces `current`. Called by a [`crate::managers`] type after a successful DB read; never
    /// called on failure, so a failed `load()` leaves the previous `current` in place (§4.1).
    pub fn replace_current(&mut self, items: HashMap<E::Id, E>) {
        self.current = items;
    }

    /// Replaces `synced`. Called by a [`crate::managers`] type after a successful remote fetch.
    pub fn replace_synced(&mut self, items: HashMap<E::Id, E>) {
        self.synced = items;
    }

    /// `new` ≡ `synced \ current`.
    pub fn new_items(&self) -> Vec<&E> {
        self.synced
            .iter()
            .filter(|(id, _)| !self.current.contains_key(*id))
            .map(|(_, item)| item)
            .collect()
    }

    /// `removed` ≡ `current \ synced`.
    pub fn removed_items(&self) -> Vec<&E> {
        self.current
            .iter()
            .filter(|(id, _)| !self.synced.contains_key(*id))
            .map(|(_, item)| item)
            .collect()
    }
}

impl<E: Entity + DiffRule> Store<E> {
    /// For each id present in both snapshots, the `(current, synced)` pair when they differ
    /// (per [`DiffRule::differs`]). Empty when the two snapshots are identical (§8).
    pub fn updated_diff(&self) -> Vec<(&E, &E)> {
        self.current
            .iter()
            .filter_map(|(id, current_item)| {
                let synced_item = self.synced.get(id)?;
                if current_item.differs(synced_item) {
                    Some((current_item, synced_item))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::entities::Task;
    use crate::ids::{ProjectId, TaskId};

    fn task(id: &str, content: &str) -> Task {
        Task::new(
            TaskId::from(id),
            content.to_string(),
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
    }

    #[test]
    fn new_is_synced_minus_current() {
        let mut store: Store<Task> = Store::new();
        store.replace_current(HashMap::from([(TaskId::from("t1"), task("t1", "a"))]));
        store.replace_synced(HashMap::from([
            (TaskId::from("t1"), task("t1", "a")),
            (TaskId::from("t2"), task("t2", "b")),
        ]));
        let new_ids: Vec<_> = store.new_items().iter().map(|t| t.id().clone()).collect();
        assert_eq!(new_ids, vec![TaskId::from("t2")]);
    }

    #[test]
    fn removed_is_current_minus_synced() {
        let mut store: Store<Task> = Store::new();
        store.replace_current(HashMap::from([
            (TaskId::from("t1"), task("t1", "a")),
            (TaskId::from("t2"), task("t2", "b")),
        ]));
        store.replace_synced(HashMap::from([(TaskId::from("t1"), task("t1", "a"))]));
        let removed_ids: Vec<_> = store.removed_items().iter().map(|t| t.id().clone()).collect();
        assert_eq!(removed_ids, vec![TaskId::from("t2")]);
    }

    #[test]
    fn updated_diff_is_empty_for_identical_snapshots() {
        let _config = Config::for_tests();
        let mut store: Store<Task> = Store::new();
        store.replace_current(HashMap::from([(TaskId::from("t1"), task("t1", "a"))]));
        store.replace_synced(HashMap::from([(TaskId::from("t1"), task("t1", "a"))]));
        assert!(store.updated_diff().is_empty());
    }

    #[test]
    fn updated_diff_reports_changed_content() {
        let mut store: Store<Task> = Store::new();
        store.replace_current(HashMap::from([(TaskId::from("t1"), task("t1", "old"))]));
        store.replace_synced(HashMap::from([(TaskId::from("t1"), task("t1", "new"))]));
        assert_eq!(store.updated_diff().len(), 1);
    }
}
