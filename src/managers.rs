//! Per-kind managers: each composes a [`Store`] with that entity kind's remote fetch and DB
//! access, per §9's "a *Manager* per kind that composes Store with an entity-kind-specific fetch
//! function" design note.

use crate::config::Config;
use crate::db::Db;
use crate::entities::{Entity as _, Label, Project, Section, Task};
use crate::error::WaypointError;
use crate::ids::TaskId;
use crate::remote::Client;
use crate::store::Store;

pub struct TaskManager {
    store: Store<Task>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self { store: Store::new() }
    }

    pub fn store(&self) -> &Store<Task> {
        &self.store
    }

    /// §4.1 `load()`: reads all rows from the DB and replaces `current`. Leaves `current`
    /// unchanged on failure.
    pub async fn load(&mut self, db: &Db) -> Result<(), WaypointError> {
        let rows = db.load_tasks().await?;
        self.store.replace_current(rows.into_iter().map(|t| (t.id().clone(), t)).collect());
        Ok(())
    }

    /// §4.1 `sync()`: fetches all items from remote and replaces `synced`. Leaves `synced`
    /// unchanged on failure.
    pub async fn sync(&mut self, remote: &Client, config: &Config) -> Result<(), WaypointError> {
        let items = remote.list_tasks(config).await?;
        self.store.replace_synced(items.into_iter().map(|t| (t.id().clone(), t)).collect());
        Ok(())
    }

    pub async fn get_from_api(&self, id: &TaskId, remote: &Client, config: &Config) -> Result<Option<Task>, WaypointError> {
        remote.get_task(id, config).await
    }

    pub async fn get_from_db(&self, id: &TaskId, db: &Db) -> Result<Option<Task>, WaypointError> {
        db.load_task(id).await
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ProjectManager {
    store: Store<Project>,
}

impl ProjectManager {
    pub fn new() -> Self {
        Self { store: Store::new() }
    }

    pub fn store(&self) -> &Store<Project> {
        &self.store
    }

    pub async fn load(&mut self, db: &Db) -> Result<(), WaypointError> {
        let rows = db.load_projects().await?;
        self.store.replace_current(rows.into_iter().map(|p| (p.id().clone(), p)).collect());
        Ok(())
    }

    pub async fn sync(&mut self, remote: &Client) -> Result<(), WaypointError> {
        let items = remote.list_projects().await?;
        self.store.replace_synced(items.into_iter().map(|p| (p.id().clone(), p)).collect());
        Ok(())
    }
}

impl Default for ProjectManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SectionManager {
    store: Store<Section>,
}

impl SectionManager {
    pub fn new() -> Self {
        Self { store: Store::new() }
    }

    pub fn store(&self) -> &Store<Section> {
        &self.store
    }

    pub async fn load(&mut self, db: &Db) -> Result<(), WaypointError> {
        let rows = db.load_sections().await?;
        self.store.replace_current(rows.into_iter().map(|s| (s.id().clone(), s)).collect());
        Ok(())
    }

    /// Sections are synced on demand (§4.7 step 2), not on every tick.
    pub async fn sync(&mut self, remote: &Client) -> Result<(), WaypointError> {
        let items = remote.list_sections().await?;
        self.store.replace_synced(items.into_iter().map(|s| (s.id().clone(), s)).collect());
        Ok(())
    }
}

impl Default for SectionManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LabelManager {
    store: Store<Label>,
}

impl LabelManager {
    pub fn new() -> Self {
        Self { store: Store::new() }
    }

    pub fn store(&self) -> &Store<Label> {
        &self.store
    }

    pub async fn load(&mut self, db: &Db) -> Result<(), WaypointError> {
        let rows = db.load_labels().await?;
        self.store.replace_current(rows.into_iter().map(|l| (l.id().clone(), l)).collect());
        Ok(())
    }

    /// Labels are synced on demand (§4.7 step 2), not on every tick.
    pub async fn sync(&mut self, remote: &Client) -> Result<(), WaypointError> {
        let items = remote.list_labels().await?;
        self.store.replace_synced(items.into_iter().map(|l| (l.id().clone(), l)).collect());
        Ok(())
    }
}

impl Default for LabelManager {
    fn default() -> Self {
        Self::new()
    }
}
