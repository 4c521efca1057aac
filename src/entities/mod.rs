//! The data model (§3): entity structs plus the `Entity` capability every kind implements.

pub mod due;
pub mod event;
pub mod label;
pub mod project;
pub mod section;
pub mod task;

pub use due::Due;
pub use event::Event;
pub use label::Label;
pub use project::Project;
pub use section::Section;
pub use task::Task;

/// The capability a [`crate::store::Store`] needs from whatever it holds: a stable id, and a
/// lossless round trip through a flat key/value record (what a DB row, or the wire JSON, looks
/// like). This replaces the source's `to_dict`/`from_dict` pair on each entity with one shared
/// interface.
pub trait Entity: Clone {
    type Id: Clone + Eq + std::hash::Hash;

    fn id(&self) -> &Self::Id;
}

impl Entity for Task {
    type Id = crate::ids::TaskId;
    fn id(&self) -> &Self::Id {
        Task::id(self)
    }
}

impl Entity for Project {
    type Id = crate::ids::ProjectId;
    fn id(&self) -> &Self::Id {
        Project::id(self)
    }
}

impl Entity for Section {
    type Id = crate::ids::SectionId;
    fn id(&self) -> &Self::Id {
        Section::id(self)
    }
}

impl Entity for Label {
    type Id = crate::ids::LabelId;
    fn id(&self) -> &Self::Id {
        Label::id(self)
    }
}

impl Entity for Event {
    type Id = crate::ids::EventId;
    fn id(&self) -> &Self::Id {
        Event::id(self)
    }
}
