use std::fmt::{Display, Formatter};

use crate::domain::{
    EntryId, EntryPatch, NewProject, NewTimeEntry, Project, ProjectId, ProjectPatch, TimeEntry,
    UserId,
};

/// Receives the full, freshly sorted, owner-scoped entry set after every
/// change, mirroring a document database's snapshot listener.
pub type EntryListener = Box<dyn FnMut(&[TimeEntry])>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug)]
pub enum StoreError {
    NotFound { collection: &'static str, id: String },
    Io(std::io::Error),
    TomlDecode(toml::de::Error),
    TomlEncode(toml::ser::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound { collection, id } => {
                write!(f, "{collection} not found: {id}")
            }
            StoreError::Io(err) => write!(f, "io error: {err}"),
            StoreError::TomlDecode(err) => write!(f, "failed to parse TOML header: {err}"),
            StoreError::TomlEncode(err) => write!(f, "failed to encode TOML header: {err}"),
            StoreError::JsonDecode(err) => write!(f, "failed to parse JSONL entry: {err}"),
            StoreError::JsonEncode(err) => write!(f, "failed to encode JSONL entry: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence boundary for projects and time entries.
///
/// Implementations stamp `created_at`/`updated_at` themselves and keep the
/// `is_active` field derived from `end_time` on every write; it is an index
/// field, never independent truth. Query results come back newest-first
/// (projects by creation, entries by start time with an id tiebreak).
pub trait EntryStore {
    fn create_project(&mut self, draft: NewProject) -> Result<Project, StoreError>;
    fn update_project(
        &mut self,
        id: &ProjectId,
        patch: ProjectPatch,
    ) -> Result<Project, StoreError>;
    fn delete_project(&mut self, id: &ProjectId) -> Result<(), StoreError>;
    fn projects_for(&self, owner: &UserId) -> Result<Vec<Project>, StoreError>;

    fn create_entry(&mut self, draft: NewTimeEntry) -> Result<TimeEntry, StoreError>;
    fn update_entry(&mut self, id: &EntryId, patch: EntryPatch) -> Result<TimeEntry, StoreError>;
    fn delete_entry(&mut self, id: &EntryId) -> Result<(), StoreError>;
    fn entries_for(&self, owner: &UserId) -> Result<Vec<TimeEntry>, StoreError>;

    /// Registers a snapshot listener scoped to one owner. The listener fires
    /// once per subsequent entry mutation until unsubscribed.
    fn subscribe_entries(&mut self, owner: &UserId, listener: EntryListener) -> ListenerId;
    fn unsubscribe(&mut self, id: ListenerId);
}
