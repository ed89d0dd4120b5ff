use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::domain::{
    EntryId, EntryPatch, NewProject, NewTimeEntry, Project, ProjectId, ProjectPatch, TimeEntry,
    UserId, generate_id,
};
use crate::store::{EntryListener, EntryStore, ListenerId, StoreError};

const ENTRIES_MARKER: &str = "\n=== ENTRIES ===\n";

/// Workspace header persisted as TOML above the entry rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Profile {
    schema_version: u32,
    created_at: DateTime<Utc>,
    projects: Vec<Project>,
}

impl Profile {
    fn new() -> Self {
        Self {
            schema_version: 1,
            created_at: Utc::now(),
            projects: Vec::new(),
        }
    }
}

struct Subscription {
    id: ListenerId,
    owner: UserId,
    callback: EntryListener,
}

/// Document store backed by a single workspace file: a TOML profile header,
/// a marker line, then one JSON time entry per line. Without a path it acts
/// as a plain in-memory store (used by tests and throwaway sessions).
pub struct JsonStore {
    path: Option<PathBuf>,
    profile: Profile,
    entries: Vec<TimeEntry>,
    subscriptions: Vec<Subscription>,
    next_listener: u64,
}

impl JsonStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            profile: Profile::new(),
            entries: Vec::new(),
            subscriptions: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let raw = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let mut store = Self::in_memory();
                store.path = Some(path.to_path_buf());
                return Ok(store);
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        let mut store = Self::parse(&raw)?;
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    fn parse(raw: &str) -> Result<Self, StoreError> {
        if raw.trim().is_empty() {
            return Ok(Self::in_memory());
        }

        let (header_blob, entries_blob) = match raw.split_once(ENTRIES_MARKER) {
            Some((header, entries)) => (header, entries),
            None => (raw, ""),
        };

        let profile: Profile = toml::from_str(header_blob).map_err(StoreError::TomlDecode)?;
        let mut entries: Vec<TimeEntry> = Vec::new();
        for line in entries_blob.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(line).map_err(StoreError::JsonDecode)?);
        }

        // The active flag is an index over end_time; repair any divergence
        // a foreign writer may have left behind.
        for entry in &mut entries {
            let derived = entry.end_time.is_none();
            if entry.is_active != derived {
                warn!(
                    "entry {} had is_active out of sync with end_time, repairing",
                    entry.id
                );
                entry.is_active = derived;
            }
        }

        Ok(Self {
            path: None,
            profile,
            entries,
            subscriptions: Vec::new(),
            next_listener: 0,
        })
    }

    fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StoreError::Io)?;
            }
        }

        let header = toml::to_string_pretty(&self.profile).map_err(StoreError::TomlEncode)?;
        let mut file = fs::File::create(path).map_err(StoreError::Io)?;
        file.write_all(header.as_bytes()).map_err(StoreError::Io)?;
        file.write_all(ENTRIES_MARKER.as_bytes())
            .map_err(StoreError::Io)?;
        for entry in &self.entries {
            let line = serde_json::to_string(entry).map_err(StoreError::JsonEncode)?;
            file.write_all(line.as_bytes()).map_err(StoreError::Io)?;
            file.write_all(b"\n").map_err(StoreError::Io)?;
        }

        debug!("saved workspace to {}", path.display());
        Ok(())
    }

    /// Persists the mutated state, restoring the previous snapshot when the
    /// write fails so a failed mutation never becomes visible.
    fn persist_or_rollback(
        &mut self,
        previous_profile: Profile,
        previous_entries: Vec<TimeEntry>,
    ) -> Result<(), StoreError> {
        match self.save() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.profile = previous_profile;
                self.entries = previous_entries;
                Err(err)
            }
        }
    }

    fn sorted_projects(&self, owner: &UserId) -> Vec<Project> {
        let mut projects: Vec<Project> = self
            .profile
            .projects
            .iter()
            .filter(|project| &project.owner_id == owner)
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        projects
    }

    fn sorted_entries(&self, owner: &UserId) -> Vec<TimeEntry> {
        let mut entries: Vec<TimeEntry> = self
            .entries
            .iter()
            .filter(|entry| &entry.owner_id == owner)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    fn notify(&mut self, owner: &UserId) {
        let snapshot = self.sorted_entries(owner);
        for subscription in &mut self.subscriptions {
            if &subscription.owner == owner {
                (subscription.callback)(&snapshot);
            }
        }
    }
}

impl EntryStore for JsonStore {
    fn create_project(&mut self, draft: NewProject) -> Result<Project, StoreError> {
        let previous = (self.profile.clone(), self.entries.clone());
        let now = Utc::now();
        let project = Project {
            id: generate_id(),
            name: draft.name,
            color: draft.color,
            owner_id: draft.owner_id,
            is_pinned: false,
            created_at: now,
            updated_at: now,
        };
        self.profile.projects.push(project.clone());
        self.persist_or_rollback(previous.0, previous.1)?;
        debug!("created project {}", project.id);
        Ok(project)
    }

    fn update_project(
        &mut self,
        id: &ProjectId,
        patch: ProjectPatch,
    ) -> Result<Project, StoreError> {
        let previous = (self.profile.clone(), self.entries.clone());
        let project = self
            .profile
            .projects
            .iter_mut()
            .find(|project| &project.id == id)
            .ok_or_else(|| StoreError::NotFound {
                collection: "project",
                id: id.clone(),
            })?;

        if let Some(name) = patch.name {
            project.name = name;
        }
        if let Some(color) = patch.color {
            project.color = color;
        }
        if let Some(is_pinned) = patch.is_pinned {
            project.is_pinned = is_pinned;
        }
        project.updated_at = Utc::now();
        let updated = project.clone();

        self.persist_or_rollback(previous.0, previous.1)?;
        Ok(updated)
    }

    fn delete_project(&mut self, id: &ProjectId) -> Result<(), StoreError> {
        let previous = (self.profile.clone(), self.entries.clone());
        let before = self.profile.projects.len();
        self.profile.projects.retain(|project| &project.id != id);
        if self.profile.projects.len() == before {
            return Err(StoreError::NotFound {
                collection: "project",
                id: id.clone(),
            });
        }
        // Entries referencing the project stay behind; readers resolve the
        // dangling reference to a placeholder name.
        self.persist_or_rollback(previous.0, previous.1)?;
        debug!("deleted project {id}");
        Ok(())
    }

    fn projects_for(&self, owner: &UserId) -> Result<Vec<Project>, StoreError> {
        Ok(self.sorted_projects(owner))
    }

    fn create_entry(&mut self, draft: NewTimeEntry) -> Result<TimeEntry, StoreError> {
        let previous = (self.profile.clone(), self.entries.clone());
        let now = Utc::now();
        let entry = TimeEntry {
            id: generate_id(),
            project_id: draft.project_id,
            owner_id: draft.owner_id,
            start_time: draft.start_time,
            end_time: draft.end_time,
            description: draft.description,
            is_active: draft.end_time.is_none(),
            created_at: now,
            updated_at: now,
        };
        self.entries.push(entry.clone());
        self.persist_or_rollback(previous.0, previous.1)?;
        debug!("created entry {} for project {}", entry.id, entry.project_id);
        let owner = entry.owner_id.clone();
        self.notify(&owner);
        Ok(entry)
    }

    fn update_entry(&mut self, id: &EntryId, patch: EntryPatch) -> Result<TimeEntry, StoreError> {
        let previous = (self.profile.clone(), self.entries.clone());
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| &entry.id == id)
            .ok_or_else(|| StoreError::NotFound {
                collection: "time entry",
                id: id.clone(),
            })?;

        if let Some(start_time) = patch.start_time {
            entry.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            entry.end_time = Some(end_time);
        }
        if let Some(description) = patch.description {
            entry.description = description.and_then(|text| {
                let trimmed = text.trim().to_string();
                if trimmed.is_empty() { None } else { Some(trimmed) }
            });
        }
        entry.is_active = entry.end_time.is_none();
        entry.updated_at = Utc::now();
        let updated = entry.clone();

        self.persist_or_rollback(previous.0, previous.1)?;
        debug!("updated entry {id}");
        let owner = updated.owner_id.clone();
        self.notify(&owner);
        Ok(updated)
    }

    fn delete_entry(&mut self, id: &EntryId) -> Result<(), StoreError> {
        let previous = (self.profile.clone(), self.entries.clone());
        let owner = match self.entries.iter().find(|entry| &entry.id == id) {
            Some(entry) => entry.owner_id.clone(),
            None => {
                return Err(StoreError::NotFound {
                    collection: "time entry",
                    id: id.clone(),
                });
            }
        };
        self.entries.retain(|entry| &entry.id != id);
        self.persist_or_rollback(previous.0, previous.1)?;
        debug!("deleted entry {id}");
        self.notify(&owner);
        Ok(())
    }

    fn entries_for(&self, owner: &UserId) -> Result<Vec<TimeEntry>, StoreError> {
        Ok(self.sorted_entries(owner))
    }

    fn subscribe_entries(&mut self, owner: &UserId, listener: EntryListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.subscriptions.push(Subscription {
            id,
            owner: owner.clone(),
            callback: listener,
        });
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        self.subscriptions.retain(|subscription| subscription.id != id);
    }
}
