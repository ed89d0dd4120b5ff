use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

use crate::auth::UserSession;
use crate::domain::{
    EntryId, EntryPatch, MIN_ENTRY_MINUTES, NewProject, NewTimeEntry, Project, ProjectId,
    ProjectPatch, TimeEntry, elapsed_label, normalize_hex_color,
};
use crate::store::{EntryStore, ListenerId, StoreError};

/// Cadence at which consumers should re-render the elapsed label while a
/// session is running. Stop ticking as soon as `elapsed(..)` returns `None`.
pub const TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);

#[derive(Debug)]
pub enum TrackError {
    SessionAlreadyActive,
    NoActiveSession,
    UnknownProject(ProjectId),
    EmptyProjectName,
    InvalidColor(String),
    StartInFuture,
    StartAfterEnd,
    EndInFuture,
    EndBeforeStart,
    /// The running session was stopped, but starting the next one failed.
    /// Recoverable: nothing is left running, the caller retries the start.
    SwitchInterrupted(StoreError),
    Store(StoreError),
}

impl Display for TrackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackError::SessionAlreadyActive => {
                write!(f, "a tracking session is already active")
            }
            TrackError::NoActiveSession => write!(f, "no tracking session is active"),
            TrackError::UnknownProject(id) => write!(f, "unknown project: {id}"),
            TrackError::EmptyProjectName => write!(f, "project name is required"),
            TrackError::InvalidColor(value) => {
                write!(f, "color must be a 6-digit hex value: {value}")
            }
            TrackError::StartInFuture => write!(f, "start time cannot be in the future"),
            TrackError::StartAfterEnd => write!(
                f,
                "start time must leave at least {MIN_ENTRY_MINUTES} minute before the end"
            ),
            TrackError::EndInFuture => write!(f, "end time cannot be in the future"),
            TrackError::EndBeforeStart => write!(
                f,
                "end time must leave at least {MIN_ENTRY_MINUTES} minute after the start"
            ),
            TrackError::SwitchInterrupted(err) => write!(
                f,
                "previous session was stopped but the new one failed to start: {err}"
            ),
            TrackError::Store(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl std::error::Error for TrackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackError::SwitchInterrupted(err) | TrackError::Store(err) => Some(err),
            _ => None,
        }
    }
}

/// Time-tracking session manager for one signed-in user.
///
/// Holds a snapshot cache fed by a store subscription; the snapshot is
/// authoritative and local state is always reconciled to it, so a failed
/// write can never linger as phantom local success. All mutations are
/// serialized through `&mut self`.
pub struct Tracker<S: EntryStore> {
    store: Rc<RefCell<S>>,
    session: UserSession,
    entries: Rc<RefCell<Vec<TimeEntry>>>,
    listener: Option<ListenerId>,
}

impl<S: EntryStore> Tracker<S> {
    pub fn new(store: Rc<RefCell<S>>, session: UserSession) -> Result<Self, TrackError> {
        let entries = Rc::new(RefCell::new(Vec::new()));
        let cache = Rc::clone(&entries);
        let listener = store.borrow_mut().subscribe_entries(
            &session.user_id,
            Box::new(move |snapshot| *cache.borrow_mut() = snapshot.to_vec()),
        );

        let mut tracker = Self {
            store,
            session,
            entries,
            listener: Some(listener),
        };
        tracker.refresh()?;
        Ok(tracker)
    }

    pub fn session(&self) -> &UserSession {
        &self.session
    }

    /// Re-pulls the authoritative entry set from the store.
    pub fn refresh(&mut self) -> Result<(), TrackError> {
        let snapshot = self
            .store
            .borrow()
            .entries_for(&self.session.user_id)
            .map_err(TrackError::Store)?;
        *self.entries.borrow_mut() = snapshot;
        Ok(())
    }

    /// Unregisters the store subscription and drops the snapshot. Called on
    /// sign-out and from `Drop`, so every exit path tears down.
    pub fn detach(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.store.borrow_mut().unsubscribe(listener);
        }
        self.entries.borrow_mut().clear();
    }

    pub fn entries(&self) -> Vec<TimeEntry> {
        self.entries.borrow().clone()
    }

    /// The single canonical running entry, if any. The store is expected to
    /// hold at most one; if a corrupt snapshot ever holds several, the most
    /// recently started wins and the anomaly is logged.
    pub fn active_entry(&self) -> Option<TimeEntry> {
        let entries = self.entries.borrow();
        let mut running = entries.iter().filter(|entry| entry.is_running());
        let first = running.next()?.clone();
        let extra = running.count();
        if extra > 0 {
            warn!(
                "found {} running entries for {}, expected at most one",
                extra + 1,
                self.session.user_id
            );
        }
        Some(first)
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<String> {
        self.active_entry()
            .map(|entry| elapsed_label(entry.start_time, now))
    }

    pub fn start_tracking(
        &mut self,
        project_id: &ProjectId,
        now: DateTime<Utc>,
    ) -> Result<TimeEntry, TrackError> {
        if self.active_entry().is_some() {
            return Err(TrackError::SessionAlreadyActive);
        }
        self.require_project(project_id)?;

        let draft = NewTimeEntry::running(
            project_id.clone(),
            self.session.user_id.clone(),
            now,
        );
        let result = self.store.borrow_mut().create_entry(draft);
        match result {
            Ok(entry) => {
                info!("started tracking {} on project {}", entry.id, project_id);
                Ok(entry)
            }
            Err(err) => Err(self.store_failure(err)),
        }
    }

    pub fn stop_tracking(&mut self, now: DateTime<Utc>) -> Result<TimeEntry, TrackError> {
        let active = self.active_entry().ok_or(TrackError::NoActiveSession)?;
        // Never write an end before the recorded start, even under clock skew.
        let end_time = now.max(active.start_time);
        let patch = EntryPatch {
            end_time: Some(end_time),
            ..EntryPatch::default()
        };
        let result = self.store.borrow_mut().update_entry(&active.id, patch);
        match result {
            Ok(entry) => {
                info!("stopped tracking {}", entry.id);
                Ok(entry)
            }
            Err(err) => Err(self.store_failure(err)),
        }
    }

    /// Stop-then-start as one caller-facing operation. At no observable point
    /// are two entries running; a failure after the stop is reported as
    /// `SwitchInterrupted` instead of being papered over.
    pub fn switch_tracking(
        &mut self,
        project_id: &ProjectId,
        now: DateTime<Utc>,
    ) -> Result<TimeEntry, TrackError> {
        self.require_project(project_id)?;

        let stopped = if self.active_entry().is_some() {
            self.stop_tracking(now)?;
            true
        } else {
            false
        };

        match self.start_tracking(project_id, now) {
            Ok(entry) => Ok(entry),
            Err(TrackError::Store(err)) if stopped => Err(TrackError::SwitchInterrupted(err)),
            Err(err) => Err(err),
        }
    }

    pub fn update_active_description(&mut self, text: &str) -> Result<TimeEntry, TrackError> {
        let active = self.active_entry().ok_or(TrackError::NoActiveSession)?;
        let patch = EntryPatch {
            description: Some(Some(text.to_string())),
            ..EntryPatch::default()
        };
        let result = self.store.borrow_mut().update_entry(&active.id, patch);
        result.map_err(|err| self.store_failure(err))
    }

    /// Re-times one or both bounds of an entry, the way a calendar drag
    /// moves or resizes a block. Neither bound may land in the future, and
    /// the resulting pair must keep at least the minimum duration between
    /// them. Setting an end on a running entry completes it; an end can
    /// never be cleared.
    pub fn retime_entry(
        &mut self,
        entry_id: &EntryId,
        new_start: Option<DateTime<Utc>>,
        new_end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<TimeEntry, TrackError> {
        let entry = self
            .entries
            .borrow()
            .iter()
            .find(|entry| &entry.id == entry_id)
            .cloned()
            .ok_or_else(|| {
                TrackError::Store(StoreError::NotFound {
                    collection: "time entry",
                    id: entry_id.clone(),
                })
            })?;

        if matches!(new_start, Some(start) if start > now) {
            return Err(TrackError::StartInFuture);
        }
        if matches!(new_end, Some(end) if end > now) {
            return Err(TrackError::EndInFuture);
        }

        let start = new_start.unwrap_or(entry.start_time);
        if let Some(end) = new_end.or(entry.end_time) {
            if start + Duration::minutes(MIN_ENTRY_MINUTES) > end {
                return Err(if new_start.is_some() {
                    TrackError::StartAfterEnd
                } else {
                    TrackError::EndBeforeStart
                });
            }
        }

        let patch = EntryPatch {
            start_time: new_start,
            end_time: new_end,
            ..EntryPatch::default()
        };
        let result = self.store.borrow_mut().update_entry(entry_id, patch);
        result.map_err(|err| self.store_failure(err))
    }

    /// Corrects when an entry actually began.
    pub fn edit_start_time(
        &mut self,
        entry_id: &EntryId,
        new_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<TimeEntry, TrackError> {
        self.retime_entry(entry_id, Some(new_start), None, now)
    }

    /// Corrects when an entry ended. On a running entry this completes it at
    /// the given instant.
    pub fn edit_end_time(
        &mut self,
        entry_id: &EntryId,
        new_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<TimeEntry, TrackError> {
        self.retime_entry(entry_id, None, Some(new_end), now)
    }

    /// Persists a backfilled entry the validator has already shaped.
    pub fn log_entry(&mut self, draft: NewTimeEntry) -> Result<TimeEntry, TrackError> {
        let result = self.store.borrow_mut().create_entry(draft);
        result.map_err(|err| self.store_failure(err))
    }

    pub fn delete_entry(&mut self, entry_id: &EntryId) -> Result<(), TrackError> {
        let result = self.store.borrow_mut().delete_entry(entry_id);
        result.map_err(|err| self.store_failure(err))
    }

    pub fn projects(&self) -> Result<Vec<Project>, TrackError> {
        self.store
            .borrow()
            .projects_for(&self.session.user_id)
            .map_err(TrackError::Store)
    }

    pub fn create_project(&mut self, name: &str, color: &str) -> Result<Project, TrackError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackError::EmptyProjectName);
        }
        let color = normalize_hex_color(color)
            .ok_or_else(|| TrackError::InvalidColor(color.to_string()))?;

        let draft = NewProject {
            name: name.to_string(),
            color,
            owner_id: self.session.user_id.clone(),
        };
        let result = self.store.borrow_mut().create_project(draft);
        result.map_err(|err| self.store_failure(err))
    }

    pub fn set_pinned(
        &mut self,
        project_id: &ProjectId,
        pinned: bool,
    ) -> Result<Project, TrackError> {
        let patch = ProjectPatch {
            is_pinned: Some(pinned),
            ..ProjectPatch::default()
        };
        let result = self.store.borrow_mut().update_project(project_id, patch);
        result.map_err(|err| self.store_failure(err))
    }

    pub fn delete_project(&mut self, project_id: &ProjectId) -> Result<(), TrackError> {
        let result = self.store.borrow_mut().delete_project(project_id);
        result.map_err(|err| self.store_failure(err))
    }

    fn require_project(&self, project_id: &ProjectId) -> Result<(), TrackError> {
        let known = self
            .store
            .borrow()
            .projects_for(&self.session.user_id)
            .map_err(TrackError::Store)?
            .iter()
            .any(|project| &project.id == project_id);
        if known {
            Ok(())
        } else {
            Err(TrackError::UnknownProject(project_id.clone()))
        }
    }

    /// A failed write never becomes local truth: re-sync from the store
    /// before surfacing the error.
    fn store_failure(&mut self, err: StoreError) -> TrackError {
        if let Err(sync_err) = self.refresh() {
            warn!("re-sync after failed write also failed: {sync_err}");
        }
        TrackError::Store(err)
    }
}

impl<S: EntryStore> Drop for Tracker<S> {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::auth::{AuthError, AuthProvider, UserSession};
    use crate::domain::{EntryState, NewTimeEntry, Project, format_duration, round_minutes};
    use crate::storage::JsonStore;
    use crate::store::EntryStore;

    use super::{TrackError, Tracker};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn session() -> UserSession {
        UserSession::new("user-1", "user@example.com")
    }

    fn tracker_with_project() -> (Rc<RefCell<JsonStore>>, Tracker<JsonStore>, Project) {
        let store = Rc::new(RefCell::new(JsonStore::in_memory()));
        let mut tracker = Tracker::new(Rc::clone(&store), session()).unwrap();
        let project = tracker.create_project("Client Work", "#3B82F6").unwrap();
        (store, tracker, project)
    }

    fn running_count(tracker: &Tracker<JsonStore>) -> usize {
        tracker
            .entries()
            .iter()
            .filter(|entry| entry.is_running())
            .count()
    }

    #[test]
    fn tick_cadence_is_one_second() {
        assert_eq!(super::TICK_INTERVAL, std::time::Duration::from_secs(1));
    }

    #[test]
    fn start_stop_cycle_produces_one_completed_entry() {
        let (_store, mut tracker, project) = tracker_with_project();

        let started = tracker.start_tracking(&project.id, t0()).unwrap();
        assert_eq!(started.start_time, t0());
        assert!(tracker.active_entry().is_some());

        assert_eq!(started.state(), EntryState::Running);

        let stopped = tracker
            .stop_tracking(t0() + Duration::seconds(90))
            .unwrap();
        assert_eq!(stopped.end_time, Some(t0() + Duration::seconds(90)));
        assert_eq!(stopped.state(), EntryState::Completed);
        assert!(!stopped.is_active);
        assert!(tracker.active_entry().is_none());

        let minutes = round_minutes(stopped.duration_ms(t0() + Duration::seconds(90)));
        assert_eq!(format_duration(minutes), "2m");
    }

    #[test]
    fn second_start_is_rejected_while_active() {
        let (_store, mut tracker, project) = tracker_with_project();
        tracker.start_tracking(&project.id, t0()).unwrap();

        let err = tracker
            .start_tracking(&project.id, t0() + Duration::minutes(1))
            .unwrap_err();
        assert!(matches!(err, TrackError::SessionAlreadyActive));
        assert_eq!(running_count(&tracker), 1);
    }

    #[test]
    fn at_most_one_entry_runs_across_any_sequence() {
        let (_store, mut tracker, project) = tracker_with_project();
        let other = tracker.create_project("Side Project", "#EF4444").unwrap();

        let mut now = t0();
        tracker.start_tracking(&project.id, now).unwrap();
        assert!(running_count(&tracker) <= 1);

        now += Duration::minutes(3);
        tracker.switch_tracking(&other.id, now).unwrap();
        assert!(running_count(&tracker) <= 1);

        now += Duration::minutes(2);
        tracker.stop_tracking(now).unwrap();
        assert_eq!(running_count(&tracker), 0);

        now += Duration::minutes(1);
        tracker.switch_tracking(&project.id, now).unwrap();
        assert_eq!(running_count(&tracker), 1);
    }

    #[test]
    fn switch_closes_previous_and_opens_next_at_the_boundary() {
        let (_store, mut tracker, project) = tracker_with_project();
        let next = tracker.create_project("Next Up", "#10B981").unwrap();

        tracker.start_tracking(&project.id, t0()).unwrap();
        let boundary = t0() + Duration::minutes(5);
        let started = tracker.switch_tracking(&next.id, boundary).unwrap();

        let entries = tracker.entries();
        let previous: Vec<_> = entries
            .iter()
            .filter(|entry| entry.project_id == project.id)
            .collect();
        assert_eq!(previous.len(), 1);
        assert_eq!(previous[0].end_time, Some(boundary));

        assert_eq!(started.project_id, next.id);
        assert_eq!(started.start_time, boundary);
        let active = tracker.active_entry().unwrap();
        assert_eq!(active.id, started.id);
    }

    #[test]
    fn switch_without_active_session_just_starts() {
        let (_store, mut tracker, project) = tracker_with_project();
        let started = tracker.switch_tracking(&project.id, t0()).unwrap();
        assert!(started.is_running());
        assert_eq!(running_count(&tracker), 1);
    }

    #[test]
    fn stop_without_active_session_is_reported() {
        let (_store, mut tracker, _project) = tracker_with_project();
        let err = tracker.stop_tracking(t0()).unwrap_err();
        assert!(matches!(err, TrackError::NoActiveSession));
    }

    #[test]
    fn start_requires_a_known_project() {
        let (_store, mut tracker, _project) = tracker_with_project();
        let err = tracker
            .start_tracking(&"missing".to_string(), t0())
            .unwrap_err();
        assert!(matches!(err, TrackError::UnknownProject(_)));
    }

    #[test]
    fn switch_to_unknown_project_leaves_session_running() {
        let (_store, mut tracker, project) = tracker_with_project();
        tracker.start_tracking(&project.id, t0()).unwrap();

        let err = tracker
            .switch_tracking(&"missing".to_string(), t0() + Duration::minutes(1))
            .unwrap_err();
        assert!(matches!(err, TrackError::UnknownProject(_)));
        assert_eq!(running_count(&tracker), 1);
    }

    #[test]
    fn description_edits_apply_to_the_running_entry() {
        let (_store, mut tracker, project) = tracker_with_project();
        tracker.start_tracking(&project.id, t0()).unwrap();

        let updated = tracker
            .update_active_description("  reviewing the brief  ")
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("reviewing the brief"));

        tracker.stop_tracking(t0() + Duration::minutes(2)).unwrap();
        let err = tracker.update_active_description("too late").unwrap_err();
        assert!(matches!(err, TrackError::NoActiveSession));
    }

    #[test]
    fn start_time_edits_reject_future_and_too_late_starts() {
        let (_store, mut tracker, project) = tracker_with_project();
        let started = tracker.start_tracking(&project.id, t0()).unwrap();
        let now = t0() + Duration::minutes(10);

        let err = tracker
            .edit_start_time(&started.id, now + Duration::minutes(1), now)
            .unwrap_err();
        assert!(matches!(err, TrackError::StartInFuture));

        let corrected = tracker
            .edit_start_time(&started.id, t0() - Duration::minutes(15), now)
            .unwrap();
        assert_eq!(corrected.start_time, t0() - Duration::minutes(15));

        let stopped = tracker.stop_tracking(now).unwrap();
        let err = tracker
            .edit_start_time(&stopped.id, now, now + Duration::minutes(1))
            .unwrap_err();
        assert!(matches!(err, TrackError::StartAfterEnd));
    }

    #[test]
    fn end_time_edits_complete_a_running_entry() {
        let (_store, mut tracker, project) = tracker_with_project();
        tracker.start_tracking(&project.id, t0()).unwrap();

        let running = tracker.active_entry().unwrap();
        let chosen_end = t0() + Duration::minutes(25);
        let completed = tracker
            .edit_end_time(&running.id, chosen_end, t0() + Duration::minutes(30))
            .unwrap();
        assert_eq!(completed.end_time, Some(chosen_end));
        assert!(!completed.is_active);
        assert!(tracker.active_entry().is_none());
    }

    #[test]
    fn end_time_edits_reject_future_and_too_early_ends() {
        let (_store, mut tracker, project) = tracker_with_project();
        tracker.start_tracking(&project.id, t0()).unwrap();
        let stopped = tracker.stop_tracking(t0() + Duration::minutes(10)).unwrap();
        let now = t0() + Duration::minutes(20);

        let err = tracker
            .edit_end_time(&stopped.id, now + Duration::minutes(1), now)
            .unwrap_err();
        assert!(matches!(err, TrackError::EndInFuture));

        let err = tracker
            .edit_end_time(&stopped.id, t0() + Duration::seconds(30), now)
            .unwrap_err();
        assert!(matches!(err, TrackError::EndBeforeStart));

        let shortened = tracker
            .edit_end_time(&stopped.id, t0() + Duration::minutes(5), now)
            .unwrap();
        assert_eq!(shortened.end_time, Some(t0() + Duration::minutes(5)));
    }

    #[test]
    fn retiming_both_bounds_moves_an_entry_past_its_old_window() {
        let (_store, mut tracker, project) = tracker_with_project();
        tracker.start_tracking(&project.id, t0()).unwrap();
        let stopped = tracker.stop_tracking(t0() + Duration::minutes(30)).unwrap();
        let now = t0() + Duration::minutes(120);

        // The new window lies entirely after the old one, which neither
        // single-bound edit could reach on its own.
        let moved = tracker
            .retime_entry(
                &stopped.id,
                Some(t0() + Duration::minutes(60)),
                Some(t0() + Duration::minutes(90)),
                now,
            )
            .unwrap();
        assert_eq!(moved.start_time, t0() + Duration::minutes(60));
        assert_eq!(moved.end_time, Some(t0() + Duration::minutes(90)));

        let err = tracker
            .retime_entry(
                &stopped.id,
                Some(t0() + Duration::minutes(90)),
                Some(t0() + Duration::minutes(90)),
                now,
            )
            .unwrap_err();
        assert!(matches!(err, TrackError::StartAfterEnd));
    }

    #[test]
    fn elapsed_label_tracks_the_active_entry_only() {
        let (_store, mut tracker, project) = tracker_with_project();
        assert_eq!(tracker.elapsed(t0()), None);

        tracker.start_tracking(&project.id, t0()).unwrap();
        assert_eq!(
            tracker.elapsed(t0() + Duration::minutes(1)).as_deref(),
            Some("about 1 minute")
        );

        tracker.stop_tracking(t0() + Duration::minutes(2)).unwrap();
        assert_eq!(tracker.elapsed(t0() + Duration::minutes(3)), None);
    }

    #[test]
    fn snapshot_follows_writes_made_through_other_handles() {
        let (store, tracker, project) = tracker_with_project();

        store
            .borrow_mut()
            .create_entry(NewTimeEntry::running(
                project.id.clone(),
                "user-1".to_string(),
                t0(),
            ))
            .unwrap();

        assert_eq!(tracker.entries().len(), 1);
        assert!(tracker.active_entry().is_some());
    }

    #[test]
    fn corrupt_snapshot_with_two_running_entries_yields_one_canonical_pick() {
        let (store, tracker, project) = tracker_with_project();

        store
            .borrow_mut()
            .create_entry(NewTimeEntry::running(
                project.id.clone(),
                "user-1".to_string(),
                t0(),
            ))
            .unwrap();
        store
            .borrow_mut()
            .create_entry(NewTimeEntry::running(
                project.id.clone(),
                "user-1".to_string(),
                t0() + Duration::minutes(1),
            ))
            .unwrap();

        let active = tracker.active_entry().unwrap();
        assert_eq!(active.start_time, t0() + Duration::minutes(1));
    }

    #[test]
    fn detach_tears_down_the_subscription() {
        let (store, mut tracker, project) = tracker_with_project();
        tracker.start_tracking(&project.id, t0()).unwrap();
        tracker.detach();
        assert!(tracker.entries().is_empty());

        // Further store changes no longer reach the detached tracker.
        store
            .borrow_mut()
            .create_entry(NewTimeEntry::running(
                project.id.clone(),
                "user-1".to_string(),
                t0() + Duration::minutes(5),
            ))
            .unwrap();
        assert!(tracker.entries().is_empty());
    }

    #[test]
    fn project_creation_validates_name_and_color() {
        let (_store, mut tracker, _project) = tracker_with_project();

        let err = tracker.create_project("   ", "#3B82F6").unwrap_err();
        assert!(matches!(err, TrackError::EmptyProjectName));

        let err = tracker.create_project("Ops", "bluish").unwrap_err();
        assert!(matches!(err, TrackError::InvalidColor(_)));

        let project = tracker.create_project(" Ops ", "10b981").unwrap();
        assert_eq!(project.name, "Ops");
        assert_eq!(project.color, "#10B981");
        assert!(!project.is_pinned);

        let pinned = tracker.set_pinned(&project.id, true).unwrap();
        assert!(pinned.is_pinned);
    }

    struct StubAuth {
        session: Option<UserSession>,
    }

    impl AuthProvider for StubAuth {
        fn sign_in(&mut self, email: &str, password: &str) -> Result<UserSession, AuthError> {
            if password.len() < 6 {
                return Err(AuthError::InvalidCredentials);
            }
            let session = UserSession::new("user-1", email);
            self.session = Some(session.clone());
            Ok(session)
        }

        fn sign_up(&mut self, email: &str, password: &str) -> Result<UserSession, AuthError> {
            if password.len() < 6 {
                return Err(AuthError::WeakPassword);
            }
            self.sign_in(email, password)
        }

        fn sign_out(&mut self) {
            self.session = None;
        }

        fn current_user(&self) -> Option<&UserSession> {
            self.session.as_ref()
        }
    }

    #[test]
    fn sign_in_attaches_and_sign_out_tears_down() {
        let store = Rc::new(RefCell::new(JsonStore::in_memory()));
        let mut auth = StubAuth { session: None };

        let session = auth.sign_in("user@example.com", "hunter22").unwrap();
        let mut tracker = Tracker::new(Rc::clone(&store), session).unwrap();
        let project = tracker.create_project("Client Work", "#3B82F6").unwrap();
        tracker.start_tracking(&project.id, t0()).unwrap();

        auth.sign_out();
        tracker.detach();
        assert!(auth.current_user().is_none());
        assert!(tracker.entries().is_empty());
    }

    #[test]
    fn weak_sign_up_is_a_credential_error_not_a_transient_one() {
        let mut auth = StubAuth { session: None };
        let err = auth.sign_up("user@example.com", "abc").unwrap_err();
        assert!(!err.is_transient());
    }
}
