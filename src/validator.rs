use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, Utc};

use crate::domain::{
    MIN_ENTRY_MINUTES, NewTimeEntry, Project, ProjectId, TimeEntry, UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingProject,
    UnknownProject,
    MissingStart,
    MissingEnd,
    EndBeforeStart,
    BelowMinimumDuration,
    OverlapsExistingEntry,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingProject => write!(f, "please select a project"),
            ValidationError::UnknownProject => write!(f, "selected project does not exist"),
            ValidationError::MissingStart => write!(f, "start time is required"),
            ValidationError::MissingEnd => write!(f, "end time is required"),
            ValidationError::EndBeforeStart => {
                write!(f, "end time must be after start time")
            }
            ValidationError::BelowMinimumDuration => {
                write!(f, "entry must be at least {MIN_ENTRY_MINUTES} minute long")
            }
            ValidationError::OverlapsExistingEntry => {
                write!(f, "entry overlaps an existing one")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Whether a backfilled entry may overlap the user's existing entries.
/// One policy everywhere; call sites never decide this ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    #[default]
    Allow,
    Reject,
}

/// User-supplied form state for a backfilled entry; everything optional
/// because every rule is checked and reported independently.
#[derive(Debug, Clone, Default)]
pub struct ManualEntryDraft {
    pub project_id: Option<ProjectId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Checks every rule and reports all failures at once, so a form can show
/// each problem together. On success the returned draft is fully shaped:
/// trimmed description, both times set, never active.
pub fn validate(
    draft: &ManualEntryDraft,
    owner: &UserId,
    projects: &[Project],
    existing: &[TimeEntry],
    policy: OverlapPolicy,
    now: DateTime<Utc>,
) -> Result<NewTimeEntry, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let project_id = match &draft.project_id {
        None => {
            errors.push(ValidationError::MissingProject);
            None
        }
        Some(id) if id.trim().is_empty() => {
            errors.push(ValidationError::MissingProject);
            None
        }
        Some(id) => {
            if projects.iter().any(|project| &project.id == id) {
                Some(id.clone())
            } else {
                errors.push(ValidationError::UnknownProject);
                None
            }
        }
    };

    if draft.start_time.is_none() {
        errors.push(ValidationError::MissingStart);
    }
    if draft.end_time.is_none() {
        errors.push(ValidationError::MissingEnd);
    }

    if let (Some(start), Some(end)) = (draft.start_time, draft.end_time) {
        if end <= start {
            errors.push(ValidationError::EndBeforeStart);
        } else {
            if end - start < Duration::minutes(MIN_ENTRY_MINUTES) {
                errors.push(ValidationError::BelowMinimumDuration);
            }
            if policy == OverlapPolicy::Reject
                && existing.iter().any(|entry| {
                    start < entry.effective_end(now) && end > entry.start_time
                })
            {
                errors.push(ValidationError::OverlapsExistingEntry);
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let description = draft.description.as_deref().and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    });

    Ok(NewTimeEntry::completed(
        project_id.expect("validated above"),
        owner.clone(),
        draft.start_time.expect("validated above"),
        draft.end_time.expect("validated above"),
        description,
    ))
}
