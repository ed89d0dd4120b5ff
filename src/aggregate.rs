use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::domain::{Project, ProjectId, TimeEntry, round_minutes};

/// Inclusive wall-clock window. Entries are retained when their interval
/// intersects the window, the one semantic shared by every view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Local [start-of-day, end-of-day] window for one calendar day.
    pub fn day(day: NaiveDate) -> Self {
        let (start, next_midnight) = local_day_bounds(day);
        Self {
            start,
            end: next_midnight - Duration::milliseconds(1),
        }
    }

    pub fn contains_interval(
        &self,
        start: DateTime<Utc>,
        effective_end: DateTime<Utc>,
    ) -> bool {
        start <= self.end && effective_end >= self.start
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub search_term: Option<String>,
    pub project_id: Option<ProjectId>,
    pub range: Option<DateRange>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayTotal {
    pub total_ms: i64,
    pub project_colors: Vec<String>,
}

/// A row is corrupt when its end precedes its start or lies in the future;
/// corrupt rows are excluded from every figure, never subtracted.
fn well_formed_span(entry: &TimeEntry, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let end = entry.effective_end(now);
    if end > now || entry.start_time > end {
        return None;
    }
    Some((entry.start_time, end))
}

pub fn filter_entries(
    entries: &[TimeEntry],
    projects: &[Project],
    filter: &EntryFilter,
    now: DateTime<Utc>,
) -> Vec<TimeEntry> {
    let names: HashMap<&ProjectId, &str> = projects
        .iter()
        .map(|project| (&project.id, project.name.as_str()))
        .collect();
    let needle = filter
        .search_term
        .as_deref()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty());

    let mut matched: Vec<TimeEntry> = entries
        .iter()
        .filter(|entry| {
            if let Some(project_id) = &filter.project_id {
                if &entry.project_id != project_id {
                    return false;
                }
            }
            if let Some(range) = &filter.range {
                if !range.contains_interval(entry.start_time, entry.effective_end(now)) {
                    return false;
                }
            }
            if let Some(needle) = &needle {
                let project_name = names
                    .get(&entry.project_id)
                    .map(|name| name.to_lowercase())
                    .unwrap_or_default();
                let description = entry
                    .description
                    .as_deref()
                    .map(str::to_lowercase)
                    .unwrap_or_default();
                if !project_name.contains(needle) && !description.contains(needle) {
                    return false;
                }
            }
            true
        })
        .cloned()
        .collect();

    sort_entries(&mut matched);
    matched
}

/// Total tracked milliseconds. Overlapping entries sum independently; a
/// running entry counts up to `now`.
pub fn total_duration(entries: &[TimeEntry], now: DateTime<Utc>) -> i64 {
    entries
        .iter()
        .filter_map(|entry| well_formed_span(entry, now))
        .map(|(start, end)| (end - start).num_milliseconds())
        .sum()
}

/// Per-project totals in whole minutes, rounded per entry the way the
/// breakdown chart displays them. Zero-minute rows are dropped.
pub fn group_by_project(entries: &[TimeEntry], now: DateTime<Utc>) -> HashMap<ProjectId, i64> {
    let mut totals: HashMap<ProjectId, i64> = HashMap::new();
    for entry in entries {
        let Some((start, end)) = well_formed_span(entry, now) else {
            continue;
        };
        let minutes = round_minutes((end - start).num_milliseconds());
        if minutes <= 0 {
            continue;
        }
        *totals.entry(entry.project_id.clone()).or_insert(0) += minutes;
    }
    totals
}

/// Per-day totals for the calendar strip. An entry spanning midnight
/// contributes a clamped slice to each local day it touches, and each day
/// collects the distinct colors of the projects worked that day.
pub fn group_by_day(
    entries: &[TimeEntry],
    projects: &[Project],
    now: DateTime<Utc>,
) -> BTreeMap<NaiveDate, DayTotal> {
    let colors: HashMap<&ProjectId, &str> = projects
        .iter()
        .map(|project| (&project.id, project.color.as_str()))
        .collect();

    let mut days: BTreeMap<NaiveDate, DayTotal> = BTreeMap::new();
    for entry in entries {
        let Some((start, end)) = well_formed_span(entry, now) else {
            continue;
        };
        if end <= start {
            continue;
        }

        let mut day = local_day_for(start);
        let last_day = local_day_for(end - Duration::seconds(1));
        while day <= last_day {
            let (day_start, day_end) = local_day_bounds(day);
            let slice_start = start.max(day_start);
            let slice_end = end.min(day_end);
            if slice_end > slice_start {
                let total = days.entry(day).or_default();
                total.total_ms += (slice_end - slice_start).num_milliseconds();
                if let Some(color) = colors.get(&entry.project_id) {
                    if !total.project_colors.iter().any(|c| c == color) {
                        total.project_colors.push(color.to_string());
                    }
                }
            }
            day = day.succ_opt().expect("next day should exist");
        }
    }
    days
}

/// Newest first, id as a stable tiebreak so equal timestamps render in a
/// deterministic order.
pub fn sort_entries(entries: &mut [TimeEntry]) {
    entries.sort_by(|a, b| {
        b.start_time
            .cmp(&a.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn local_day_for(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}

fn local_day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_naive = day.and_hms_opt(0, 0, 0).expect("midnight must be valid");
    let end_naive = start_naive + Duration::days(1);
    (
        local_naive_to_utc_resolved(start_naive),
        local_naive_to_utc_resolved(end_naive),
    )
}

fn local_naive_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(local_datetime) => Some(local_datetime.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, second) => Some(first.min(second).with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

fn local_naive_to_utc_resolved(naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(timestamp) = local_naive_to_utc(naive) {
        return timestamp;
    }

    // A DST gap can swallow midnight; scan forward to the first instant
    // that exists.
    let mut cursor = naive + Duration::minutes(1);
    for _ in 0..120 {
        if let Some(timestamp) = local_naive_to_utc(cursor) {
            return timestamp;
        }
        cursor += Duration::minutes(1);
    }

    panic!("local day boundary does not exist");
}
