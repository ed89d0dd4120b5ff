use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 8;

/// Smallest entry length accepted by validation and re-time edits, and the
/// unit the display rounding works in.
pub const MIN_ENTRY_MINUTES: i64 = 1;

pub type UserId = String;
pub type ProjectId = String;
pub type EntryId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub color: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub color: String,
    pub owner_id: UserId,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub is_pinned: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: EntryId,
    pub project_id: ProjectId,
    pub owner_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
    /// Denormalized index field. Recomputed from `end_time` on every write;
    /// read paths must use `is_running()` instead.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Running,
    Completed,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn state(&self) -> EntryState {
        if self.is_running() {
            EntryState::Running
        } else {
            EntryState::Completed
        }
    }

    /// End instant used for all duration math; a running entry ends "now".
    pub fn effective_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.end_time.unwrap_or(now)
    }

    /// Signed span in milliseconds. Callers filtering corrupt rows must check
    /// the sign themselves.
    pub fn duration_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.effective_end(now) - self.start_time).num_milliseconds()
    }
}

#[derive(Debug, Clone)]
pub struct NewTimeEntry {
    pub project_id: ProjectId,
    pub owner_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl NewTimeEntry {
    pub fn running(project_id: ProjectId, owner_id: UserId, start_time: DateTime<Utc>) -> Self {
        Self {
            project_id,
            owner_id,
            start_time,
            end_time: None,
            description: None,
        }
    }

    pub fn completed(
        project_id: ProjectId,
        owner_id: UserId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        description: Option<String>,
    ) -> Self {
        Self {
            project_id,
            owner_id,
            start_time,
            end_time: Some(end_time),
            description,
        }
    }
}

/// Partial update for a time entry. `end_time` can only ever be set, not
/// cleared: a completed entry never transitions back to running.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub description: Option<Option<String>>,
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Half-up rounding from milliseconds to whole minutes, saturating at zero.
pub fn round_minutes(ms: i64) -> i64 {
    if ms <= 0 {
        return 0;
    }
    (ms + 30_000) / 60_000
}

pub fn format_duration(total_minutes: i64) -> String {
    let total_minutes = total_minutes.max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

pub fn format_clock(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Human-relative label for the live timer, recomputed on every tick.
pub fn elapsed_label(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - start).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if seconds < 45 {
        "less than a minute".to_string()
    } else if seconds < 90 {
        "about 1 minute".to_string()
    } else if minutes < 45 {
        format!("{minutes} minutes")
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if hours < 24 {
        format!("{hours} hours")
    } else if days < 2 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

pub fn normalize_hex_color(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", hex.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    use super::{
        elapsed_label, format_clock, format_duration, generate_id, normalize_hex_color,
        round_minutes,
    };

    #[rstest]
    #[case(0, "0m")]
    #[case(1, "1m")]
    #[case(59, "59m")]
    #[case(60, "1h 0m")]
    #[case(90, "1h 30m")]
    #[case(605, "10h 5m")]
    fn formats_minutes_as_hours_and_minutes(#[case] minutes: i64, #[case] expected: &str) {
        assert_eq!(format_duration(minutes), expected);
    }

    #[test]
    fn format_duration_digits_match_div_and_mod() {
        for minutes in 0..300 {
            let rendered = format_duration(minutes);
            let expected = if minutes >= 60 {
                format!("{}h {}m", minutes / 60, minutes % 60)
            } else {
                format!("{}m", minutes % 60)
            };
            assert_eq!(rendered, expected);
        }
    }

    #[rstest]
    #[case(0, 0)]
    #[case(29_999, 0)]
    #[case(30_000, 1)]
    #[case(90_000, 2)]
    #[case(3_600_000, 60)]
    #[case(-5_000, 0)]
    fn rounds_half_up_to_minutes(#[case] ms: i64, #[case] expected: i64) {
        assert_eq!(round_minutes(ms), expected);
    }

    #[test]
    fn clock_format_pads_components() {
        assert_eq!(format_clock(chrono::Duration::seconds(0)), "00:00:00");
        assert_eq!(format_clock(chrono::Duration::seconds(3_725)), "01:02:05");
        assert_eq!(format_clock(chrono::Duration::seconds(-10)), "00:00:00");
    }

    #[rstest]
    #[case(10, "less than a minute")]
    #[case(60, "about 1 minute")]
    #[case(600, "10 minutes")]
    #[case(3_600, "about 1 hour")]
    #[case(7_200, "2 hours")]
    #[case(90_000, "1 day")]
    #[case(260_000, "3 days")]
    fn elapsed_label_buckets(#[case] seconds: i64, #[case] expected: &str) {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let now = start + chrono::Duration::seconds(seconds);
        assert_eq!(elapsed_label(start, now), expected);
    }

    #[test]
    fn elapsed_label_clamps_future_starts() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let start = now + chrono::Duration::minutes(5);
        assert_eq!(elapsed_label(start, now), "less than a minute");
    }

    #[test]
    fn generated_ids_are_opaque_and_distinct() {
        let a = generate_id();
        let b = generate_id();
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[rstest]
    #[case("#3b82f6", Some("#3B82F6"))]
    #[case("3B82F6", Some("#3B82F6"))]
    #[case("  #A1B2C3 ", Some("#A1B2C3"))]
    #[case("#fff", None)]
    #[case("not-a-color", None)]
    #[case("", None)]
    fn normalizes_hex_colors(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_hex_color(input).as_deref(), expected);
    }
}
