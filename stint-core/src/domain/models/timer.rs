use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::{ProjectId, RecordId, TaskId, UserId};

/// Descriptive fields of the record a running timer is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySnapshot {
    pub description: String,
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
    pub owner_id: Option<UserId>,
}

impl EntrySnapshot {
    pub fn new(description: impl Into<String>, project_id: impl Into<ProjectId>) -> Self {
        Self {
            description: description.into(),
            project_id: Some(project_id.into()),
            task_id: None,
            owner_id: None,
        }
    }

    pub fn with_task(mut self, task_id: Option<TaskId>) -> Self {
        self.task_id = task_id;
        self
    }

    pub fn with_owner(mut self, owner_id: Option<UserId>) -> Self {
        self.owner_id = owner_id;
        self
    }
}

/// A timer that is currently running against a remote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningTimer {
    pub record_id: RecordId,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub entry: EntrySnapshot,
}

impl RunningTimer {
    pub fn new(record_id: RecordId, started_at: OffsetDateTime, entry: EntrySnapshot) -> Self {
        Self {
            record_id,
            started_at: truncate_to_millis(started_at),
            entry,
        }
    }

    /// Elapsed time between the start and `now`, never negative.
    pub fn elapsed_at(&self, now: OffsetDateTime) -> Duration {
        (now - self.started_at).max(Duration::ZERO)
    }
}

/// The engine's single timer state.
///
/// A running timer always has both a start time and a record id, and a
/// stopped timer has neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TimerState {
    #[default]
    Stopped,
    Running(RunningTimer),
}

impl TimerState {
    pub fn is_running(&self) -> bool {
        matches!(self, TimerState::Running(_))
    }

    pub fn running(&self) -> Option<&RunningTimer> {
        match self {
            TimerState::Running(timer) => Some(timer),
            TimerState::Stopped => None,
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.running().map(|t| t.record_id)
    }

    pub fn started_at(&self) -> Option<OffsetDateTime> {
        self.running().map(|t| t.started_at)
    }

    pub fn entry(&self) -> Option<&EntrySnapshot> {
        self.running().map(|t| &t.entry)
    }

    /// Elapsed hours at `now`, zero when stopped.
    pub fn elapsed_hours_at(&self, now: OffsetDateTime) -> f64 {
        self.running()
            .map(|t| hours(t.elapsed_at(now)))
            .unwrap_or(0.0)
    }
}

/// The restart-surviving projection of a running timer.
///
/// Only a hint: it has to be confirmed by the backend before it is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTimer {
    pub entry_id: RecordId,
    /// Start time as milliseconds since the unix epoch.
    pub start_time: i64,
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
    pub description: String,
}

impl PersistedTimer {
    pub fn started_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.start_time) * 1_000_000).ok()
    }
}

impl From<&RunningTimer> for PersistedTimer {
    fn from(timer: &RunningTimer) -> Self {
        Self {
            entry_id: timer.record_id,
            start_time: unix_millis(timer.started_at),
            project_id: timer.entry.project_id,
            task_id: timer.entry.task_id,
            description: timer.entry.description.clone(),
        }
    }
}

/// Note produced when the backend's recorded duration differs noticeably
/// from the locally measured one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discrepancy {
    pub local_hours: f64,
    pub recorded_hours: f64,
}

impl Discrepancy {
    pub fn difference(&self) -> f64 {
        self.recorded_hours - self.local_hours
    }

    pub fn describe(&self) -> String {
        format!(
            "server recorded {:.2}h, timer measured {:.2}h",
            self.recorded_hours, self.local_hours
        )
    }
}

/// Result of a successful stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StopOutcome {
    pub record_id: RecordId,
    pub local_hours: f64,
    pub recorded_hours: f64,
    pub discrepancy: Option<Discrepancy>,
}

/// Why a persisted snapshot could not be restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreFailure {
    /// The backend is running a different timer, or none at all.
    Stale {
        persisted: RecordId,
        running: Option<RecordId>,
    },
    Backend(String),
    Store(String),
}

impl std::fmt::Display for RestoreFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestoreFailure::Stale {
                persisted,
                running: Some(running),
            } => write!(
                f,
                "saved timer for record {} is stale, backend is running record {}",
                persisted, running
            ),
            RestoreFailure::Stale {
                persisted,
                running: None,
            } => write!(
                f,
                "saved timer for record {} is stale, backend has no running timer",
                persisted
            ),
            RestoreFailure::Backend(e) => write!(f, "backend check failed: {}", e),
            RestoreFailure::Store(e) => write!(f, "saved timer unreadable: {}", e),
        }
    }
}

/// Outcome of restoring timer state after a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored(RunningTimer),
    NothingToRestore,
    Failed(RestoreFailure),
}

impl RestoreOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, RestoreOutcome::Restored(_))
    }
}

/// Convert a duration to fractional hours.
pub fn hours(duration: Duration) -> f64 {
    duration.as_seconds_f64() / 3600.0
}

/// Get elapsed time as (hours, minutes, seconds).
pub fn split_hms(duration: Duration) -> (i64, i64, i64) {
    let total_seconds = duration.whole_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    (hours, minutes, seconds)
}

pub fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn truncate_to_millis(at: OffsetDateTime) -> OffsetDateTime {
    let nanos = at.nanosecond();
    at - Duration::nanoseconds(i64::from(nanos % 1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn running() -> RunningTimer {
        RunningTimer::new(
            RecordId::new(7),
            datetime!(2024-03-01 09:00:00.123456789 UTC),
            EntrySnapshot::new("Task A", 5).with_task(Some(TaskId::new(10))),
        )
    }

    #[test]
    fn running_timer_keeps_millisecond_precision() {
        let timer = running();
        assert_eq!(
            timer.started_at,
            datetime!(2024-03-01 09:00:00.123 UTC)
        );
    }

    #[test]
    fn persisted_timer_round_trips_start_time() {
        let timer = running();
        let persisted = PersistedTimer::from(&timer);
        assert_eq!(persisted.entry_id, RecordId::new(7));
        assert_eq!(persisted.task_id, Some(TaskId::new(10)));
        assert_eq!(persisted.started_at(), Some(timer.started_at));
    }

    #[test]
    fn persisted_timer_uses_camel_case_json() {
        let json = serde_json::to_value(PersistedTimer::from(&running())).unwrap();
        assert_eq!(json["entryId"], 7);
        assert_eq!(json["projectId"], 5);
        assert_eq!(json["taskId"], 10);
        assert_eq!(json["description"], "Task A");
        assert!(json["startTime"].is_i64());
    }

    #[test]
    fn accessors_follow_the_variant() {
        let stopped = TimerState::Stopped;
        assert!(!stopped.is_running());
        assert!(stopped.record_id().is_none());
        assert!(stopped.started_at().is_none());
        assert!(stopped.entry().is_none());

        let state = TimerState::Running(running());
        assert!(state.is_running());
        assert_eq!(state.record_id(), Some(RecordId::new(7)));
        assert!(state.started_at().is_some());
        assert_eq!(state.entry().and_then(|e| e.project_id), Some(ProjectId::new(5)));
    }

    #[test]
    fn elapsed_hours_are_computed_from_start() {
        let state = TimerState::Running(running());
        let now = datetime!(2024-03-01 10:30:00.123 UTC);
        assert!((state.elapsed_hours_at(now) - 1.5).abs() < 1e-9);
        assert_eq!(TimerState::Stopped.elapsed_hours_at(now), 0.0);
    }

    #[test]
    fn split_hms_breaks_down_duration() {
        assert_eq!(split_hms(Duration::seconds(3723)), (1, 2, 3));
        assert_eq!(split_hms(Duration::seconds(-5)), (0, 0, 0));
    }

    #[test]
    fn discrepancy_note_mentions_both_durations() {
        let note = Discrepancy {
            local_hours: 0.0167,
            recorded_hours: 0.5,
        }
        .describe();
        assert_eq!(note, "server recorded 0.50h, timer measured 0.02h");
    }
}
