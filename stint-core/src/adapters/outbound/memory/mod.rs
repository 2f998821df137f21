//! In-memory timesheet backend.
//!
//! Simulates a remote store with server-side timers: one timer runs at a
//! time, stopping applies a minimum-duration and rounding policy, and other
//! clients can start or stop timers behind the engine's back. Used by tests
//! and by the CLI's dev mode, which saves the whole state between runs.

use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{
    models::{
        NewRecord, ProjectId, RecordDetails, RecordId, RunningTimerReport, TaskId, UserId,
    },
    ports::outbound::{Clock, TimerBackend},
    BackendError,
};

/// Server-side duration policy applied when a timer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendPolicy {
    /// Every run counts for at least this many minutes.
    pub minimum_minutes: u32,
    /// Runs are rounded up to a multiple of this many minutes. Zero disables rounding.
    pub rounding_minutes: u32,
}

impl BackendPolicy {
    pub fn apply(&self, seconds: i64) -> f64 {
        let mut minutes = seconds.max(0) as f64 / 60.0;
        if minutes < f64::from(self.minimum_minutes) {
            minutes = f64::from(self.minimum_minutes);
        }
        if self.rounding_minutes > 0 {
            let unit = f64::from(self.rounding_minutes);
            minutes = (minutes / unit).ceil() * unit;
        }
        minutes / 60.0
    }
}

/// A record as stored by the simulated backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub record_id: RecordId,
    pub description: String,
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
    pub owner_id: Option<UserId>,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunningRun {
    record_id: RecordId,
    #[serde(with = "time::serde::rfc3339")]
    started_at: OffsetDateTime,
}

/// Everything the simulated backend knows, in a form that can be saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendState {
    next_id: i64,
    records: Vec<StoredRecord>,
    running: Option<RunningRun>,
    policy: BackendPolicy,
}

impl BackendState {
    fn record_mut(&mut self, record_id: RecordId) -> Result<&mut StoredRecord, BackendError> {
        self.records
            .iter_mut()
            .find(|r| r.record_id == record_id)
            .ok_or(BackendError::NotFound(record_id))
    }

    fn finish_run(&mut self, now: OffsetDateTime) -> Option<RecordId> {
        let run = self.running.take()?;
        let seconds = (now - run.started_at).whole_seconds();
        let added = self.policy.apply(seconds);
        if let Ok(record) = self.record_mut(run.record_id) {
            record.hours += added;
        }
        Some(run.record_id)
    }
}

/// The backend operations, used for failure injection and call assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    CreateRecord,
    StartTimer,
    StopTimer { match_hint: bool },
    ReadRecord,
    QueryRunningTimer,
}

impl BackendCall {
    fn same_kind(&self, other: &BackendCall) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug, Default)]
struct Faults {
    offline: bool,
    fail_next: Vec<BackendCall>,
}

#[derive(Clone)]
pub struct InMemoryBackend {
    state: Arc<RwLock<BackendState>>,
    faults: Arc<Mutex<Faults>>,
    calls: Arc<Mutex<Vec<BackendCall>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::from_state(BackendState::default(), clock)
    }

    /// Rebuild a backend from previously exported state.
    pub fn from_state(state: BackendState, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            faults: Arc::default(),
            calls: Arc::default(),
            clock,
        }
    }

    pub fn with_policy(self, policy: BackendPolicy) -> Self {
        self.set_policy(policy);
        self
    }

    pub fn set_policy(&self, policy: BackendPolicy) {
        self.state.write().expect("backend lock poisoned").policy = policy;
    }

    /// Snapshot of the full backend state.
    pub fn export(&self) -> BackendState {
        self.state.read().expect("backend lock poisoned").clone()
    }

    /// Add a record with a fixed id, as if another client had created it.
    pub fn insert_record(&self, record: StoredRecord) {
        let mut state = self.state.write().expect("backend lock poisoned");
        state.next_id = state.next_id.max(record.record_id.as_i64());
        state.records.retain(|r| r.record_id != record.record_id);
        state.records.push(record);
    }

    /// Start a timer as another client would, bypassing fault injection.
    pub fn start_externally(&self, record_id: RecordId) -> Result<(), BackendError> {
        let now = self.clock.now();
        let mut state = self.state.write().expect("backend lock poisoned");
        state.record_mut(record_id)?;
        state.finish_run(now);
        state.running = Some(RunningRun {
            record_id,
            started_at: now,
        });
        Ok(())
    }

    /// Stop whatever timer is running, as another client would.
    pub fn stop_externally(&self) -> Option<RecordId> {
        let now = self.clock.now();
        self.state
            .write()
            .expect("backend lock poisoned")
            .finish_run(now)
    }

    pub fn running_record(&self) -> Option<RecordId> {
        self.state
            .read()
            .expect("backend lock poisoned")
            .running
            .as_ref()
            .map(|run| run.record_id)
    }

    pub fn record(&self, record_id: RecordId) -> Option<StoredRecord> {
        self.state
            .read()
            .expect("backend lock poisoned")
            .records
            .iter()
            .find(|r| r.record_id == record_id)
            .cloned()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.state.read().expect("backend lock poisoned").records.clone()
    }

    /// Make every call fail with a network error until turned back on.
    pub fn set_offline(&self, offline: bool) {
        self.faults.lock().expect("backend lock poisoned").offline = offline;
    }

    /// Make the next call of this kind fail with a server error.
    pub fn fail_next(&self, call: BackendCall) {
        self.faults
            .lock()
            .expect("backend lock poisoned")
            .fail_next
            .push(call);
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().expect("backend lock poisoned").clone()
    }

    fn enter(&self, call: BackendCall) -> Result<(), BackendError> {
        self.calls.lock().expect("backend lock poisoned").push(call);

        let mut faults = self.faults.lock().expect("backend lock poisoned");
        if faults.offline {
            return Err(BackendError::network("backend unreachable"));
        }
        if let Some(pos) = faults.fail_next.iter().position(|c| c.same_kind(&call)) {
            faults.fail_next.remove(pos);
            return Err(BackendError::server("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl TimerBackend for InMemoryBackend {
    async fn create_record(&self, record: &NewRecord) -> Result<RecordId, BackendError> {
        self.enter(BackendCall::CreateRecord)?;

        let mut state = self.state.write().expect("backend lock poisoned");
        state.next_id += 1;
        let record_id = RecordId::new(state.next_id);
        state.records.push(StoredRecord {
            record_id,
            description: record.description.clone(),
            project_id: Some(record.project_id),
            task_id: record.task_id,
            owner_id: record.owner_id,
            hours: record.hours,
        });
        Ok(record_id)
    }

    async fn start_timer(&self, record_id: RecordId) -> Result<(), BackendError> {
        self.enter(BackendCall::StartTimer)?;

        let now = self.clock.now();
        let mut state = self.state.write().expect("backend lock poisoned");
        state.record_mut(record_id)?;
        // Only one timer runs per user; starting another stops the old one.
        state.finish_run(now);
        state.running = Some(RunningRun {
            record_id,
            started_at: now,
        });
        Ok(())
    }

    async fn stop_timer(&self, record_id: RecordId, match_hint: bool) -> Result<(), BackendError> {
        self.enter(BackendCall::StopTimer { match_hint })?;

        let now = self.clock.now();
        let mut state = self.state.write().expect("backend lock poisoned");
        let is_running = state
            .running
            .as_ref()
            .is_some_and(|run| run.record_id == record_id);
        if !is_running {
            return Err(BackendError::NotRunning(record_id));
        }
        state.finish_run(now);
        Ok(())
    }

    async fn read_record(&self, record_id: RecordId) -> Result<RecordDetails, BackendError> {
        self.enter(BackendCall::ReadRecord)?;

        let state = self.state.read().expect("backend lock poisoned");
        state
            .records
            .iter()
            .find(|r| r.record_id == record_id)
            .map(|r| RecordDetails {
                record_id: r.record_id,
                description: r.description.clone(),
                accumulated_hours: r.hours,
                project_id: r.project_id,
                task_id: r.task_id,
                owner_id: r.owner_id,
            })
            .ok_or(BackendError::NotFound(record_id))
    }

    async fn query_running_timer(&self) -> Result<Option<RunningTimerReport>, BackendError> {
        self.enter(BackendCall::QueryRunningTimer)?;

        let now = self.clock.now();
        let state = self.state.read().expect("backend lock poisoned");
        let Some(run) = &state.running else {
            return Ok(None);
        };
        let record = state
            .records
            .iter()
            .find(|r| r.record_id == run.record_id)
            .ok_or(BackendError::NotFound(run.record_id))?;

        let run_seconds = (now - run.started_at).whole_seconds();
        Ok(Some(RunningTimerReport {
            record_id: run.record_id,
            elapsed_seconds: run_seconds + (record.hours * 3600.0).round() as i64,
            accumulated_hours: record.hours,
            project_id: record.project_id,
            task_id: record.task_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::clock::ManualClock;
    use time::{macros::datetime, Duration};

    fn backend() -> (InMemoryBackend, ManualClock) {
        let clock = ManualClock::new(datetime!(2024-03-01 09:00 UTC));
        (InMemoryBackend::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn policy_applies_minimum_then_rounding() {
        let minimum = BackendPolicy {
            minimum_minutes: 1,
            rounding_minutes: 0,
        };
        assert!((minimum.apply(40) - 1.0 / 60.0).abs() < 1e-9);
        assert!((minimum.apply(600) - 10.0 / 60.0).abs() < 1e-9);

        let half_hours = BackendPolicy {
            minimum_minutes: 0,
            rounding_minutes: 30,
        };
        assert!((half_hours.apply(60) - 0.5).abs() < 1e-9);
        assert!((half_hours.apply(31 * 60) - 1.0).abs() < 1e-9);
        assert_eq!(BackendPolicy::default().apply(0), 0.0);
    }

    #[tokio::test]
    async fn start_stop_accumulates_hours() {
        let (backend, clock) = backend();
        let id = backend
            .create_record(&NewRecord::new("Review", 3))
            .await
            .unwrap();
        backend.start_timer(id).await.unwrap();
        assert_eq!(backend.running_record(), Some(id));

        clock.advance(Duration::minutes(90));
        backend.stop_timer(id, false).await.unwrap();

        let details = backend.read_record(id).await.unwrap();
        assert!((details.accumulated_hours - 1.5).abs() < 1e-9);
        assert!(backend.query_running_timer().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn running_report_includes_accumulated_time() {
        let (backend, clock) = backend();
        backend.insert_record(StoredRecord {
            record_id: RecordId::new(7),
            description: "Support".to_string(),
            project_id: Some(ProjectId::new(2)),
            task_id: None,
            owner_id: None,
            hours: 0.5,
        });
        backend.start_externally(RecordId::new(7)).unwrap();
        clock.advance(Duration::seconds(120));

        let report = backend.query_running_timer().await.unwrap().unwrap();
        assert_eq!(report.record_id, RecordId::new(7));
        assert_eq!(report.elapsed_seconds, 120 + 1800);
        assert_eq!(report.accumulated_hours, 0.5);
        assert_eq!(report.project_id, Some(ProjectId::new(2)));
    }

    #[tokio::test]
    async fn stopping_a_record_that_is_not_running_fails() {
        let (backend, _clock) = backend();
        let id = backend
            .create_record(&NewRecord::new("Idle", 1))
            .await
            .unwrap();

        let err = backend.stop_timer(id, true).await.unwrap_err();
        assert_eq!(err, BackendError::NotRunning(id));
    }

    #[tokio::test]
    async fn injected_failures_hit_only_the_named_call() {
        let (backend, _clock) = backend();
        backend.fail_next(BackendCall::StartTimer);

        let id = backend
            .create_record(&NewRecord::new("Flaky", 1))
            .await
            .unwrap();
        assert!(backend.start_timer(id).await.is_err());
        assert!(backend.start_timer(id).await.is_ok());

        backend.set_offline(true);
        assert!(matches!(
            backend.query_running_timer().await,
            Err(BackendError::Network(_))
        ));
        assert_eq!(backend.calls().len(), 4);
    }

    #[tokio::test]
    async fn exported_state_survives_rebuild() {
        let (backend, clock) = backend();
        let id = backend
            .create_record(&NewRecord::new("Carry over", 4))
            .await
            .unwrap();
        backend.start_timer(id).await.unwrap();

        let json = serde_json::to_string(&backend.export()).unwrap();
        let state: BackendState = serde_json::from_str(&json).unwrap();
        let rebuilt = InMemoryBackend::from_state(state, Arc::new(clock));

        assert_eq!(rebuilt.running_record(), Some(id));
        let next = rebuilt
            .create_record(&NewRecord::new("Next", 4))
            .await
            .unwrap();
        assert_eq!(next, RecordId::new(id.as_i64() + 1));
    }
}
