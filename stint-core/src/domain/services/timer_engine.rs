use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::{mpsc, Mutex};

use crate::domain::{
    models::{
        hours, Discrepancy, EntrySnapshot, NewRecord, PersistedTimer, ProjectId, RecordDetails,
        RestoreFailure, RestoreOutcome, RunningTimer, RunningTimerReport, StopOutcome, TaskId,
        TimerState,
    },
    ports::{
        inbound::{Observer, SubscriptionId, TimerService},
        outbound::{Clock, StateStore, TimerBackend},
    },
    BackendError, TimerError,
};

use super::{observers::StateCell, ticker::Ticker, EngineSettings};

/// A reconciled start this close to the tracked one keeps the tracked value.
const START_DRIFT_TOLERANCE: Duration = Duration::seconds(1);

/// Owner of the single timer state.
///
/// All transitions go through here: the engine talks to the backend, keeps
/// the persisted snapshot in step and pushes every change to observers.
/// State-changing operations hold one operation gate for their whole
/// duration, so concurrently started operations never interleave.
pub struct TimerEngine<B, S> {
    backend: Arc<B>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    cell: Arc<StateCell>,
    ticker: Ticker,
    gate: Mutex<()>,
}

impl<B: TimerBackend, S: StateStore> TimerEngine<B, S> {
    pub fn new(
        backend: Arc<B>,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            backend,
            store,
            clock,
            settings,
            cell: Arc::default(),
            ticker: Ticker::default(),
            gate: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Elapsed time on the running timer, zero when stopped.
    pub fn elapsed(&self) -> Duration {
        self.cell
            .snapshot()
            .running()
            .map(|timer| timer.elapsed_at(self.clock.now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Observe state changes as messages instead of callbacks.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<TimerState> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.cell.subscribe(Arc::new(move |state: &TimerState| {
            let _ = tx.send(state.clone());
        }));
        rx
    }

    /// Stop the periodic refresh. The engine is unusable for ticking afterwards
    /// until the next transition into running.
    pub fn shutdown(&self) {
        self.ticker.cancel();
    }

    fn enter_running(&self, timer: RunningTimer) {
        self.cell.install(TimerState::Running(timer));
        self.ticker
            .restart(Arc::downgrade(&self.cell), self.settings.tick_interval);
    }

    fn enter_stopped(&self) {
        self.ticker.cancel();
        self.cell.install(TimerState::Stopped);
    }

    async fn persist(&self, timer: &RunningTimer) {
        let snapshot = PersistedTimer::from(timer);
        let value = match serde_json::to_string(&snapshot) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode timer snapshot");
                return;
            }
        };

        if let Err(e) = self.store.set(&self.settings.snapshot_key, value).await {
            tracing::warn!(record_id = %timer.record_id, error = %e, "could not persist timer snapshot");
        }
    }

    async fn clear_snapshot(&self) {
        if let Err(e) = self.store.delete(&self.settings.snapshot_key).await {
            tracing::warn!(error = %e, "could not clear timer snapshot");
        }
    }

    async fn read_snapshot(&self) -> Result<Option<PersistedTimer>, RestoreFailure> {
        let raw = self
            .store
            .get(&self.settings.snapshot_key)
            .await
            .map_err(|e| RestoreFailure::Store(e.to_string()))?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| RestoreFailure::Store(e.to_string()))
    }

    /// Build the running timer the backend describes.
    ///
    /// The backend reports total elapsed seconds including previously
    /// accumulated hours, so the current run started at
    /// `now - (elapsed - accumulated)`. A report whose numbers do not fit in
    /// a timestamp is rejected rather than adopted.
    fn timer_from_report(
        &self,
        report: &RunningTimerReport,
        details: RecordDetails,
        current: &TimerState,
    ) -> Result<RunningTimer, BackendError> {
        let out_of_range = || {
            BackendError::invalid_response(format!(
                "running timer on record {} reports {}s elapsed and {}h accumulated",
                report.record_id, report.elapsed_seconds, report.accumulated_hours
            ))
        };
        let accumulated = Duration::checked_seconds_f64(report.accumulated_hours * 3600.0)
            .ok_or_else(out_of_range)?;
        let current_run = Duration::seconds(report.elapsed_seconds)
            .checked_sub(accumulated)
            .ok_or_else(out_of_range)?;
        let mut started_at = self
            .clock
            .now()
            .checked_sub(current_run)
            .ok_or_else(out_of_range)?;

        if let Some(tracked) = current.running() {
            if tracked.record_id == report.record_id
                && (tracked.started_at - started_at).abs() < START_DRIFT_TOLERANCE
            {
                started_at = tracked.started_at;
            }
        }

        let entry = EntrySnapshot {
            description: details.description,
            project_id: report.project_id.or(details.project_id),
            task_id: report.task_id.or(details.task_id),
            owner_id: details.owner_id,
        };
        Ok(RunningTimer::new(report.record_id, started_at, entry))
    }

    fn discrepancy(&self, local_hours: f64, recorded_hours: f64) -> Option<Discrepancy> {
        let note = Discrepancy {
            local_hours,
            recorded_hours,
        };
        (note.difference().abs() > self.settings.discrepancy_tolerance_hours).then_some(note)
    }
}

#[async_trait]
impl<B: TimerBackend, S: StateStore> TimerService for TimerEngine<B, S> {
    #[tracing::instrument(skip(self))]
    async fn start(
        &self,
        description: &str,
        project_id: ProjectId,
        task_id: Option<TaskId>,
    ) -> Result<TimerState, TimerError> {
        let _gate = self.gate.lock().await;

        if self.cell.snapshot().is_running() {
            return Err(TimerError::AlreadyRunning);
        }

        let record = NewRecord::new(description, project_id)
            .with_task(task_id)
            .with_owner(self.settings.owner_id);
        let record_id = self.backend.create_record(&record).await?;

        if let Err(e) = self.backend.start_timer(record_id).await {
            tracing::warn!(
                %record_id,
                error = %e,
                "record created but its timer could not be started, record is left untracked"
            );
            return Err(e.into());
        }

        let entry = EntrySnapshot::new(description, project_id)
            .with_task(task_id)
            .with_owner(self.settings.owner_id);
        let timer = RunningTimer::new(record_id, self.clock.now(), entry);

        self.persist(&timer).await;
        self.enter_running(timer);
        self.cell.publish();

        tracing::info!(%record_id, "timer started");
        Ok(self.cell.snapshot())
    }

    #[tracing::instrument(skip(self))]
    async fn stop(&self) -> Result<StopOutcome, TimerError> {
        let _gate = self.gate.lock().await;

        let Some(timer) = self.cell.snapshot().running().cloned() else {
            return Err(TimerError::NotRunning);
        };
        let local_hours = hours(timer.elapsed_at(self.clock.now()));

        self.backend
            .stop_timer(timer.record_id, self.settings.match_on_stop)
            .await?;
        let record = self.backend.read_record(timer.record_id).await?;

        let recorded_hours = record.accumulated_hours;
        let discrepancy = self.discrepancy(local_hours, recorded_hours);
        if let Some(note) = &discrepancy {
            tracing::info!(record_id = %timer.record_id, "{}", note.describe());
        }

        self.enter_stopped();
        self.clear_snapshot().await;
        self.cell.publish();

        tracing::info!(record_id = %timer.record_id, recorded_hours, "timer stopped");
        Ok(StopOutcome {
            record_id: timer.record_id,
            local_hours,
            recorded_hours,
            discrepancy,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn reconcile(&self) -> Result<TimerState, TimerError> {
        let _gate = self.gate.lock().await;

        let report = match self.backend.query_running_timer().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "could not query running timer, keeping last known state");
                return Err(e.into());
            }
        };
        let current = self.cell.snapshot();

        match report {
            Some(report) => {
                let details = match self.backend.read_record(report.record_id).await {
                    Ok(details) => details,
                    Err(e) => {
                        tracing::warn!(
                            record_id = %report.record_id,
                            error = %e,
                            "could not read running record, keeping last known state"
                        );
                        return Err(e.into());
                    }
                };

                let timer = match self.timer_from_report(&report, details, &current) {
                    Ok(timer) => timer,
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring running timer report, keeping last known state");
                        return Err(e.into());
                    }
                };
                let unchanged = current
                    .running()
                    .is_some_and(|tracked| PersistedTimer::from(tracked) == PersistedTimer::from(&timer));
                if unchanged {
                    tracing::debug!(record_id = %timer.record_id, "local timer matches backend");
                } else {
                    tracing::info!(record_id = %timer.record_id, "adopting running timer from backend");
                    self.persist(&timer).await;
                }

                self.enter_running(timer);
                self.cell.publish();
            }
            None if current.is_running() => {
                tracing::info!(
                    record_id = ?current.record_id(),
                    "backend has no running timer, clearing local timer"
                );
                self.enter_stopped();
                self.clear_snapshot().await;
                self.cell.publish();
            }
            None => {
                tracing::debug!("no timer running locally or on the backend");
                self.cell.publish();
            }
        }

        Ok(self.cell.snapshot())
    }

    #[tracing::instrument(skip(self))]
    async fn load(&self) -> RestoreOutcome {
        let _gate = self.gate.lock().await;

        if self.cell.snapshot().is_running() {
            tracing::debug!("timer already running, nothing to restore");
            return RestoreOutcome::NothingToRestore;
        }

        let persisted = match self.read_snapshot().await {
            Ok(Some(persisted)) => persisted,
            Ok(None) => return RestoreOutcome::NothingToRestore,
            Err(failure) => {
                tracing::warn!(%failure, "discarding unreadable timer snapshot");
                self.clear_snapshot().await;
                return RestoreOutcome::Failed(failure);
            }
        };
        let Some(started_at) = persisted.started_at() else {
            let failure = RestoreFailure::Store(format!(
                "start time {} is out of range",
                persisted.start_time
            ));
            tracing::warn!(%failure, "discarding unreadable timer snapshot");
            self.clear_snapshot().await;
            return RestoreOutcome::Failed(failure);
        };

        let failure = match self.backend.query_running_timer().await {
            Ok(Some(report)) if report.record_id == persisted.entry_id => {
                let entry = EntrySnapshot {
                    description: persisted.description,
                    project_id: persisted.project_id,
                    task_id: persisted.task_id,
                    owner_id: self.settings.owner_id,
                };
                let timer = RunningTimer::new(persisted.entry_id, started_at, entry);

                self.enter_running(timer.clone());
                self.cell.publish();

                tracing::info!(record_id = %timer.record_id, "restored running timer");
                return RestoreOutcome::Restored(timer);
            }
            Ok(report) => RestoreFailure::Stale {
                persisted: persisted.entry_id,
                running: report.map(|r| r.record_id),
            },
            Err(e) => RestoreFailure::Backend(e.to_string()),
        };

        tracing::warn!(%failure, "discarding timer snapshot");
        self.clear_snapshot().await;
        RestoreOutcome::Failed(failure)
    }

    fn state(&self) -> TimerState {
        self.cell.snapshot()
    }

    fn elapsed_hours(&self) -> f64 {
        self.cell.snapshot().elapsed_hours_at(self.clock.now())
    }

    fn subscribe(&self, observer: Observer) -> SubscriptionId {
        self.cell.subscribe(observer)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.cell.unsubscribe(id)
    }
}
