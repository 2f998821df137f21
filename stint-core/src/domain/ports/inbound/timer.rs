use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    models::{ProjectId, RestoreOutcome, StopOutcome, TaskId, TimerState},
    TimerError,
};

/// Callback invoked with a copy of the timer state after every change and tick.
pub type Observer = Arc<dyn Fn(&TimerState) + Send + Sync + 'static>;

/// Handle returned by [`TimerService::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Inbound port for the timer use cases.
///
/// Surfaces (status line, panels, the CLI) call these and never touch the
/// timer state directly.
#[async_trait]
pub trait TimerService: Send + Sync + 'static {
    /// Start a new timer on a freshly created record.
    async fn start(
        &self,
        description: &str,
        project_id: ProjectId,
        task_id: Option<TaskId>,
    ) -> Result<TimerState, TimerError>;

    /// Stop the running timer and compare the recorded duration with the
    /// locally measured one.
    async fn stop(&self) -> Result<StopOutcome, TimerError>;

    /// Adopt whatever the backend reports as the running timer.
    async fn reconcile(&self) -> Result<TimerState, TimerError>;

    /// Restore a persisted timer after a restart, if the backend confirms it.
    async fn load(&self) -> RestoreOutcome;

    /// Get a copy of the current state.
    fn state(&self) -> TimerState;

    /// Hours elapsed on the running timer, zero when stopped.
    fn elapsed_hours(&self) -> f64;

    /// Register an observer. It is called in registration order.
    fn subscribe(&self, observer: Observer) -> SubscriptionId;

    /// Remove a previously registered observer.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
