//! Single work-timer tracking against a remote timesheet backend.
//!
//! [`TimerEngine`] owns the one timer state of the process. It starts and
//! stops timers on the backend, reconciles local state with whatever the
//! backend reports as running, restores a persisted snapshot after a restart
//! and fans every change out to observers.

pub mod adapters;
pub mod domain;

pub use domain::{
    models::{
        Discrepancy, EntrySnapshot, ProjectId, RecordId, RestoreFailure, RestoreOutcome,
        RunningTimer, StopOutcome, TaskId, TimerState, UserId,
    },
    ports::inbound::{Observer, SubscriptionId, TimerService},
    services::{EngineSettings, TimerEngine},
    BackendError, StoreError, TimerError,
};
