use async_trait::async_trait;

use crate::domain::{
    models::{NewRecord, RecordDetails, RecordId, RunningTimerReport},
    BackendError,
};

/// Outbound port for the remote timesheet backend.
///
/// The backend is the authority on which timer is running. Every call may
/// fail or take arbitrarily long; timeouts are the implementor's concern.
#[async_trait]
pub trait TimerBackend: Send + Sync + 'static {
    /// Create a new timesheet record.
    ///
    /// Returns the id assigned by the backend.
    async fn create_record(&self, record: &NewRecord) -> Result<RecordId, BackendError>;

    /// Start the server-side timer on a record.
    async fn start_timer(&self, record_id: RecordId) -> Result<(), BackendError>;

    /// Stop the server-side timer on a record.
    ///
    /// `match_hint` asks the backend to fold the time into a matching
    /// existing record if it has one.
    async fn stop_timer(&self, record_id: RecordId, match_hint: bool) -> Result<(), BackendError>;

    /// Read a record, including its server-computed accumulated duration.
    async fn read_record(&self, record_id: RecordId) -> Result<RecordDetails, BackendError>;

    /// Ask the backend which timer is running, independent of local state.
    async fn query_running_timer(&self) -> Result<Option<RunningTimerReport>, BackendError>;
}

