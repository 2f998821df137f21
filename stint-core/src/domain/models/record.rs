use serde::{Deserialize, Serialize};

use super::{ProjectId, RecordId, TaskId, UserId};

/// Request to create a new timesheet record on the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub description: String,
    pub project_id: ProjectId,
    pub task_id: Option<TaskId>,
    pub owner_id: Option<UserId>,
    /// Initial accumulated duration in hours.
    pub hours: f64,
}

impl NewRecord {
    pub fn new(description: impl Into<String>, project_id: impl Into<ProjectId>) -> Self {
        Self {
            description: description.into(),
            project_id: project_id.into(),
            task_id: None,
            owner_id: None,
            hours: 0.0,
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

/// A timesheet record as read back from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetails {
    pub record_id: RecordId,
    pub description: String,
    /// Server-computed duration, after the backend's minimum and rounding policy.
    pub accumulated_hours: f64,
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
    pub owner_id: Option<UserId>,
}

/// The backend's answer to "which timer is running right now".
#[derive(Debug, Clone, PartialEq)]
pub struct RunningTimerReport {
    pub record_id: RecordId,
    /// Total seconds on the record, including the hours accumulated before
    /// the current run.
    pub elapsed_seconds: i64,
    /// Hours accumulated on the record before the current run.
    pub accumulated_hours: f64,
    pub project_id: Option<ProjectId>,
    pub task_id: Option<TaskId>,
}
