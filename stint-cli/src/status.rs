use serde::Serialize;
use stint_core::{
    domain::models::split_hms, EntrySnapshot, RunningTimer, StopOutcome, TimerState,
};
use time::OffsetDateTime;

use crate::time_utils::clock_time;

/// One-line rendering of the timer, as shown in a status bar.
pub fn status_line(state: &TimerState, now: OffsetDateTime) -> String {
    match state.running() {
        None => "No timer running".to_string(),
        Some(timer) => {
            let (hours, minutes, seconds) = split_hms(timer.elapsed_at(now));
            format!(
                "{:02}:{:02}:{:02}  {}",
                hours,
                minutes,
                seconds,
                describe_entry(&timer.entry)
            )
        }
    }
}

pub fn describe_entry(entry: &EntrySnapshot) -> String {
    let description = if entry.description.trim().is_empty() {
        "(no description)"
    } else {
        entry.description.as_str()
    };

    match (entry.project_id, entry.task_id) {
        (Some(project), Some(task)) => format!("{} [project {}, task {}]", description, project, task),
        (Some(project), None) => format!("{} [project {}]", description, project),
        (None, _) => description.to_string(),
    }
}

pub fn started_line(timer: &RunningTimer) -> String {
    format!(
        "Timer running on record {} since {}: {}",
        timer.record_id,
        clock_time(timer.started_at),
        describe_entry(&timer.entry)
    )
}

pub fn stopped_lines(outcome: &StopOutcome) -> Vec<String> {
    let mut lines = vec![format!(
        "Stopped record {}: {:.2}h recorded.",
        outcome.record_id, outcome.recorded_hours
    )];
    if let Some(note) = &outcome.discrepancy {
        lines.push(format!("Note: {}", note.describe()));
    }
    lines
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport<'a> {
    pub state: &'a TimerState,
    pub elapsed_hours: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stint_core::{Discrepancy, ProjectId, RecordId, TaskId};
    use time::macros::datetime;

    fn timer() -> RunningTimer {
        RunningTimer::new(
            RecordId::new(12),
            datetime!(2024-03-01 09:00 UTC),
            EntrySnapshot::new("Task A", ProjectId::new(5)).with_task(Some(TaskId::new(10))),
        )
    }

    #[test]
    fn status_line_shows_elapsed_and_entry() {
        let state = TimerState::Running(timer());
        let line = status_line(&state, datetime!(2024-03-01 10:02:03 UTC));
        assert_eq!(line, "01:02:03  Task A [project 5, task 10]");
        assert_eq!(
            status_line(&TimerState::Stopped, datetime!(2024-03-01 10:00 UTC)),
            "No timer running"
        );
    }

    #[test]
    fn blank_description_is_labelled() {
        let entry = EntrySnapshot::new("  ", ProjectId::new(5));
        assert_eq!(describe_entry(&entry), "(no description) [project 5]");
    }

    #[test]
    fn stop_lines_include_discrepancy_note() {
        let outcome = StopOutcome {
            record_id: RecordId::new(12),
            local_hours: 1.0 / 60.0,
            recorded_hours: 0.5,
            discrepancy: Some(Discrepancy {
                local_hours: 1.0 / 60.0,
                recorded_hours: 0.5,
            }),
        };
        assert_eq!(
            stopped_lines(&outcome),
            vec![
                "Stopped record 12: 0.50h recorded.".to_string(),
                "Note: server recorded 0.50h, timer measured 0.02h".to_string(),
            ]
        );
    }

    #[test]
    fn status_report_serializes_tagged_state() {
        let state = TimerState::Running(timer());
        let json = serde_json::to_value(StatusReport {
            state: &state,
            elapsed_hours: 1.5,
        })
        .unwrap();
        assert_eq!(json["state"]["status"], "running");
        assert_eq!(json["state"]["recordId"], 12);
        assert_eq!(json["elapsedHours"], 1.5);
    }
}
