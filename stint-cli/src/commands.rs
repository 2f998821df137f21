use std::{io::Write, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use stint_core::{
    domain::ports::outbound::Clock, ProjectId, TaskId, TimerError, TimerService, TimerState,
};

use crate::status::{started_line, status_line, stopped_lines, StatusReport};

pub async fn start<T: TimerService + ?Sized>(
    service: &T,
    description: &str,
    project: i64,
    task: Option<i64>,
) -> Result<()> {
    match service
        .start(description, ProjectId::new(project), task.map(TaskId::new))
        .await
    {
        Ok(state) => {
            if let Some(timer) = state.running() {
                println!("{}", started_line(timer));
            }
            Ok(())
        }
        Err(TimerError::AlreadyRunning) => {
            let state = service.state();
            let record = state
                .record_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "?".to_string());
            bail!("A timer is already running on record {record}. Stop it first.")
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn stop<T: TimerService + ?Sized>(service: &T) -> Result<()> {
    match service.stop().await {
        Ok(outcome) => {
            for line in stopped_lines(&outcome) {
                println!("{}", line);
            }
            Ok(())
        }
        Err(TimerError::NotRunning) => bail!("No timer is running."),
        Err(e) => Err(e.into()),
    }
}

pub fn status<T: TimerService + ?Sized>(service: &T, clock: &dyn Clock, json: bool) -> Result<()> {
    let state = service.state();
    if json {
        let report = StatusReport {
            state: &state,
            elapsed_hours: service.elapsed_hours(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", status_line(&state, clock.now()));
    }
    Ok(())
}

pub async fn sync<T: TimerService + ?Sized>(service: &T, clock: &dyn Clock) -> Result<()> {
    let state = service.reconcile().await?;
    println!("{}", status_line(&state, clock.now()));
    Ok(())
}

pub async fn watch<T: TimerService + ?Sized>(
    service: &T,
    clock: Arc<dyn Clock>,
    seconds: u64,
) -> Result<()> {
    if !service.state().is_running() {
        println!("No timer running");
        return Ok(());
    }

    let subscription = service.subscribe(Arc::new(move |state: &TimerState| {
        print!("\r\x1b[2K{}", status_line(state, clock.now()));
        let _ = std::io::stdout().flush();
    }));

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    service.unsubscribe(subscription);
    println!();
    Ok(())
}
