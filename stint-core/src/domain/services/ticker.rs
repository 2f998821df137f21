use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError, Weak,
    },
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use super::observers::StateCell;

/// The once-a-second refresh that runs only while a timer is running.
///
/// It never talks to the backend, it only re-publishes state so observers
/// can redraw the elapsed time. Every restart and cancel bumps the
/// generation; a tick only publishes while its generation is the latest.
#[derive(Default)]
pub(super) struct Ticker {
    current: Mutex<Option<TickTask>>,
    latest: Arc<AtomicU64>,
}

struct TickTask {
    generation: u64,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Replace any running tick with a fresh one.
    pub(super) fn restart(&self, cell: Weak<StateCell>, interval: Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(task) = current.take() {
            task.handle.abort();
        }

        let handle = tokio::spawn(run(cell, interval, generation, self.latest.clone()));
        *current = Some(TickTask { generation, handle });
        tracing::trace!(generation, "tick started");
    }

    pub(super) fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        let task = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.handle.abort();
            tracing::trace!(generation = task.generation, "tick cancelled");
        }
    }

    #[cfg(test)]
    pub(super) fn is_active(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

const MIN_PERIOD: Duration = Duration::from_millis(10);

async fn run(cell: Weak<StateCell>, period: Duration, generation: u64, latest: Arc<AtomicU64>) {
    let period = period.max(MIN_PERIOD);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(state) = cell.upgrade() else {
            break;
        };
        // Abort cannot interrupt a tick already past its await point, so the
        // generation and the state are checked again under the fan-out lock.
        let published = state.publish_if(|current| {
            current.is_running() && latest.load(Ordering::SeqCst) == generation
        });
        if !published {
            tracing::debug!(generation, "tick outlived its timer, cancelling itself");
            break;
        }
    }
}
