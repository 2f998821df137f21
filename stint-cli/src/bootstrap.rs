use stint_core::{RestoreOutcome, TimerService};

/// Bring the engine in line with the backend at start-up.
///
/// A saved timer confirmed by the backend is restored as-is; anything else
/// falls back to asking the backend what is running.
pub async fn initialize_timer<T: TimerService + ?Sized>(service: &T) {
    match service.load().await {
        RestoreOutcome::Restored(timer) => {
            tracing::debug!(record_id = %timer.record_id, "restored saved timer");
            return;
        }
        RestoreOutcome::NothingToRestore => {}
        RestoreOutcome::Failed(failure) => {
            tracing::warn!(%failure, "saved timer discarded");
        }
    }

    if let Err(e) = service.reconcile().await {
        eprintln!("Warning: Could not check running timer: {}", e);
    }
}
