use std::time::Duration;

use crate::domain::models::UserId;

/// Tunables for [`TimerEngine`](super::TimerEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Recorded and measured durations further apart than this, in hours,
    /// produce a discrepancy note on stop.
    pub discrepancy_tolerance_hours: f64,
    /// How often observers are refreshed while a timer runs.
    pub tick_interval: Duration,
    /// Passed to the backend when stopping, see `TimerBackend::stop_timer`.
    pub match_on_stop: bool,
    /// Key of the persisted snapshot in the state store.
    pub snapshot_key: String,
    /// Owner sent along with every created record.
    pub owner_id: Option<UserId>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            discrepancy_tolerance_hours: 0.1,
            tick_interval: Duration::from_secs(1),
            match_on_stop: false,
            snapshot_key: "stint.timer".to_string(),
            owner_id: None,
        }
    }
}

impl EngineSettings {
    pub fn with_owner(mut self, owner_id: Option<UserId>) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_discrepancy_tolerance(mut self, hours: f64) -> Self {
        self.discrepancy_tolerance_hours = hours;
        self
    }
}
