use std::sync::{Arc, Mutex};

use time::{Duration, OffsetDateTime};

use crate::domain::ports::outbound::Clock;

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can hand one copy to the engine and
/// another to the backend and advance both at once.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: OffsetDateTime) {
        *self.now.lock().expect("manual clock lock poisoned") = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("manual clock lock poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("manual clock lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(datetime!(2024-03-01 09:00 UTC));
        let other = clock.clone();

        clock.advance(Duration::seconds(90));
        assert_eq!(other.now(), datetime!(2024-03-01 09:01:30 UTC));

        other.set(datetime!(2024-03-02 00:00 UTC));
        assert_eq!(clock.now(), datetime!(2024-03-02 00:00 UTC));
    }
}
