use std::sync::{Mutex, PoisonError};

use crate::domain::{
    models::TimerState,
    ports::inbound::{Observer, SubscriptionId},
};

/// The engine-owned timer state plus everyone watching it.
///
/// Observers are called with a clone of the state taken after the state lock
/// is released, so they may read the engine from a callback. Deliveries are
/// serialized by the fan-out lock: one publish finishes notifying before the
/// next one takes its snapshot, so observers always end on the latest state.
#[derive(Default)]
pub(super) struct StateCell {
    state: Mutex<TimerState>,
    observers: Mutex<ObserverList>,
    fanout: Mutex<()>,
}

#[derive(Default)]
struct ObserverList {
    next_id: u64,
    entries: Vec<(SubscriptionId, Observer)>,
}

impl StateCell {
    pub(super) fn snapshot(&self) -> TimerState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(super) fn install(&self, next: TimerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub(super) fn subscribe(&self, observer: Observer) -> SubscriptionId {
        let mut list = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        list.next_id += 1;
        let id = SubscriptionId(list.next_id);
        list.entries.push((id, observer));
        id
    }

    pub(super) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut list = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = list.entries.len();
        list.entries.retain(|(entry_id, _)| *entry_id != id);
        list.entries.len() != before
    }

    /// Push the current state to every observer, in registration order.
    pub(super) fn publish(&self) {
        self.publish_if(|_| true);
    }

    /// Publish only if `accept` approves the state about to be delivered.
    ///
    /// The check runs under the fan-out lock, so a state replaced before the
    /// check is never delivered after its replacement. Returns whether the
    /// state was published.
    pub(super) fn publish_if(&self, accept: impl FnOnce(&TimerState) -> bool) -> bool {
        let _fanout = self.fanout.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.snapshot();
        if !accept(&state) {
            return false;
        }

        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        for observer in observers {
            observer(&state);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn publishes_in_registration_order() {
        let cell = StateCell::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["status", "tree", "panel"] {
            let seen = seen.clone();
            cell.subscribe(Arc::new(move |_state: &TimerState| {
                seen.lock().unwrap().push(name);
            }));
        }
        cell.publish();

        assert_eq!(*seen.lock().unwrap(), vec!["status", "tree", "panel"]);
    }

    #[test]
    fn unsubscribed_observers_are_not_called() {
        let cell = StateCell::default();
        let calls = Arc::new(Mutex::new(0));

        let counter = calls.clone();
        let id = cell.subscribe(Arc::new(move |_state: &TimerState| {
            *counter.lock().unwrap() += 1;
        }));
        cell.publish();
        assert!(cell.unsubscribe(id));
        assert!(!cell.unsubscribe(id));
        cell.publish();

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn observers_can_read_state_while_being_notified() {
        let cell = Arc::new(StateCell::default());
        let inner = Arc::downgrade(&cell);
        let matched = Arc::new(Mutex::new(false));

        let flag = matched.clone();
        cell.subscribe(Arc::new(move |state: &TimerState| {
            let current = inner.upgrade().unwrap().snapshot();
            *flag.lock().unwrap() = current == *state;
        }));
        cell.publish();

        assert!(*matched.lock().unwrap());
    }

    #[test]
    fn rejected_publish_notifies_nobody() {
        let cell = StateCell::default();
        let calls = Arc::new(Mutex::new(0));

        let counter = calls.clone();
        cell.subscribe(Arc::new(move |_state: &TimerState| {
            *counter.lock().unwrap() += 1;
        }));

        assert!(!cell.publish_if(TimerState::is_running));
        assert!(cell.publish_if(|state| !state.is_running()));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
