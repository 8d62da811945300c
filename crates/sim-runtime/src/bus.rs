//! Ordered clock listeners.

use sim_core::{ClockEvent, SubscriptionId};
use std::collections::HashMap;

/// Listener registry keyed by clock event.
///
/// Listeners of one event fire in registration order. Dispatch works on a
/// snapshot taken by [`EventBus::listeners`]; a listener removed while the
/// snapshot is being delivered must be skipped by checking
/// [`EventBus::is_registered`] before delivery.
#[derive(Clone, Debug)]
pub struct EventBus<L> {
    next_id: u64,
    listeners: HashMap<ClockEvent, Vec<(SubscriptionId, L)>>,
    index: HashMap<SubscriptionId, ClockEvent>,
}

impl<L> Default for EventBus<L> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: HashMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<L: Copy> EventBus<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, event: ClockEvent, listener: L) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.entry(event).or_default().push((id, listener));
        self.index.insert(id, event);
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let Some(event) = self.index.remove(&id) else {
            return false;
        };
        if let Some(list) = self.listeners.get_mut(&event) {
            list.retain(|(sub, _)| *sub != id);
        }
        true
    }

    pub fn is_registered(&self, id: SubscriptionId) -> bool {
        self.index.contains_key(&id)
    }

    /// Snapshot of the current listeners of `event`, in registration order.
    pub fn listeners(&self, event: ClockEvent) -> Vec<(SubscriptionId, L)> {
        self.listeners.get(&event).cloned().unwrap_or_default()
    }

    pub fn len(&self, event: ClockEvent) -> usize {
        self.listeners.get(&event).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_keep_registration_order() {
        let mut bus = EventBus::new();
        let a = bus.on(ClockEvent::Hour, 'a');
        bus.on(ClockEvent::Day, 'x');
        let b = bus.on(ClockEvent::Hour, 'b');
        let c = bus.on(ClockEvent::Hour, 'c');
        assert_eq!(
            bus.listeners(ClockEvent::Hour),
            vec![(a, 'a'), (b, 'b'), (c, 'c')]
        );
        assert!(bus.off(b));
        assert!(!bus.off(b));
        assert_eq!(bus.listeners(ClockEvent::Hour), vec![(a, 'a'), (c, 'c')]);
        assert_eq!(bus.len(ClockEvent::Day), 1);
    }

    #[test]
    fn removal_during_delivery_is_honoured() {
        let mut bus = EventBus::new();
        let first = bus.on(ClockEvent::Hour, 1);
        let second = bus.on(ClockEvent::Hour, 2);
        let mut delivered = Vec::new();
        for (id, listener) in bus.listeners(ClockEvent::Hour) {
            if !bus.is_registered(id) {
                continue;
            }
            delivered.push(listener);
            if id == first {
                bus.off(second);
                // Late registrations wait for the next delivery.
                bus.on(ClockEvent::Hour, 3);
            }
        }
        assert_eq!(delivered, vec![1]);
        assert_eq!(bus.len(ClockEvent::Hour), 2);
    }
}
