//! Snapshot subscriptions.
//!
//! Listeners are kept in a map keyed by [`SubscriptionId`], so removal is O(1)
//! and takes effect before the next publication. Delivery order between
//! listeners is unspecified.

use crate::snapshot::SystemSnapshot;
use std::collections::HashMap;
use std::fmt;

/// Handle returned by a subscribe call; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

type Listener = Box<dyn FnMut(&SystemSnapshot)>;

#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    listeners: HashMap<SubscriptionId, Listener>,
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("next_id", &self.next_id)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver every published snapshot to `listener`.
    pub fn subscribe(&mut self, listener: impl FnMut(&SystemSnapshot) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    /// Deliver `selector(snapshot)` only when it differs from the value last
    /// delivered. The first publication after subscribing always delivers.
    pub fn subscribe_select<T, S, L>(&mut self, selector: S, mut listener: L) -> SubscriptionId
    where
        T: PartialEq + 'static,
        S: Fn(&SystemSnapshot) -> T + 'static,
        L: FnMut(&T) + 'static,
    {
        let mut last: Option<T> = None;
        self.subscribe(move |snapshot| {
            let value = selector(snapshot);
            if last.as_ref() != Some(&value) {
                listener(&value);
                last = Some(value);
            }
        })
    }

    /// Returns `true` if a listener was removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub(crate) fn publish(&mut self, snapshot: &SystemSnapshot) {
        for listener in self.listeners.values_mut() {
            listener(snapshot);
        }
    }
}
