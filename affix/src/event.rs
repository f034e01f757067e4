//! Change notifications
//!
//! Every successful mutation of a registry emits one [`AdaptersChanged`]
//! carrying complete before and after snapshots. Snapshots are owned copies,
//! so a listener that mutates the registry while handling an event does not
//! alter what it (or later listeners) see.

use crate::adapter::{AdapterId, AdapterRef};
use affix_types::CapabilityKey;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// An owned, ordered copy of key -> adapter registrations
#[derive(Clone, Default)]
pub struct AdapterSnapshot(BTreeMap<CapabilityKey, AdapterRef>);

impl AdapterSnapshot {
    pub(crate) fn from_map(map: BTreeMap<CapabilityKey, AdapterRef>) -> Self {
        Self(map)
    }

    /// Adapter registered under `key`
    pub fn get(&self, key: &CapabilityKey) -> Option<&AdapterRef> {
        self.0.get(key)
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &CapabilityKey) -> bool {
        self.0.contains_key(key)
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &CapabilityKey> {
        self.0.keys()
    }

    /// Adapters in key order; shared adapters appear once per key
    pub fn values(&self) -> impl Iterator<Item = &AdapterRef> {
        self.0.values()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&CapabilityKey, &AdapterRef)> {
        self.0.iter()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no keys
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn same_entry(&self, key: &CapabilityKey, other: &AdapterSnapshot) -> bool {
        match (self.0.get(key), other.0.get(key)) {
            (Some(a), Some(b)) => AdapterId::of(a) == AdapterId::of(b),
            _ => false,
        }
    }
}

impl fmt::Debug for AdapterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| (k, AdapterId::of(v))))
            .finish()
    }
}

/// Event emitted when a registry's registrations change
#[derive(Debug, Clone)]
pub struct AdaptersChanged {
    /// Registrations before the change
    pub old: AdapterSnapshot,
    /// Registrations after the change
    pub new: AdapterSnapshot,
}

impl AdaptersChanged {
    /// Keys present afterwards that were absent, or held by another adapter,
    /// before
    pub fn added(&self) -> Vec<CapabilityKey> {
        self.new
            .keys()
            .filter(|key| !self.new.same_entry(key, &self.old))
            .cloned()
            .collect()
    }

    /// Keys present before that are gone, or held by another adapter,
    /// afterwards
    pub fn removed(&self) -> Vec<CapabilityKey> {
        self.old
            .keys()
            .filter(|key| !self.old.same_entry(key, &self.new))
            .cloned()
            .collect()
    }
}

/// Trait for observing registry changes
pub trait AdapterListener {
    /// Called after every successful mutation
    fn adapters_changed(&self, event: &AdaptersChanged);
}

impl<F> AdapterListener for F
where
    F: Fn(&AdaptersChanged),
{
    fn adapters_changed(&self, event: &AdaptersChanged) {
        self(event)
    }
}

/// A listener that records every event
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: RefCell<Vec<AdaptersChanged>>,
}

impl CollectingListener {
    /// Create a new collecting listener
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the collected events, leaving the listener empty
    pub fn take(&self) -> Vec<AdaptersChanged> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Number of events collected so far
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing has been collected
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl AdapterListener for CollectingListener {
    fn adapters_changed(&self, event: &AdaptersChanged) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Listener identifier, returned by `add_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

static LISTENER_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    /// Create a new unique listener ID
    pub fn new() -> Self {
        Self(LISTENER_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener:{}", self.0)
    }
}

/// Listeners in registration order
#[derive(Default)]
pub struct ListenerSet {
    listeners: BTreeMap<ListenerId, Rc<dyn AdapterListener>>,
}

impl ListenerSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener
    pub fn add(&mut self, listener: Rc<dyn AdapterListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.insert(id, listener);
        id
    }

    /// Remove a listener; false if it was not present
    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Drop every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether there are no listeners
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Copy of the current listeners, in delivery order
    ///
    /// Deliver from the copy so listeners can add or remove listeners while
    /// an event is in flight.
    pub fn to_vec(&self) -> Vec<(ListenerId, Rc<dyn AdapterListener>)> {
        self.listeners
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect()
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.listeners.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Adapter;
    use affix_types::TypeDescriptor;
    use std::cell::Cell;

    struct Marker;

    impl Adapter for Marker {
        fn runtime_type(&self) -> TypeDescriptor {
            TypeDescriptor::named("Marker")
        }
    }

    fn key(role: &str) -> CapabilityKey {
        CapabilityKey::get(TypeDescriptor::named("Marker"), role).unwrap()
    }

    #[test]
    fn test_added_and_removed() {
        let a: AdapterRef = Rc::new(Marker);
        let b: AdapterRef = Rc::new(Marker);

        let mut old = BTreeMap::new();
        old.insert(key("kept"), a.clone());
        old.insert(key("dropped"), a.clone());
        old.insert(key("replaced"), a.clone());

        let mut new = BTreeMap::new();
        new.insert(key("kept"), a.clone());
        new.insert(key("replaced"), b.clone());
        new.insert(key("fresh"), b);

        let event = AdaptersChanged {
            old: AdapterSnapshot::from_map(old),
            new: AdapterSnapshot::from_map(new),
        };

        assert_eq!(event.added(), vec![key("fresh"), key("replaced")]);
        assert_eq!(event.removed(), vec![key("dropped"), key("replaced")]);
    }

    #[test]
    fn test_listener_order() {
        let mut set = ListenerSet::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            set.add(Rc::new(move |_: &AdaptersChanged| order.borrow_mut().push(n)));
        }

        let event = AdaptersChanged {
            old: AdapterSnapshot::default(),
            new: AdapterSnapshot::default(),
        };
        for (_, listener) in set.to_vec() {
            listener.adapters_changed(&event);
        }

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_listener() {
        let mut set = ListenerSet::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let id = set.add(Rc::new(move |_: &AdaptersChanged| counter.set(counter.get() + 1)));

        assert_eq!(set.len(), 1);
        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(set.is_empty());
    }

    #[test]
    fn test_listener_ids_are_unique() {
        let first = ListenerId::new();
        let second = ListenerId::default();

        assert!(first < second);
        assert_eq!(first.to_string(), format!("listener:{}", first.0));
    }

    #[test]
    fn test_collecting_listener() {
        let listener = CollectingListener::new();
        let event = AdaptersChanged {
            old: AdapterSnapshot::default(),
            new: AdapterSnapshot::default(),
        };

        listener.adapters_changed(&event);
        listener.adapters_changed(&event);

        assert_eq!(listener.len(), 2);
        assert_eq!(listener.take().len(), 2);
        assert!(listener.is_empty());
    }
}
