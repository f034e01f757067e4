//! Bidirectional adapter storage and matching
//!
//! [`AdapterStore`] owns the forward map (key -> adapter) and the reverse
//! index (adapter identity -> keys) together. The reverse side is only ever
//! updated by the same methods that update the forward side, so every adapter
//! in `entries` has an index entry and vice versa.

use crate::adapter::{AdapterId, AdapterRef};
use crate::event::AdapterSnapshot;
use affix_types::{CapabilityKey, TypeDescriptor, DEFAULT_ROLE};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

/// Outcome of [`AdapterStore::insert`]
pub enum Insertion {
    /// The key was added; `first` is true if the adapter had no keys before
    Added {
        /// Whether this is the adapter's first key
        first: bool,
    },
    /// The key already maps to this very adapter; nothing changed
    Redundant,
    /// The key maps to another adapter; nothing changed
    Conflict(AdapterRef),
}

/// An adapter removed from the store by key
pub struct Removed {
    /// The adapter that held the key
    pub adapter: AdapterRef,
    /// Whether the adapter has no keys left
    pub orphaned: bool,
}

/// Keys held by one adapter, in registration order
struct Holding {
    adapter: AdapterRef,
    keys: Vec<CapabilityKey>,
}

/// Ordered key -> adapter map with an identity-based reverse index
#[derive(Default)]
pub struct AdapterStore {
    entries: BTreeMap<CapabilityKey, AdapterRef>,
    index: HashMap<AdapterId, Holding>,
}

impl AdapterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter registered under exactly `key`
    pub fn get(&self, key: &CapabilityKey) -> Option<&AdapterRef> {
        self.entries.get(key)
    }

    /// Bind `key` to `adapter`
    ///
    /// Never replaces an existing binding.
    pub fn insert(&mut self, key: CapabilityKey, adapter: AdapterRef) -> Insertion {
        let id = AdapterId::of(&adapter);
        if let Some(existing) = self.entries.get(&key) {
            if AdapterId::of(existing) == id {
                return Insertion::Redundant;
            }
            return Insertion::Conflict(Rc::clone(existing));
        }

        self.entries.insert(key.clone(), Rc::clone(&adapter));
        let holding = self.index.entry(id).or_insert_with(|| Holding {
            adapter,
            keys: Vec::new(),
        });
        holding.keys.push(key);
        Insertion::Added {
            first: holding.keys.len() == 1,
        }
    }

    /// Remove one key
    pub fn remove_key(&mut self, key: &CapabilityKey) -> Option<Removed> {
        let adapter = self.entries.remove(key)?;
        let id = AdapterId::of(&adapter);

        let orphaned = match self.index.get_mut(&id) {
            Some(holding) => {
                holding.keys.retain(|k| k != key);
                holding.keys.is_empty()
            }
            None => true,
        };
        if orphaned {
            self.index.remove(&id);
        }
        Some(Removed { adapter, orphaned })
    }

    /// Remove every key held by the adapter with identity `id`
    ///
    /// Returns the adapter and the keys it held, in registration order.
    pub fn remove_adapter(&mut self, id: AdapterId) -> Option<(AdapterRef, Vec<CapabilityKey>)> {
        let holding = self.index.remove(&id)?;
        for key in &holding.keys {
            self.entries.remove(key);
        }
        Some((holding.adapter, holding.keys))
    }

    /// Whether the adapter holds at least one key
    pub fn contains_adapter(&self, id: AdapterId) -> bool {
        self.index.contains_key(&id)
    }

    /// The most recently registered key still held by the adapter
    pub fn key_of(&self, id: AdapterId) -> Option<&CapabilityKey> {
        self.index.get(&id).and_then(|holding| holding.keys.last())
    }

    /// All keys held by the adapter, in registration order
    pub fn keys_of(&self, id: AdapterId) -> &[CapabilityKey] {
        self.index
            .get(&id)
            .map(|holding| holding.keys.as_slice())
            .unwrap_or_default()
    }

    /// Distinct adapters whose key type is `ty` or a subtype of it and, if
    /// `role` is given, whose role equals it
    ///
    /// Adapters appear once, at the position of their first qualifying key.
    pub fn gather(&self, ty: &TypeDescriptor, role: Option<&str>) -> Vec<AdapterRef> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|(key, _)| role.map_or(true, |role| key.role() == role))
            .filter(|(key, _)| ty.is_assignable_from(key.ty()))
            .filter(|(_, adapter)| seen.insert(AdapterId::of(adapter)))
            .map(|(_, adapter)| Rc::clone(adapter))
            .collect()
    }

    /// Resolve a single adapter for `ty` and optional `role`
    ///
    /// Exactly one distinct match wins. With several matches and no role
    /// given, the search is repeated for [`DEFAULT_ROLE`] and wins if that
    /// leaves exactly one. Anything else is no match.
    pub fn lookup(&self, ty: &TypeDescriptor, role: Option<&str>) -> Option<AdapterRef> {
        let mut candidates = self.gather(ty, role);
        if candidates.len() > 1 && role.is_none() {
            candidates = self.gather(ty, Some(DEFAULT_ROLE));
        }

        match candidates.len() {
            1 => candidates.pop(),
            0 => None,
            n => {
                tracing::debug!(
                    "ambiguous lookup for {} (role {:?}): {} candidates",
                    ty,
                    role,
                    n
                );
                None
            }
        }
    }

    /// Every registration whose key type is `ty` or a subtype, any role
    pub fn lookup_all(&self, ty: &TypeDescriptor) -> AdapterSnapshot {
        AdapterSnapshot::from_map(
            self.entries
                .iter()
                .filter(|(key, _)| ty.is_assignable_from(key.ty()))
                .map(|(key, adapter)| (key.clone(), Rc::clone(adapter)))
                .collect(),
        )
    }

    /// Copy of all registrations
    pub fn snapshot(&self) -> AdapterSnapshot {
        AdapterSnapshot::from_map(self.entries.clone())
    }

    /// Distinct adapters in key order
    pub fn adapters(&self) -> Vec<AdapterRef> {
        let mut seen = HashSet::new();
        self.entries
            .values()
            .filter(|adapter| seen.insert(AdapterId::of(adapter)))
            .map(Rc::clone)
            .collect()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of distinct adapters
    pub fn adapter_count(&self) -> usize {
        self.index.len()
    }

    /// Whether the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
