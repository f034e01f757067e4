//! The capability registry owned by an adaptable entity
//!
//! [`CapabilityRegistry`] validates registrations, keeps the [`AdapterStore`]
//! consistent, binds adapters to their owner, couples activatable adapters to
//! the owner's lifecycle and tears everything down on [`dispose`].
//!
//! The registry is single-threaded (`Rc`/`RefCell` based). Every operation
//! takes `&self` and releases its borrow of the store before any adapter or
//! listener callback runs, so callbacks may call back into the registry.
//!
//! [`dispose`]: CapabilityRegistry::dispose

use crate::adaptable::Adaptable;
use crate::adapter::{downcast_adapter, Adapter, AdapterId, AdapterRef};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::event::{AdapterListener, AdapterSnapshot, AdaptersChanged, ListenerId, ListenerSet};
use crate::store::{AdapterStore, Insertion};
use affix_types::{CapabilityKey, TypeDescriptor, DEFAULT_ROLE};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Store of adapters for one adaptable owner
pub struct CapabilityRegistry {
    /// Set at construction, cleared by dispose
    owner: RefCell<Option<Weak<dyn Adaptable>>>,
    store: RefCell<AdapterStore>,
    listeners: RefCell<ListenerSet>,
    config: RegistryConfig,
    disposed: Cell<bool>,
    /// Set while dispose runs; nested changes are covered by its one event
    disposing: Cell<bool>,
}

impl CapabilityRegistry {
    /// Create a registry for `owner` with the default configuration
    ///
    /// Owners usually build themselves with [`Rc::new_cyclic`] so they can
    /// hand their own weak reference to the registry.
    pub fn new(owner: Weak<dyn Adaptable>) -> Self {
        Self::with_config(owner, RegistryConfig::default())
    }

    /// Create a registry for `owner` with an explicit configuration
    pub fn with_config(owner: Weak<dyn Adaptable>, config: RegistryConfig) -> Self {
        Self {
            owner: RefCell::new(Some(owner)),
            store: RefCell::new(AdapterStore::new()),
            listeners: RefCell::new(ListenerSet::new()),
            config,
            disposed: Cell::new(false),
            disposing: Cell::new(false),
        }
    }

    /// The configuration in effect
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The owning adaptable, while alive and not disposed
    pub fn owner(&self) -> Option<Rc<dyn Adaptable>> {
        self.owner.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Whether [`dispose`](Self::dispose) has run
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register `adapter` under `ty` with the default role
    pub fn register(&self, ty: TypeDescriptor, adapter: AdapterRef) -> Result<()> {
        self.register_with_role(ty, adapter, DEFAULT_ROLE)
    }

    /// Register `adapter` under `(ty, role)`
    ///
    /// The adapter's runtime type must be `ty` (ignoring generic arguments
    /// the adapter does not report), or an anonymous subtype of `ty` when the
    /// configuration permits anonymous adapters. Registering the same adapter
    /// under the same key again is a reported no-op; registering a different
    /// adapter under a taken key is a [`RegistryError::Conflict`].
    pub fn register_with_role(
        &self,
        ty: TypeDescriptor,
        adapter: AdapterRef,
        role: &str,
    ) -> Result<()> {
        self.ensure_live()?;
        let key = CapabilityKey::get(ty, role)?;
        self.check_runtime_type(&key, &adapter)?;

        if let Some(existing) = self.store.borrow().get(&key) {
            return self.reject_taken(key, existing, &adapter);
        }

        let active = self.owner_is_active();
        if active {
            self.deactivate_adapters();
        }

        let (old, insertion, new) = {
            let mut store = self.store.borrow_mut();
            let old = store.snapshot();
            let insertion = store.insert(key.clone(), Rc::clone(&adapter));
            (old, insertion, store.snapshot())
        };

        // Deactivation callbacks may have taken the key since the check above
        let outcome = match insertion {
            Insertion::Added { first } => {
                if first {
                    self.bind(&adapter);
                }
                tracing::debug!("registered {} under {}", AdapterId::of(&adapter), key);
                Ok(Some(AdaptersChanged { old, new }))
            }
            Insertion::Redundant => {
                self.report_redundant(&key, &adapter);
                Ok(None)
            }
            Insertion::Conflict(existing) => Err(RegistryError::Conflict {
                key,
                existing: AdapterId::of(&existing),
            }),
        };

        if active {
            self.activate_adapters();
        }
        if let Some(event) = outcome? {
            self.notify(&event);
        }
        Ok(())
    }

    fn check_runtime_type(&self, key: &CapabilityKey, adapter: &AdapterRef) -> Result<()> {
        let declared = key.ty();
        let actual = adapter.runtime_type();

        let same_raw = actual.raw() == declared.raw()
            && (!actual.is_parameterized() || declared.is_assignable_from(&actual));
        let anonymous_fit = self.config.permit_anonymous
            && actual.is_anonymous()
            && declared.is_assignable_from(&actual);

        if same_raw || anonymous_fit {
            Ok(())
        } else {
            Err(RegistryError::TypeMismatch {
                declared: declared.clone(),
                actual,
            })
        }
    }

    fn reject_taken(
        &self,
        key: CapabilityKey,
        existing: &AdapterRef,
        adapter: &AdapterRef,
    ) -> Result<()> {
        if AdapterId::of(existing) == AdapterId::of(adapter) {
            self.report_redundant(&key, adapter);
            Ok(())
        } else {
            Err(RegistryError::Conflict {
                key,
                existing: AdapterId::of(existing),
            })
        }
    }

    fn report_redundant(&self, key: &CapabilityKey, adapter: &AdapterRef) {
        if self.config.warn_on_redundant {
            tracing::warn!(
                "{} is already registered under {}; ignoring",
                AdapterId::of(adapter),
                key
            );
        } else {
            tracing::debug!(
                "{} is already registered under {}; ignoring",
                AdapterId::of(adapter),
                key
            );
        }
    }

    /// Remove `adapter` under every key it holds
    ///
    /// Fails with [`RegistryError::NotRegistered`] if the adapter holds no
    /// key. A bound adapter has its owner cleared.
    pub fn unregister(&self, adapter: &AdapterRef) -> Result<()> {
        let id = AdapterId::of(adapter);
        if !self.store.borrow().contains_adapter(id) {
            return Err(RegistryError::NotRegistered(id));
        }

        let active = self.owner_is_active();
        if active {
            self.deactivate_adapters();
        }

        let (old, removed, new) = {
            let mut store = self.store.borrow_mut();
            let old = store.snapshot();
            let removed = store.remove_adapter(id);
            (old, removed, store.snapshot())
        };

        let outcome = match removed {
            Some((adapter, keys)) => {
                self.unbind(&adapter);
                tracing::debug!("unregistered {} from {} key(s)", id, keys.len());
                Ok(AdaptersChanged { old, new })
            }
            None => Err(RegistryError::NotRegistered(id)),
        };

        if active {
            self.activate_adapters();
        }
        let event = outcome?;
        self.notify(&event);
        Ok(())
    }

    /// Remove a single key
    ///
    /// The adapter stays registered under its other keys; it is unbound once
    /// it has none left. Returns the adapter that held the key.
    pub fn unregister_key(&self, key: &CapabilityKey) -> Result<AdapterRef> {
        if self.store.borrow().get(key).is_none() {
            return Err(RegistryError::UnknownKey(key.clone()));
        }

        let active = self.owner_is_active();
        if active {
            self.deactivate_adapters();
        }

        let (old, removed, new) = {
            let mut store = self.store.borrow_mut();
            let old = store.snapshot();
            let removed = store.remove_key(key);
            (old, removed, store.snapshot())
        };

        let outcome = match removed {
            Some(removed) => {
                if removed.orphaned {
                    self.unbind(&removed.adapter);
                }
                tracing::debug!("unregistered {} from {}", AdapterId::of(&removed.adapter), key);
                Ok((removed.adapter, AdaptersChanged { old, new }))
            }
            None => Err(RegistryError::UnknownKey(key.clone())),
        };

        if active {
            self.activate_adapters();
        }
        let (adapter, event) = outcome?;
        self.notify(&event);
        Ok(adapter)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Resolve the single adapter for `ty` and optional `role`
    ///
    /// Matches adapters registered under `ty` or any subtype. If more than one
    /// distinct adapter matches and no role was given, the adapter registered
    /// under [`DEFAULT_ROLE`] wins, provided it is the only one there.
    /// Ambiguity returns `None`.
    pub fn lookup(&self, ty: &TypeDescriptor, role: Option<&str>) -> Option<AdapterRef> {
        self.store.borrow().lookup(ty, role)
    }

    /// [`lookup`](Self::lookup) followed by a downcast to `T`
    pub fn lookup_as<T: Adapter>(&self, ty: &TypeDescriptor, role: Option<&str>) -> Option<Rc<T>> {
        self.lookup(ty, role)
            .and_then(|adapter| downcast_adapter::<T>(&adapter))
    }

    /// The key `adapter` was most recently registered under
    pub fn lookup_key(&self, adapter: &AdapterRef) -> Option<CapabilityKey> {
        self.store.borrow().key_of(AdapterId::of(adapter)).cloned()
    }

    /// Every key `adapter` is registered under, in registration order
    pub fn lookup_keys(&self, adapter: &AdapterRef) -> Vec<CapabilityKey> {
        self.store.borrow().keys_of(AdapterId::of(adapter)).to_vec()
    }

    /// Every registration under `ty` or a subtype, any role, in key order
    pub fn lookup_all(&self, ty: &TypeDescriptor) -> AdapterSnapshot {
        self.store.borrow().lookup_all(ty)
    }

    /// Snapshot of every registration
    pub fn adapters(&self) -> AdapterSnapshot {
        self.store.borrow().snapshot()
    }

    /// Whether `adapter` holds at least one key
    pub fn contains(&self, adapter: &AdapterRef) -> bool {
        self.store.borrow().contains_adapter(AdapterId::of(adapter))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    /// Whether no adapter is registered
    pub fn is_empty(&self) -> bool {
        self.store.borrow().is_empty()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Activate every activatable adapter that is not active yet
    ///
    /// Owners call this when they become active.
    pub fn activate_adapters(&self) {
        for adapter in self.distinct_adapters() {
            if let Some(activatable) = adapter.as_activatable() {
                if !activatable.is_active() {
                    activatable.activate();
                }
            }
        }
    }

    /// Deactivate every active adapter
    ///
    /// Owners call this when they become inactive.
    pub fn deactivate_adapters(&self) {
        for adapter in self.distinct_adapters() {
            if let Some(activatable) = adapter.as_activatable() {
                if activatable.is_active() {
                    activatable.deactivate();
                }
            }
        }
    }

    /// Unregister, unbind and dispose every adapter
    ///
    /// Fails with [`RegistryError::IllegalState`] without touching anything
    /// if the owner is still active. Each adapter is unbound and disposed once,
    /// when its last key is removed. Afterwards the registry is empty, has no
    /// owner and refuses new registrations. Disposing twice is a no-op.
    ///
    /// Listeners get one event spanning the whole disposal, including
    /// adapters that disposal callbacks unregister along the way.
    pub fn dispose(&self) -> Result<()> {
        if self.disposed.get() {
            return Ok(());
        }
        if self.owner_is_active() {
            return Err(RegistryError::IllegalState(
                "cannot dispose the adapters of an active owner".to_string(),
            ));
        }
        self.disposed.set(true);
        self.disposing.set(true);

        let old = self.store.borrow().snapshot();
        let keys: Vec<CapabilityKey> = old.keys().cloned().collect();
        let mut disposed = 0usize;

        for key in keys {
            // Re-fetch per key: disposal callbacks may have removed it already
            let removed = self.store.borrow_mut().remove_key(&key);
            let Some(removed) = removed else {
                continue;
            };
            if removed.orphaned {
                self.unbind(&removed.adapter);
                if let Some(disposable) = removed.adapter.as_disposable() {
                    disposable.dispose();
                }
                disposed += 1;
            }
        }

        let new = self.store.borrow().snapshot();
        self.disposing.set(false);
        self.owner.borrow_mut().take();
        tracing::debug!("disposed registry: released {} adapter(s)", disposed);

        if !old.is_empty() {
            self.notify(&AdaptersChanged { old, new });
        }
        self.listeners.borrow_mut().clear();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Attach a listener; it is called after every successful mutation
    pub fn add_listener(&self, listener: Rc<dyn AdapterListener>) -> ListenerId {
        self.listeners.borrow_mut().add(listener)
    }

    /// Attach a closure as listener
    pub fn on_change(&self, listener: impl Fn(&AdaptersChanged) + 'static) -> ListenerId {
        self.add_listener(Rc::new(listener))
    }

    /// Detach a listener; false if it was not attached
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(id)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_live(&self) -> Result<()> {
        if self.disposed.get() {
            Err(RegistryError::Disposed)
        } else {
            Ok(())
        }
    }

    fn owner_is_active(&self) -> bool {
        self.owner().map_or(false, |owner| owner.is_active())
    }

    fn distinct_adapters(&self) -> Vec<AdapterRef> {
        self.store.borrow().adapters()
    }

    fn bind(&self, adapter: &AdapterRef) {
        if let Some(bound) = adapter.as_bound() {
            let owner = self.owner.borrow().clone();
            bound.set_owner(owner);
        }
    }

    fn unbind(&self, adapter: &AdapterRef) {
        if let Some(bound) = adapter.as_bound() {
            bound.set_owner(None);
        }
    }

    fn notify(&self, event: &AdaptersChanged) {
        if self.disposing.get() {
            tracing::trace!("holding back change during dispose");
            return;
        }
        let listeners = self.listeners.borrow().to_vec();
        for (id, listener) in listeners {
            tracing::trace!("delivering change to {}", id);
            listener.adapters_changed(event);
        }
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("adapters", &self.store.borrow().snapshot())
            .field("listeners", &*self.listeners.borrow())
            .field("config", &self.config)
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
