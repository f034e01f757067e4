//! The adaptable contract
//!
//! An adaptable entity owns a [`CapabilityRegistry`] and exposes it through
//! [`Adaptable`]. All provided methods are plain pass-throughs; the matching
//! rules live in the registry.

use crate::adapter::{Adapter, AdapterRef};
use crate::config::RegistryConfig;
use crate::error::Result;
use crate::event::AdapterSnapshot;
use crate::registry::CapabilityRegistry;
use affix_types::{CapabilityKey, TypeDescriptor};
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

/// An entity that adapters can be attached to
pub trait Adaptable {
    /// The registry this entity owns
    fn registry(&self) -> &CapabilityRegistry;

    /// Whether the entity is currently active
    ///
    /// While active, activatable adapters are deactivated around every
    /// registry mutation and reactivated afterwards, and the registry cannot
    /// be disposed. Entities without a lifecycle keep the default.
    fn is_active(&self) -> bool {
        false
    }

    /// Register `adapter` under `ty` with the default role
    fn register(&self, ty: TypeDescriptor, adapter: AdapterRef) -> Result<()> {
        self.registry().register(ty, adapter)
    }

    /// Register `adapter` under `(ty, role)`
    fn register_with_role(&self, ty: TypeDescriptor, adapter: AdapterRef, role: &str) -> Result<()> {
        self.registry().register_with_role(ty, adapter, role)
    }

    /// Remove `adapter` under all its keys
    fn unregister(&self, adapter: &AdapterRef) -> Result<()> {
        self.registry().unregister(adapter)
    }

    /// Resolve the single adapter for `ty` and optional `role`
    fn lookup(&self, ty: &TypeDescriptor, role: Option<&str>) -> Option<AdapterRef> {
        self.registry().lookup(ty, role)
    }

    /// Resolve and downcast to `T`
    ///
    /// Not available on `dyn Adaptable`; use `registry().lookup_as` there.
    fn lookup_as<T: Adapter>(&self, ty: &TypeDescriptor, role: Option<&str>) -> Option<Rc<T>>
    where
        Self: Sized,
    {
        self.registry().lookup_as(ty, role)
    }

    /// The key `adapter` is registered under
    fn lookup_key(&self, adapter: &AdapterRef) -> Option<CapabilityKey> {
        self.registry().lookup_key(adapter)
    }

    /// Every registration under `ty` or a subtype
    fn lookup_all(&self, ty: &TypeDescriptor) -> AdapterSnapshot {
        self.registry().lookup_all(ty)
    }
}

/// A minimal adaptable with an activation flag
///
/// Useful on its own as an adapter container and as the reference for how
/// an entity wires itself to its registry.
///
/// # Example
///
/// ```
/// use affix::{Adaptable, AdaptableHost};
///
/// let host = AdaptableHost::new();
/// host.activate();
/// assert!(host.is_active());
/// host.deactivate();
/// host.dispose().unwrap();
/// ```
pub struct AdaptableHost {
    registry: CapabilityRegistry,
    active: Cell<bool>,
}

impl AdaptableHost {
    /// Create a host with the default configuration
    pub fn new() -> Rc<Self> {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a host with an explicit registry configuration
    pub fn with_config(config: RegistryConfig) -> Rc<Self> {
        Rc::new_cyclic(|me: &Weak<AdaptableHost>| {
            let owner: Weak<dyn Adaptable> = me.clone();
            AdaptableHost {
                registry: CapabilityRegistry::with_config(owner, config),
                active: Cell::new(false),
            }
        })
    }

    /// Become active and activate all activatable adapters
    pub fn activate(&self) {
        if !self.active.replace(true) {
            self.registry.activate_adapters();
        }
    }

    /// Deactivate all activatable adapters and become inactive
    pub fn deactivate(&self) {
        if self.active.get() {
            self.registry.deactivate_adapters();
            self.active.set(false);
        }
    }

    /// Dispose the registry; the host must be inactive
    pub fn dispose(&self) -> Result<()> {
        self.registry.dispose()
    }
}

impl Adaptable for AdaptableHost {
    fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl fmt::Debug for AdaptableHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptableHost")
            .field("active", &self.active.get())
            .field("registry", &self.registry)
            .finish()
    }
}
