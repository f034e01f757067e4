//! Declarative adapter bindings
//!
//! An injector that builds adapters for an adaptable usually describes them
//! up front: "a `Logger` under role `debug`", "whatever this factory makes,
//! under role `fallback`", "whatever this factory makes, default role". The
//! last two forms do not know the type until the adapter exists, which is
//! what [`BindingKey::role_only`] and [`BindingKey::unkeyed`] express.
//!
//! [`AdapterBindings`] keeps such a description and installs it into a
//! registry. How the factories build adapters is up to the caller.

use crate::adaptable::Adaptable;
use crate::adapter::AdapterRef;
use crate::error::Result;
use crate::registry::CapabilityRegistry;
use affix_types::{BindingKey, CapabilityKey};
use std::fmt;

/// Produces one adapter per call
pub type AdapterFactory = Box<dyn Fn() -> AdapterRef>;

/// An ordered list of binding keys and the factories that fill them
#[derive(Default)]
pub struct AdapterBindings {
    bindings: Vec<(BindingKey, AdapterFactory)>,
}

impl AdapterBindings {
    /// Create an empty binding list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding
    pub fn bind(
        mut self,
        key: impl Into<BindingKey>,
        factory: impl Fn() -> AdapterRef + 'static,
    ) -> Self {
        self.bindings.push((key.into(), Box::new(factory)));
        self
    }

    /// Binding keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &BindingKey> {
        self.bindings.iter().map(|(key, _)| key)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether there are no bindings
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Build every adapter and register it
    ///
    /// Keys without a type take the adapter's runtime type, or its nearest
    /// named supertype if the adapter is anonymous. Stops at the first
    /// registration error. Returns the keys used, in declaration order.
    pub fn install(&self, registry: &CapabilityRegistry) -> Result<Vec<CapabilityKey>> {
        let mut installed = Vec::with_capacity(self.bindings.len());
        for (binding, factory) in &self.bindings {
            let adapter = factory();
            let key = binding.resolve(&adapter.runtime_type().nearest_named());
            registry.register_with_role(key.ty().clone(), adapter, key.role())?;
            tracing::debug!("installed binding {} as {}", binding, key);
            installed.push(key);
        }
        Ok(installed)
    }

    /// [`install`](Self::install) into an adaptable's registry
    pub fn install_into(&self, adaptable: &dyn Adaptable) -> Result<Vec<CapabilityKey>> {
        self.install(adaptable.registry())
    }
}

impl fmt::Debug for AdapterBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.bindings.iter().map(|(key, _)| key.to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptable::AdaptableHost;
    use crate::adapter::Adapter;
    use crate::error::RegistryError;
    use affix_types::{TypeDescriptor, DEFAULT_ROLE};
    use std::rc::Rc;

    struct Typed(TypeDescriptor);

    impl Adapter for Typed {
        fn runtime_type(&self) -> TypeDescriptor {
            self.0.clone()
        }
    }

    fn palette() -> TypeDescriptor {
        TypeDescriptor::named("Palette")
    }

    #[test]
    fn test_install_resolves_keys() {
        let host = AdaptableHost::new();
        let bindings = AdapterBindings::new()
            .bind(
                CapabilityKey::get(palette(), "main").unwrap(),
                || Rc::new(Typed(palette())),
            )
            .bind(BindingKey::role_only("spare").unwrap(), || {
                Rc::new(Typed(palette()))
            })
            .bind(BindingKey::unkeyed(), || Rc::new(Typed(palette())));

        let keys = bindings.install_into(&*host).unwrap();

        let roles: Vec<&str> = keys.iter().map(CapabilityKey::role).collect();
        assert_eq!(roles, vec!["main", "spare", DEFAULT_ROLE]);
        assert!(keys.iter().all(|key| *key.ty() == palette()));
        assert_eq!(host.registry().len(), 3);
    }

    #[test]
    fn test_anonymous_adapter_takes_named_type() {
        let host = AdaptableHost::new();
        let bindings = AdapterBindings::new().bind(BindingKey::unkeyed(), || {
            Rc::new(Typed(TypeDescriptor::anonymous_of(&palette())))
        });

        let keys = bindings.install(host.registry()).unwrap();
        assert_eq!(keys, vec![CapabilityKey::of(palette())]);
    }

    #[test]
    fn test_install_stops_at_conflict() {
        let host = AdaptableHost::new();
        let bindings = AdapterBindings::new()
            .bind(BindingKey::unkeyed(), || Rc::new(Typed(palette())))
            .bind(BindingKey::unkeyed(), || Rc::new(Typed(palette())));

        assert_eq!(bindings.len(), 2);
        let err = bindings.install(host.registry()).unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { .. }));
        assert_eq!(host.registry().len(), 1);
    }
}
