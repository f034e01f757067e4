//! affix - capability registry for adaptable entities
//!
//! An *adaptable* entity owns a [`CapabilityRegistry`] in which auxiliary
//! objects, *adapters*, are registered under a [`CapabilityKey`]: a declared
//! [`TypeDescriptor`] plus a role string. Callers that only know a capability's
//! type retrieve the adapter later, without the entity knowing about that
//! capability in advance.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Adaptable entity (Rc<Self>)              │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │               CapabilityRegistry                   │  │
//! │  │  owner: Weak<dyn Adaptable>   listeners            │  │
//! │  │  ┌──────────────────────────────────────────────┐  │  │
//! │  │  │ AdapterStore                                 │  │  │
//! │  │  │  (type, role) ──► adapter      (ordered)     │  │  │
//! │  │  │  adapter id   ──► keys         (reverse)     │  │  │
//! │  │  └──────────────────────────────────────────────┘  │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//!           ▲ bind / unbind         │ activate / deactivate / dispose
//!           │                       ▼
//!   ┌──────────────┐ ┌──────────────┐ ┌──────────────┐
//!   │   Adapter    │ │   Adapter    │ │   Adapter    │ ...
//!   └──────────────┘ └──────────────┘ └──────────────┘
//! ```
//!
//! # Matching
//!
//! A lookup for type `T` considers every adapter registered under `T` or a
//! subtype of `T`. If exactly one distinct adapter qualifies it is returned.
//! If several qualify and no role was asked for, the search is repeated for
//! the default role. Anything else, including ambiguity, yields `None`.
//!
//! # Example
//!
//! ```rust
//! use affix::{Adaptable, AdaptableHost, Adapter, TypeDescriptor};
//! use std::rc::Rc;
//!
//! struct Logger(&'static str);
//!
//! impl Adapter for Logger {
//!     fn runtime_type(&self) -> TypeDescriptor {
//!         TypeDescriptor::named("Logger")
//!     }
//! }
//!
//! let logger = TypeDescriptor::named("Logger");
//! let host = AdaptableHost::new();
//!
//! host.register(logger.clone(), Rc::new(Logger("plain"))).unwrap();
//! host.register_with_role(logger.clone(), Rc::new(Logger("debug")), "debug").unwrap();
//!
//! // Two candidates, one under the default role: that one wins
//! let found = host.lookup_as::<Logger>(&logger, None).unwrap();
//! assert_eq!(found.0, "plain");
//!
//! let found = host.lookup_as::<Logger>(&logger, Some("debug")).unwrap();
//! assert_eq!(found.0, "debug");
//! ```

// Modules
pub mod adaptable;
pub mod adapter;
pub mod bindings;
pub mod config;
pub mod error;
pub mod event;
pub mod registry;
pub mod store;

// Re-exports for convenience
pub use adaptable::{Adaptable, AdaptableHost};
pub use adapter::{
    downcast_adapter, Activatable, Adapter, AdapterId, AdapterRef, AsAny, Bound, Disposable,
    OwnerSlot,
};
pub use affix_types::{
    BindingKey, CapabilityKey, KeyError, Reified, TypeArg, TypeDescriptor, DEFAULT_ROLE,
};
pub use bindings::{AdapterBindings, AdapterFactory};
pub use config::{ConfigError, RegistryConfig};
pub use error::{RegistryError, Result};
pub use event::{
    AdapterListener, AdapterSnapshot, AdaptersChanged, CollectingListener, ListenerId, ListenerSet,
};
pub use registry::CapabilityRegistry;
pub use store::AdapterStore;
