//! Adapters and their optional capabilities
//!
//! Anything stored in a registry implements [`Adapter`]. On top of that an
//! adapter may expose any of three optional capabilities, each reached through
//! a typed handle rather than a runtime type check:
//!
//! - [`Bound`]: receives a back-reference to the owning adaptable
//! - [`Disposable`]: released when the registry is disposed
//! - [`Activatable`]: follows the owner's activation lifecycle

use crate::adaptable::Adaptable;
use affix_types::TypeDescriptor;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Shared handle to a registered adapter
pub type AdapterRef = Rc<dyn Adapter>;

/// Upcasting helper so adapters can be viewed as [`Any`]
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;

    /// Convert a shared handle into `Rc<dyn Any>` for downcasting
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// An object that can be registered on an adaptable
///
/// `runtime_type` reports the concrete type of the adapter. The registry
/// compares it against the type the caller registers it under.
///
/// # Example
///
/// ```
/// use affix::{Adapter, TypeDescriptor};
///
/// struct Logger;
///
/// impl Adapter for Logger {
///     fn runtime_type(&self) -> TypeDescriptor {
///         TypeDescriptor::named("Logger")
///     }
/// }
/// ```
pub trait Adapter: AsAny {
    /// The concrete type of this adapter
    fn runtime_type(&self) -> TypeDescriptor;

    /// Back-reference capability, if implemented
    fn as_bound(&self) -> Option<&dyn Bound> {
        None
    }

    /// Disposal capability, if implemented
    fn as_disposable(&self) -> Option<&dyn Disposable> {
        None
    }

    /// Activation capability, if implemented
    fn as_activatable(&self) -> Option<&dyn Activatable> {
        None
    }
}

/// Downcast a registered adapter to its concrete type
pub fn downcast_adapter<T: Adapter>(adapter: &AdapterRef) -> Option<Rc<T>> {
    AsAny::into_any_rc(Rc::clone(adapter)).downcast::<T>().ok()
}

/// Identity of an adapter instance
///
/// Derived from the address of the shared allocation; two handles have the
/// same id exactly when they point at the same adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdapterId(usize);

impl AdapterId {
    /// The identity of `adapter`
    pub fn of(adapter: &AdapterRef) -> Self {
        Self(Rc::as_ptr(adapter) as *const () as usize)
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "adapter@{:#x}", self.0)
    }
}

/// An adapter that wants a back-reference to its owner
///
/// The registry calls [`set_owner`](Bound::set_owner) with the owner when the
/// adapter gets its first key, and with `None` when it loses its last one.
/// Adapters never call it themselves.
pub trait Bound {
    /// The owning adaptable, while bound and alive
    fn owner(&self) -> Option<Rc<dyn Adaptable>>;

    /// Set or clear the owner
    fn set_owner(&self, owner: Option<Weak<dyn Adaptable>>);
}

/// An adapter holding resources that must be released explicitly
pub trait Disposable {
    /// Release resources; called once when the registry is disposed
    fn dispose(&self);
}

/// An adapter that follows its owner's activation lifecycle
pub trait Activatable {
    /// Start
    fn activate(&self);

    /// Stop
    fn deactivate(&self);

    /// Whether currently active
    fn is_active(&self) -> bool;
}

/// Storage for a [`Bound`] adapter's owner
///
/// Holds a weak reference, so an adapter never keeps its owner alive.
#[derive(Default)]
pub struct OwnerSlot {
    owner: RefCell<Option<Weak<dyn Adaptable>>>,
}

impl OwnerSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// The owner, if set and still alive
    pub fn get(&self) -> Option<Rc<dyn Adaptable>> {
        self.owner.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Replace the owner
    pub fn set(&self, owner: Option<Weak<dyn Adaptable>>) {
        *self.owner.borrow_mut() = owner;
    }

    /// Whether an owner has been set (alive or not)
    pub fn is_bound(&self) -> bool {
        self.owner.borrow().is_some()
    }
}

impl fmt::Debug for OwnerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerSlot")
            .field("bound", &self.is_bound())
            .finish()
    }
}
