//! Shared fixtures for the integration tests
#![allow(dead_code)]

use affix::{
    Activatable, Adaptable, Adapter, AdapterId, AdapterRef, Bound, Disposable, OwnerSlot,
    TypeDescriptor,
};
use once_cell::sync::Lazy;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing_subscriber::EnvFilter;

pub static LOGGER: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::named("Logger"));
pub static CONSOLE_LOGGER: Lazy<TypeDescriptor> = Lazy::new(|| {
    TypeDescriptor::builder("ConsoleLogger")
        .supertype(LOGGER.clone())
        .build()
});
pub static POLICY: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::named("Policy"));

/// Install a subscriber once; `RUST_LOG=affix=debug` shows registry logs
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An adapter that implements every optional capability and records calls
pub struct Probe {
    pub name: &'static str,
    ty: TypeDescriptor,
    slot: OwnerSlot,
    pub binds: Cell<u32>,
    pub unbinds: Cell<u32>,
    pub disposals: Cell<u32>,
    pub activations: Cell<u32>,
    pub deactivations: Cell<u32>,
    active: Cell<bool>,
    on_dispose: RefCell<Option<Box<dyn Fn()>>>,
    on_activate: RefCell<Option<Box<dyn Fn()>>>,
    on_deactivate: RefCell<Option<Box<dyn Fn()>>>,
}

impl Probe {
    pub fn new(name: &'static str, ty: &TypeDescriptor) -> Rc<Self> {
        Rc::new(Self {
            name,
            ty: ty.clone(),
            slot: OwnerSlot::new(),
            binds: Cell::new(0),
            unbinds: Cell::new(0),
            disposals: Cell::new(0),
            activations: Cell::new(0),
            deactivations: Cell::new(0),
            active: Cell::new(false),
            on_dispose: RefCell::new(None),
            on_activate: RefCell::new(None),
            on_deactivate: RefCell::new(None),
        })
    }

    pub fn handle(self: &Rc<Self>) -> AdapterRef {
        self.clone()
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    pub fn when_disposed(&self, callback: impl Fn() + 'static) {
        *self.on_dispose.borrow_mut() = Some(Box::new(callback));
    }

    pub fn when_activated(&self, callback: impl Fn() + 'static) {
        *self.on_activate.borrow_mut() = Some(Box::new(callback));
    }

    pub fn when_deactivated(&self, callback: impl Fn() + 'static) {
        *self.on_deactivate.borrow_mut() = Some(Box::new(callback));
    }
}

impl Adapter for Probe {
    fn runtime_type(&self) -> TypeDescriptor {
        self.ty.clone()
    }

    fn as_bound(&self) -> Option<&dyn Bound> {
        Some(self)
    }

    fn as_disposable(&self) -> Option<&dyn Disposable> {
        Some(self)
    }

    fn as_activatable(&self) -> Option<&dyn Activatable> {
        Some(self)
    }
}

impl Bound for Probe {
    fn owner(&self) -> Option<Rc<dyn Adaptable>> {
        self.slot.get()
    }

    fn set_owner(&self, owner: Option<Weak<dyn Adaptable>>) {
        if owner.is_some() {
            self.binds.set(self.binds.get() + 1);
        } else {
            self.unbinds.set(self.unbinds.get() + 1);
        }
        self.slot.set(owner);
    }
}

impl Disposable for Probe {
    fn dispose(&self) {
        self.disposals.set(self.disposals.get() + 1);
        if let Some(callback) = self.on_dispose.borrow().as_ref() {
            callback();
        }
    }
}

impl Activatable for Probe {
    fn activate(&self) {
        self.active.set(true);
        self.activations.set(self.activations.get() + 1);
        if let Some(callback) = self.on_activate.borrow().as_ref() {
            callback();
        }
    }

    fn deactivate(&self) {
        self.active.set(false);
        self.deactivations.set(self.deactivations.get() + 1);
        if let Some(callback) = self.on_deactivate.borrow().as_ref() {
            callback();
        }
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// An adapter with no optional capabilities
pub struct Plain(pub TypeDescriptor);

impl Adapter for Plain {
    fn runtime_type(&self) -> TypeDescriptor {
        self.0.clone()
    }
}

pub fn plain(ty: &TypeDescriptor) -> AdapterRef {
    Rc::new(Plain(ty.clone()))
}

pub fn same(a: &AdapterRef, b: &AdapterRef) -> bool {
    AdapterId::of(a) == AdapterId::of(b)
}
