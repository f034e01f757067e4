//! Shared value types for affix
//!
//! This crate provides the two immutable value types every registry query is
//! phrased in:
//!
//! - [`TypeDescriptor`]: a reified, possibly parameterized type with an
//!   `is_assignable_from` relation that follows declared supertypes and
//!   generic argument compatibility.
//! - [`CapabilityKey`]: a `(type, role)` pair addressing one adapter slot.
//!
//! [`BindingKey`] covers the declarative forms whose type is not known yet
//! (role-only and unkeyed bindings). Those can never be used as lookup keys.

pub mod descriptor;
pub mod key;

pub use descriptor::{Reified, TypeArg, TypeDescriptor, TypeDescriptorBuilder};
pub use key::{BindingKey, CapabilityKey, KeyError, DEFAULT_ROLE};
