//! Capability keys
//!
//! A [`CapabilityKey`] addresses one adapter slot on an adaptable: the type
//! the adapter is registered under plus a role string. Declarative binding
//! contexts may not know the type yet; they use [`BindingKey`] instead, which
//! cannot be stored in a registry or used as a query.

use crate::descriptor::TypeDescriptor;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Role used when none is given
pub const DEFAULT_ROLE: &str = "default";

/// Errors raised while building or comparing keys
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Roles must be non-empty
    #[error("role must not be empty")]
    EmptyRole,

    /// A binding key without a type was compared or queried
    #[error("binding key {0} has no type and cannot be compared")]
    Unresolved(String),
}

/// An immutable `(type, role)` pair
///
/// Keys are ordered by role first and by the type's rendered form second.
/// That order only exists to make registry iteration deterministic.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CapabilityKey {
    ty: TypeDescriptor,
    role: Arc<str>,
}

impl CapabilityKey {
    /// Create a key for `ty` under `role`
    ///
    /// Fails with [`KeyError::EmptyRole`] if `role` is empty.
    pub fn get(ty: TypeDescriptor, role: impl AsRef<str>) -> Result<Self, KeyError> {
        let role = role.as_ref();
        if role.is_empty() {
            return Err(KeyError::EmptyRole);
        }
        Ok(Self {
            ty,
            role: Arc::from(role),
        })
    }

    /// Create a key for `ty` under [`DEFAULT_ROLE`]
    pub fn of(ty: TypeDescriptor) -> Self {
        Self {
            ty,
            role: Arc::from(DEFAULT_ROLE),
        }
    }

    /// The type the key was registered under
    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// The role string
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Whether the role is [`DEFAULT_ROLE`]
    pub fn has_default_role(&self) -> bool {
        &*self.role == DEFAULT_ROLE
    }
}

impl Ord for CapabilityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.role
            .cmp(&other.role)
            .then_with(|| self.ty.cmp(&other.ty))
    }
}

impl PartialOrd for CapabilityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.ty, self.role)
    }
}

impl fmt::Debug for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityKey{}", self)
    }
}

/// A key as written in a declarative binding
///
/// Only usable while describing which adapters an adaptable should receive.
/// The role-only and unkeyed forms have no type until they are resolved
/// against the adapter that gets bound; they are never equal to anything,
/// not even to themselves, so two such bindings are never collapsed.
#[derive(Debug, Clone)]
pub enum BindingKey {
    /// Fully specified
    Keyed(CapabilityKey),
    /// Role given, type taken from the bound adapter
    RoleOnly(Arc<str>),
    /// Neither given: adapter type, default role
    Unkeyed,
}

impl BindingKey {
    /// A binding key for `role`, typed later from the bound adapter
    pub fn role_only(role: impl AsRef<str>) -> Result<Self, KeyError> {
        let role = role.as_ref();
        if role.is_empty() {
            return Err(KeyError::EmptyRole);
        }
        Ok(BindingKey::RoleOnly(Arc::from(role)))
    }

    /// A binding key with neither type nor role
    pub fn unkeyed() -> Self {
        BindingKey::Unkeyed
    }

    /// Whether the key already carries a type
    pub fn is_resolved(&self) -> bool {
        matches!(self, BindingKey::Keyed(_))
    }

    /// The role this binding will use
    pub fn role(&self) -> &str {
        match self {
            BindingKey::Keyed(key) => key.role(),
            BindingKey::RoleOnly(role) => &**role,
            BindingKey::Unkeyed => DEFAULT_ROLE,
        }
    }

    /// The resolved key, if any
    pub fn as_key(&self) -> Option<&CapabilityKey> {
        match self {
            BindingKey::Keyed(key) => Some(key),
            _ => None,
        }
    }

    /// Complete the key with `declared` where the type is missing
    pub fn resolve(&self, declared: &TypeDescriptor) -> CapabilityKey {
        match self {
            BindingKey::Keyed(key) => key.clone(),
            BindingKey::RoleOnly(role) => CapabilityKey {
                ty: declared.clone(),
                role: role.clone(),
            },
            BindingKey::Unkeyed => CapabilityKey::of(declared.clone()),
        }
    }

    /// Compare two binding keys
    ///
    /// Fails with [`KeyError::Unresolved`] if either key has no type.
    pub fn try_cmp(&self, other: &BindingKey) -> Result<Ordering, KeyError> {
        match (self, other) {
            (BindingKey::Keyed(a), BindingKey::Keyed(b)) => Ok(a.cmp(b)),
            (BindingKey::Keyed(_), unresolved) | (unresolved, _) => {
                Err(KeyError::Unresolved(unresolved.to_string()))
            }
        }
    }
}

impl PartialEq for BindingKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BindingKey::Keyed(a), BindingKey::Keyed(b)) => a == b,
            _ => false,
        }
    }
}

impl From<CapabilityKey> for BindingKey {
    fn from(key: CapabilityKey) -> Self {
        BindingKey::Keyed(key)
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKey::Keyed(key) => write!(f, "{}", key),
            BindingKey::RoleOnly(role) => write!(f, "(?, {})", role),
            BindingKey::Unkeyed => write!(f, "(?, ?)"),
        }
    }
}
