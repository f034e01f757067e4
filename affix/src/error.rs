//! Error types for the capability registry

use crate::adapter::AdapterId;
use affix_types::{CapabilityKey, KeyError, TypeDescriptor};
use thiserror::Error;

/// Errors raised by registry operations
///
/// All of these indicate a caller bug and are reported at the call site that
/// violated the precondition. An ambiguous lookup is not an error; it yields
/// `None`.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed key or role
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] KeyError),

    /// The adapter's runtime type does not fit the declared type
    #[error("adapter of type {actual} cannot be registered as {declared}")]
    TypeMismatch {
        /// Type the caller registered the adapter under
        declared: TypeDescriptor,
        /// Type the adapter reports for itself
        actual: TypeDescriptor,
    },

    /// The key is already bound to another adapter
    #[error("{key} is already bound to {existing}")]
    Conflict {
        /// The contested key
        key: CapabilityKey,
        /// The adapter currently holding it
        existing: AdapterId,
    },

    /// The adapter is not registered
    #[error("{0} is not registered")]
    NotRegistered(AdapterId),

    /// No adapter is registered under the key
    #[error("no adapter is registered under {0}")]
    UnknownKey(CapabilityKey),

    /// Operation not allowed in the owner's current state
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The registry has been disposed
    #[error("registry has been disposed")]
    Disposed,
}

/// Result type using RegistryError
pub type Result<T> = std::result::Result<T, RegistryError>;
