//! Unified error types for the Switchboard dispatch core.
//!
//! The taxonomy separates four concerns: malformed input (`NoMessage`),
//! resolution misses (`NoHandlers`), storage-layer failures
//! ([`StorageError`]), and failures inside application handlers
//! (returned errors and caught panics).

use thiserror::Error;

use crate::kind::Kind;

// =============================================================================
// Handler errors
// =============================================================================

/// Error type returned by application handlers.
///
/// Handlers are opaque to the core, so their failures are too; any error
/// type converts via `?`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for handler invocations.
pub type HandlerResult = Result<(), HandlerError>;

// =============================================================================
// Storage errors
// =============================================================================

/// Errors produced by [`Storage`](crate::storage::Storage) implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No binding exists at the requested scope or the wildcard scope.
    ///
    /// The dispatcher's fallback chain continues past this variant and
    /// only this variant; everything else aborts resolution.
    #[error("not found")]
    NotFound,

    /// A persisted descriptor names a command with no registered factory.
    #[error("no factory registered for command '{command_name}'")]
    MissingFactory {
        /// The persisted command name.
        command_name: String,
    },

    /// The external store failed. Distinct from [`NotFound`](Self::NotFound)
    /// so infrastructure trouble is never mistaken for a routing miss.
    #[error("storage backend error: {reason}")]
    Store {
        /// Reason for failure.
        reason: String,
    },

    /// The storage implementation does not support this operation.
    #[error("operation '{operation}' not supported by this storage")]
    Unsupported {
        /// The unsupported operation name.
        operation: &'static str,
    },

    /// A handler could not be serialized for persistence.
    #[error("failed to serialize handler: {reason}")]
    Serialize {
        /// Reason for failure.
        reason: String,
    },
}

impl StorageError {
    /// Creates a backend error from any displayable cause.
    pub fn store(reason: impl ToString) -> Self {
        Self::Store {
            reason: reason.to_string(),
        }
    }

    /// Creates a serialization error from any displayable cause.
    pub fn serialize(reason: impl ToString) -> Self {
        Self::Serialize {
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for the miss variant the fallback chain may skip.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Sender errors
// =============================================================================

/// Error returned by the [`Sender`](crate::dispatcher::Sender)
/// collaborator when an outbound message cannot be delivered.
#[derive(Debug, Clone, Error)]
#[error("send failed: {reason}")]
pub struct SendError {
    /// Reason for failure.
    pub reason: String,
}

impl SendError {
    /// Creates a send error from any displayable cause.
    pub fn new(reason: impl ToString) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Registration errors
// =============================================================================

/// Errors rejected synchronously at registration time. Nothing invalid
/// is ever stored.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// Commands must start with a slash.
    #[error("command must start with slash")]
    MissingSlash,

    /// Keyboard commands must not start with a slash.
    #[error("keyboard command must not start with slash")]
    UnexpectedSlash,

    /// The binding name must not be empty.
    #[error("binding name must not be empty")]
    EmptyName,

    /// The storage layer rejected the write.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for registration operations.
pub type RegisterResult = Result<(), RegisterError>;

// =============================================================================
// Dispatch errors
// =============================================================================

/// Errors surfaced by [`Dispatcher::handle_update`](crate::dispatcher::Dispatcher::handle_update).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The update carries no message, callback query, or inline query.
    #[error("no message")]
    NoMessage,

    /// Resolution found nothing after the full fallback chain.
    ///
    /// Callers may ignore this silently; `handle_updates` does not
    /// escalate it to the error handler.
    #[error("no handlers for {kind}")]
    NoHandlers {
        /// The kind that failed to resolve.
        kind: Kind,
    },

    /// The storage layer failed during resolution.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The resolved handler returned an error.
    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),

    /// The resolved handler panicked; caught at the task boundary.
    #[error("handler panicked: {detail}")]
    HandlerPanic {
        /// Stringified panic payload.
        detail: String,
    },
}

impl DispatchError {
    /// Returns `true` if this is the non-escalated "nothing bound" miss.
    pub fn is_no_handlers(&self) -> bool {
        matches!(self, Self::NoHandlers { .. })
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        Self::Handler(err)
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
