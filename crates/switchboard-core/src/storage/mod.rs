//! Handler registry storage.
//!
//! The [`Storage`] trait owns every (kind, name, chat scope) → handler
//! binding and the resolution policy: a chat-specific binding always
//! shadows the wildcard binding for the same kind and name. The
//! dispatcher is written against this contract only, so registries can
//! be swapped — [`InMemoryStorage`] for process-local bindings,
//! [`PersistentStorage`] for bindings reconstructed from an external
//! store.

pub mod memory;
pub mod persistent;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::handler::BoxedHandler;
use crate::kind::Kind;
use crate::update::ChatId;

pub use memory::InMemoryStorage;
pub use persistent::{HandlerRecord, HandlerStore, PersistentStorage};

/// The registry contract: a keyed store of handler bindings.
///
/// # Concurrency
///
/// Implementations must tolerate concurrent `set`/`get`/`unset` from
/// many tasks without corruption or deadlock. A `get` racing a `set`
/// for the same key returns either the old or the new handler, never a
/// partial one.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts or overwrites the binding at exactly
    /// (`kind`, `name`, `chat_id`). Idempotent.
    async fn set(
        &self,
        kind: Kind,
        name: &str,
        chat_id: ChatId,
        handler: BoxedHandler,
    ) -> StorageResult<()>;

    /// Resolves a binding.
    ///
    /// Looks up the exact (`kind`, `name`, `chat_id`) first and falls
    /// back to the wildcard scope `0`; when both miss, fails with
    /// [`StorageError::NotFound`](crate::error::StorageError::NotFound).
    async fn get(&self, kind: Kind, name: &str, chat_id: ChatId) -> StorageResult<BoxedHandler>;

    /// Removes exactly the binding at (`kind`, `name`, `chat_id`).
    ///
    /// Removing a chat-specific binding never affects the wildcard
    /// binding, and vice versa. Removing an absent binding is a no-op.
    async fn unset(&self, kind: Kind, name: &str, chat_id: ChatId) -> StorageResult<()>;

    /// Returns the binding names registered under `kind`, in no
    /// particular order.
    ///
    /// The dispatcher prefix-matches callback and inline bindings
    /// against this set, so every implementation must be able to
    /// enumerate it.
    async fn names(&self, kind: Kind) -> StorageResult<Vec<String>>;
}
