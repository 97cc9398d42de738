//! Persistent handler registry adapter.
//!
//! [`PersistentStorage`] resolves bindings with no in-process state
//! surviving a restart: every `get` queries an external
//! [`HandlerStore`] for a [`HandlerRecord`] descriptor and rebuilds a
//! live handler through the factory registered under the record's
//! command name. The adapter behaves identically to the in-memory
//! registry from the dispatcher's point of view (a missing row is the
//! same `NotFound` miss), so the fallback chain does not care which
//! registry is in use.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::handler::{BoxedHandler, HandlerFactory, SerializableHandler};
use crate::kind::Kind;
use crate::storage::Storage;
use crate::update::{ANY_CHAT, ChatId};

// ============================================================================
// External store contract
// ============================================================================

/// A persisted handler descriptor: the factory tag plus the opaque
/// payload that factory decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRecord {
    /// Tag naming the handler type; must match a registered factory.
    pub command_name: String,
    /// Opaque serialized handler state.
    pub data: String,
}

impl HandlerRecord {
    /// Builds the record for a serializable handler.
    pub fn describe(handler: &dyn SerializableHandler) -> StorageResult<Self> {
        Ok(Self {
            command_name: handler.command_name().to_string(),
            data: handler.serialize()?,
        })
    }
}

/// The external store the adapter reads descriptors from.
///
/// Implementations typically wrap a database table keyed by
/// (kind tag, name, chat id). Failures must be reported as
/// [`StorageError::Store`]; an I/O error is not a miss.
#[async_trait]
pub trait HandlerStore: Send + Sync {
    /// Finds the descriptor at exactly (`kind`, `name`, `chat_id`), or
    /// `None` when no row exists.
    async fn find(
        &self,
        kind: Kind,
        name: &str,
        chat_id: ChatId,
    ) -> StorageResult<Option<HandlerRecord>>;

    /// Returns the binding names stored under `kind`.
    async fn names(&self, kind: Kind) -> StorageResult<Vec<String>>;
}

// ============================================================================
// Adapter
// ============================================================================

/// Registry adapter that reconstructs handlers from a [`HandlerStore`].
///
/// Factories must be registered before the first `get` that depends on
/// them; a descriptor whose tag has no factory fails hard with
/// [`StorageError::MissingFactory`] rather than masquerading as a miss.
///
/// Durable writes are store-specific and outside this adapter's
/// contract: `set` and `unset` report
/// [`StorageError::Unsupported`].
pub struct PersistentStorage {
    store: Arc<dyn HandlerStore>,
    factories: RwLock<HashMap<&'static str, Arc<dyn HandlerFactory>>>,
}

impl PersistentStorage {
    /// Creates an adapter over the given store with no factories
    /// registered yet.
    pub fn new(store: Arc<dyn HandlerStore>) -> Self {
        Self {
            store,
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a factory under its command name.
    ///
    /// The first registration for a name wins; repeats are ignored.
    pub fn register_factory(&self, factory: Arc<dyn HandlerFactory>) {
        let name = factory.command_name();
        let mut factories = self.factories.write();
        if factories.contains_key(name) {
            debug!(command_name = name, "factory already registered, keeping first");
            return;
        }
        factories.insert(name, factory);
    }

    /// Registers several factories at once.
    pub fn register_factories<I>(&self, factories: I)
    where
        I: IntoIterator<Item = Arc<dyn HandlerFactory>>,
    {
        for factory in factories {
            self.register_factory(factory);
        }
    }

    fn factory(&self, command_name: &str) -> StorageResult<Arc<dyn HandlerFactory>> {
        // Clone the Arc out so no factory-map lock is held while the
        // factory runs; a factory may register further factories.
        self.factories
            .read()
            .get(command_name)
            .cloned()
            .ok_or_else(|| StorageError::MissingFactory {
                command_name: command_name.to_string(),
            })
    }
}

impl std::fmt::Debug for PersistentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStorage")
            .field("factories", &self.factories.read().len())
            .finish()
    }
}

#[async_trait]
impl Storage for PersistentStorage {
    async fn set(
        &self,
        _kind: Kind,
        _name: &str,
        _chat_id: ChatId,
        _handler: BoxedHandler,
    ) -> StorageResult<()> {
        Err(StorageError::Unsupported { operation: "set" })
    }

    async fn get(&self, kind: Kind, name: &str, chat_id: ChatId) -> StorageResult<BoxedHandler> {
        let record = match self.store.find(kind, name, chat_id).await? {
            Some(record) => Some(record),
            None if chat_id != ANY_CHAT => self.store.find(kind, name, ANY_CHAT).await?,
            None => None,
        };
        let record = record.ok_or(StorageError::NotFound)?;
        debug!(
            kind = %kind,
            name,
            command_name = %record.command_name,
            "rebuilding persisted handler"
        );
        self.factory(&record.command_name)?.deserialize(&record.data)
    }

    async fn unset(&self, _kind: Kind, _name: &str, _chat_id: ChatId) -> StorageResult<()> {
        Err(StorageError::Unsupported { operation: "unset" })
    }

    async fn names(&self, kind: Kind) -> StorageResult<Vec<String>> {
        self.store.names(kind).await
    }
}
