//! In-memory handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::handler::BoxedHandler;
use crate::kind::Kind;
use crate::storage::Storage;
use crate::update::{ANY_CHAT, ChatId};

type Scoped = HashMap<ChatId, BoxedHandler>;
type Named = HashMap<String, Scoped>;

/// The default, process-local registry.
///
/// A three-level map (kind → name → chat scope → handler) behind a
/// single reader/writer lock: reads proceed concurrently, writes are
/// exclusive. Registration is rare (startup or administrative time)
/// relative to read volume, since every inbound update performs at
/// least one read, so one lock over the whole structure suffices.
/// Handlers are cloned out of the map under the read lock; no lock is
/// held while a handler runs.
#[derive(Default)]
pub struct InMemoryStorage {
    handlers: RwLock<HashMap<Kind, Named>>,
}

impl InMemoryStorage {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.handlers.read();
        let bindings: usize = guard
            .values()
            .flat_map(|named| named.values())
            .map(Scoped::len)
            .sum();
        f.debug_struct("InMemoryStorage")
            .field("bindings", &bindings)
            .finish()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn set(
        &self,
        kind: Kind,
        name: &str,
        chat_id: ChatId,
        handler: BoxedHandler,
    ) -> StorageResult<()> {
        let mut guard = self.handlers.write();
        guard
            .entry(kind)
            .or_default()
            .entry(name.to_string())
            .or_default()
            .insert(chat_id, handler);
        Ok(())
    }

    async fn get(&self, kind: Kind, name: &str, chat_id: ChatId) -> StorageResult<BoxedHandler> {
        let guard = self.handlers.read();
        let scoped = guard
            .get(&kind)
            .and_then(|named| named.get(name))
            .ok_or(StorageError::NotFound)?;
        if let Some(handler) = scoped.get(&chat_id) {
            return Ok(Arc::clone(handler));
        }
        scoped
            .get(&ANY_CHAT)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn unset(&self, kind: Kind, name: &str, chat_id: ChatId) -> StorageResult<()> {
        let mut guard = self.handlers.write();
        if let Some(scoped) = guard.get_mut(&kind).and_then(|named| named.get_mut(name)) {
            scoped.remove(&chat_id);
        }
        Ok(())
    }

    async fn names(&self, kind: Kind) -> StorageResult<Vec<String>> {
        let guard = self.handlers.read();
        Ok(guard
            .get(&kind)
            .map(|named| named.keys().cloned().collect())
            .unwrap_or_default())
    }
}
