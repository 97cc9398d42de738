//! Handler traits for the Switchboard framework.
//!
//! A [`Handler`] is an application-supplied unit of behavior bound to a
//! (kind, name, chat scope) key in the registry. The core never inspects
//! a handler's internals; it only invokes [`run`](Handler::run) and, for
//! handlers that survive a restart, the [`SerializableHandler`] /
//! [`HandlerFactory`] pair.
//!
//! # Closure handlers
//!
//! Most handlers are written as async closures and lifted with
//! [`handler_fn`]:
//!
//! ```rust,ignore
//! use switchboard_core::handler_fn;
//!
//! let greet = handler_fn(|bot, update| {
//!     Box::pin(async move {
//!         bot.send_text(update.chat_id(), "hi there").await?;
//!         Ok(())
//!     })
//! });
//! bot.register_command("/greet", greet, 0).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::dispatcher::Dispatcher;
use crate::error::{HandlerResult, StorageResult};
use crate::update::Update;

// ============================================================================
// Handler
// ============================================================================

/// An application-supplied unit of behavior invoked on a matched update.
///
/// Handlers receive the dispatcher (to send replies or mutate the
/// registry; re-entrant registration is safe, no registry lock is held
/// during invocation) and the raw update. A returned error is isolated
/// to the update's task and forwarded to the dispatcher's error handler.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Executes this handler against the given update.
    async fn run(&self, bot: &Dispatcher, update: &Update) -> HandlerResult;
}

/// A shared, type-erased handler as stored in the registry.
pub type BoxedHandler = Arc<dyn Handler>;

// ============================================================================
// Closure adapter
// ============================================================================

struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a Dispatcher, &'a Update) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    async fn run(&self, bot: &Dispatcher, update: &Update) -> HandlerResult {
        (self.f)(bot, update).await
    }
}

/// Lifts an async closure into a [`BoxedHandler`].
///
/// The closure receives borrowed arguments and must return a boxed
/// future (`Box::pin(async move { .. })`).
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a Dispatcher, &'a Update) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(HandlerFn { f })
}

// ============================================================================
// Persistence capabilities
// ============================================================================

/// A handler that can be persisted to an external store.
///
/// The descriptor written to the store is the pair
/// (`command_name()`, `serialize()`): a tag naming the handler type and
/// an opaque payload the matching [`HandlerFactory`] can rebuild it
/// from. Every command name ever persisted must have its factory
/// registered before the first lookup that depends on it.
pub trait SerializableHandler: Handler {
    /// The stable tag identifying this handler type in the store.
    fn command_name(&self) -> &'static str;

    /// Serializes this handler's state into an opaque payload.
    fn serialize(&self) -> StorageResult<String>;
}

/// Rebuilds live handlers from persisted descriptors.
///
/// Factories form a tagged-union-by-name encoding: the registry maps
/// `command_name` to the factory that decodes its payloads. A persisted
/// tag with no registered factory is a hard resolution failure
/// ([`StorageError::MissingFactory`](crate::error::StorageError::MissingFactory)),
/// never a silent no-op.
pub trait HandlerFactory: Send + Sync {
    /// The tag this factory decodes.
    fn command_name(&self) -> &'static str;

    /// Reconstructs a live handler from the opaque payload.
    fn deserialize(&self, data: &str) -> StorageResult<BoxedHandler>;
}
