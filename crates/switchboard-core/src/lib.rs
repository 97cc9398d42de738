//! # Switchboard Core
//!
//! The dispatch core of the Switchboard bot framework.
//!
//! This crate decides, for every inbound chat-platform event, *which*
//! registered behavior runs: it classifies raw updates, resolves handler
//! bindings through a pluggable registry with per-chat overrides
//! shadowing chat-agnostic defaults, and isolates every update's
//! handling so a failing or panicking handler never halts the loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌───────────────────┐
//! │ update source│────▶│ Dispatcher │────▶│ Storage (registry)│
//! │  (external)  │     │  classify  │◀────│ kind·name·chat →  │
//! └──────────────┘     │  + invoke  │     │ handler           │
//!                      └─────┬──────┘     └───────────────────┘
//!                            ▼
//!                      ┌────────────┐
//!                      │  Handler   │  (application code)
//!                      └────────────┘
//! ```
//!
//! - **Foundation**: the [`Update`] event model, the closed [`Kind`]
//!   category set, and the [`Handler`] trait.
//! - **Registry**: the [`Storage`] contract with its two-step chat-scope
//!   fallback, the default [`InMemoryStorage`], and the
//!   [`PersistentStorage`] adapter that rebuilds handlers from an
//!   external store via registered factories.
//! - **Dispatch**: the [`Dispatcher`] — classification, resolution,
//!   prefix matching for callback/inline queries, the per-update task
//!   boundary, and the registration surface.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchboard_core::{Dispatcher, InMemoryStorage, handler_fn};
//!
//! let bot = Arc::new(Dispatcher::new(
//!     Arc::new(InMemoryStorage::new()),
//!     Arc::new(my_sender),
//! ));
//!
//! bot.register_command("/start", handler_fn(|bot, update| {
//!     Box::pin(async move {
//!         bot.send_text(update.chat_id(), "hello!").await?;
//!         Ok(())
//!     })
//! }), 0).await?;
//!
//! bot.handle_updates(update_stream).await;
//! ```

pub mod classify;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod kind;
pub mod storage;
pub mod update;

pub use classify::{Route, classify};
pub use dispatcher::{
    Dispatcher, ErrorHandler, ReplyErrorHandler, Sender, SilentErrorHandler,
};
pub use error::{
    DispatchError, DispatchResult, HandlerError, HandlerResult, RegisterError, RegisterResult,
    SendError, StorageError, StorageResult,
};
pub use handler::{BoxedHandler, Handler, HandlerFactory, SerializableHandler, handler_fn};
pub use kind::Kind;
pub use storage::{
    HandlerRecord, HandlerStore, InMemoryStorage, PersistentStorage, Storage,
};
pub use update::{ANY_CHAT, CallbackQuery, ChatId, Chat, InlineQuery, Message, Update, User};

/// Prelude for common imports.
pub mod prelude {
    pub use super::dispatcher::{Dispatcher, ErrorHandler, Sender};
    pub use super::error::{DispatchError, HandlerResult, StorageError};
    pub use super::handler::{BoxedHandler, Handler, handler_fn};
    pub use super::kind::Kind;
    pub use super::storage::{InMemoryStorage, PersistentStorage, Storage};
    pub use super::update::{ChatId, Update};
}
