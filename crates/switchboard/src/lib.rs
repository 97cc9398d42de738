//! # Switchboard
//!
//! A chat-event dispatch framework: inbound updates are classified,
//! resolved against a registry of (kind, name, chat scope) handler
//! bindings (chat-specific bindings shadowing chat-agnostic defaults),
//! and executed on isolated tasks that survive failing or panicking
//! handlers.
//!
//! This crate is a facade over the workspace members:
//!
//! - [`switchboard_core`]: the dispatcher, registry contract, and
//!   in-memory/persistent registries.
//! - [`switchboard_runtime`]: configuration, logging, and the run
//!   loop.

pub use switchboard_core;
pub use switchboard_runtime;

pub use switchboard_core::{
    ANY_CHAT, BoxedHandler, ChatId, DispatchError, DispatchResult, Dispatcher, ErrorHandler,
    Handler, HandlerFactory, HandlerRecord, HandlerResult, HandlerStore, InMemoryStorage, Kind,
    PersistentStorage, RegisterError, SendError, Sender, SerializableHandler, Storage,
    StorageError, Update, handler_fn,
};
pub use switchboard_runtime::{
    ConfigLoader, LoggingBuilder, Runtime, SwitchboardConfig, UpdateSource,
};

/// Prelude for common imports.
pub mod prelude {
    pub use switchboard_core::prelude::*;
    pub use switchboard_runtime::{ConfigLoader, Runtime, UpdateSource};
}
