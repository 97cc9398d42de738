//! Runtime orchestration.
//!
//! The [`Runtime`] owns a [`Dispatcher`] and drives it from an
//! [`UpdateSource`] until the source is exhausted or shutdown is
//! requested. Shutdown only stops *intake*: updates already dispatched
//! keep running to completion on their own tasks, matching the core's
//! no-cancellation contract.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use switchboard_core::dispatcher::SilentErrorHandler;
use switchboard_core::{Dispatcher, Update};

use crate::config::SwitchboardConfig;

/// Produces the sequence of inbound updates the runtime consumes.
///
/// Implemented by ingestion collaborators (long pollers, webhook
/// receivers, test fixtures). Any `Unpin + Send` stream of updates
/// works out of the box.
#[async_trait]
pub trait UpdateSource: Send {
    /// Returns the next update, or `None` when the source is exhausted.
    async fn next_update(&mut self) -> Option<Update>;
}

#[async_trait]
impl<S> UpdateSource for S
where
    S: Stream<Item = Update> + Send + Unpin,
{
    async fn next_update(&mut self) -> Option<Update> {
        self.next().await
    }
}

/// Drives a dispatcher from an update source with graceful shutdown.
pub struct Runtime {
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
}

impl Runtime {
    /// Creates a runtime over the given dispatcher.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates a runtime, applying the dispatch section of the
    /// configuration to the dispatcher.
    pub fn from_config(dispatcher: Dispatcher, config: &SwitchboardConfig) -> Self {
        let dispatcher = if config.dispatch.report_errors {
            dispatcher
        } else {
            dispatcher.with_error_handler(Arc::new(SilentErrorHandler))
        };
        Self::new(Arc::new(dispatcher))
    }

    /// The dispatcher this runtime drives.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// A token that stops update intake when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Consumes the source until exhaustion or shutdown.
    pub async fn run<S>(&self, source: S)
    where
        S: UpdateSource,
    {
        let updates = futures::stream::unfold(source, |mut source| async move {
            source.next_update().await.map(|update| (update, source))
        });

        tokio::select! {
            () = self.shutdown.cancelled() => {
                info!("shutdown requested, stopping update intake");
            }
            () = Arc::clone(&self.dispatcher).handle_updates(updates) => {
                info!("update source exhausted");
            }
        }
    }

    /// Like [`run`](Self::run), additionally stopping on Ctrl-C.
    pub async fn run_until_ctrl_c<S>(&self, source: S)
    where
        S: UpdateSource,
    {
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => token.cancel(),
                Err(err) => warn!(error = %err, "failed to listen for Ctrl-C"),
            }
        });
        self.run(source).await;
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}
