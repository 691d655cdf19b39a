//! Ordered, fire-and-forget delivery of outbound messages.
//!
//! Each platform gets one worker task draining its own queue, so messages
//! to a platform go out in the order they were routed while the router
//! itself never waits on the network.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::common::error::SendError;
use crate::common::{OutboundMessage, Platform};

/// Something that can post a line of text to a channel.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), SendError>;
}

type SendJob = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), SendError>> + Send>;

/// Handle to a platform's send queue.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    platform: Platform,
    tx: mpsc::UnboundedSender<(String, SendJob)>,
}

impl DispatchQueue {
    /// Create the queue and spawn its worker.
    ///
    /// The worker exits once every handle has been dropped and the queue is
    /// drained.
    pub fn spawn(platform: Platform) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, SendJob)>();

        let worker = tokio::spawn(async move {
            while let Some((description, job)) = rx.recv().await {
                match job().await {
                    Ok(()) => debug!("Sent to {} {}", platform, description),
                    Err(e) => error!("Failed to send message to {} {}: {}", platform, description, e),
                }
            }
            debug!("{} dispatch queue closed", platform);
        });

        (Self { platform, tx }, worker)
    }

    /// Queue a send. Never blocks; failures are logged by the worker.
    pub fn submit<F, Fut>(&self, description: impl Into<String>, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), SendError>> + Send + 'static,
    {
        let job: SendJob = Box::new(move || job().boxed());
        if self.tx.send((description.into(), job)).is_err() {
            error!("{} dispatch queue is closed, dropping message", self.platform);
        }
    }

    /// Queue delivery of a routed message through `sink`.
    pub fn submit_message(&self, sink: Arc<dyn MessageSink>, message: OutboundMessage) {
        let description = match &message.author {
            Some(author) => format!("{} <{}>", message.destination, author),
            None => message.destination.clone(),
        };
        self.submit(description, move || async move {
            sink.send_message(&message.channel_id, &message.text()).await
        });
    }
}
