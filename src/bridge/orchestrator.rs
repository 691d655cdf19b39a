//! Relay tasks that tie IRC and Discord together.
//!
//! Each direction has its own task: it receives inbound events, routes
//! them, and submits the results to the destination's dispatch queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task;
use tracing::{error, info};

use crate::bridge::dispatch::{DispatchQueue, MessageSink};
use crate::bridge::router::BridgeRouter;
use crate::common::{DiscordMessage, IrcEvent, OutboundMessage, Platform};

/// Destination of one platform: its queue and the sink the queue sends through.
#[derive(Clone)]
pub struct Outlet {
    pub queue: DispatchQueue,
    pub sink: Arc<dyn MessageSink>,
}

impl Outlet {
    pub fn new(queue: DispatchQueue, sink: Arc<dyn MessageSink>) -> Self {
        Self { queue, sink }
    }

    fn deliver(&self, message: OutboundMessage) {
        self.queue.submit_message(Arc::clone(&self.sink), message);
    }
}

/// The running bridge.
#[derive(Clone)]
pub struct Relay {
    router: Arc<BridgeRouter>,
    irc: Outlet,
    discord: Outlet,
}

impl Relay {
    pub fn new(router: Arc<BridgeRouter>, irc: Outlet, discord: Outlet) -> Self {
        Self {
            router,
            irc,
            discord,
        }
    }

    fn deliver(&self, message: OutboundMessage) {
        match message.platform {
            Platform::Irc => self.irc.deliver(message),
            Platform::Discord => self.discord.deliver(message),
        }
    }

    /// Relay IRC events to Discord until the event channel closes.
    pub async fn run_irc_to_discord(self, mut rx: mpsc::UnboundedReceiver<IrcEvent>) {
        while let Some(event) = rx.recv().await {
            for message in self.router.route_irc(&event) {
                self.deliver(message);
            }
        }
        info!("IRC event channel closed, IRC -> Discord relay stopped");
    }

    /// Relay Discord messages to IRC until the message channel closes.
    ///
    /// Routing may write overflow text to the paste sink, so it runs on the
    /// blocking pool.
    pub async fn run_discord_to_irc(self, mut rx: mpsc::UnboundedReceiver<DiscordMessage>) {
        while let Some(message) = rx.recv().await {
            let router = Arc::clone(&self.router);
            match task::spawn_blocking(move || router.route_discord(&message)).await {
                Ok(routed) => {
                    for outbound in routed {
                        self.deliver(outbound);
                    }
                }
                Err(e) => error!("Routing a Discord message failed: {}", e),
            }
        }
        info!("Discord message channel closed, Discord -> IRC relay stopped");
    }
}
