//! Bridge channel management.
//!
//! Groups the channels connecting the platform clients to the relay tasks.

use tokio::sync::{mpsc, watch};

use crate::common::{DiscordMessage, IrcEvent};

/// Channels held by the IRC client.
pub struct IrcChannels {
    /// Sender for IRC -> relay events.
    pub event_tx: mpsc::UnboundedSender<IrcEvent>,
    /// Receiver for the shutdown signal.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Channels held by the Discord client.
pub struct DiscordChannels {
    /// Sender for Discord -> relay messages.
    pub message_tx: mpsc::UnboundedSender<DiscordMessage>,
    /// Receiver for the shutdown signal.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Channels drained by the relay tasks.
pub struct RelayChannels {
    pub irc_rx: mpsc::UnboundedReceiver<IrcEvent>,
    pub discord_rx: mpsc::UnboundedReceiver<DiscordMessage>,
}

/// Control channels for shutdown coordination.
pub struct ControlChannels {
    /// Sender to trigger shutdown.
    pub shutdown_tx: watch::Sender<bool>,
}

/// Bundle of all channels created by the bridge.
pub struct ChannelBundle {
    pub irc: IrcChannels,
    pub discord: DiscordChannels,
    pub relay: RelayChannels,
    pub control: ControlChannels,
}

impl ChannelBundle {
    /// Create a new set of bridge channels.
    pub fn new() -> Self {
        let (event_tx, irc_rx) = mpsc::unbounded_channel();
        let (message_tx, discord_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            irc: IrcChannels {
                event_tx,
                shutdown_rx: shutdown_rx.clone(),
            },
            discord: DiscordChannels {
                message_tx,
                shutdown_rx,
            },
            relay: RelayChannels { irc_rx, discord_rx },
            control: ControlChannels { shutdown_tx },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}
