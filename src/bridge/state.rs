//! Bridge state management.
//!
//! Provides state types for the IRC-Discord bridge initialization lifecycle:
//! - `PendingBridgeState`: Configuration waiting for the Discord roster
//! - `ResolvedBridgeState`: Fully resolved state, immutable after creation
//!
//! The initialization flow is:
//! 1. Create `PendingBridgeState` from the config
//! 2. Fetch the bot's own user ID and the guild roster over REST
//! 3. Resolve every mapped `guild#channel` against the roster
//! 4. Hand the `ResolvedBridgeState` to the router, shared via `Arc`

use std::sync::Arc;

use tracing::{info, warn};

use crate::bridge::mapping::ChannelMapping;
use crate::bridge::mentions::MentionTranslator;
use crate::bridge::paginate::MessagePaginator;
use crate::bridge::paste::{DisabledPasteSink, FilePasteSink, PasteSink};
use crate::bridge::roster::RosterSnapshot;
use crate::config::types::Config;

/// Pending state before the Discord roster is known.
#[derive(Debug)]
pub struct PendingBridgeState {
    pub mapping: ChannelMapping,
    /// Prefixes marking IRC messages as Discord bot commands.
    pub discord_command_chars: String,
    /// Prefixes marking Discord messages as IRC bot commands.
    pub irc_command_chars: String,
    pub use_nicknames: bool,
    pub forward_embeds: bool,
    pub paginator: MessagePaginator,
}

impl PendingBridgeState {
    /// Build from a validated config.
    pub fn from_config(config: &Config) -> Self {
        let sink: Arc<dyn PasteSink> = match config.discord.paste_filepath.as_deref() {
            Some(path) if !path.is_empty() => {
                let url = config.discord.paste_url.clone().unwrap_or_default();
                info!("Overflow text will be stored in {} ({})", path, url);
                Arc::new(FilePasteSink::new(path, url))
            }
            _ => {
                info!("No paste directory configured; overlong messages will be dropped");
                Arc::new(DisabledPasteSink)
            }
        };

        Self {
            mapping: ChannelMapping::from_config(&config.mapping),
            discord_command_chars: config.discord.command_chars.clone(),
            irc_command_chars: config.irc.command_chars.clone(),
            use_nicknames: config.discord.use_nicknames,
            forward_embeds: config.discord.forward_embeds,
            paginator: MessagePaginator::new(config.discord.max_lines, sink),
        }
    }

    /// Attach the roster and the bot's identity.
    ///
    /// Mapped channels missing from the roster stay mapped; messages for
    /// them are dropped at routing time.
    pub fn resolve(self, roster: RosterSnapshot, self_user_id: u64) -> ResolvedBridgeState {
        let mut resolved = 0;
        let mut unresolved = Vec::new();

        for irc_channel in self.mapping.irc_channels() {
            let Some(key) = self.mapping.discord_for(&irc_channel) else {
                continue;
            };
            match roster.resolve_key(key) {
                Some((guild, channel_id)) => {
                    resolved += 1;
                    info!(
                        "Resolved Discord channel '{}' -> {} (guild {}, ID {})",
                        key, irc_channel, guild.id, channel_id
                    );
                }
                None => {
                    warn!("Could not resolve Discord channel: {}", key);
                    unresolved.push(key.to_string());
                }
            }
        }

        if !unresolved.is_empty() {
            warn!("Unresolved Discord channels: {:?}", unresolved);
        }
        info!(
            "Channel resolution complete: {} resolved, {} unresolved",
            resolved,
            unresolved.len()
        );

        ResolvedBridgeState {
            mapping: self.mapping,
            roster,
            self_user_id,
            translator: MentionTranslator::new(self.use_nicknames),
            paginator: self.paginator,
            discord_command_chars: self.discord_command_chars,
            irc_command_chars: self.irc_command_chars,
            use_nicknames: self.use_nicknames,
            forward_embeds: self.forward_embeds,
        }
    }
}

/// Fully resolved bridge state.
///
/// This is immutable after creation and shared via `Arc` by both relay
/// directions without locking.
#[derive(Debug, Clone)]
pub struct ResolvedBridgeState {
    pub mapping: ChannelMapping,
    /// Point-in-time view of the guilds, taken at startup.
    pub roster: RosterSnapshot,
    /// Bot's user ID, used to ignore its own messages.
    pub self_user_id: u64,
    pub translator: MentionTranslator,
    pub paginator: MessagePaginator,
    pub discord_command_chars: String,
    pub irc_command_chars: String,
    pub use_nicknames: bool,
    pub forward_embeds: bool,
}
