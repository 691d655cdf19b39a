//! Discord bot client.
//!
//! Bring-up happens over REST (identity and guild roster) before the
//! gateway is started; gateway messages are converted to
//! [`DiscordMessage`]s and forwarded to the relay.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use serenity::async_trait;
use serenity::http::{Http, HttpBuilder};
use serenity::model::channel::{ChannelType, Embed, Message};
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::bridge::channels::DiscordChannels;
use crate::bridge::dispatch::MessageSink;
use crate::bridge::roster::{Emoji, GuildRoster, Member, Role, RosterSnapshot};
use crate::common::error::{BringupError, DiscordError, DiscordResult, SendError};
use crate::common::retry::{retry_startup, BringupPolicy};
use crate::common::{DiscordMessage, EmbedInfo};

/// Members fetched per REST page.
const MEMBER_PAGE: u64 = 1000;
/// Upper bound on guilds listed at startup.
const GUILD_LIMIT: u64 = 100;

/// Forwards gateway messages to the relay.
#[derive(Clone)]
struct DiscordEvents {
    message_tx: mpsc::UnboundedSender<DiscordMessage>,
}

#[async_trait]
impl EventHandler for DiscordEvents {
    async fn ready(&self, _context: Context, ready: Ready) {
        info!("Discord gateway ready as {}", ready.user.name);
    }

    async fn message(&self, _context: Context, message: Message) {
        // Direct messages are not bridged.
        let Some(guild_id) = message.guild_id else {
            return;
        };
        if let Err(error) = self.message_tx.send(convert_message(&message, guild_id)) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

fn convert_embed(embed: &Embed) -> EmbedInfo {
    EmbedInfo {
        title: embed.title.clone().unwrap_or_default(),
        url: embed.url.clone(),
        description: embed.description.clone().unwrap_or_default(),
        author_name: embed.author.as_ref().map(|a| a.name.clone()),
        author_url: embed.author.as_ref().and_then(|a| a.url.clone()),
        color: embed.colour.map(|c| c.0).unwrap_or(0),
    }
}

fn convert_message(message: &Message, guild_id: GuildId) -> DiscordMessage {
    DiscordMessage {
        author_id: message.author.id.get(),
        username: message.author.name.clone(),
        nickname: message.member.as_ref().and_then(|m| m.nick.clone()),
        guild_id: guild_id.get(),
        channel_id: message.channel_id.get(),
        content: message.content.clone(),
        attachments: message
            .attachments
            .iter()
            .map(|a| a.proxy_url.clone())
            .collect(),
        embeds: message.embeds.iter().map(convert_embed).collect(),
    }
}

fn build_http(token: &str) -> anyhow::Result<Http> {
    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    Ok(HttpBuilder::new(token).client(reqwest_client).build())
}

async fn build_client(token: &str, events: DiscordEvents) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS;

    let http = build_http(token)?;
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;
    Ok(client)
}

/// Every member of a guild, following REST pagination.
async fn fetch_members(http: &Http, guild_id: GuildId) -> DiscordResult<Vec<Member>> {
    let mut members = Vec::new();
    let mut after = None;

    loop {
        let page = http
            .get_guild_members(guild_id, Some(MEMBER_PAGE), after)
            .await?;
        let full = page.len() as u64 == MEMBER_PAGE;
        after = page.last().map(|m| m.user.id.get());
        members.extend(page.into_iter().map(|m| Member {
            id: m.user.id.get(),
            username: m.user.name.clone(),
            nickname: m.nick.clone(),
        }));
        if !full {
            break;
        }
    }

    Ok(members)
}

/// Sends text to Discord channels over REST.
#[derive(Clone)]
pub struct DiscordSink {
    http: Arc<Http>,
}

#[async_trait]
impl MessageSink for DiscordSink {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), SendError> {
        let id = channel_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| DiscordError::InvalidChannelId {
                channel_id: channel_id.to_string(),
            })?;

        ChannelId::new(id)
            .say(&self.http, text)
            .await
            .map_err(DiscordError::from)?;
        Ok(())
    }
}

/// Discord session: REST handle plus the not-yet-started gateway client.
pub struct DiscordClient {
    client: Option<Client>,
    http: Arc<Http>,
    token: String,
    events: DiscordEvents,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordClient {
    /// Build the Discord session, retrying per `policy`.
    pub async fn connect(
        token: &str,
        channels: DiscordChannels,
        policy: &BringupPolicy,
    ) -> Result<Self, BringupError> {
        let events = DiscordEvents {
            message_tx: channels.message_tx,
        };

        let client = retry_startup("initialise Discord session", policy, || {
            build_client(token, events.clone())
        })
        .await?;
        let http = Arc::clone(&client.http);

        Ok(Self {
            client: Some(client),
            http,
            token: token.to_string(),
            events,
            shutdown_rx: channels.shutdown_rx,
        })
    }

    pub fn sink(&self) -> DiscordSink {
        DiscordSink {
            http: Arc::clone(&self.http),
        }
    }

    /// Fetch the bot's user ID and a snapshot of every guild it is in.
    pub async fn load_roster(
        &self,
        policy: &BringupPolicy,
    ) -> Result<(u64, RosterSnapshot), BringupError> {
        let http: &Http = &self.http;

        let me = retry_startup("get own Discord user", policy, move || http.get_current_user())
            .await?;
        info!("Logged in to Discord as {} ({})", me.name, me.id);

        let guilds = retry_startup("get guilds", policy, move || {
            http.get_guilds(None, Some(GUILD_LIMIT))
        })
        .await?;

        let mut roster = RosterSnapshot::new();
        for info in guilds {
            let guild_id = info.id;
            let mut guild = GuildRoster::new(guild_id.get(), info.name.clone());

            let channels = retry_startup(
                &format!("get channels for {}", info.name),
                policy,
                move || http.get_channels(guild_id),
            )
            .await?;
            guild.channels = channels
                .into_iter()
                .filter(|c| c.kind == ChannelType::Text)
                .map(|c| (c.name, c.id.get()))
                .collect();

            guild.members = retry_startup(
                &format!("get members for {}", info.name),
                policy,
                move || fetch_members(http, guild_id),
            )
            .await?;

            guild.roles = retry_startup(
                &format!("get roles for {}", info.name),
                policy,
                move || http.get_guild_roles(guild_id),
            )
            .await?
            .into_iter()
            .map(|r| Role {
                id: r.id.get(),
                name: r.name,
            })
            .collect();

            guild.emojis = retry_startup(
                &format!("get emojis for {}", info.name),
                policy,
                move || http.get_emojis(guild_id),
            )
            .await?
            .into_iter()
            .map(|e| Emoji {
                id: e.id.get(),
                name: e.name,
                animated: e.animated,
            })
            .collect();

            info!(
                "Loaded guild {}: {} text channels, {} members, {} roles, {} emojis",
                guild.name,
                guild.channels.len(),
                guild.members.len(),
                guild.roles.len(),
                guild.emojis.len()
            );
            roster.insert(guild);
        }

        Ok((me.id.get(), roster))
    }

    /// Run the gateway until shutdown.
    pub async fn run(mut self) {
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::select! {
            _ = Self::run_connection(&mut self.client, &self.token, &self.events) => {},
            _ = async {
                loop {
                    if shutdown_rx.changed().await.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                // Gracefully shutdown Discord gateway
                if let Some(ref manager) = shard_manager {
                    info!("Initiating graceful Discord shutdown...");
                    manager.shutdown_all().await;
                    info!("Discord shutdown complete");
                }
            } => {}
        }
        info!("Discord task ended");
    }

    async fn run_connection(client: &mut Option<Client>, token: &str, events: &DiscordEvents) {
        /// Create an exponential backoff iterator for Discord reconnection.
        /// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
        fn discord_backoff() -> impl Iterator<Item = Duration> {
            backon::ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(5))
                .with_max_delay(Duration::from_secs(300))
                .with_factor(1.1)
                .with_jitter()
                .without_max_times()
                .build()
        }

        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord gateway...");

            let mut client = match client.take() {
                Some(client) => client,
                None => match build_client(token, events.clone()).await {
                    Ok(client) => {
                        backoff = discord_backoff();
                        client
                    }
                    Err(e) => {
                        error!("Failed to rebuild Discord client: {}", e);
                        let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                        warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                        sleep(delay).await;
                        continue;
                    }
                },
            };

            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    sleep(delay).await;
                }
            }
            debug!("Discord connection loop iteration finished");
        }
    }
}
