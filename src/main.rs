//! ircbridge - IRC-Discord chat relay
//!
//! Relays messages between mapped IRC channels and Discord guild channels,
//! translating formatting, mentions and message length between the two.

mod bridge;
mod common;
mod config;
mod discord;
mod format;
mod irc;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{debug, error, info, warn};

use bridge::{BridgeRouter, ChannelBundle, DispatchQueue, Outlet, PendingBridgeState, Relay};
use common::retry::BringupPolicy;
use common::Platform;
use config::env::check_empty_env_vars;
use config::load_and_validate;
use discord::DiscordClient;
use irc::IrcClient;

/// IRC-Discord chat relay.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to the JSON configuration file
    #[arg(long, env = "IRCBRIDGE_CONFIG", default_value = "conf.json")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("ircbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    for var in check_empty_env_vars() {
        warn!("Environment variable {} is set but empty", var);
    }

    // Load configuration
    info!("Loading configuration from {}...", args.config);
    let config = load_and_validate(&args.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", args.config);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  IRC server: {}", config.irc.server);
    info!("  IRC nick: {}", config.irc.nick);
    info!("  Mapped channels: {}", config.mapping.len());

    let channels = ChannelBundle::new();
    let pending = PendingBridgeState::from_config(&config);
    let policy = BringupPolicy::default();

    // ============================================================
    // Discord bring-up: session, identity and roster
    // ============================================================
    let discord = DiscordClient::connect(&config.discord.token, channels.discord, &policy).await?;
    let (self_user_id, roster) = discord.load_roster(&policy).await?;

    if roster.is_empty() {
        warn!("The bot is not a member of any guild; nothing will be relayed");
    }
    let state = pending.resolve(roster, self_user_id);
    let channels_to_join = state.mapping.irc_channels();
    let router = Arc::new(BridgeRouter::new(state));
    info!(
        "Bridge ready: {} mapped channels, {} guilds in roster",
        router.state().mapping.len(),
        router.state().roster.len()
    );

    // ============================================================
    // Dispatch queues and relay tasks
    // ============================================================
    let (irc_client, irc_handle) = IrcClient::new(config.irc.clone(), channels_to_join, channels.irc);

    let (irc_queue, irc_worker) = DispatchQueue::spawn(Platform::Irc);
    let (discord_queue, discord_worker) = DispatchQueue::spawn(Platform::Discord);

    let relay = Relay::new(
        router,
        Outlet::new(irc_queue, Arc::new(irc_handle)),
        Outlet::new(discord_queue, Arc::new(discord.sink())),
    );

    let irc_to_discord = tokio::spawn(relay.clone().run_irc_to_discord(channels.relay.irc_rx));
    let discord_to_irc = tokio::spawn(relay.run_discord_to_irc(channels.relay.discord_rx));

    // ============================================================
    // Start both clients
    // ============================================================
    info!("Starting Discord gateway...");
    let discord_task = tokio::spawn(discord.run());

    info!("Starting IRC client...");
    let mut irc_task = tokio::spawn(irc_client.run());

    let shutdown_tx = channels.control.shutdown_tx;

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - initiating graceful shutdown...");
            true
        }
        _ = &mut irc_task => false,
        _ = discord_task => false,
        _ = irc_to_discord => false,
        _ = discord_to_irc => false,
        _ = irc_worker => false,
        _ = discord_worker => false,
    };

    if shutdown {
        // Fire-and-forget: a closed channel means the clients are already gone
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (clients already exited): {}", e);
        }
        let timeout = tokio::time::Duration::from_secs(5);
        match tokio::time::timeout(timeout, irc_task).await {
            Ok(Ok(())) => info!("IRC client quit gracefully"),
            Ok(Err(e)) => warn!("IRC client task panicked: {}", e),
            Err(_) => warn!("IRC client quit timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
