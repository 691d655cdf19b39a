//! Discord bot integration.
//!
//! Loads the guild roster at startup, runs the gateway, and posts relayed
//! messages through REST.

pub mod client;

pub use client::DiscordClient;
