//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;
pub mod retry;

pub use messages::{DiscordMessage, EmbedInfo, IrcEvent, OutboundMessage, Platform};
