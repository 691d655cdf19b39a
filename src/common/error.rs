//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// A startup step that kept failing until it ran out of attempts.
#[derive(Debug, Error)]
pub enum BringupError {
    #[error("{step} failed after {attempts} attempts: {message}")]
    Exhausted {
        step: String,
        attempts: usize,
        message: String,
    },
}

/// Discord-related errors.
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("Invalid channel id: {channel_id}")]
    InvalidChannelId { channel_id: String },

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),
}

/// IRC connection errors.
#[derive(Debug, Error)]
pub enum IrcError {
    #[error("Invalid server address '{address}'")]
    InvalidAddress { address: String },

    #[error("Failed to connect to {address}: {source}")]
    ConnectFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS error: {message}")]
    Tls { message: String },

    #[error("Line too long: {len} bytes")]
    LineTooLong { len: usize },

    #[error("Server closed the connection: {reason}")]
    Closed { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to deliver one outbound message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Discord send failed: {0}")]
    Discord(#[from] DiscordError),

    #[error("IRC client is not running")]
    IrcDisconnected,
}

/// Failure to store overflow text in the paste sink.
#[derive(Debug, Error)]
pub enum PasteError {
    #[error("Paste storage is not configured")]
    Disabled,

    #[error("Failed to write paste '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Discord operations.
pub type DiscordResult<T> = std::result::Result<T, DiscordError>;
