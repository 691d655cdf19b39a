//! Configuration type definitions.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub irc: IrcConfig,
    pub discord: DiscordConfig,
    /// IRC channel -> `guild#channel`.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
}

/// IRC server connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    pub nick: String,
    pub user: String,
    /// Server password, sent as PASS when non-empty.
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub ssl: bool,
    /// Verify the server certificate when `ssl` is on.
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    /// `host:port`
    pub server: String,
    /// Leading characters that mark a Discord message as an IRC bot command.
    #[serde(default)]
    pub command_chars: String,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// Prefer guild nicknames over usernames when displaying members.
    #[serde(default)]
    pub use_nicknames: bool,
    #[serde(default)]
    pub forward_embeds: bool,
    /// Leading characters that mark an IRC message as a Discord bot command.
    #[serde(default)]
    pub command_chars: String,
    /// Lines relayed to IRC before the rest goes to the paste sink.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    /// Directory overflow text is written to.
    #[serde(default)]
    pub paste_filepath: Option<String>,
    /// Public URL the paste directory is served under.
    #[serde(default)]
    pub paste_url: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_max_lines() -> usize {
    5
}
