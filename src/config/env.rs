//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `IRCBRIDGE_DISCORD_TOKEN` - Discord bot token
//! - `IRCBRIDGE_IRC_PASS` - IRC server password
//! - `IRCBRIDGE_IRC_NICK` - IRC nick
//! - `IRCBRIDGE_IRC_SERVER` - IRC server `host:port`

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "IRCBRIDGE";

/// Apply environment variable overrides to a config.
///
/// This allows secrets to be provided via environment variables instead of
/// the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }

    if let Ok(pass) = env::var(format!("{}_IRC_PASS", ENV_PREFIX)) {
        config.irc.pass = pass;
    }
    if let Ok(nick) = env::var(format!("{}_IRC_NICK", ENV_PREFIX)) {
        config.irc.nick = nick;
    }
    if let Ok(server) = env::var(format!("{}_IRC_SERVER", ENV_PREFIX)) {
        config.irc.server = server;
    }

    config
}

/// Check if any secret environment variables are set but empty.
///
/// Returns a list of variable names that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_DISCORD_TOKEN", ENV_PREFIX),
        format!("{}_IRC_PASS", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}
