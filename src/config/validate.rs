//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use std::collections::HashMap;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Discord
    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.max_lines == 0 {
        errors.push("discord.max_lines must be at least 1".to_string());
    }
    let paste_path_set = config
        .discord
        .paste_filepath
        .as_deref()
        .is_some_and(|p| !p.is_empty());
    let paste_url_set = config
        .discord
        .paste_url
        .as_deref()
        .is_some_and(|u| !u.is_empty());
    if paste_path_set && !paste_url_set {
        errors.push("discord.paste_url is required when discord.paste_filepath is set".to_string());
    }

    // IRC
    if config.irc.nick.is_empty() {
        errors.push("irc.nick is required".to_string());
    }
    if config.irc.user.is_empty() {
        errors.push("irc.user is required".to_string());
    }
    match config.irc.server.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok_and(|p| p != 0) => {}
        _ => errors.push(format!(
            "irc.server '{}' must be of the form host:port",
            config.irc.server
        )),
    }

    // Channel mapping
    if config.mapping.is_empty() {
        errors.push("mapping is empty - no message routing configured".to_string());
    }
    let mut destinations: HashMap<String, &str> = HashMap::new();
    for (irc, discord) in &config.mapping {
        if !irc.starts_with('#') && !irc.starts_with('&') {
            errors.push(format!("mapping key '{}' is not an IRC channel", irc));
        }
        match discord.rsplit_once('#') {
            Some((guild, channel)) if !guild.is_empty() && !channel.is_empty() => {}
            _ => errors.push(format!(
                "mapping['{}'] = '{}' must be of the form guild#channel",
                irc, discord
            )),
        }
        if let Some(previous) = destinations.insert(discord.clone(), irc.as_str()) {
            errors.push(format!(
                "mapping destination '{}' is used by both '{}' and '{}'",
                discord, previous, irc
            ));
        }
    }
    let mut lowered: HashMap<String, &str> = HashMap::new();
    for irc in config.mapping.keys() {
        if let Some(previous) = lowered.insert(irc.to_lowercase(), irc.as_str()) {
            errors.push(format!(
                "mapping keys '{}' and '{}' name the same IRC channel",
                previous, irc
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
