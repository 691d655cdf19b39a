//! IRC channel <-> Discord channel mapping.

use std::collections::{BTreeMap, HashMap};

/// Bidirectional lookup between IRC channels and `guild#channel` keys.
///
/// IRC channel names are stored lowercased; Discord keys are case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct ChannelMapping {
    irc_to_discord: HashMap<String, String>,
    discord_to_irc: HashMap<String, String>,
}

impl ChannelMapping {
    /// Build from the config `mapping` table (IRC channel -> `guild#channel`).
    pub fn from_config(mapping: &BTreeMap<String, String>) -> Self {
        let mut irc_to_discord = HashMap::new();
        let mut discord_to_irc = HashMap::new();

        for (irc, discord) in mapping {
            let irc = irc.to_lowercase();
            irc_to_discord.insert(irc.clone(), discord.clone());
            discord_to_irc.insert(discord.clone(), irc);
        }

        Self {
            irc_to_discord,
            discord_to_irc,
        }
    }

    /// Discord key for an IRC channel.
    pub fn discord_for(&self, irc_channel: &str) -> Option<&str> {
        self.irc_to_discord
            .get(&irc_channel.to_lowercase())
            .map(String::as_str)
    }

    /// IRC channel for a `guild#channel` key.
    pub fn irc_for(&self, discord_key: &str) -> Option<&str> {
        self.discord_to_irc.get(discord_key).map(String::as_str)
    }

    /// Every mapped IRC channel, sorted.
    pub fn irc_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.irc_to_discord.keys().cloned().collect();
        channels.sort();
        channels
    }

    pub fn len(&self) -> usize {
        self.irc_to_discord.len()
    }
}

/// Split a `guild#channel` key. Guild names may themselves contain `#`.
pub fn split_discord_key(key: &str) -> Option<(&str, &str)> {
    key.rsplit_once('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ChannelMapping {
        let mut table = BTreeMap::new();
        table.insert("#General".to_string(), "MyGuild#general".to_string());
        table.insert("#dev".to_string(), "My#Guild#dev".to_string());
        ChannelMapping::from_config(&table)
    }

    #[test]
    fn test_lookup_both_ways() {
        let m = mapping();
        assert_eq!(m.discord_for("#general"), Some("MyGuild#general"));
        assert_eq!(m.discord_for("#GENERAL"), Some("MyGuild#general"));
        assert_eq!(m.irc_for("MyGuild#general"), Some("#general"));
        assert_eq!(m.irc_for("myguild#general"), None);
        assert_eq!(m.discord_for("#random"), None);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_irc_channels_sorted() {
        assert_eq!(mapping().irc_channels(), vec!["#dev", "#general"]);
    }

    #[test]
    fn test_split_discord_key() {
        assert_eq!(split_discord_key("MyGuild#general"), Some(("MyGuild", "general")));
        assert_eq!(split_discord_key("My#Guild#dev"), Some(("My#Guild", "dev")));
        assert_eq!(split_discord_key("nohash"), None);
    }
}
