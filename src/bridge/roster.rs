//! Snapshot of the Discord guilds the bot is in.
//!
//! Loaded once during bring-up and read-only afterwards.

use std::collections::{BTreeMap, HashMap};

use crate::bridge::mapping::split_discord_key;

/// A guild member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: u64,
    pub username: String,
    pub nickname: Option<String>,
}

impl Member {
    /// Name shown for this member: the guild nickname when enabled and set,
    /// otherwise the username.
    pub fn display_name(&self, use_nicknames: bool) -> &str {
        match &self.nickname {
            Some(nick) if use_nicknames && !nick.is_empty() => nick,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: u64,
    pub name: String,
}

/// A custom guild emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emoji {
    pub id: u64,
    pub name: String,
    pub animated: bool,
}

/// Directory of one guild.
#[derive(Debug, Clone, Default)]
pub struct GuildRoster {
    pub id: u64,
    pub name: String,
    /// Text channels, name -> id.
    pub channels: BTreeMap<String, u64>,
    pub members: Vec<Member>,
    pub roles: Vec<Role>,
    pub emojis: Vec<Emoji>,
}

impl GuildRoster {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn channel_id(&self, name: &str) -> Option<u64> {
        self.channels.get(name).copied()
    }

    pub fn channel_name(&self, id: u64) -> Option<&str> {
        self.channels
            .iter()
            .find(|(_, channel_id)| **channel_id == id)
            .map(|(name, _)| name.as_str())
    }

    pub fn member(&self, id: u64) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn role(&self, id: u64) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn emoji(&self, id: u64) -> Option<&Emoji> {
        self.emojis.iter().find(|e| e.id == id)
    }
}

/// Every guild visible to the bot, indexed by name and by id.
#[derive(Debug, Clone, Default)]
pub struct RosterSnapshot {
    guilds: HashMap<String, GuildRoster>,
    names_by_id: HashMap<u64, String>,
}

impl RosterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a guild. A later guild with the same name replaces the earlier one.
    pub fn insert(&mut self, guild: GuildRoster) {
        if let Some(previous) = self.guilds.get(&guild.name) {
            self.names_by_id.remove(&previous.id);
        }
        self.names_by_id.insert(guild.id, guild.name.clone());
        self.guilds.insert(guild.name.clone(), guild);
    }

    pub fn guild(&self, name: &str) -> Option<&GuildRoster> {
        self.guilds.get(name)
    }

    pub fn guild_by_id(&self, id: u64) -> Option<&GuildRoster> {
        self.names_by_id.get(&id).and_then(|name| self.guilds.get(name))
    }

    /// Resolve a `guild#channel` key to its guild and channel id.
    pub fn resolve_key(&self, key: &str) -> Option<(&GuildRoster, u64)> {
        let (guild_name, channel_name) = split_discord_key(key)?;
        let guild = self.guild(guild_name)?;
        let channel_id = guild.channel_id(channel_name)?;
        Some((guild, channel_id))
    }

    /// Build the `guild#channel` key of a channel the bot saw a message in.
    pub fn channel_key(&self, guild_id: u64, channel_id: u64) -> Option<String> {
        let guild = self.guild_by_id(guild_id)?;
        let channel = guild.channel_name(channel_id)?;
        Some(format!("{}#{}", guild.name, channel))
    }

    pub fn len(&self) -> usize {
        self.guilds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RosterSnapshot {
        let mut guild = GuildRoster::new(10, "MyGuild");
        guild.channels.insert("general".to_string(), 100);
        guild.channels.insert("dev".to_string(), 101);
        guild.members.push(Member {
            id: 1,
            username: "alice".to_string(),
            nickname: Some("Ally".to_string()),
        });
        guild.members.push(Member {
            id: 2,
            username: "bob".to_string(),
            nickname: Some(String::new()),
        });

        let mut roster = RosterSnapshot::new();
        roster.insert(guild);
        roster
    }

    #[test]
    fn test_display_name() {
        let roster = sample();
        let guild = roster.guild("MyGuild").unwrap();
        assert_eq!(guild.member(1).unwrap().display_name(true), "Ally");
        assert_eq!(guild.member(1).unwrap().display_name(false), "alice");
        assert_eq!(guild.member(2).unwrap().display_name(true), "bob");
    }

    #[test]
    fn test_resolve_key() {
        let roster = sample();
        let (guild, channel) = roster.resolve_key("MyGuild#general").unwrap();
        assert_eq!(guild.id, 10);
        assert_eq!(channel, 100);
        assert!(roster.resolve_key("MyGuild#missing").is_none());
        assert!(roster.resolve_key("Other#general").is_none());
    }

    #[test]
    fn test_channel_key() {
        let roster = sample();
        assert_eq!(roster.channel_key(10, 101).as_deref(), Some("MyGuild#dev"));
        assert_eq!(roster.channel_key(10, 999), None);
        assert_eq!(roster.channel_key(11, 100), None);
    }
}
