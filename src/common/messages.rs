//! Canonical message types for bridge communication.
//!
//! Platform clients turn their native events into [`IrcEvent`] and
//! [`DiscordMessage`]; the router turns those into [`OutboundMessage`]s.

use crate::format::{discord, FormattedString, Span};

/// Marks a name so that echoing it does not notify its owner.
const ANTI_PING_MARK: char = '\u{FEFF}';

/// Destination chat network of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Irc,
    Discord,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Irc => write!(f, "IRC"),
            Platform::Discord => write!(f, "Discord"),
        }
    }
}

/// A message seen in an IRC channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcEvent {
    /// Sender's nick.
    pub nick: String,
    /// Channel name, lowercased.
    pub channel: String,
    /// Raw message text including IRC control codes.
    pub text: String,
    /// True for CTCP ACTION (`/me`).
    pub action: bool,
}

/// Embed attached to a Discord message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedInfo {
    pub title: String,
    pub url: Option<String>,
    pub description: String,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    /// `0xRRGGBB`.
    pub color: u32,
}

/// A message posted in a Discord guild text channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscordMessage {
    pub author_id: u64,
    pub username: String,
    /// Guild nickname, if the author has one.
    pub nickname: Option<String>,
    pub guild_id: u64,
    pub channel_id: u64,
    pub content: String,
    /// Proxy URLs of attached files.
    pub attachments: Vec<String>,
    pub embeds: Vec<EmbedInfo>,
}

/// A fully routed message waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub platform: Platform,
    /// Platform-native channel identifier (Discord snowflake or IRC channel name).
    pub channel_id: String,
    /// Human-readable destination, for logs.
    pub destination: String,
    /// Displayed sender, `None` for anonymous messages.
    pub author: Option<String>,
    /// Message body, already rendered for the destination.
    pub body: String,
}

impl OutboundMessage {
    /// Final wire text, with the platform's attribution prefix.
    pub fn text(&self) -> String {
        let Some(author) = &self.author else {
            return self.body.clone();
        };

        match self.platform {
            Platform::Discord => {
                let nick = discord::render(&FormattedString(vec![Span::plain(author.as_str())]));
                format!("**<{}>** {}", nick, self.body)
            }
            Platform::Irc => format!("<{}> {}", anti_ping(author), self.body),
        }
    }
}

/// Insert an invisible mark after the first ASCII letter or digit of every
/// word in `name`.
pub fn anti_ping(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 6);
    let mut prev_is_word = false;

    for c in name.chars() {
        out.push(c);
        if c.is_ascii_alphanumeric() && !prev_is_word {
            out.push(ANTI_PING_MARK);
        }
        prev_is_word = c.is_ascii_alphanumeric() || c == '_';
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbound(platform: Platform, author: Option<&str>) -> OutboundMessage {
        OutboundMessage {
            platform,
            channel_id: "1".to_string(),
            destination: "test".to_string(),
            author: author.map(str::to_string),
            body: "hello".to_string(),
        }
    }

    #[test]
    fn test_anti_ping() {
        assert_eq!(anti_ping("bob"), "b\u{FEFF}ob");
        assert_eq!(anti_ping("bob smith"), "b\u{FEFF}ob s\u{FEFF}mith");
        assert_eq!(anti_ping("a_b-c"), "a\u{FEFF}_b-c\u{FEFF}");
        assert_eq!(anti_ping("[x]"), "[x\u{FEFF}]");
        assert_eq!(anti_ping("Ψ"), "Ψ");
    }

    #[test]
    fn test_discord_attribution() {
        assert_eq!(outbound(Platform::Discord, Some("bob")).text(), "**<bob>** hello");
        assert_eq!(
            outbound(Platform::Discord, Some("bob_")).text(),
            "**<bob\\_>** hello"
        );
    }

    #[test]
    fn test_irc_attribution() {
        assert_eq!(outbound(Platform::Irc, Some("bob")).text(), "<b\u{FEFF}ob> hello");
    }

    #[test]
    fn test_anonymous_has_no_prefix() {
        assert_eq!(outbound(Platform::Irc, None).text(), "hello");
        assert_eq!(outbound(Platform::Discord, None).text(), "hello");
    }
}
