//! Message routing between IRC and Discord.
//!
//! Routing is synchronous: an inbound event goes in, the fully rendered
//! outbound messages come out, ready to be handed to a dispatch queue.

use fancy_regex::Regex;
use tracing::{debug, error, warn};

use crate::bridge::paginate::PageLine;
use crate::bridge::state::ResolvedBridgeState;
use crate::common::error::PasteError;
use crate::common::messages::anti_ping;
use crate::common::{DiscordMessage, EmbedInfo, IrcEvent, OutboundMessage, Platform};
use crate::format::color::nearest;
use crate::format::{discord, irc, Format, FormattedString, PaletteColor, Span};

/// Author shown on bridge-generated IRC lines.
const SYSTEM_AUTHOR: &str = "[SYSTEM]";

/// Routes messages between the two networks.
#[derive(Debug)]
pub struct BridgeRouter {
    state: ResolvedBridgeState,
    /// Markdown links, `[text](url)`.
    link_pattern: Regex,
}

impl BridgeRouter {
    pub fn new(state: ResolvedBridgeState) -> Self {
        Self {
            state,
            link_pattern: Regex::new(r"\[([^\[\]]+)\]\(([^()]+)\)").unwrap(),
        }
    }

    pub fn state(&self) -> &ResolvedBridgeState {
        &self.state
    }

    /// Route a message seen on IRC to its Discord channel.
    pub fn route_irc(&self, event: &IrcEvent) -> Vec<OutboundMessage> {
        debug!("IRC {} <{}> {}", event.channel, event.nick, event.text);

        let Some(key) = self.state.mapping.discord_for(&event.channel) else {
            return Vec::new();
        };
        let Some((guild, channel_id)) = self.state.roster.resolve_key(key) else {
            warn!("Discord channel {} is not in the roster, dropping message", key);
            return Vec::new();
        };
        debug!("Mapping IRC:{} to DIS:{}", event.channel, key);

        let mut parsed = irc::parse(&event.text);
        if event.action {
            parsed = parsed.emphasize(Format::ITALIC);
        }
        let body = self
            .state
            .translator
            .to_native(guild, &discord::render(&parsed));
        if body.trim().is_empty() {
            debug!("Dropping empty message from {}", event.nick);
            return Vec::new();
        }

        let outbound = |author: Option<&str>, body: String| OutboundMessage {
            platform: Platform::Discord,
            channel_id: channel_id.to_string(),
            destination: key.to_string(),
            author: author.map(str::to_string),
            body,
        };

        if starts_with_any(&parsed.plain_text(), &self.state.discord_command_chars) {
            let nick = discord::render(&FormattedString(vec![Span::styled(
                event.nick.as_str(),
                Format::BOLD,
            )]));
            vec![
                outbound(None, format!("Command sent by {}", nick)),
                outbound(None, body),
            ]
        } else {
            vec![outbound(Some(event.nick.as_str()), body)]
        }
    }

    /// Route a message seen on Discord to its IRC channel.
    pub fn route_discord(&self, message: &DiscordMessage) -> Vec<OutboundMessage> {
        if message.author_id == self.state.self_user_id {
            return Vec::new();
        }

        let Some(key) = self
            .state
            .roster
            .channel_key(message.guild_id, message.channel_id)
        else {
            debug!(
                "Message in unknown channel {} of guild {}",
                message.channel_id, message.guild_id
            );
            return Vec::new();
        };
        let Some(irc_channel) = self.state.mapping.irc_for(&key) else {
            return Vec::new();
        };
        let Some(guild) = self.state.roster.guild_by_id(message.guild_id) else {
            return Vec::new();
        };

        let author = self.display_name(message);
        debug!("DIS {} <{}> {}", key, author, message.content);
        debug!("Mapping DIS:{} to IRC:{}", key, irc_channel);

        let outbound = |author: Option<&str>, body: String| OutboundMessage {
            platform: Platform::Irc,
            channel_id: irc_channel.to_string(),
            destination: irc_channel.to_string(),
            author: author.map(str::to_string),
            body,
        };

        let mut out = Vec::new();

        if !message.content.is_empty() {
            let text = self.state.translator.to_display(guild, &message.content);
            let lines = match self.state.paginator.paginate(&text) {
                Ok(lines) => lines,
                Err(e) => {
                    error!("Dropping message from {} in {}: {}", author, key, e);
                    return Vec::new();
                }
            };

            let is_command = starts_with_any(&text, &self.state.irc_command_chars);
            if is_command {
                out.push(outbound(None, format!("Command sent by {}", anti_ping(author))));
            }

            for line in lines {
                match line {
                    PageLine::Content(line) => {
                        let body = irc::render(&discord::parse(&line));
                        out.push(outbound((!is_command).then_some(author), body));
                    }
                    PageLine::Overflow { url } => out.push(outbound(
                        Some(SYSTEM_AUTHOR),
                        format!("full message from {}: {}", anti_ping(author), url),
                    )),
                }
            }
        }

        for attachment in &message.attachments {
            out.push(outbound(Some(author), attachment.clone()));
        }

        if self.state.forward_embeds && message.content.is_empty() {
            for embed in &message.embeds {
                match self.embed_lines(embed) {
                    Ok(lines) => {
                        out.extend(lines.into_iter().map(|line| outbound(Some(author), line)))
                    }
                    Err(e) => error!("Dropping embed from {} in {}: {}", author, key, e),
                }
            }
        }

        out
    }

    /// Name shown for the author of a Discord message.
    fn display_name<'a>(&self, message: &'a DiscordMessage) -> &'a str {
        match &message.nickname {
            Some(nick) if self.state.use_nicknames && !nick.is_empty() => nick,
            _ => &message.username,
        }
    }

    /// Render an embed as IRC lines joined by a colored bracket.
    ///
    /// Embeds with neither title nor description are usually link previews
    /// and produce nothing.
    fn embed_lines(&self, embed: &EmbedInfo) -> Result<Vec<String>, PasteError> {
        if embed.title.is_empty() && embed.description.is_empty() {
            return Ok(Vec::new());
        }

        let mut lines = Vec::new();

        if let Some(name) = embed.author_name.as_deref().filter(|n| !n.is_empty()) {
            lines.push(with_url(name, embed.author_url.as_deref()));
        }
        lines.push(with_url(&embed.title, embed.url.as_deref()));

        let description = self
            .link_pattern
            .replace_all(&embed.description, "$1 <$2>")
            .to_string();
        if !description.is_empty() {
            for line in self.state.paginator.paginate(&description)? {
                lines.push(match line {
                    PageLine::Content(line) => line,
                    PageLine::Overflow { url } => format!("[full message: {}]", url),
                });
            }
        }

        let color = nearest(embed.color);
        let count = lines.len();
        Ok(lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let glyph = match i {
                    _ if count == 1 => "│",
                    0 => "╽",
                    _ if i == count - 1 => "╿",
                    _ => "┃",
                };
                irc::render(&FormattedString(vec![
                    Span::colored(glyph, color, PaletteColor::Default),
                    Span::plain(format!(" {}", line)),
                ]))
            })
            .collect())
    }
}

fn starts_with_any(text: &str, prefixes: &str) -> bool {
    text.chars().next().is_some_and(|c| prefixes.contains(c))
}

fn with_url(text: &str, url: Option<&str>) -> String {
    match url.filter(|u| !u.is_empty()) {
        Some(url) => format!("{} <{}>", text, url),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::bridge::paginate::MessagePaginator;
    use crate::bridge::paste::{DisabledPasteSink, PasteSink};
    use crate::bridge::roster::{GuildRoster, Member, RosterSnapshot};
    use crate::bridge::state::PendingBridgeState;
    use crate::config::parser::load_config_str;

    const BOT_ID: u64 = 999;

    #[derive(Default)]
    struct RecordingSink {
        stored: Mutex<Vec<String>>,
    }

    impl PasteSink for RecordingSink {
        fn store(&self, content: &str) -> Result<String, PasteError> {
            self.stored.lock().unwrap().push(content.to_string());
            Ok("https://paste/x.txt".to_string())
        }
    }

    fn roster() -> RosterSnapshot {
        let mut guild = GuildRoster::new(10, "MyGuild");
        guild.channels.insert("general".to_string(), 100);
        guild.channels.insert("random".to_string(), 101);
        guild.members.push(Member {
            id: 1,
            username: "alice".to_string(),
            nickname: Some("Alice".to_string()),
        });
        let mut roster = RosterSnapshot::new();
        roster.insert(guild);
        roster
    }

    fn router_with(forward_embeds: bool, max_lines: usize) -> (BridgeRouter, Arc<RecordingSink>) {
        let config = load_config_str(&format!(
            r##"{{
                "irc": {{"nick": "bridge", "user": "bridge", "server": "localhost:6667", "command_chars": "."}},
                "discord": {{"token": "t", "command_chars": "!", "use_nicknames": true,
                            "forward_embeds": {}, "max_lines": {}}},
                "mapping": {{"#general": "MyGuild#general", "#missing": "MyGuild#gone"}}
            }}"##,
            forward_embeds, max_lines
        ))
        .unwrap();

        let sink = Arc::new(RecordingSink::default());
        let mut pending = PendingBridgeState::from_config(&config);
        pending.paginator = MessagePaginator::new(max_lines, sink.clone());
        (BridgeRouter::new(pending.resolve(roster(), BOT_ID)), sink)
    }

    fn router() -> BridgeRouter {
        router_with(true, 5).0
    }

    fn irc_event(nick: &str, channel: &str, text: &str) -> IrcEvent {
        IrcEvent {
            nick: nick.to_string(),
            channel: channel.to_string(),
            text: text.to_string(),
            action: false,
        }
    }

    fn discord_message(content: &str) -> DiscordMessage {
        DiscordMessage {
            author_id: 1,
            username: "alice".to_string(),
            nickname: Some("Alice".to_string()),
            guild_id: 10,
            channel_id: 100,
            content: content.to_string(),
            ..DiscordMessage::default()
        }
    }

    fn texts(messages: &[OutboundMessage]) -> Vec<String> {
        messages.iter().map(OutboundMessage::text).collect()
    }

    #[test]
    fn test_irc_message_is_attributed() {
        let out = router().route_irc(&irc_event("bob", "#general", "hi"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].platform, Platform::Discord);
        assert_eq!(out[0].channel_id, "100");
        assert_eq!(out[0].destination, "MyGuild#general");
        assert_eq!(out[0].author.as_deref(), Some("bob"));
        assert_eq!(out[0].text(), "**<bob>** hi");
    }

    #[test]
    fn test_irc_unmapped_or_unresolved_is_dropped() {
        let r = router();
        assert!(r.route_irc(&irc_event("bob", "#random", "hi")).is_empty());
        assert!(r.route_irc(&irc_event("bob", "#missing", "hi")).is_empty());
    }

    #[test]
    fn test_irc_channel_lookup_ignores_case() {
        assert_eq!(router().route_irc(&irc_event("bob", "#General", "hi")).len(), 1);
    }

    #[test]
    fn test_irc_formatting_and_mentions() {
        let out = router().route_irc(&irc_event("bob", "#general", "\x02hey\x02 @Alice"));
        assert_eq!(texts(&out), vec!["**<bob>** **hey** <@1>"]);
    }

    #[test]
    fn test_irc_action_is_italic() {
        let mut event = irc_event("bob", "#general", "waves");
        event.action = true;
        assert_eq!(texts(&router().route_irc(&event)), vec!["**<bob>** *waves*"]);
    }

    #[test]
    fn test_irc_command_is_sent_anonymously() {
        let out = router().route_irc(&irc_event("bob", "#general", "!roll d20"));
        assert_eq!(texts(&out), vec!["Command sent by **bob**", "!roll d20"]);
        assert!(out.iter().all(|m| m.author.is_none()));
    }

    #[test]
    fn test_discord_message_is_attributed() {
        let out = router().route_discord(&discord_message("hello <#100>"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].platform, Platform::Irc);
        assert_eq!(out[0].channel_id, "#general");
        assert_eq!(out[0].text(), "<A\u{FEFF}lice> hello #general");
    }

    #[test]
    fn test_discord_own_and_unmapped_messages_are_ignored() {
        let r = router();
        let mut own = discord_message("hi");
        own.author_id = BOT_ID;
        assert!(r.route_discord(&own).is_empty());

        let mut unmapped = discord_message("hi");
        unmapped.channel_id = 101;
        assert!(r.route_discord(&unmapped).is_empty());
    }

    #[test]
    fn test_discord_command_is_announced() {
        let out = router().route_discord(&discord_message(".seen bob"));
        assert_eq!(texts(&out), vec!["Command sent by A\u{FEFF}lice", ".seen bob"]);
    }

    #[test]
    fn test_discord_overflow_goes_to_paste() {
        let (r, sink) = router_with(false, 2);
        let out = r.route_discord(&discord_message("one\ntwo\nthree"));
        assert_eq!(
            texts(&out),
            vec![
                "<A\u{FEFF}lice> one".to_string(),
                "<[S\u{FEFF}YSTEM]> full message from A\u{FEFF}lice: https://paste/x.txt"
                    .to_string(),
            ]
        );
        assert_eq!(*sink.stored.lock().unwrap(), vec!["one\ntwo\nthree".to_string()]);
    }

    #[test]
    fn test_discord_attachments_are_relayed() {
        let mut message = discord_message("");
        message.attachments = vec!["https://media/a.png".to_string()];
        assert_eq!(
            texts(&router().route_discord(&message)),
            vec!["<A\u{FEFF}lice> https://media/a.png"]
        );
    }

    #[test]
    fn test_discord_nickname_falls_back_to_username() {
        let mut message = discord_message("hi");
        message.nickname = None;
        assert_eq!(texts(&router().route_discord(&message)), vec!["<a\u{FEFF}lice> hi"]);
    }

    #[test]
    fn test_embed_lines_are_bracketed() {
        let mut message = discord_message("");
        message.embeds = vec![EmbedInfo {
            title: "Release".to_string(),
            url: Some("https://ex/r".to_string()),
            description: "see [notes](https://ex/n)".to_string(),
            color: 0x0000AA,
            ..EmbedInfo::default()
        }];

        let out = router().route_discord(&message);
        assert_eq!(
            texts(&out),
            vec![
                "<A\u{FEFF}lice> \x0302╽\x0f Release <https://ex/r>",
                "<A\u{FEFF}lice> \x0302╿\x0f see notes <https://ex/n>",
            ]
        );
    }

    #[test]
    fn test_single_line_embed_and_skipped_embeds() {
        let mut message = discord_message("");
        message.embeds = vec![
            EmbedInfo::default(),
            EmbedInfo {
                title: "Only".to_string(),
                color: 0xFF5555,
                ..EmbedInfo::default()
            },
        ];
        assert_eq!(
            texts(&router().route_discord(&message)),
            vec!["<A\u{FEFF}lice> \x0304│\x0f Only"]
        );
    }

    #[test]
    fn test_embeds_ignored_when_disabled_or_with_content() {
        let (r, _) = router_with(false, 5);
        let mut message = discord_message("");
        message.embeds = vec![EmbedInfo {
            title: "x".to_string(),
            ..EmbedInfo::default()
        }];
        assert!(r.route_discord(&message).is_empty());

        let mut with_content = discord_message("text");
        with_content.embeds = message.embeds.clone();
        assert_eq!(router().route_discord(&with_content).len(), 1);
    }

    #[test]
    fn test_failed_embed_keeps_attachments_and_other_embeds() {
        let (mut r, _) = router_with(true, 1);
        r.state.paginator = MessagePaginator::new(1, Arc::new(DisabledPasteSink));

        let mut message = discord_message("");
        message.attachments = vec!["https://media/a.png".to_string()];
        message.embeds = vec![
            EmbedInfo {
                title: "Long".to_string(),
                description: "one\ntwo".to_string(),
                ..EmbedInfo::default()
            },
            EmbedInfo {
                title: "Only".to_string(),
                color: 0xFF5555,
                ..EmbedInfo::default()
            },
        ];

        assert_eq!(
            texts(&r.route_discord(&message)),
            vec![
                "<A\u{FEFF}lice> https://media/a.png",
                "<A\u{FEFF}lice> \x0304│\x0f Only",
            ]
        );
    }
}
