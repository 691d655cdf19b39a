//! Mention, channel, role and emoji reference translation.
//!
//! Discord encodes references as `<@id>`, `<#id>`, `<@&id>` and
//! `<:name:id>`. IRC users only ever see and type display names, so
//! messages heading to IRC get references expanded to names and messages
//! heading to Discord get names turned back into references.

use std::collections::HashMap;

use fancy_regex::{Captures, Regex};
use tracing::{error, warn};

use crate::bridge::roster::GuildRoster;
use crate::format::discord::escape_markdown;

/// Name of the implicit role every member has.
const EVERYONE_ROLE: &str = "@everyone";

/// A name matched in outbound text, and what replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Replacement {
    start: usize,
    end: usize,
    native: String,
}

/// Literal -> replacement pairs of one reference kind, matched
/// longest-first.
#[derive(Debug, Default)]
struct ReplaceGroup {
    pairs: Vec<(String, String)>,
}

impl ReplaceGroup {
    fn add(&mut self, find: String, replace: String) {
        self.pairs.push((find, replace));
    }

    /// Collect every match in `text`. Matches within the group never overlap.
    fn find_all(mut self, text: &str) -> Vec<Replacement> {
        if self.pairs.is_empty() {
            return Vec::new();
        }

        self.pairs
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut natives: HashMap<String, String> = HashMap::with_capacity(self.pairs.len());
        let mut alternatives = Vec::with_capacity(self.pairs.len());
        for (find, replace) in self.pairs {
            if natives.contains_key(&find) {
                continue;
            }
            alternatives.push(fancy_regex::escape(&find).into_owned());
            natives.insert(find, replace);
        }

        let pattern = format!(r"(?:{})(?=$|[\p{{P}}\p{{Z}}])", alternatives.join("|"));
        let regex = match Regex::new(&pattern) {
            Ok(regex) => regex,
            Err(e) => {
                error!("Failed to compile mention pattern: {}", e);
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for m in regex.find_iter(text) {
            match m {
                Ok(m) => {
                    if let Some(native) = natives.get(m.as_str()) {
                        found.push(Replacement {
                            start: m.start(),
                            end: m.end(),
                            native: native.clone(),
                        });
                    }
                }
                Err(e) => {
                    warn!("Mention match error: {}", e);
                    break;
                }
            }
        }
        found
    }
}

/// Translates references between Discord's native form and display names.
#[derive(Debug, Clone)]
pub struct MentionTranslator {
    use_nicknames: bool,
    /// `<#id>`, `<@id>`, `<@!id>`, `<@&id>`, `<:name:id>`, `<a:name:id>`.
    native_pattern: Regex,
}

impl MentionTranslator {
    pub fn new(use_nicknames: bool) -> Self {
        Self {
            use_nicknames,
            native_pattern: Regex::new(r"<(#|@!?|@&|a?:[A-Za-z0-9_]+:)(\d+)>").unwrap(),
        }
    }

    /// Expand native references into `#channel`, `@name` and `:emoji:`.
    ///
    /// References to ids missing from the roster are left untouched.
    pub fn to_display(&self, guild: &GuildRoster, text: &str) -> String {
        self.native_pattern
            .replace_all(text, |caps: &Captures| -> String {
                let original = caps[0].to_string();
                let Ok(id) = caps[2].parse::<u64>() else {
                    return original;
                };

                let display = match &caps[1] {
                    "#" => guild.channel_name(id).map(|name| format!("#{}", name)),
                    "@" | "@!" => guild.member(id).and_then(|member| {
                        let name = member.display_name(self.use_nicknames);
                        if name.is_empty() {
                            warn!(
                                "Member {} ({:?}/{:?}) has an empty display name",
                                member.id, member.username, member.nickname
                            );
                            None
                        } else {
                            Some(format!("@{}", name))
                        }
                    }),
                    "@&" => guild.role(id).map(|role| format!("@{}", role.name)),
                    _ => guild.emoji(id).map(|emoji| format!(":{}:", emoji.name)),
                };

                display.unwrap_or(original)
            })
            .to_string()
    }

    /// Turn display names in rendered Discord markdown back into native
    /// references.
    ///
    /// A name only matches when followed by the end of the text, punctuation
    /// or whitespace, and the longest candidate wins, so `@Al` never
    /// matches inside `@Alice`.
    pub fn to_native(&self, guild: &GuildRoster, text: &str) -> String {
        let mut channels = ReplaceGroup::default();
        for (name, id) in &guild.channels {
            channels.add(escape_markdown(&format!("#{}", name)), format!("<#{}>", id));
        }

        let mut users = ReplaceGroup::default();
        for member in &guild.members {
            let name = member.display_name(self.use_nicknames);
            if name.is_empty() {
                warn!(
                    "Member {} ({:?}/{:?}) has an empty display name",
                    member.id, member.username, member.nickname
                );
                continue;
            }
            users.add(escape_markdown(&format!("@{}", name)), format!("<@{}>", member.id));
        }

        let mut roles = ReplaceGroup::default();
        for role in &guild.roles {
            if role.name == EVERYONE_ROLE || role.id == guild.id || role.name.is_empty() {
                continue;
            }
            roles.add(escape_markdown(&format!("@{}", role.name)), format!("<@&{}>", role.id));
        }

        let mut emojis = ReplaceGroup::default();
        for emoji in &guild.emojis {
            let prefix = if emoji.animated { "a" } else { "" };
            emojis.add(
                escape_markdown(&format!(":{}:", emoji.name)),
                format!("<{}:{}:{}>", prefix, emoji.name, emoji.id),
            );
        }

        let mut found: Vec<Replacement> = [channels, users, roles, emojis]
            .into_iter()
            .flat_map(|group| group.find_all(text))
            .collect();
        found.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.end.cmp(&a.end)));

        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;
        for replacement in found {
            if replacement.start < cursor {
                continue;
            }
            output.push_str(&text[cursor..replacement.start]);
            output.push_str(&replacement.native);
            cursor = replacement.end;
        }
        output.push_str(&text[cursor..]);

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::roster::{Emoji, Member, Role};

    fn member(id: u64, username: &str, nickname: Option<&str>) -> Member {
        Member {
            id,
            username: username.to_string(),
            nickname: nickname.map(str::to_string),
        }
    }

    fn guild() -> GuildRoster {
        let mut guild = GuildRoster::new(10, "MyGuild");
        guild.channels.insert("general".to_string(), 100);
        guild.channels.insert("general-chat".to_string(), 101);
        guild.members.push(member(1, "al", Some("Al")));
        guild.members.push(member(2, "alice", Some("Alice")));
        guild.members.push(member(3, "some_user", None));
        guild.members.push(member(4, "", None));
        guild.members.push(member(5, "general", None));
        guild.roles.push(Role {
            id: 10,
            name: EVERYONE_ROLE.to_string(),
        });
        guild.roles.push(Role {
            id: 20,
            name: "Mods".to_string(),
        });
        guild.roles.push(Role {
            id: 21,
            name: "Ali".to_string(),
        });
        guild.emojis.push(Emoji {
            id: 7,
            name: "party_blob".to_string(),
            animated: true,
        });
        guild.emojis.push(Emoji {
            id: 8,
            name: "wave".to_string(),
            animated: false,
        });
        guild
    }

    #[test]
    fn test_to_display_expands_known_references() {
        let t = MentionTranslator::new(true);
        let g = guild();
        assert_eq!(
            t.to_display(&g, "<@2> <@!1> in <#100> ping <@&20> <:wave:8> <a:party_blob:7>"),
            "@Alice @Al in #general ping @Mods :wave: :party_blob:"
        );
    }

    #[test]
    fn test_to_display_respects_nickname_setting() {
        let t = MentionTranslator::new(false);
        assert_eq!(t.to_display(&guild(), "<@2>"), "@alice");
    }

    #[test]
    fn test_to_display_leaves_unknown_and_empty_names() {
        let t = MentionTranslator::new(true);
        let g = guild();
        assert_eq!(t.to_display(&g, "<@999> <#999> <@&999>"), "<@999> <#999> <@&999>");
        assert_eq!(t.to_display(&g, "<@4>"), "<@4>");
        assert_eq!(
            t.to_display(&g, "<@99999999999999999999999>"),
            "<@99999999999999999999999>"
        );
    }

    #[test]
    fn test_to_native_prefers_longest_name() {
        let t = MentionTranslator::new(true);
        let g = guild();
        assert_eq!(t.to_native(&g, "@Alice hi"), "<@2> hi");
        assert_eq!(t.to_native(&g, "@Al hi"), "<@1> hi");
        assert_eq!(t.to_native(&g, "@Alice, @Al."), "<@2>, <@1>.");
        assert_eq!(t.to_native(&g, "@Alicex"), "@Alicex");
    }

    #[test]
    fn test_to_native_across_kinds_longest_wins() {
        let t = MentionTranslator::new(true);
        let g = guild();
        // Role "Ali" is a prefix of user "Alice".
        assert_eq!(t.to_native(&g, "@Ali and @Alice"), "<@&21> and <@2>");
    }

    #[test]
    fn test_to_native_channels_and_emojis() {
        let t = MentionTranslator::new(true);
        let g = guild();
        assert_eq!(
            t.to_native(&g, "see #general-chat and #general :wave:"),
            "see <#101> and <#100> <:wave:8>"
        );
        assert_eq!(t.to_native(&g, r":party\_blob:"), "<a:party_blob:7>");
        assert_eq!(t.to_native(&g, "#generalx"), "#generalx");
    }

    #[test]
    fn test_to_native_matches_escaped_names() {
        let t = MentionTranslator::new(true);
        assert_eq!(t.to_native(&guild(), r"hey @some\_user!"), "hey <@3>!");
    }

    #[test]
    fn test_to_native_does_not_rewrite_its_own_output() {
        let t = MentionTranslator::new(true);
        assert_eq!(t.to_native(&guild(), "#general @general"), "<#100> <@5>");
    }

    #[test]
    fn test_to_native_never_produces_everyone() {
        let t = MentionTranslator::new(true);
        assert_eq!(t.to_native(&guild(), "@@everyone"), "@@everyone");
        assert!(!t.to_native(&guild(), "@everyone hi").contains("<@&10>"));
    }

    #[test]
    fn test_to_native_inside_emphasis() {
        let t = MentionTranslator::new(true);
        assert_eq!(t.to_native(&guild(), "**@Mods**"), "**<@&20>**");
    }
}
