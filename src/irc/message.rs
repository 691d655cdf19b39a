//! IRC protocol line parsing.

/// One parsed protocol line. IRCv3 message tags are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcLine {
    /// Source, without the leading `:`.
    pub prefix: Option<String>,
    pub command: String,
    /// Middle parameters followed by the trailing one, if any.
    pub params: Vec<String>,
}

impl IrcLine {
    /// Parse a line without its terminator. Returns `None` when there is
    /// no command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line;

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map(|(_, r)| r).unwrap_or("");
        }
        rest = rest.trim_start_matches(' ');

        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (source, r) = stripped.split_once(' ').unwrap_or((stripped, ""));
            prefix = Some(source.to_string());
            rest = r.trim_start_matches(' ');
        }

        let (command, r) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }
        rest = r;

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            let (param, r) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = r;
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nick part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        let nick = prefix.split(['!', '@']).next().unwrap_or(prefix);
        (!nick.is_empty()).then_some(nick)
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

/// Body of a CTCP message (`\x01VERB args\x01`), split into verb and args.
pub fn ctcp(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_prefix('\x01')?;
    let inner = inner.strip_suffix('\x01').unwrap_or(inner);
    Some(inner.split_once(' ').unwrap_or((inner, "")))
}

pub fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg() {
        let line = IrcLine::parse(":bob!~b@host PRIVMSG #General :hello there").unwrap();
        assert_eq!(line.prefix.as_deref(), Some("bob!~b@host"));
        assert_eq!(line.nick(), Some("bob"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#General", "hello there"]);
    }

    #[test]
    fn test_parse_without_prefix_or_trailing() {
        let line = IrcLine::parse("ping  token").unwrap();
        assert_eq!(line.prefix, None);
        assert_eq!(line.command, "PING");
        assert_eq!(line.params, vec!["token"]);
    }

    #[test]
    fn test_parse_numeric_and_tags() {
        let line =
            IrcLine::parse("@time=2024-01-01T00:00:00Z :irc.example.net 001 bridge :Welcome")
                .unwrap();
        assert_eq!(line.nick(), Some("irc.example.net"));
        assert_eq!(line.command, "001");
        assert_eq!(line.param(0), Some("bridge"));
        assert_eq!(line.param(1), Some("Welcome"));
        assert_eq!(line.param(2), None);
    }

    #[test]
    fn test_parse_empty_trailing() {
        let line = IrcLine::parse(":a PRIVMSG #c :").unwrap();
        assert_eq!(line.params, vec!["#c", ""]);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(IrcLine::parse(""), None);
        assert_eq!(IrcLine::parse(":prefix.only"), None);
    }

    #[test]
    fn test_ctcp() {
        assert_eq!(ctcp("\x01ACTION waves\x01"), Some(("ACTION", "waves")));
        assert_eq!(ctcp("\x01ACTION waves"), Some(("ACTION", "waves")));
        assert_eq!(ctcp("\x01VERSION\x01"), Some(("VERSION", "")));
        assert_eq!(ctcp("plain"), None);
    }

    #[test]
    fn test_is_channel() {
        assert!(is_channel("#rust"));
        assert!(is_channel("&local"));
        assert!(!is_channel("bridge"));
    }
}
