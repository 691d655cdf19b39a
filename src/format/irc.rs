//! IRC inline control-code codec.
//!
//! Understands bold, italic, underline, reset and mIRC color codes.
//! Reverse video, strikethrough and monospace toggles are dropped.

use std::iter::Peekable;
use std::str::Chars;

use super::{Format, FormattedString, PaletteColor, Span};

const BOLD: char = '\x02';
const COLOR: char = '\x03';
const RESET: char = '\x0f';
const ITALIC: char = '\x1d';
const UNDERLINE: char = '\x1f';

/// Emitted after a color code whose digits could otherwise swallow the text.
const NO_OP_PAIR: &str = "\x02\x02";

/// A single lexical unit of an IRC message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlToken {
    Toggle(Format),
    Reset,
    Color,
    /// Monospace (0x11), reverse (0x16) and strikethrough (0x1E).
    Unsupported,
    Text(char),
}

impl ControlToken {
    fn classify(c: char) -> Self {
        match c {
            BOLD => Self::Toggle(Format::BOLD),
            ITALIC => Self::Toggle(Format::ITALIC),
            UNDERLINE => Self::Toggle(Format::UNDERLINE),
            RESET => Self::Reset,
            COLOR => Self::Color,
            '\x11' | '\x16' | '\x1e' => Self::Unsupported,
            other => Self::Text(other),
        }
    }
}

/// Parse an IRC message into a [`FormattedString`].
pub fn parse(raw: &str) -> FormattedString {
    let mut spans = FormattedString::new();
    let mut current = Span::default();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match ControlToken::classify(c) {
            ControlToken::Text(ch) => current.text.push(ch),
            ControlToken::Toggle(flag) => {
                flush(&mut spans, &mut current);
                current.format ^= flag;
            }
            ControlToken::Reset => {
                flush(&mut spans, &mut current);
                current.format = Format::NONE;
                current.foreground = PaletteColor::Default;
                current.background = PaletteColor::Default;
            }
            ControlToken::Color => {
                flush(&mut spans, &mut current);
                apply_color_code(&mut chars, &mut current);
            }
            ControlToken::Unsupported => {}
        }
    }

    spans.push(current);
    spans
}

/// Move the accumulated text into `spans`, keeping the current style.
fn flush(spans: &mut FormattedString, current: &mut Span) {
    let text = std::mem::take(&mut current.text);
    spans.push(Span {
        text,
        ..current.clone()
    });
}

/// Consume up to two ASCII digits.
fn take_digits(chars: &mut Peekable<Chars<'_>>) -> Option<u8> {
    let mut value: Option<u8> = None;
    for _ in 0..2 {
        match chars.peek().and_then(|c| c.to_digit(10)) {
            Some(digit) => {
                chars.next();
                value = Some(value.unwrap_or(0) * 10 + digit as u8);
            }
            None => break,
        }
    }
    value
}

/// Consume the `fg[,bg]` part following a color introducer.
fn apply_color_code(chars: &mut Peekable<Chars<'_>>, span: &mut Span) {
    let foreground = take_digits(chars);
    let comma = chars.peek() == Some(&',');

    if comma {
        chars.next();
        let background = take_digits(chars);
        if let Some(code) = foreground {
            span.foreground = PaletteColor::from_irc_code(code);
        }
        span.background = background
            .map(PaletteColor::from_irc_code)
            .unwrap_or(PaletteColor::Default);
    } else {
        if foreground.is_none() {
            span.background = PaletteColor::Default;
        }
        span.foreground = foreground
            .map(PaletteColor::from_irc_code)
            .unwrap_or(PaletteColor::Default);
    }
}

/// Shape of the last color code written, used to decide whether the next
/// character could be misread as part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeTail {
    /// Bare `\x03`: a digit or a comma would extend it.
    Bare,
    /// `\x03NN`: a comma would extend it.
    Foreground,
    /// `\x03NN,` or `\x03,`: a digit would extend it.
    Comma,
    /// `\x03NN,NN` or `\x03,NN`: nothing can extend it.
    Closed,
}

impl CodeTail {
    fn extended_by(self, next: Option<char>) -> bool {
        let Some(c) = next else {
            return false;
        };
        match self {
            Self::Bare => c.is_ascii_digit() || c == ',',
            Self::Foreground => c == ',',
            Self::Comma => c.is_ascii_digit(),
            Self::Closed => false,
        }
    }
}

fn color_specifier(color: PaletteColor) -> String {
    color
        .irc_code()
        .map(|code| format!("{:02}", code))
        .unwrap_or_default()
}

/// Render a [`FormattedString`] as an IRC message using minimal control codes.
pub fn render(fs: &FormattedString) -> String {
    let mut output = String::new();
    let mut last = Span::default();

    for span in fs.spans() {
        if span.is_zero_format() && !last.is_zero_format() {
            output.push(RESET);
            output.push_str(&span.text);
            last = span.clone();
            continue;
        }

        let changes = span.format ^ last.format;
        for (flag, code) in [
            (Format::BOLD, BOLD),
            (Format::ITALIC, ITALIC),
            (Format::UNDERLINE, UNDERLINE),
        ] {
            if changes.contains(flag) {
                output.push(code);
            }
        }

        let fg_changed = span.foreground != last.foreground;
        let bg_changed = span.background != last.background;
        let tail = if span.is_zero_color() && !last.is_zero_color() {
            output.push(COLOR);
            Some(CodeTail::Bare)
        } else if fg_changed && span.foreground == PaletteColor::Default {
            // A bare introducer is the only way to drop the foreground.
            output.push(COLOR);
            output.push(COLOR);
            output.push(',');
            output.push_str(&color_specifier(span.background));
            Some(CodeTail::Closed)
        } else if fg_changed && bg_changed {
            output.push(COLOR);
            output.push_str(&color_specifier(span.foreground));
            output.push(',');
            let bg = color_specifier(span.background);
            output.push_str(&bg);
            Some(if bg.is_empty() { CodeTail::Comma } else { CodeTail::Closed })
        } else if fg_changed {
            output.push(COLOR);
            output.push_str(&color_specifier(span.foreground));
            Some(CodeTail::Foreground)
        } else if bg_changed {
            output.push(COLOR);
            output.push(',');
            let bg = color_specifier(span.background);
            output.push_str(&bg);
            Some(if bg.is_empty() { CodeTail::Comma } else { CodeTail::Closed })
        } else {
            None
        };

        if let Some(tail) = tail {
            if tail.extended_by(span.text.chars().next()) {
                output.push_str(NO_OP_PAIR);
            }
        }

        output.push_str(&span.text);
        last = span.clone();
    }

    output
}
