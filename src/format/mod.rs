//! Platform-neutral rich text.
//!
//! Messages are parsed from their native markup into a [`FormattedString`]
//! (a list of [`Span`]s) and rendered back out for the other side.
//!
//! ## Module Structure
//!
//! - `irc`: IRC control-code codec
//! - `discord`: Discord markdown codec
//! - `color`: 24-bit color to IRC palette quantization

pub mod color;
pub mod discord;
pub mod irc;

use std::ops::{BitAnd, BitOr, BitOrAssign, BitXor, BitXorAssign};

/// Set of text emphasis flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Format(u8);

impl Format {
    pub const NONE: Format = Format(0);
    pub const BOLD: Format = Format(1 << 0);
    pub const ITALIC: Format = Format(1 << 1);
    pub const UNDERLINE: Format = Format(1 << 2);

    /// Returns true if every flag in `other` is set.
    pub fn contains(self, other: Format) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Format {
    type Output = Format;

    fn bitor(self, rhs: Format) -> Format {
        Format(self.0 | rhs.0)
    }
}

impl BitOrAssign for Format {
    fn bitor_assign(&mut self, rhs: Format) {
        self.0 |= rhs.0;
    }
}

impl BitXor for Format {
    type Output = Format;

    fn bitxor(self, rhs: Format) -> Format {
        Format(self.0 ^ rhs.0)
    }
}

impl BitXorAssign for Format {
    fn bitxor_assign(&mut self, rhs: Format) {
        self.0 ^= rhs.0;
    }
}

impl BitAnd for Format {
    type Output = Format;

    fn bitand(self, rhs: Format) -> Format {
        Format(self.0 & rhs.0)
    }
}

/// IRC palette color.
///
/// Discriminants are one more than the IRC color index so that the zero
/// value is `Default` (inherit whatever the client shows by default).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PaletteColor {
    #[default]
    Default = 0,
    White = 1,
    Black = 2,
    Blue = 3,
    Green = 4,
    BrightRed = 5,
    Red = 6,
    Magenta = 7,
    DarkYellow = 8,
    Yellow = 9,
    BrightGreen = 10,
    Cyan = 11,
    BrightCyan = 12,
    BrightBlue = 13,
    BrightMagenta = 14,
    Grey = 15,
    LightGrey = 16,
}

impl PaletteColor {
    /// Look up a color by its IRC index (0-15).
    ///
    /// Indices outside the 16-color palette (e.g. 99, "transparent") map to `Default`.
    pub fn from_irc_code(code: u8) -> Self {
        match code {
            0 => Self::White,
            1 => Self::Black,
            2 => Self::Blue,
            3 => Self::Green,
            4 => Self::BrightRed,
            5 => Self::Red,
            6 => Self::Magenta,
            7 => Self::DarkYellow,
            8 => Self::Yellow,
            9 => Self::BrightGreen,
            10 => Self::Cyan,
            11 => Self::BrightCyan,
            12 => Self::BrightBlue,
            13 => Self::BrightMagenta,
            14 => Self::Grey,
            15 => Self::LightGrey,
            _ => Self::Default,
        }
    }

    /// IRC index of this color, `None` for `Default`.
    pub fn irc_code(self) -> Option<u8> {
        match self {
            Self::Default => None,
            other => Some(other as u8 - 1),
        }
    }

    /// Nominal 24-bit RGB value, `None` for `Default`.
    pub fn rgb(self) -> Option<u32> {
        let rgb = match self {
            Self::Default => return None,
            Self::White => 0xFFFFFF,
            Self::Black => 0x000000,
            Self::Blue => 0x0000AA,
            Self::Green => 0x00AA00,
            Self::BrightRed => 0xFF5555,
            Self::Red => 0xAA0000,
            Self::Magenta => 0xAA00AA,
            Self::DarkYellow => 0xAA5500,
            Self::Yellow => 0xFFFF55,
            Self::BrightGreen => 0x55FF55,
            Self::Cyan => 0x00AAAA,
            Self::BrightCyan => 0x55FFFF,
            Self::BrightBlue => 0x5555FF,
            Self::BrightMagenta => 0xFF55FF,
            Self::Grey => 0x555555,
            Self::LightGrey => 0xAAAAAA,
        };
        Some(rgb)
    }
}

/// A run of text sharing one formatting and color state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub format: Format,
    pub foreground: PaletteColor,
    pub background: PaletteColor,
}

impl Span {
    /// Unformatted, uncolored span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn styled(text: impl Into<String>, format: Format) -> Self {
        Self {
            text: text.into(),
            format,
            ..Self::default()
        }
    }

    pub fn colored(text: impl Into<String>, foreground: PaletteColor, background: PaletteColor) -> Self {
        Self {
            text: text.into(),
            format: Format::NONE,
            foreground,
            background,
        }
    }

    /// Returns whether the span has neither emphasis nor color.
    pub fn is_zero_format(&self) -> bool {
        self.format.is_empty() && self.is_zero_color()
    }

    /// Returns whether both colors are `Default`.
    pub fn is_zero_color(&self) -> bool {
        self.foreground == PaletteColor::Default && self.background == PaletteColor::Default
    }

    /// Returns whether `other` would render identically apart from its text.
    pub fn same_style(&self, other: &Span) -> bool {
        self.format == other.format
            && self.foreground == other.foreground
            && self.background == other.background
    }
}

/// A message made of [`Span`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedString(pub Vec<Span>);

impl FormattedString {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn spans(&self) -> &[Span] {
        &self.0
    }

    /// Concatenated text of every span.
    pub fn plain_text(&self) -> String {
        self.0.iter().map(|span| span.text.as_str()).collect()
    }

    /// Set `format` on every span.
    pub fn emphasize(mut self, format: Format) -> Self {
        for span in &mut self.0 {
            span.format |= format;
        }
        self
    }

    /// Append a span, merging it into the last one when styles match.
    ///
    /// Empty spans are discarded.
    pub fn push(&mut self, span: Span) {
        if span.text.is_empty() {
            return;
        }
        match self.0.last_mut() {
            Some(last) if last.same_style(&span) => last.text.push_str(&span.text),
            _ => self.0.push(span),
        }
    }
}

impl From<Vec<Span>> for FormattedString {
    fn from(spans: Vec<Span>) -> Self {
        Self(spans)
    }
}
