//! Discord markdown codec.
//!
//! Incoming Discord markdown is kept as-is: the Discord client already
//! rendered it for its own users, and IRC has no equivalent for most of it.
//! Outgoing text is escaped so IRC users cannot accidentally trigger
//! markdown, then emphasis is re-applied from the span flags.

use super::{Format, FormattedString, Span};

/// Inserted between a formatted span and a directly following span so the
/// closing and opening markers are not read as one token.
const ZERO_WIDTH_SEPARATOR: char = '\u{FEFF}';

/// Parse a Discord message. The markdown is not interpreted.
pub fn parse(raw: &str) -> FormattedString {
    let mut fs = FormattedString::new();
    fs.push(Span::plain(raw));
    fs
}

/// Escape markdown specials in one non-code chunk, leaving links alone.
fn escape_chunk(chunk: &str, out: &mut String) {
    for word in chunk.split_inclusive(' ') {
        if word.starts_with("http://") || word.starts_with("https://") {
            out.push_str(word);
            continue;
        }
        for c in word.chars() {
            if matches!(c, '\\' | '*' | '_') {
                out.push('\\');
            }
            out.push(c);
        }
    }
}

/// Escape a span's text, skipping everything inside backtick code spans.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut in_code = false;
    let mut rest = text;

    while !rest.is_empty() {
        // Each chunk runs up to and including the next run of backticks.
        let end = match rest.find('`') {
            Some(start) => {
                let run = rest[start..].chars().take_while(|&c| c == '`').count();
                start + run
            }
            None => rest.len(),
        };
        let (chunk, tail) = rest.split_at(end);

        if in_code {
            out.push_str(chunk);
        } else {
            escape_chunk(chunk, &mut out);
        }
        in_code = !in_code;
        rest = tail;
    }

    out
}

/// Markdown escape used for text compared against rendered output.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render a [`FormattedString`] as Discord markdown.
pub fn render(fs: &FormattedString) -> String {
    let mut output = String::new();
    let spans = fs.spans();

    for (i, span) in spans.iter().enumerate() {
        let escaped = escape_text(&span.text);

        let core = escaped.trim();
        if core.is_empty() {
            output.push_str(&escaped);
            continue;
        }
        let start = escaped.len() - escaped.trim_start().len();
        let leading = &escaped[..start];
        let trailing = &escaped[start + core.len()..];

        let mut text = core.to_string();
        if span.format.contains(Format::ITALIC) {
            text = format!("*{}*", text);
        }
        if span.format.contains(Format::BOLD) {
            text = format!("**{}**", text);
        }
        if span.format.contains(Format::UNDERLINE) {
            text = format!("__{}__", text);
        }

        output.push_str(leading);
        output.push_str(&text);

        let abuts_next = trailing.is_empty()
            && spans
                .get(i + 1)
                .and_then(|next| next.text.chars().next())
                .is_some_and(|c| !c.is_whitespace());
        if !span.format.is_empty() && abuts_next {
            output.push(ZERO_WIDTH_SEPARATOR);
        }

        output.push_str(trailing);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(text: &str, format: Format) -> Span {
        Span::styled(text, format)
    }

    #[test]
    fn test_parse_is_single_plain_span() {
        let fs = parse("**already** markdown");
        assert_eq!(fs.spans().len(), 1);
        assert_eq!(fs.spans()[0], Span::plain("**already** markdown"));
        assert!(parse("").spans().is_empty());
    }

    #[test]
    fn test_render_escapes_specials() {
        let fs = FormattedString(vec![Span::plain(r"a*b_c\d")]);
        assert_eq!(render(&fs), r"a\*b\_c\\d");
    }

    #[test]
    fn test_render_leaves_code_spans_alone() {
        let fs = FormattedString(vec![Span::plain("x_y `a_b` z_w ``c*d``")]);
        assert_eq!(render(&fs), r"x\_y `a_b` z\_w ``c*d``");
    }

    #[test]
    fn test_render_leaves_links_alone() {
        let fs = FormattedString(vec![Span::plain("see https://ex.com/a_b_c and not_this")]);
        assert_eq!(render(&fs), r"see https://ex.com/a_b_c and not\_this");
    }

    #[test]
    fn test_render_emphasis_nesting_order() {
        let all = Format::BOLD | Format::ITALIC | Format::UNDERLINE;
        let fs = FormattedString(vec![styled("t", all)]);
        assert_eq!(render(&fs), "__***t***__");
    }

    #[test]
    fn test_render_emphasis_wraps_trimmed_core() {
        let fs = FormattedString(vec![styled("  hi  ", Format::BOLD)]);
        assert_eq!(render(&fs), "  **hi**  ");
    }

    #[test]
    fn test_render_separates_abutting_spans() {
        let fs = FormattedString(vec![
            styled("foo", Format::ITALIC),
            styled("bar", Format::BOLD),
        ]);
        assert_eq!(render(&fs), "*foo*\u{FEFF}**bar**");

        let spaced = FormattedString(vec![
            styled("foo", Format::ITALIC),
            Span::plain(" bar"),
        ]);
        assert_eq!(render(&spaced), "*foo* bar");

        let last = FormattedString(vec![styled("end", Format::BOLD)]);
        assert_eq!(render(&last), "**end**");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("@some_user*"), r"@some\_user\*");
    }
}
