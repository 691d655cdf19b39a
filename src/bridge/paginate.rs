//! Splitting long Discord messages into IRC-sized lines.
//!
//! IRC servers truncate long lines and flood-kick on many of them, so a
//! message is wrapped and, past a line limit, clipped with a link to the
//! full text.

use std::sync::Arc;

use crate::bridge::paste::PasteSink;
use crate::common::error::PasteError;

/// Lines shorter than this many bytes are relayed as-is.
pub const LINE_THRESHOLD: usize = 300;

/// One line of paginated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLine {
    Content(String),
    /// Stands in for everything that was clipped.
    Overflow { url: String },
}

/// Wraps lines on spaces and clips messages longer than `max_lines`.
#[derive(Clone)]
pub struct MessagePaginator {
    max_lines: usize,
    sink: Arc<dyn PasteSink>,
}

impl std::fmt::Debug for MessagePaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePaginator")
            .field("max_lines", &self.max_lines)
            .finish_non_exhaustive()
    }
}

impl MessagePaginator {
    pub fn new(max_lines: usize, sink: Arc<dyn PasteSink>) -> Self {
        Self { max_lines, sink }
    }

    /// Paginate `text`. The paste sink is only called when clipping.
    pub fn paginate(&self, text: &str) -> Result<Vec<PageLine>, PasteError> {
        let (lines, forced) = wrap_lines(text);

        if lines.len() <= self.max_lines && !forced {
            return Ok(lines.into_iter().map(PageLine::Content).collect());
        }

        let url = self.sink.store(text)?;
        let keep = self.max_lines.saturating_sub(1).min(lines.len());

        let mut out: Vec<PageLine> = lines
            .into_iter()
            .take(keep)
            .map(PageLine::Content)
            .collect();
        out.push(PageLine::Overflow { url });
        Ok(out)
    }
}

/// Split on newlines and greedily word-wrap long lines.
///
/// The flag is set when a single word is longer than [`LINE_THRESHOLD`] and
/// could not be wrapped.
fn wrap_lines(text: &str) -> (Vec<String>, bool) {
    let mut out = Vec::new();
    let mut forced = false;

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.len() < LINE_THRESHOLD {
            out.push(line.to_string());
            continue;
        }

        let mut words = line.split(' ').peekable();
        while let Some(first) = words.next() {
            let mut wrapped = first.to_string();
            while let Some(word) = words.next_if(|w| wrapped.len() + w.len() < LINE_THRESHOLD) {
                wrapped.push(' ');
                wrapped.push_str(word);
            }
            forced |= wrapped.len() > LINE_THRESHOLD;
            out.push(wrapped);
        }
    }

    (out, forced)
}
