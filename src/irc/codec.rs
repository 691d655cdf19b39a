//! Line framing for the IRC connection.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};

use crate::common::error::IrcError;

/// Longest inbound line accepted, tags included.
pub const MAX_LINE_LENGTH: usize = 8192;

/// Codec for `\r\n`-terminated IRC lines.
///
/// Inbound lines are decoded lossily as UTF-8 since servers relay whatever
/// bytes clients send. Bare `\n` terminators are accepted and blank lines
/// skipped.
#[derive(Debug, Clone)]
pub struct IrcLineCodec {
    max_length: usize,
}

impl IrcLineCodec {
    pub fn new() -> Self {
        Self {
            max_length: MAX_LINE_LENGTH,
        }
    }

    #[cfg(test)]
    pub fn with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Default for IrcLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn to_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

impl Decoder for IrcLineCodec {
    type Item = String;
    type Error = IrcError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(pos) = src.iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_length {
                    return Err(IrcError::LineTooLong { len: src.len() });
                }
                return Ok(None);
            };
            if pos > self.max_length {
                return Err(IrcError::LineTooLong { len: pos });
            }

            let raw = src.split_to(pos + 1);
            let line = to_line(&raw[..pos]);
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        // Unterminated trailing line.
        if src.is_empty() {
            return Ok(None);
        }
        let raw = src.split();
        let line = to_line(&raw);
        Ok((!line.is_empty()).then_some(line))
    }
}

impl Encoder<String> for IrcLineCodec {
    type Error = IrcError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 2);
        dst.put_slice(item.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// A framed IRC connection.
pub type IrcConnection<S> = Framed<S, IrcLineCodec>;

/// Create a new IRC connection from a stream.
pub fn new_irc_connection<S: AsyncRead + AsyncWrite>(stream: S) -> IrcConnection<S> {
    Framed::new(stream, IrcLineCodec::new())
}
