//! Storage for text too long to relay line by line.

use std::path::PathBuf;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::common::error::PasteError;

/// Stores a blob of text and returns a URL it can be read back from.
pub trait PasteSink: Send + Sync {
    fn store(&self, content: &str) -> Result<String, PasteError>;
}

/// Writes each paste to `<dir>/<base64url(sha256)>.txt`, served under `url`.
///
/// Identical content always lands in the same file.
#[derive(Debug, Clone)]
pub struct FilePasteSink {
    dir: PathBuf,
    url: String,
}

impl FilePasteSink {
    pub fn new(dir: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            dir: dir.into(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    fn object_name(content: &str) -> String {
        let digest = Sha256::digest(content.as_bytes());
        format!("{}.txt", URL_SAFE.encode(digest))
    }
}

impl PasteSink for FilePasteSink {
    fn store(&self, content: &str) -> Result<String, PasteError> {
        let name = Self::object_name(content);
        let path = self.dir.join(&name);

        std::fs::write(&path, content).map_err(|e| PasteError::Write {
            path: path.display().to_string(),
            source: e,
        })?;
        debug!("Stored {} bytes at {}", content.len(), path.display());

        Ok(format!("{}/{}", self.url, name))
    }
}

/// Sink used when no paste directory is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPasteSink;

impl PasteSink for DisabledPasteSink {
    fn store(&self, _content: &str) -> Result<String, PasteError> {
        Err(PasteError::Disabled)
    }
}
