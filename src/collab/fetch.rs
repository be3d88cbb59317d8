// src/collab/fetch.rs

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::collab::{ByteFetcher, FetchError};
use crate::fs::FileSystem;

/// Largest body accepted from a source unless overridden.
pub const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Fetches `http(s)://` sources over the network and everything else
/// (`file://` URLs or plain paths) from a [`FileSystem`].
#[derive(Debug)]
pub struct SourceFetcher<F: FileSystem> {
    agent: ureq::Agent,
    fs: F,
    max_body: u64,
}

impl<F: FileSystem> SourceFetcher<F> {
    pub fn new(fs: F) -> Self {
        Self::with_timeout(fs, Duration::from_secs(30))
    }

    pub fn with_timeout(fs: F, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            fs,
            max_body: MAX_BODY_BYTES,
        }
    }

    /// Reject sources larger than `bytes`.
    pub fn with_max_body(mut self, bytes: u64) -> Self {
        self.max_body = bytes;
        self
    }

    fn fetch_http(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self.agent.get(url).call() {
            Ok(response) => {
                let body = read_capped(response.into_reader(), self.max_body)?;
                debug!(%url, bytes = body.len(), "fetched remote source");
                Ok(body)
            }
            Err(ureq::Error::Status(code, _)) if (500..600).contains(&code) => {
                Err(FetchError::Server(code))
            }
            Err(ureq::Error::Status(code, _)) => Err(FetchError::Rejected(code)),
            Err(ureq::Error::Transport(transport)) => {
                Err(FetchError::Transport(transport.to_string()))
            }
        }
    }

    fn fetch_local(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        if !self.fs.exists(path) {
            return Err(FetchError::Rejected(404));
        }
        let body = self
            .fs
            .read(path)
            .map_err(|e| FetchError::Transport(format!("{e:#}")))?;
        if body.len() as u64 > self.max_body {
            return Err(FetchError::TooLarge(self.max_body));
        }
        debug!(path = %path.display(), bytes = body.len(), "fetched local source");
        Ok(body)
    }
}

impl<F: FileSystem> ByteFetcher for SourceFetcher<F> {
    fn fetch(&self, source: &str) -> Result<Vec<u8>, FetchError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return self.fetch_http(source);
        }
        let path = source.strip_prefix("file://").unwrap_or(source);
        self.fetch_local(Path::new(path))
    }
}

/// Read all of `reader`, failing instead of truncating past `limit` bytes.
pub fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Err(FetchError::TooLarge(limit));
    }
    Ok(body)
}
