// src/collab/store.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::collab::ArtifactStore;
use crate::fs::FileSystem;

const SCHEME: &str = "file://";

/// Content-addressed artifact store.
///
/// Artifacts are written to `<dir>/<blake3 hex>.bin` and identified by a
/// `file://` locator, so persisting the same bytes twice yields the same
/// locator.
#[derive(Debug, Clone)]
pub struct FileArtifactStore<F: FileSystem> {
    fs: F,
    dir: PathBuf,
}

impl<F: FileSystem> FileArtifactStore<F> {
    pub fn new(fs: F, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if dir.as_os_str().is_empty() {
            bail!("artifact directory must not be empty");
        }
        Ok(Self { fs, dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an artifact with these contents would be stored at.
    pub fn path_for(&self, bytes: &[u8]) -> PathBuf {
        let digest = blake3::hash(bytes);
        self.dir.join(format!("{}.bin", digest.to_hex()))
    }
}

pub fn locator_for(path: &Path) -> String {
    format!("{SCHEME}{}", path.display())
}

pub fn path_from_locator(locator: &str) -> Result<PathBuf> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        bail!("empty artifact locator");
    }
    let path = trimmed.strip_prefix(SCHEME).unwrap_or(trimmed);
    Ok(PathBuf::from(path))
}

impl<F: FileSystem> ArtifactStore for FileArtifactStore<F> {
    fn persist(&self, bytes: &[u8]) -> Result<String> {
        let path = self.path_for(bytes);
        if !self.fs.exists(&path) {
            self.fs
                .write(&path, bytes)
                .with_context(|| format!("persisting artifact to {}", path.display()))?;
        }
        debug!(path = %path.display(), bytes = bytes.len(), "artifact persisted");
        Ok(locator_for(&path))
    }

    fn load(&self, locator: &str) -> Result<Vec<u8>> {
        let path = path_from_locator(locator)?;
        self.fs
            .read(&path)
            .with_context(|| format!("loading artifact {locator}"))
    }
}
