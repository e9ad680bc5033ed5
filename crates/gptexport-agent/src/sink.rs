//! Where finished exports are delivered.

use std::path::{Path, PathBuf};

use gptexport_core::Result;
use tracing::info;

/// Download target for encoded documents.
pub trait DownloadSink: Send + Sync {
    /// Store `bytes` under `filename`; returns where it ended up.
    fn save(&self, filename: &str, mime_type: &str, bytes: &[u8]) -> Result<String>;
}

/// Writes downloads into a directory, never overwriting an existing file.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn free_path(&self, filename: &str) -> PathBuf {
        let candidate = self.dir.join(filename);
        if !candidate.exists() {
            return candidate;
        }
        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{}", ext)),
            None => (filename, String::new()),
        };
        (1..)
            .map(|n| self.dir.join(format!("{} ({}){}", stem, n, ext)))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, mime_type: &str, bytes: &[u8]) -> Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.free_path(filename);
        std::fs::write(&path, bytes)?;
        info!("Saved {} ({}, {} bytes)", path.display(), mime_type, bytes.len());
        Ok(path.display().to_string())
    }
}
