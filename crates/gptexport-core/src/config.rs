//! Configuration and data directory management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Paths to all exporter data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Finished exports land here (`data/exports/`).
    pub exports: PathBuf,
    /// Extension local storage area (`data/storage.json`).
    pub storage_file: PathBuf,
    /// Exporter settings (`data/config.json`).
    pub config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            exports: root.join("exports"),
            storage_file: root.join("storage.json"),
            config_file: root.join("config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.exports)?;
        Ok(paths)
    }
}

/// Persisted exporter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterConfig {
    /// Upper bound on waiting for any cross-context reply.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
    /// Format preselected in the popup.
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_icon")]
    pub notification_icon: String,
    /// Context-menu exports include every message kind.
    #[serde(default = "default_true")]
    pub context_menu_full_export: bool,
    /// Path to config file (not serialized).
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_reply_timeout_ms() -> u64 {
    10_000
}
fn default_format() -> String {
    "pdf".into()
}
fn default_icon() -> String {
    "icon/48.png".into()
}
fn default_true() -> bool {
    true
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: default_reply_timeout_ms(),
            default_format: default_format(),
            notification_icon: default_icon(),
            context_menu_full_export: true,
            config_path: PathBuf::new(),
        }
    }
}

impl ExporterConfig {
    /// Load config from a JSON file, or return defaults. Env overrides win.
    pub fn load(config_path: &Path) -> Self {
        let mut config: ExporterConfig = match std::fs::read_to_string(config_path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", config_path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        config.config_path = config_path.to_path_buf();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Some(ms) = std::env::var("GPTEXPORT_REPLY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.reply_timeout_ms = ms;
        }
    }

    /// Save config to disk.
    pub fn save(&self) -> crate::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.config_path, json)?;
        Ok(())
    }

    pub fn reply_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reply_timeout_ms)
    }
}

/// Resolve the data directory from `GPTEXPORT_DATA_DIR`, falling back to `data`.
pub fn resolve_data_dir() -> PathBuf {
    std::env::var("GPTEXPORT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}
