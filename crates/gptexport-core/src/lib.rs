//! GPT Exporter Core — errors, configuration, local storage.

pub mod config;
pub mod error;
pub mod storage;

pub use config::{DataPaths, ExporterConfig};
pub use error::{Error, Result};
pub use storage::{JsonFileStorage, LocalStorage, MemoryStorage};
