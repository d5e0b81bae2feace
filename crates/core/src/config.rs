//! Editor configuration.
//!
//! Configuration can be loaded from a JSON file, from environment variables,
//! or built programmatically.

use crate::codec::ImportPolicy;
use crate::history::DEFAULT_MAX_DEPTH;
use doc_model::PageSize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Settings shared by an editing session and its exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Fixed page geometry in points
    pub page_size: PageSize,
    /// Maximum snapshots kept per page on each of the undo and redo stacks
    pub history_depth: usize,
    /// Reject files whose checksums do not verify
    pub strict_import: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { page_size: PageSize::A4, history_depth: DEFAULT_MAX_DEPTH, strict_import: true }
    }
}

impl EditorConfig {
    pub fn with_page_size(mut self, width: f64, height: f64) -> Self {
        self.page_size = PageSize { width, height };
        self
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    pub fn with_strict_import(mut self, strict: bool) -> Self {
        self.strict_import = strict;
        self
    }

    pub fn import_policy(&self) -> ImportPolicy {
        if self.strict_import {
            ImportPolicy::Strict
        } else {
            ImportPolicy::AllowMismatch
        }
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `PAGESMITH_PAGE_WIDTH`: page width in points (default: 595)
    /// - `PAGESMITH_PAGE_HEIGHT`: page height in points (default: 842)
    /// - `PAGESMITH_HISTORY_DEPTH`: snapshots kept per page (default: 100)
    /// - `PAGESMITH_STRICT_IMPORT`: `true` or `false` (default: true)
    ///
    /// # Errors
    /// Returns an error if any variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PAGESMITH_PAGE_WIDTH") {
            config.page_size.width = parse_var("PAGESMITH_PAGE_WIDTH", &val)?;
        }

        if let Ok(val) = std::env::var("PAGESMITH_PAGE_HEIGHT") {
            config.page_size.height = parse_var("PAGESMITH_PAGE_HEIGHT", &val)?;
        }

        if let Ok(val) = std::env::var("PAGESMITH_HISTORY_DEPTH") {
            config.history_depth = parse_var("PAGESMITH_HISTORY_DEPTH", &val)?;
        }

        if let Ok(val) = std::env::var("PAGESMITH_STRICT_IMPORT") {
            config.strict_import = parse_var("PAGESMITH_STRICT_IMPORT", &val)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file. Missing keys keep their defaults.
    ///
    /// ```json
    /// { "page_size": { "width": 612, "height": 792 }, "history_depth": 50 }
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let PageSize { width, height } = self.page_size;
        if !(width.is_finite() && width > 0.0) {
            return Err(ConfigError::InvalidValue("page_size.width".to_owned()));
        }
        if !(height.is_finite() && height > 0.0) {
            return Err(ConfigError::InvalidValue("page_size.height".to_owned()));
        }
        if self.history_depth == 0 {
            return Err(ConfigError::InvalidValue("history_depth".to_owned()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue(key.to_owned()))
}

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
