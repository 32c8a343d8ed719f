//! Configuration loading
//!
//! Detection tuning and the duplicate-subscription keyword lists are data,
//! not code; both can be overridden from a TOML file. Absent or partial
//! config falls back to the built-in defaults.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::detect::DetectorConfig;
use crate::error::Result;
use crate::models::{Budget, DuplicateCategory};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LensConfig {
    pub detector: DetectorConfig,
    /// Extra duplicate-subscription categories, appended to the built-ins.
    pub duplicate_categories: Vec<DuplicateCategory>,
    /// Monthly category budgets used by the alert generator.
    pub budgets: Vec<Budget>,
}

impl LensConfig {
    /// Load configuration from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: LensConfig = toml::from_str(&text)?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }
}
