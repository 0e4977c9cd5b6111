use crate::error::HydrationError;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

/// Upper bound on subject patterns the data plane accepts per label query.
pub const MAX_LABEL_PAGE_SIZE: usize = 250;

/// Default nesting limit for payload extraction.
pub const DEFAULT_MAX_EXTRACT_DEPTH: usize = 128;

pub const TAKEDOWN_LABELS: [&str; 2] = ["!takedown", "!suspend"];
pub const NEEDS_REVIEW_LABEL: &str = "needs-review";

/// Which label values carry moderation meaning when issued by a redacting labeler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelPolicy {
    pub takedown_values: Vec<String>,
    pub needs_review_value: String,
    /// Keep actionable needs-review labels out of the visible label set. They still mark the
    /// subject as needing review.
    pub withhold_needs_review: bool,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        LabelPolicy {
            takedown_values: TAKEDOWN_LABELS.iter().map(|v| v.to_string()).collect(),
            needs_review_value: NEEDS_REVIEW_LABEL.to_string(),
            withhold_needs_review: true,
        }
    }
}

impl LabelPolicy {
    pub fn is_takedown(&self, val: &str) -> bool {
        self.takedown_values.iter().any(|v| v == val)
    }

    pub fn is_needs_review(&self, val: &str) -> bool {
        self.needs_review_value == val
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationConfig {
    /// Page size requested from the label query. Clamped to [MAX_LABEL_PAGE_SIZE].
    pub label_page_size: usize,
    /// Payload nesting beyond this depth is not walked by the extractor.
    pub max_extract_depth: usize,
    pub labels: LabelPolicy,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        HydrationConfig {
            label_page_size: MAX_LABEL_PAGE_SIZE,
            max_extract_depth: DEFAULT_MAX_EXTRACT_DEPTH,
            labels: LabelPolicy::default(),
        }
    }
}

impl HydrationConfig {
    pub fn label_limit(&self) -> usize {
        self.label_page_size.clamp(1, MAX_LABEL_PAGE_SIZE)
    }
}

pub trait HydrationConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<HydrationConfig, HydrationError>;
    fn set_config(&self, config: &HydrationConfig) -> Result<(), HydrationError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HydrationConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<HydrationConfig, HydrationError> {
        tracing::debug!("Attempting to read hydration config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(HydrationConfig::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn set_config(&self, config: &HydrationConfig) -> Result<(), HydrationError> {
        tracing::debug!("Attempting to write hydration config to: {:?}", &self.path);
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("skyweave.toml"));
        assert_eq!(provider.get_config().unwrap(), HydrationConfig::default());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("skyweave.toml"));
        let mut config = HydrationConfig::default();
        config.labels.withhold_needs_review = false;
        config.max_extract_depth = 16;
        provider.set_config(&config).unwrap();
        assert_eq!(provider.get_config().unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("skyweave.toml");
        std::fs::write(&path, "label_page_size = 1000\n[labels]\ntakedown_values = [\"!hide\"]\n")
            .unwrap();
        let config = TomlConfigProvider::new(path).get_config().unwrap();
        assert_eq!(config.label_limit(), MAX_LABEL_PAGE_SIZE);
        assert_eq!(config.max_extract_depth, DEFAULT_MAX_EXTRACT_DEPTH);
        assert!(config.labels.is_takedown("!hide"));
        assert!(!config.labels.is_takedown("!takedown"));
        assert!(config.labels.is_needs_review(NEEDS_REVIEW_LABEL));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("skyweave.toml");
        std::fs::write(&path, "label_page_size = \"lots\"").unwrap();
        let err = TomlConfigProvider::new(path).get_config().unwrap_err();
        assert!(matches!(err, HydrationError::Config(_)));
    }
}
