//! Batch configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tally_domain::ScoringConfig;
use tally_extractor::ExtractorConfig;
use tally_gatekeeper::ValidationConfig;
use tally_llm::RetryPolicy;

/// Configuration bundle for one batch run
///
/// Carries the per-layer configs so a whole run is reproducible from one
/// TOML file. The retry policy is consumed when the model provider is
/// constructed; everything else is read by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory of source documents, one per named unit (e.g. a year)
    pub input_dir: PathBuf,

    /// Path of the transcript cache database
    pub cache_path: PathBuf,

    /// File extension of source documents
    pub document_extension: String,

    /// Bypass and overwrite cached transcriptions for this run
    pub force_refresh: bool,

    /// Confidence aggregation weights
    pub scoring: ScoringConfig,

    /// Plausibility-rule weights
    pub validation: ValidationConfig,

    /// Per-page extraction settings
    pub extractor: ExtractorConfig,

    /// Retry policy for the model provider
    pub retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/raw"),
            cache_path: PathBuf::from("data/interim/transcripts.db"),
            document_extension: "pdf".to_string(),
            force_refresh: false,
            scoring: ScoringConfig::default(),
            validation: ValidationConfig::default(),
            extractor: ExtractorConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl BatchConfig {
    /// Validate the configuration and every nested layer
    pub fn validate(&self) -> Result<(), String> {
        if self.document_extension.is_empty() {
            return Err("document_extension must not be empty".to_string());
        }
        self.scoring.validate()?;
        self.validation.validate()?;
        self.extractor.validate()?;
        self.retry.validate()?;
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
