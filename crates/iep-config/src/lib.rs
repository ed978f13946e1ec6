//! iep-config - unified configuration for the IEP document pipeline
//!
//! Layered the way the teacher layers it:
//! 1. Environment variables (highest priority)
//! 2. Config file path from `IEP_CONFIG`
//! 3. Config file contents from `IEP_CONFIG_CONTENT`
//! 4. Default config file locations (./config.toml, ./.iep.toml)
//! 5. Defaults (lowest priority)

use serde::{Deserialize, Serialize};

mod secrets;
mod sources;
mod validation;

pub use secrets::{NoopSecretSource, SecretResolver, SecretSource, SecretValue};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub providers: ProviderConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub pii: PiiConfig,
}

/// Metadata-store/blob-store wiring (§6 Configuration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub documents_table: String,
    pub user_profiles_table: String,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_endpoint: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents_table: "iep-documents".to_string(),
            user_profiles_table: "user-profiles".to_string(),
            bucket: "iep-documents-bucket".to_string(),
            s3_endpoint: None,
            region: default_region(),
        }
    }
}

/// Credentials for the external LLM and OCR providers. Either field may be
/// a literal value or a parameter-store reference (spec.md §9, "Secret
/// resolution"): references are recognized by the `ssm://` prefix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key_parameter_name: Option<String>,
    #[serde(default)]
    pub mistral_api_key: Option<String>,
    #[serde(default)]
    pub mistral_api_key_parameter_name: Option<String>,
    #[serde(default)]
    pub pii_entity_endpoint: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_ocr_base_url")]
    pub ocr_base_url: String,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ocr_base_url() -> String {
    "https://api.mistral.ai/v1".to_string()
}

/// The allow-listed PII entity types that survive redaction (§6, fixed).
pub const ALLOWED_PII_ENTITY_TYPES: &[&str] = &["NAME", "DATE_TIME"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiConfig {
    #[serde(default = "default_pii_concurrency")]
    pub max_concurrent_pages: usize,
}

fn default_pii_concurrency() -> usize {
    8
}

impl Default for PiiConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: default_pii_concurrency(),
        }
    }
}

/// Per-step timeout/retry knobs for the orchestrator (C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_extractor_turns")]
    pub extractor_max_tool_turns: u32,
    #[serde(default = "default_translator_turns")]
    pub translator_max_tool_turns: u32,
}

fn default_step_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    250
}

fn default_extractor_turns() -> u32 {
    150
}

fn default_translator_turns() -> u32 {
    10
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            extractor_max_tool_turns: default_extractor_turns(),
            translator_max_tool_turns: default_translator_turns(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority, as described in
    /// the module doc comment.
    pub fn load() -> anyhow::Result<Self> {
        sources::load_config()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_config(self)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            providers: ProviderConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            pii: PiiConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RuntimeConfig::default();
        assert_eq!(config.pii.max_concurrent_pages, 8);
        assert_eq!(config.orchestrator.max_retries, 3);
        assert_eq!(config.orchestrator.extractor_max_tool_turns, 150);
        assert_eq!(config.orchestrator.translator_max_tool_turns, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn allowed_pii_entity_types_fixed() {
        assert_eq!(ALLOWED_PII_ENTITY_TYPES, &["NAME", "DATE_TIME"]);
    }
}
