// Configuration validation
//
// Validates that required fields are present and values are sensible.

use anyhow::{bail, Result};
use tracing::warn;

use crate::{OrchestratorConfig, PiiConfig, ProviderConfig, RuntimeConfig, StorageConfig};

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_storage_config(&config.storage)?;
    validate_provider_config(&config.providers)?;
    validate_orchestrator_config(&config.orchestrator)?;
    validate_pii_config(&config.pii)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    if config.documents_table.is_empty() {
        bail!("storage.documents_table must not be empty");
    }
    if config.user_profiles_table.is_empty() {
        bail!("storage.user_profiles_table must not be empty");
    }
    if config.bucket.is_empty() {
        bail!("storage.bucket must not be empty");
    }
    if config.region.is_empty() {
        bail!("storage.region must not be empty");
    }
    Ok(())
}

fn validate_provider_config(config: &ProviderConfig) -> Result<()> {
    if config.openai_api_key.is_some() && config.openai_api_key_parameter_name.is_some() {
        warn!("both providers.openai_api_key and openai_api_key_parameter_name set; the literal key wins");
    }
    if config.mistral_api_key.is_some() && config.mistral_api_key_parameter_name.is_some() {
        warn!("both providers.mistral_api_key and mistral_api_key_parameter_name set; the literal key wins");
    }
    if config.llm_base_url.is_empty() {
        bail!("providers.llm_base_url must not be empty");
    }
    if config.ocr_base_url.is_empty() {
        bail!("providers.ocr_base_url must not be empty");
    }
    Ok(())
}

fn validate_orchestrator_config(config: &OrchestratorConfig) -> Result<()> {
    if config.step_timeout_secs == 0 {
        bail!("orchestrator.step_timeout_secs must be greater than 0");
    }
    if config.max_retries > 3 {
        bail!("orchestrator.max_retries must not exceed 3 (transient-failure retry ceiling)");
    }
    if config.extractor_max_tool_turns == 0 {
        bail!("orchestrator.extractor_max_tool_turns must be greater than 0");
    }
    if config.translator_max_tool_turns == 0 {
        bail!("orchestrator.translator_max_tool_turns must be greater than 0");
    }
    if config.step_timeout_secs > 900 {
        warn!(
            step_timeout_secs = config.step_timeout_secs,
            "orchestrator.step_timeout_secs is very large; may exceed typical Lambda invocation budgets"
        );
    }
    Ok(())
}

fn validate_pii_config(config: &PiiConfig) -> Result<()> {
    if config.max_concurrent_pages == 0 {
        bail!("pii.max_concurrent_pages must be greater than 0");
    }
    if config.max_concurrent_pages > 32 {
        warn!(
            max_concurrent_pages = config.max_concurrent_pages,
            "pii.max_concurrent_pages is very large; may overwhelm the redaction endpoint"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_bucket() {
        let mut config = StorageConfig {
            documents_table: "t".to_string(),
            user_profiles_table: "u".to_string(),
            bucket: String::new(),
            s3_endpoint: None,
            region: "us-east-1".to_string(),
        };
        assert!(validate_storage_config(&config).is_err());
        config.bucket = "b".to_string();
        assert!(validate_storage_config(&config).is_ok());
    }

    #[test]
    fn rejects_retry_ceiling_violation() {
        let config = OrchestratorConfig {
            step_timeout_secs: 60,
            max_retries: 4,
            backoff_base_ms: 250,
            extractor_max_tool_turns: 150,
            translator_max_tool_turns: 10,
        };
        assert!(validate_orchestrator_config(&config).is_err());
    }
}
