// Configuration source loading
//
// Loads configuration from multiple sources with priority:
// 1. Environment variables (highest)
// 2. Config file from IEP_CONFIG path
// 3. Inline config from IEP_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.iep.toml)
// 5. Platform defaults (lowest)

use anyhow::{Context, Result};
use std::env;
use std::path::Path;

use crate::platform::Platform;
use crate::RuntimeConfig;

const ENV_PREFIX: &str = "IEP_";

/// Load configuration from all sources.
pub fn load_config() -> Result<RuntimeConfig> {
    let platform = Platform::detect();
    let mut config = platform_defaults(platform);

    if let Some(file_config) = load_from_file()? {
        merge_config(&mut config, file_config);
    }

    apply_env_overrides(&mut config)?;

    config.validate()?;
    Ok(config)
}

fn platform_defaults(platform: Platform) -> RuntimeConfig {
    let defaults = platform.defaults();
    let mut config = RuntimeConfig::default();
    config.storage.region = defaults.region.to_string();
    config.orchestrator.step_timeout_secs = defaults.step_timeout_secs;
    config
}

fn load_from_file() -> Result<Option<RuntimeConfig>> {
    if let Ok(path) = env::var(format!("{}CONFIG", ENV_PREFIX)) {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path))?;
        let config: RuntimeConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path))?;
        return Ok(Some(config));
    }

    if let Ok(content) = env::var(format!("{}CONFIG_CONTENT", ENV_PREFIX)) {
        let config: RuntimeConfig = toml::from_str(&content)
            .context("failed to parse inline config from IEP_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in &["./config.toml", "./.iep.toml"] {
        if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path))?;
            let config: RuntimeConfig = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file: {}", path))?;
            return Ok(Some(config));
        }
    }

    Ok(None)
}

fn merge_config(base: &mut RuntimeConfig, file: RuntimeConfig) {
    base.storage = file.storage;
    base.providers = file.providers;
    base.orchestrator = file.orchestrator;
    base.pii = file.pii;
}

fn apply_env_overrides(config: &mut RuntimeConfig) -> Result<()> {
    if let Some(val) = get_env_string("DOCUMENTS_TABLE")? {
        config.storage.documents_table = val;
    }
    if let Some(val) = get_env_string("USER_PROFILES_TABLE")? {
        config.storage.user_profiles_table = val;
    }
    if let Some(val) = get_env_string("BUCKET")? {
        config.storage.bucket = val;
    }
    if let Some(val) = get_env_string("S3_ENDPOINT")? {
        config.storage.s3_endpoint = Some(val);
    }
    if let Some(val) = get_env_string("REGION")? {
        config.storage.region = val;
    }

    if let Some(val) = get_env_string("OPENAI_API_KEY")? {
        config.providers.openai_api_key = Some(val);
    }
    if let Some(val) = get_env_string("OPENAI_API_KEY_PARAMETER_NAME")? {
        config.providers.openai_api_key_parameter_name = Some(val);
    }
    if let Some(val) = get_env_string("MISTRAL_API_KEY")? {
        config.providers.mistral_api_key = Some(val);
    }
    if let Some(val) = get_env_string("MISTRAL_API_KEY_PARAMETER_NAME")? {
        config.providers.mistral_api_key_parameter_name = Some(val);
    }
    if let Some(val) = get_env_string("PII_ENTITY_ENDPOINT")? {
        config.providers.pii_entity_endpoint = Some(val);
    }
    if let Some(val) = get_env_string("LLM_BASE_URL")? {
        config.providers.llm_base_url = val;
    }
    if let Some(val) = get_env_string("OCR_BASE_URL")? {
        config.providers.ocr_base_url = val;
    }

    if let Some(val) = get_env_u64("STEP_TIMEOUT_SECS")? {
        config.orchestrator.step_timeout_secs = val;
    }
    if let Some(val) = get_env_u32("MAX_RETRIES")? {
        config.orchestrator.max_retries = val;
    }
    if let Some(val) = get_env_u64("BACKOFF_BASE_MS")? {
        config.orchestrator.backoff_base_ms = val;
    }
    if let Some(val) = get_env_u32("EXTRACTOR_MAX_TOOL_TURNS")? {
        config.orchestrator.extractor_max_tool_turns = val;
    }
    if let Some(val) = get_env_u32("TRANSLATOR_MAX_TOOL_TURNS")? {
        config.orchestrator.translator_max_tool_turns = val;
    }

    if let Some(val) = get_env_usize("PII_MAX_CONCURRENT_PAGES")? {
        config.pii.max_concurrent_pages = val;
    }

    Ok(())
}

fn get_env_string(key: &str) -> Result<Option<String>> {
    let full_key = format!("{}{}", ENV_PREFIX, key);
    match env::var(&full_key) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read env var {}", full_key)),
    }
}

fn get_env_usize(key: &str) -> Result<Option<usize>> {
    let full_key = format!("{}{}", ENV_PREFIX, key);
    match get_env_string(key)? {
        Some(val) => Ok(Some(
            val.parse::<usize>()
                .with_context(|| format!("{} must be a valid number", full_key))?,
        )),
        None => Ok(None),
    }
}

fn get_env_u32(key: &str) -> Result<Option<u32>> {
    let full_key = format!("{}{}", ENV_PREFIX, key);
    match get_env_string(key)? {
        Some(val) => Ok(Some(
            val.parse::<u32>()
                .with_context(|| format!("{} must be a valid number", full_key))?,
        )),
        None => Ok(None),
    }
}

fn get_env_u64(key: &str) -> Result<Option<u64>> {
    let full_key = format!("{}{}", ENV_PREFIX, key);
    match get_env_string(key)? {
        Some(val) => Ok(Some(
            val.parse::<u64>()
                .with_context(|| format!("{} must be a valid number", full_key))?,
        )),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_defaults_apply() {
        let config = platform_defaults(Platform::Lambda);
        assert_eq!(config.orchestrator.step_timeout_secs, 120);
        assert_eq!(config.storage.region, "us-east-1");
    }

    #[test]
    fn file_config_overrides_defaults_without_clobbering_other_sections() {
        let mut base = RuntimeConfig::default();
        let mut file = RuntimeConfig::default();
        file.storage.bucket = "custom-bucket".to_string();
        merge_config(&mut base, file);
        assert_eq!(base.storage.bucket, "custom-bucket");
    }
}
