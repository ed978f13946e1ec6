//! iep - turns a scanned IEP PDF into a structured, multilingual,
//! parent-friendly document record.
//!
//! This crate is the CLI front door: it wires the same adapters the
//! Lambda entrypoint wires (see `iep_lambda::build_step_context`) for
//! direct invocation, plus a local filesystem/in-memory stack for
//! `serve-ingress`'s offline smoke test.

use std::path::Path;
use std::sync::Arc;

use iep_config::RuntimeConfig;
use iep_orchestrator::StepContext;
use iep_persistence::PersistenceService;
use iep_providers::{HttpOcrProvider, HttpPiiRedactor};
use iep_storage::{BlobStore, InMemoryMetadataStore, OpenDalBlobStore};

pub fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Builds a `StepContext` backed by a local filesystem blob store and an
/// in-memory metadata store, for `serve-ingress`'s offline smoke test and
/// for local development — the providers (OCR/PII/LLM) are still the real
/// HTTP adapters, since there is nothing to fake locally about an external
/// API call.
pub async fn build_local_step_context(config: &RuntimeConfig, local_dir: &Path) -> anyhow::Result<StepContext> {
    std::fs::create_dir_all(local_dir)?;
    let content_blob = Arc::new(OpenDalBlobStore::new_fs(&local_dir.join("content").to_string_lossy())?);
    let source_blob: Arc<dyn BlobStore> = Arc::new(OpenDalBlobStore::new_fs(&local_dir.join("uploads").to_string_lossy())?);

    let metadata = Arc::new(InMemoryMetadataStore::new());
    let persistence = Arc::new(PersistenceService::new(metadata, content_blob, config.storage.bucket.clone()));

    let resolver = iep_config::SecretResolver::new(&iep_config::NoopSecretSource);
    let openai_key = resolver
        .resolve(
            config.providers.openai_api_key.as_deref(),
            config.providers.openai_api_key_parameter_name.as_deref(),
        )?
        .value()
        .to_string();
    let mistral_key = resolver
        .resolve(
            config.providers.mistral_api_key.as_deref(),
            config.providers.mistral_api_key_parameter_name.as_deref(),
        )?
        .value()
        .to_string();

    let ocr = Arc::new(HttpOcrProvider::new(source_blob.clone(), mistral_key, config.providers.ocr_base_url.clone()));
    let pii_endpoint = config
        .providers
        .pii_entity_endpoint
        .clone()
        .ok_or_else(|| anyhow::anyhow!("providers.pii_entity_endpoint is required"))?;
    let pii = Arc::new(HttpPiiRedactor::new(pii_endpoint, config.pii.max_concurrent_pages));
    let llm = Arc::new(iep_agents::HttpLlmClient::new(openai_key, config.providers.llm_base_url.clone()));

    Ok(StepContext::new(persistence, ocr, pii, llm, source_blob, config.orchestrator.clone()))
}
