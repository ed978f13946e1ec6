//! iep-lambda - the Ingress Adapter (C9): parses the S3-event and
//! direct-invocation event shapes, derives `(userId, childId, iepId)` from
//! the upload key convention, dedupes retried events by execution name,
//! and hands the execution to the orchestrator (C8).
//!
//! Philosophy, inherited from the teacher's Lambda adapter: use
//! `lambda_runtime`'s own tokio runtime, don't add a second one.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use iep_config::{NoopSecretSource, RuntimeConfig, SecretResolver};
use iep_orchestrator::{ExecutionInput, StepContext};
use iep_persistence::PersistenceService;
use iep_providers::{HttpOcrProvider, HttpPiiRedactor};
use iep_storage::{BlobStore, OpenDalBlobStore};
use lambda_runtime::{service_fn, Error, LambdaEvent};

mod error;
mod event;
mod identifiers;

pub use error::IngressError;
pub use event::{parse_ingress_event, DirectInvocation, IngressEvent, RawUpload};
pub use identifiers::{derive_identifiers, execution_name};

/// Dedupe is tracked with a process-local set rather than an external
/// state-machine's execution-name uniqueness constraint, since this crate
/// runs the workflow in-process instead of handing it to an external
/// durable-execution service.
pub struct LambdaState {
    pub step_context: StepContext,
    pub source_bucket: String,
    seen_executions: Mutex<HashSet<String>>,
}

/// Builds the `StepContext` the orchestrator runs against: S3-backed blob
/// storage (content bucket doubles as the upload source), DynamoDB-backed
/// metadata, and the HTTP-backed OCR/PII/LLM adapters. Shared by the
/// Lambda entrypoint and the root CLI's direct-invocation subcommand, so
/// both platforms wire the production stack identically.
pub async fn build_step_context(config: &RuntimeConfig) -> anyhow::Result<StepContext> {
    let content_blob = Arc::new(OpenDalBlobStore::new_s3(
        &config.storage.bucket,
        &config.storage.region,
        config.storage.s3_endpoint.as_deref(),
    )?);
    let source_blob: Arc<dyn BlobStore> = content_blob.clone();

    let metadata = Arc::new(
        iep_storage::DynamoMetadataStore::new(
            config.storage.documents_table.clone(),
            config.storage.user_profiles_table.clone(),
        )
        .await,
    );
    let persistence = Arc::new(PersistenceService::new(metadata, content_blob, config.storage.bucket.clone()));

    let resolver = SecretResolver::new(&NoopSecretSource);
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

async fn build_state(config: &RuntimeConfig) -> anyhow::Result<LambdaState> {
    let step_context = build_step_context(config).await?;
    Ok(LambdaState {
        step_context,
        source_bucket: config.storage.bucket.clone(),
        seen_executions: Mutex::new(HashSet::new()),
    })
}

/// Derives identifiers (if not already present), dedupes by execution
/// name against `state`, and runs the upload through the orchestrator.
/// Returns `None` when the event was a duplicate and was skipped.
pub async fn process_upload(
    step_context: &StepContext,
    dedupe: &Mutex<HashSet<String>>,
    upload: RawUpload,
    correlation_id: &str,
) -> Result<Option<(String, iep_orchestrator::ExecutionOutcome)>, IngressError> {
    let (user_id, child_id, iep_id) = match upload.identifiers {
        Some(ids) => ids,
        None => derive_identifiers(&upload.key)?,
    };

    let name = execution_name(&iep_id, correlation_id);
    if !dedupe.lock().unwrap().insert(name.clone()) {
        tracing::info!(execution_name = %name, %iep_id, "duplicate ingress event ignored");
        return Ok(None);
    }

    let input = ExecutionInput {
        iep_id: iep_id.clone(),
        child_id,
        user_id,
        bucket: upload.bucket,
        source_key: upload.key,
    };
    tracing::info!(execution_name = %name, %iep_id, "starting execution");
    let outcome = iep_orchestrator::run(step_context, input)
        .await
        .unwrap_or_else(|err| iep_orchestrator::ExecutionOutcome::Failed {
            step: "engine".to_string(),
            message: err.to_string(),
        });
    Ok(Some((iep_id, outcome)))
}

async fn handle_event(event: LambdaEvent<serde_json::Value>, state: Arc<LambdaState>) -> Result<serde_json::Value, Error> {
    let (payload, context) = event.into_parts();
    let uploads = parse_ingress_event(&payload)?;

    let mut outcomes = Vec::with_capacity(uploads.len());
    for upload in uploads {
        if let Some((iep_id, outcome)) =
            process_upload(&state.step_context, &state.seen_executions, upload, &context.request_id).await?
        {
            outcomes.push(serde_json::json!({ "iepId": iep_id, "outcome": format!("{:?}", outcome) }));
        }
    }

    Ok(serde_json::json!({ "processed": outcomes }))
}

/// Lambda runtime entry point.
pub async fn run() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .init();

    tracing::info!("iep-lambda starting - lambda_runtime's tokio + OpenDAL S3/DynamoDB");

    let config = RuntimeConfig::load().map_err(|e| Error::from(format!("failed to load configuration: {e}")))?;
    config.validate().map_err(|e| Error::from(format!("invalid configuration: {e}")))?;

    let state = Arc::new(build_state(&config).await.map_err(|e| Error::from(e.to_string()))?);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<serde_json::Value>| {
        let state = state.clone();
        async move { handle_event(event, state).await }
    }))
    .await
}
