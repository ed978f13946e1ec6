use std::sync::Arc;

use iep_agents::LlmClient;
use iep_config::OrchestratorConfig;
use iep_persistence::PersistenceService;
use iep_providers::{OcrProvider, PiiRedactor};
use iep_storage::BlobStore;

/// Everything a step needs: the persistence service plus the three
/// external adapters, bound once at startup and shared across executions.
pub struct StepContext {
    pub persistence: Arc<PersistenceService>,
    pub ocr: Arc<dyn OcrProvider>,
    pub pii: Arc<dyn PiiRedactor>,
    pub llm: Arc<dyn LlmClient>,
    /// The bucket holding user-uploaded source documents, distinct from
    /// (but possibly backed by the same store as) the content blob store
    /// wrapped inside `persistence`. Used only to delete the original
    /// upload once OCR has extracted it (S5).
    pub source_store: Arc<dyn BlobStore>,
    pub config: OrchestratorConfig,
    pub extractor_model: String,
    pub meeting_notes_model: String,
    pub missing_info_model: String,
    pub translator_model: String,
}

impl StepContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        persistence: Arc<PersistenceService>,
        ocr: Arc<dyn OcrProvider>,
        pii: Arc<dyn PiiRedactor>,
        llm: Arc<dyn LlmClient>,
        source_store: Arc<dyn BlobStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            persistence,
            ocr,
            pii,
            llm,
            source_store,
            config,
            extractor_model: "gpt-4.1".to_string(),
            meeting_notes_model: "gpt-5.1".to_string(),
            missing_info_model: "gpt-4.1".to_string(),
            translator_model: "gpt-4.1".to_string(),
        }
    }
}
