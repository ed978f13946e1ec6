use thiserror::Error;

/// The orchestrator's classified error type. Every step returns one of
/// these; `is_retryable()` drives the retry loop, and `Display` (via
/// `to_string()`) feeds `record_failure`'s `last_error`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("persistence error: {0}")]
    Persistence(#[from] iep_persistence::PersistenceError),
    #[error("provider error: {0}")]
    Provider(#[from] iep_providers::ProviderError),
    #[error("agent error: {0}")]
    Agent(#[from] iep_agents::AgentError),
    #[error("storage error: {0}")]
    Storage(#[from] iep_storage::StorageError),
    #[error("step '{0}' exceeded its timeout")]
    Timeout(&'static str),
    #[error("step '{0}' failed after exhausting its retry budget: {1}")]
    RetriesExhausted(&'static str, String),
}

impl OrchestratorError {
    /// Transient (network/5xx/throttling/timeout) errors are retried with
    /// backoff; validation and permission errors are not (spec.md §7).
    pub fn is_retryable(&self) -> bool {
        match self {
            OrchestratorError::Timeout(_) => true,
            OrchestratorError::Provider(iep_providers::ProviderError::Transport(_)) => true,
            OrchestratorError::Persistence(err) => err.status_code() >= 500,
            OrchestratorError::Agent(iep_agents::AgentError::Transport(_)) => true,
            OrchestratorError::Agent(iep_agents::AgentError::InvalidJson(_)) => false,
            OrchestratorError::Agent(iep_agents::AgentError::MaxTurnsExceeded(_)) => false,
            OrchestratorError::Agent(iep_agents::AgentError::ValidationFailed(_)) => false,
            OrchestratorError::Agent(iep_agents::AgentError::MissingCredentials) => false,
            OrchestratorError::Provider(_) => false,
            OrchestratorError::Storage(_) => true,
            OrchestratorError::RetriesExhausted(_, _) => false,
        }
    }
}
