use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("llm transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("llm returned invalid json: {0}")]
    InvalidJson(String),
    #[error("agent exceeded its tool-call turn limit ({0})")]
    MaxTurnsExceeded(u32),
    #[error("no credentials configured for the llm provider")]
    MissingCredentials,
    #[error("validation failed: {0}")]
    ValidationFailed(String),
}
