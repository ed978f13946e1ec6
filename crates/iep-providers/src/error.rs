use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream provider error: {0}")]
    Upstream(String),
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response decode error: {0}")]
    Decode(String),
    #[error("no credentials configured for {0}")]
    MissingCredentials(&'static str),
}
