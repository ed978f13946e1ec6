use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("event did not match the S3 or direct-invocation shape: {0}")]
    UnrecognizedEvent(serde_json::Error),
    #[error("upload key '{0}' does not match the userId/childId/iepId/filename convention")]
    MalformedKey(String),
}
