/// Classified errors shared by the domain layer.
///
/// Mirrors the teacher's flat, classified error style: one enum per
/// boundary, each variant carrying enough context to render a response and
/// to decide retryability, rather than a deep `std::error::Error` chain.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("content location invariant violated: {0}")]
    MixedContentLocation(String),

    #[error("missing required section: {0}")]
    MissingSection(String),

    #[error("unknown language: {0}")]
    UnknownLanguage(String),
}

impl CoreError {
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::InvalidRecord(_) => 400,
            CoreError::MixedContentLocation(_) => 500,
            CoreError::MissingSection(_) => 422,
            CoreError::UnknownLanguage(_) => 400,
        }
    }
}
