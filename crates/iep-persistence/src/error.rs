/// Core error classification for the persistence service.
#[derive(Debug, Clone)]
pub enum PersistenceError {
    NotFound { iep_id: String, child_id: String },
    Forbidden { iep_id: String, user_id: String },
    InvalidRequest { message: String },
    StorageFailed { message: String },
}

impl PersistenceError {
    /// HTTP status code for this error, mirroring the original ddb-service
    /// Lambda's `{statusCode, body}` envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Forbidden { .. } => 403,
            Self::InvalidRequest { .. } => 400,
            Self::StorageFailed { .. } => 502,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::Forbidden { .. } => "Forbidden",
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::StorageFailed { .. } => "StorageFailed",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::NotFound { iep_id, child_id } => {
                format!("document not found: iepId={}, childId={}", iep_id, child_id)
            }
            Self::Forbidden { iep_id, user_id } => format!(
                "user {} does not own document {}",
                user_id, iep_id
            ),
            Self::InvalidRequest { message } => message.clone(),
            Self::StorageFailed { message } => message.clone(),
        }
    }
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PersistenceError {}

impl From<iep_storage::StorageError> for PersistenceError {
    fn from(err: iep_storage::StorageError) -> Self {
        PersistenceError::StorageFailed {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::InvalidRequest {
            message: format!("content serialization error: {}", err),
        }
    }
}
