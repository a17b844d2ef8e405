use models::errors::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage write failed: {0}")]
    StorageWrite(String),
    #[error("storage corrupted: {0}")]
    StorageCorruption(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    /// Storage failures are operator problems; the client only gets a generic message.
    pub fn is_internal(&self) -> bool {
        matches!(self, ServiceError::StorageWrite(_) | ServiceError::StorageCorruption(_))
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(msg) => ServiceError::Validation(msg),
            ModelError::CapacityExceeded(_) | ModelError::DuplicateConsumer(_) => ServiceError::Conflict(e.to_string()),
            ModelError::UnknownConsumer(_) => ServiceError::NotFound(e.to_string()),
        }
    }
}
