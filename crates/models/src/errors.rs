use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("account is full ({0} of {0} slots used)")]
    CapacityExceeded(u32),
    #[error("consumer {0} already holds a slot")]
    DuplicateConsumer(String),
    #[error("consumer {0} holds no slot")]
    UnknownConsumer(String),
}
