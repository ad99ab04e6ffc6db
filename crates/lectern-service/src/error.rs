use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    StoreError(#[from] lectern_store::error::StoreError),

    #[error(transparent)]
    EngineError(#[from] lectern_engine::error::EngineError),

    #[error("Source error: {0}")]
    SourceError(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
