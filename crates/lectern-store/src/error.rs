use thiserror::Error;

/// Store layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(#[from] redis::RedisError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
