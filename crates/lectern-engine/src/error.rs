use chrono::{DateTime, Utc};
use thiserror::Error;

/// Engine error type with minimal dependencies
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("empty interval: start {start} is not before end {end}")]
    EmptyInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
