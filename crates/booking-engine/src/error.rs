//! Error types for booking-engine operations.
//!
//! Queries against the registries never fail; errors only arise while
//! ingesting external data (labels, dates, documents, configuration).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    #[error("Invalid recurrence interval: {0}")]
    InvalidInterval(u32),

    #[error("Invalid time range: {start} is not before {end}")]
    InvalidRange { start: String, end: String },

    #[error("Document error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
