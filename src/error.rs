/// Error type shared by storage, item management and import/export
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid import: {0}")]
    InvalidImport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Extension API error: {0}")]
    Bridge(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
