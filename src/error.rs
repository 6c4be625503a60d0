//! Common error type and result alias.
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Rejected input: oversized upload, empty instruction, missing image.
    #[error("{0}")]
    Validation(String),

    /// Transport-level failure talking to the provider or an asset origin.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The provider answered, but not with a usable image.
    #[error("provider error: {0}")]
    Provider(String),

    /// Durable store failure. Fatal during install, swallowed during fetch.
    #[error("cache error: {0}")]
    Cache(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}
