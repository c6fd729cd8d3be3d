use sourcescope_api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceScopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SourceScopeError {
    fn from(err: reqwest::Error) -> Self {
        SourceScopeError::Http(err.to_string())
    }
}

impl From<SourceScopeError> for ApiError {
    fn from(err: SourceScopeError) -> Self {
        match err {
            SourceScopeError::Io(e) => ApiError::Io(e),
            SourceScopeError::Api(e) => e,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceScopeError>;
