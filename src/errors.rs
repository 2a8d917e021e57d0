use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// Raised while resolving adapter options, before any request is issued.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: Missing required option `{0}`")]
    MissingOption(&'static str),
    #[error("Configuration error: S3 path must be absolute, got `{0}`")]
    RelativePath(String),
    #[error("Configuration error: `{0}` must not be set on `upload_params`")]
    ReservedUploadParam(String),
    #[error("Configuration error: `{0}` is not a supported upload parameter")]
    UnsupportedUploadParam(String),
    #[error("Configuration error: invalid value `{value}` for `{option}`")]
    InvalidValue { option: &'static str, value: String },
}

/// Failure reported by an [`ObjectStoreClient`](crate::services::client::ObjectStoreClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("object `{key}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, key: String },
    #[error("store returned status code {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucket { name: String, reason: String },
    #[error("declared content length {declared} does not match the {written} bytes received")]
    LengthMismatch { declared: u64, written: u64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ClientError {
    /// True when the store reported that the object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ClientError::NotFound { .. } | ClientError::Status { status: 404, .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("filename generation failed: {0:#}")]
    FilenameGeneration(anyhow::Error),
    #[error("could not open source file {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("S3#{operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("S3#{operation} returned status code {status}")]
    UnexpectedStatus { operation: &'static str, status: u16 },
    #[error("no free filename after {attempts} attempts")]
    NameAttemptsExhausted { attempts: u32 },
}

impl AdapterError {
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(ClientError) -> Self {
        move |source| AdapterError::Store { operation, source }
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Error returned by the development file server, rendered as JSON.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound { .. } => AppError::not_found(err.to_string()),
            ClientError::InvalidKey(_) | ClientError::InvalidBucket { .. } => {
                AppError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            other => AppError::internal(other.to_string()),
        }
    }
}
