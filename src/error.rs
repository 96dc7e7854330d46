use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error;
use std::fmt;

/// Failures of the library core (path resolution, indexing, range negotiation, streaming).
///
/// Each variant is one kind of the service's failure taxonomy. HTTP mapping happens in
/// [`AppError`]; the core never builds responses itself.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// The requested path resolves outside the library root.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// The requested path does not exist or is not a regular file.
    #[error("not found: {0}")]
    NotFound(String),
    /// The Range header is malformed or outside the file.
    #[error("range not satisfiable for {total} bytes")]
    RangeNotSatisfiable { total: u64 },
    /// One top-level folder could not be scanned. Non-fatal: the folder contributes nothing.
    #[error("failed to scan folder {folder:?}: {source}")]
    ScanSubtreeFailure {
        folder: String,
        #[source]
        source: std::io::Error,
    },
    /// Reading the file failed while a response body was being produced.
    #[error("stream I/O failure: {0}")]
    StreamIo(#[source] std::io::Error),
    /// The library root itself could not be enumerated and no earlier snapshot exists.
    #[error("library root unavailable: {0}")]
    RootUnavailable(#[source] std::io::Error),
    /// The scan exceeded the configured ceiling and no earlier snapshot exists.
    #[error("library scan exceeded {0} seconds")]
    ScanTimedOut(u64),
}

/// The primary error type for the HTTP layer.
///
/// This enum consolidates all possible errors that can occur within a request,
/// providing a unified way to handle and respond to failures.
#[derive(Debug)]
pub enum AppError {
    /// For internal server errors that are not expected to be handled by the client.
    Internal(anyhow::Error),
    /// For client errors due to invalid requests.
    BadRequest(String),
    /// For paths that escape the library root.
    Forbidden(String),
    /// For when a requested resource is not found.
    NotFound(String),
    /// For Range headers that cannot be served against a file of `total` bytes.
    RangeNotSatisfiable {
        /// Size of the file the range was checked against.
        total: u64,
    },
    /// For when a service is temporarily unavailable.
    ServiceUnavailable(String),
    /// For errors related to I/O operations.
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::RangeNotSatisfiable { total } => {
                write!(f, "Range not satisfiable for {} bytes", total)
            }
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut content_range: Option<String> = None;
        let (status, error_code, error_message, details) = match self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                let error_id = uuid::Uuid::new_v4();
                tracing::error!("Error ID: {}", error_id);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "ACCESS_DENIED", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::RangeNotSatisfiable { total } => {
                content_range = Some(format!("bytes */{}", total));
                (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    "RANGE_NOT_SATISFIABLE",
                    "Requested range cannot be served".to_string(),
                    Some(json!({ "size": total })),
                )
            }
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
            AppError::IoError(msg) => {
                tracing::error!("I/O error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    "An I/O error occurred".to_string(),
                    Some(json!({ "details": msg })),
                )
            }
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        let mut res = (status, Json(body)).into_response();
        if let Some(value) = content_range.and_then(|v| HeaderValue::from_str(&v).ok()) {
            res.headers_mut().insert(header::CONTENT_RANGE, value);
        }
        res
    }
}

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::AccessDenied(p) => AppError::Forbidden(format!("Access denied: {}", p)),
            LibraryError::NotFound(p) => AppError::NotFound(format!("Video not found: {}", p)),
            LibraryError::RangeNotSatisfiable { total } => AppError::RangeNotSatisfiable { total },
            LibraryError::RootUnavailable(e) => {
                AppError::ServiceUnavailable(format!("Library root unavailable: {}", e))
            }
            e @ LibraryError::ScanTimedOut(_) => AppError::ServiceUnavailable(e.to_string()),
            e @ LibraryError::ScanSubtreeFailure { .. } => AppError::Internal(e.into()),
            LibraryError::StreamIo(e) => e.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(format!("{}: {}", err.kind(), err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(anyhow::anyhow!("background task failed: {}", err))
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the HTTP layer.
pub type AppResult<T> = Result<T, AppError>;
