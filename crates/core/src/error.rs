//! Unified error types for tabula.
//!
//! Display strings carry a stable `CODE:` prefix so front ends can match on
//! the failure class without parsing the message body.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error type for the extraction engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty mapping, blank item path).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Path expression could not be parsed.
    #[error("INVALID_XPATH: {0}")]
    InvalidXPath(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response or transport failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// The rating column held no node or a non-numeric class suffix.
    #[error("RATING_PARSE: column '{column}' could not parse '{text}'")]
    RatingParse { column: String, text: String },

    /// A data row did not match the header width.
    #[error("ROW_WIDTH: expected {expected} cells, got {actual}")]
    RowWidth { expected: usize, actual: usize },

    /// The operator declined to choose a destination.
    #[error("EXPORT_CANCELLED: operation cancelled")]
    ExportCancelled,

    /// Writing the table to its destination failed.
    #[error("PERSIST_FAILED: {0}")]
    PersistFailed(String),

    /// A background page fetch panicked or was aborted.
    #[error("TASK_FAILED: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Whether this error came from the final persist step rather than extraction.
    pub fn is_persist(&self) -> bool {
        matches!(self, Error::ExportCancelled | Error::PersistFailed(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::PersistFailed(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidXPath(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::HttpError(_) => -32008,
            Error::RatingParse { .. } => -32000,
            Error::RowWidth { .. } => -32000,
            Error::ExportCancelled => -32013,
            Error::PersistFailed(_) => -32014,
            Error::TaskFailed(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
