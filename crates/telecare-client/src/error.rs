//! Error types for the gateway client

use thiserror::Error;

/// Result type alias for gateway calls
pub type ClientResult<T> = Result<T, ClientError>;

/// Message used when the server reports failure without saying why
pub const DEFAULT_FAILURE_MESSAGE: &str = "Something went wrong, Please try again!";

/// Message used when a transport failure carries no detail
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Errors that can occur while talking to the admin API
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport level failure (connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code
    #[error("{message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Server supplied message, or the status reason
        message: String,
    },

    /// 401 from the server; the stored token has been cleared
    #[error("{message}")]
    Unauthorized {
        /// Server supplied message
        message: String,
    },

    /// Envelope with `success: false`
    #[error("{message}")]
    Api {
        /// Server supplied message
        message: String,
    },

    /// Response body could not be decoded
    #[error("Failed to decode response: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },

    /// Request exceeded the client timeout
    #[error("Request timed out after {seconds} seconds")]
    Timeout {
        /// Configured timeout
        seconds: u64,
    },

    /// Request could not be built
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message
        message: String,
    },

    /// Failure injected by the mock transport
    #[error("{message}")]
    Mock {
        /// Error message
        message: String,
    },
}

impl ClientError {
    /// Create a status error
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create an application error, falling back to the generic message
    pub fn api(message: Option<&str>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_FAILURE_MESSAGE);
        Self::Api {
            message: message.to_string(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub const fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a mock error
    pub fn mock(message: impl Into<String>) -> Self {
        Self::Mock {
            message: message.into(),
        }
    }

    /// HTTP status attached to the error, if any
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get error severity level for logging
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Api { .. } | Self::Status { .. } => ErrorSeverity::Warning,
            Self::Http(_) | Self::Timeout { .. } | Self::Decode { .. } => ErrorSeverity::Error,
            Self::Unauthorized { .. } | Self::InvalidRequest { .. } => ErrorSeverity::Critical,
            Self::Mock { .. } => ErrorSeverity::Info,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// The server rejected the call; user visible
    Warning,
    /// The call could not complete
    Error,
    /// Session or programming problem
    Critical,
}

impl From<ClientError> for telecare_core::Error {
    fn from(err: ClientError) -> Self {
        Self::Api(err.to_string())
    }
}
