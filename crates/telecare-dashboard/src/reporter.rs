//! Where caught fetch and action failures go

use parking_lot::Mutex;
use std::fmt;
use telecare_client::{ClientError, ErrorSeverity};
use tracing::{error, info, warn};

/// Receives every failure caught at the fetcher boundary
///
/// Reporting is fire-and-forget: nothing is retried and nothing propagates
/// back to the caller that triggered the fetch.
pub trait ErrorReporter: Send + Sync + fmt::Debug {
    /// Surface a failure of `resource`
    fn report(&self, resource: &str, error: &ClientError);
}

/// Reporter that turns failures into tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, resource: &str, err: &ClientError) {
        match err.severity() {
            ErrorSeverity::Info => info!(resource, error = %err, "request failed"),
            ErrorSeverity::Warning => warn!(resource, error = %err, "request rejected"),
            ErrorSeverity::Error | ErrorSeverity::Critical => {
                error!(resource, error = %err, retryable = err.is_retryable(), "request failed");
            }
        }
    }
}

/// One reported failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Resource that failed
    pub resource: String,
    /// Human readable message
    pub message: String,
}

/// Reporter that keeps every notice, for tests and the CLI summary
#[derive(Debug, Default)]
pub struct CollectingReporter {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices reported so far
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Notices reported for `resource`
    pub fn notices_for(&self, resource: &str) -> Vec<Notice> {
        self.notices
            .lock()
            .iter()
            .filter(|notice| notice.resource == resource)
            .cloned()
            .collect()
    }

    /// Whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.notices.lock().is_empty()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, resource: &str, err: &ClientError) {
        TracingReporter.report(resource, err);
        self.notices.lock().push(Notice {
            resource: resource.to_string(),
            message: err.to_string(),
        });
    }
}
