//! Error types for the sync layer.

use fieldsync_types::Side;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a sync run.
///
/// Field- and object-level problems never show up here; they are recorded
/// as [`Diagnostic`](crate::Diagnostic)s and the run continues.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A side failed to produce its change report. No order is emitted.
    #[error("failed to fetch {side} change report: {source}")]
    Fetch {
        side: Side,
        #[source]
        source: ExchangeError,
    },

    /// A side failed to apply its order.
    #[error("failed to deliver {side} sync order: {source}")]
    Delivery {
        side: Side,
        #[source]
        source: ExchangeError,
    },

    /// An exchange answered for the wrong side or with a malformed report.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The service or process is missing a collaborator.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Fetching the change reports took longer than the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// The run was cancelled before both reports arrived.
    #[error("sync run cancelled")]
    Cancelled,
}

/// Errors raised by a [`DataExchange`](crate::DataExchange) implementation.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Network error talking to the side's API.
    #[error("network error: {0}")]
    Network(String),

    /// The side refused the request or order.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (file-backed exchanges).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
