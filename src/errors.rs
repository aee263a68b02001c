use thiserror::Error;

/// Why a session ended through the cancellation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The user pressed stop while the reply was streaming.
    User,
    /// The request deadline elapsed before the stream finished.
    Timeout,
}

/// Terminal failure of a single completion session.
///
/// The `Display` text of each variant is what the composer shows after the
/// `Error: ` prefix, so `Api` renders the server message verbatim.
#[derive(Debug, Error)]
pub enum SessionError {
    // ── Pre-flight ───────────────────────────────────────────────────────────
    #[error("Missing API key.")]
    BadCredential,

    // ── Remote ───────────────────────────────────────────────────────────────
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("No response stream available.")]
    StreamUnavailable,

    // ── Local ────────────────────────────────────────────────────────────────
    #[error("Request stopped or timed out.")]
    CancelledOrTimedOut { reason: StopReason },

    #[error("{0}")]
    NetworkFailure(#[from] TransportError),
}

impl SessionError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        SessionError::Api { status, message: message.into() }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, SessionError::CancelledOrTimedOut { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::CancelledOrTimedOut { reason: StopReason::Timeout })
    }
}

/// Any failure raised by the HTTP layer below the session.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::new(e.to_string())
    }
}

/// Input rejected at the composer boundary. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message cannot be empty")]
    EmptyInput,

    #[error("Add API key first")]
    MissingCredential,
}

/// Failures of the key-value persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("Failed to write key '{key}': {message}")]
    WriteFailed { key: String, message: String },

    #[error("Failed to read key '{key}': {message}")]
    ReadFailed { key: String, message: String },

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    pub fn write_failed(key: &str, message: impl Into<String>) -> Self {
        StorageError::WriteFailed { key: key.to_string(), message: message.into() }
    }

    pub fn read_failed(key: &str, message: impl Into<String>) -> Self {
        StorageError::ReadFailed { key: key.to_string(), message: message.into() }
    }
}
