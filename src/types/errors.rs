//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the MCore kernel.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (bad request content, bad config values).
    #[error("validation error: {0}")]
    Validation(String),

    /// A file or resource the kernel needs is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Jupyter wire protocol violations (missing delimiter, short frames).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Message signature did not verify against the session key.
    #[error("signature error: {0}")]
    Signature(String),

    /// The interpreter did not reach a prompt in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The interpreter process is gone.
    #[error("interpreter exited: {0}")]
    ReplExited(String),

    /// The interpreter stopped at its continuation prompt after the last line.
    #[error("continuation prompt found - input was incomplete:\n{0}")]
    IncompleteInput(String),

    /// Pseudo-terminal setup or I/O failures.
    #[error("pty error: {0}")]
    Pty(String),

    /// Internal errors (join failures, poisoned locks).
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// ZeroMQ transport errors.
    #[error("zmq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Name reported to the notebook as `ename` in error replies.
    pub fn ename(&self) -> &'static str {
        match self {
            Error::Validation(_) => "ValidationError",
            Error::NotFound(_) => "NotFoundError",
            Error::Protocol(_) => "ProtocolError",
            Error::Signature(_) => "SignatureError",
            Error::Timeout(_) => "ReplTimeout",
            Error::ReplExited(_) => "ReplExited",
            Error::IncompleteInput(_) => "IncompleteInput",
            Error::Pty(_) => "PtyError",
            Error::Internal(_) => "InternalError",
            Error::Serialization(_) => "SerializationError",
            Error::Zmq(_) => "ZmqError",
            Error::Io(_) => "IoError",
        }
    }

    /// True when the interpreter can no longer accept input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ReplExited(_))
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn signature(msg: impl Into<String>) -> Self {
        Self::Signature(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn repl_exited(msg: impl Into<String>) -> Self {
        Self::ReplExited(msg.into())
    }

    pub fn incomplete_input(msg: impl Into<String>) -> Self {
        Self::IncompleteInput(msg.into())
    }

    pub fn pty(msg: impl Into<String>) -> Self {
        Self::Pty(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
