use thiserror::Error;

/// Unified error type for the storage core.
///
/// Iterators report failures out-of-band through `status()`, which hands the
/// error back by value — so the whole taxonomy is `Clone`, and I/O failures
/// are captured as their rendered message rather than a live
/// [`std::io::Error`].
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The requested key or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored bytes failed validation (checksum mismatch, bad framing,
    /// impossible lengths).
    #[error("corruption: {0}")]
    Corruption(String),

    /// A recognized but unimplemented feature (e.g. an unknown block type).
    #[error("not supported: {0}")]
    NotSupported(String),

    /// The caller handed us something unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An underlying file-system failure.
    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(e.to_string())
        } else {
            Error::Io(e.to_string())
        }
    }
}

/// Result type alias used throughout the storage core.
pub type Result<T> = std::result::Result<T, Error>;
