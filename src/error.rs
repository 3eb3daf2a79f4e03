//! Errors.

use core::fmt;

/// Combined error type for everything that can go wrong loading, laying out or refreshing a
/// document.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Bincode(bincode::Error),
    Json(serde_json::Error),
    Fetch(FetchError),
    /// The serialized document was written by a different format version.
    VersionMismatch { expected: u32, found: u32 },
    /// The document decoded but contains no views to render.
    MissingRoot,
    /// The layout solver rejected an operation.
    Layout(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Bincode(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Error::Fetch(err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Bincode(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Fetch(e) => Some(e),
            Error::VersionMismatch { .. } | Error::MissingRoot | Error::Layout(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Bincode(e) => write!(f, "decode error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Fetch(e) => write!(f, "fetch error: {}", e),
            Error::VersionMismatch { expected, found } => write!(
                f,
                "serialized document has version {}, expected {}",
                found, expected
            ),
            Error::MissingRoot => write!(f, "document has no root view"),
            Error::Layout(msg) => write!(f, "layout error: {}", msg),
        }
    }
}

/// Failures reported by a document transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    AccessDenied,
    NotFound(String),
    RateLimited,
    Internal,
    Connection(String),
    Unknown(String),
}

impl FetchError {
    /// A short message suitable for showing to the user.
    pub fn feedback_message(&self) -> String {
        match self {
            FetchError::AccessDenied => "Invalid Authentication Token".to_string(),
            FetchError::NotFound(doc_id) => format!("Document {} not found", doc_id),
            FetchError::RateLimited => "Rate Limit Exceeded".to_string(),
            FetchError::Internal => "Server internal error".to_string(),
            FetchError::Connection(detail) => format!("Connection failed: {}", detail),
            FetchError::Unknown(detail) => format!("Fetch failed: {}", detail),
        }
    }
}

impl std::error::Error for FetchError {}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.feedback_message())
    }
}
