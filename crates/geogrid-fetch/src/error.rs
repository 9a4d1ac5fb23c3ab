//! Error types for the fetch crate.

use thiserror::Error;

/// Broad category of an acquisition failure.
///
/// Callers use this to decide whether a failed acquisition should abort the
/// whole run or only be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// The remote could not be reached or answered with a failure.
    Transport,
    /// The remote location could not be formed into a valid URL.
    Naming,
    /// A downloaded archive could not be read or unpacked.
    Extraction,
    /// A local file could not be created or written.
    Io,
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::Transport => write!(f, "transport"),
            FetchErrorKind::Naming => write!(f, "naming"),
            FetchErrorKind::Extraction => write!(f, "extraction"),
            FetchErrorKind::Io => write!(f, "io"),
        }
    }
}

/// Errors that can occur while acquiring a source file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection or body transfer failure.
    #[error("Transport error fetching {url}: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The URL could not be built or parsed.
    #[error("Invalid remote location {url}: {reason}")]
    Naming {
        /// The offending location.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Archive extraction failed.
    #[error("Failed to extract archive {archive}: {source}")]
    Extraction {
        /// Archive file name.
        archive: String,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// I/O error writing a local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Category of this error.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport { .. } | FetchError::Status { .. } => FetchErrorKind::Transport,
            FetchError::Naming { .. } => FetchErrorKind::Naming,
            FetchError::Extraction { .. } => FetchErrorKind::Extraction,
            FetchError::Io(_) => FetchErrorKind::Io,
        }
    }
}
