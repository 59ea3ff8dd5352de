use thiserror::Error;

/// Crate-wide error type for the scanning engine.
///
/// Only two classes of error abort a scan outright: an invalid target and a
/// session-level failure (the browser session could not be created, or
/// navigation never completed). Everything else is accumulated and returned
/// alongside whatever results exist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The target URL did not parse as an absolute http(s) URL.
    /// Fatal; no scan is attempted.
    #[error("Invalid scan target: {reason}")]
    InvalidTarget { reason: String },

    /// Scan options failed validation at session start.
    #[error("Invalid scan options: {reason}")]
    InvalidOptions { reason: String },

    /// The browser session could not be created.
    #[error("Browser session could not be established: {message}")]
    SessionFailed { message: String },

    /// Navigation or session-level work did not complete within the scan
    /// deadline. The session ends with whatever partial evidence exists.
    #[error("Scan deadline exceeded")]
    ScanTimeout,

    /// Navigation itself failed. The session is marked failed but partial
    /// evidence gathered before the failure is preserved.
    #[error("Scan failed: {message}")]
    ScanFailed { message: String },

    /// A single evidence channel failed. Recorded, never fatal.
    #[error("Evidence channel error: {message}")]
    Channel { message: String },

    /// An inventory write failed. Recorded per record; reconciliation
    /// continues.
    #[error("Inventory persistence error: {message}")]
    Persistence { message: String },

    /// The vendor directory could not be loaded or parsed.
    #[error("Vendor directory error: {message}")]
    Directory { message: String },
}

impl ScanError {
    pub fn invalid_target(reason: impl Into<String>) -> Self {
        ScanError::InvalidTarget {
            reason: reason.into(),
        }
    }

    pub fn session_failed(message: impl Into<String>) -> Self {
        ScanError::SessionFailed {
            message: message.into(),
        }
    }

    pub fn scan_failed(message: impl Into<String>) -> Self {
        ScanError::ScanFailed {
            message: message.into(),
        }
    }

    pub fn channel(message: impl Into<String>) -> Self {
        ScanError::Channel {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        ScanError::Persistence {
            message: message.into(),
        }
    }

    /// True for errors that abort the whole scan rather than being
    /// accumulated.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidTarget { .. }
                | ScanError::InvalidOptions { .. }
                | ScanError::SessionFailed { .. }
        )
    }
}

impl From<rusqlite::Error> for ScanError {
    fn from(err: rusqlite::Error) -> Self {
        ScanError::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Directory {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(ScanError::invalid_target("not a url").is_fatal());
        assert!(ScanError::session_failed("no browser").is_fatal());
        assert!(!ScanError::ScanTimeout.is_fatal());
        assert!(!ScanError::channel("storage read failed").is_fatal());
        assert!(!ScanError::persistence("disk full").is_fatal());
    }
}
