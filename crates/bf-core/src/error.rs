//! Error types for baseflow

use thiserror::Error;

/// baseflow error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input: mismatched lengths, negative discharge, non-increasing time.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A regression or solver failed to converge or produced a non-physical result.
    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    /// Fewer usable points than a fit requires.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

impl Error {
    /// Whether this error is recoverable at event or population level.
    ///
    /// Only malformed input (and I/O) escalates to the caller; fit failures are
    /// recorded on the affected record instead.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DegenerateFit(_) | Error::InsufficientData(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_failures_are_recoverable() {
        assert!(Error::DegenerateFit("rising window".into()).is_recoverable());
        assert!(Error::InsufficientData("3 points".into()).is_recoverable());
        assert!(!Error::InvalidInput("length mismatch".into()).is_recoverable());
    }

    #[test]
    fn display_carries_message() {
        let e = Error::InvalidInput("time axis not increasing at index 3".into());
        assert_eq!(e.to_string(), "Invalid input: time axis not increasing at index 3");
    }
}
