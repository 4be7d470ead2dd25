//! Error taxonomy for calls that cannot produce a verdict
//!
//! Canon-law findings are never errors; they travel as `GrayEvent`s.

use thiserror::Error;

/// Errors fatal to a single call
#[derive(Debug, Error)]
pub enum CodexError {
    /// Input bytes could not be decoded (not UTF-8, malformed JSON body, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Name or symbol not present in the canon table
    #[error("Unknown token: {0}")]
    UnknownToken(String),

    /// Threshold or phase name not present in the phase table
    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    /// Canon definition failed validation
    #[error("Invalid canon definition: {0}")]
    InvalidCanon(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::str::Utf8Error> for CodexError {
    fn from(err: std::str::Utf8Error) -> Self {
        CodexError::InvalidInput(format!(
            "input is not valid UTF-8 (first bad byte at offset {})",
            err.valid_up_to()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_error_maps_to_invalid_input() {
        let bytes = [b'o', b'k', 0xff, 0xfe];
        let err: CodexError = std::str::from_utf8(&bytes).unwrap_err().into();
        match err {
            CodexError::InvalidInput(msg) => assert!(msg.contains("offset 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display_carries_detail() {
        let err = CodexError::UnknownPhase("GRAY".to_string());
        assert_eq!(err.to_string(), "Unknown phase: GRAY");
    }
}
