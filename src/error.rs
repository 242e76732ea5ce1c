//! Error types for the architecture classifier and report pipeline.
//!
//! Classification failures are split into two kinds: the file could not be
//! read at all, or its bytes do not form a recognizable PE container header.
//! A well-formed header with an unrecognized machine type is not an error.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for binary classification.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// IO error while opening or reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is too small to contain a DOS header.
    #[error("File too small: expected at least {expected} bytes, got {actual}")]
    FileTooSmall { expected: usize, actual: usize },

    /// The PE header offset stored at 0x3C is negative.
    #[error("Invalid PE header offset: {offset}")]
    InvalidHeaderOffset { offset: i32 },

    /// The bytes at the PE header offset are not `PE\0\0`.
    #[error("Can't find PE header: expected signature 0x{expected:08X}, got 0x{actual:08X}")]
    InvalidSignature { expected: u32, actual: u32 },

    /// Truncated data when reading.
    #[error("Truncated data at offset {offset}: expected {expected} bytes, got {actual}")]
    TruncatedData {
        offset: usize,
        expected: usize,
        actual: usize,
    },
}

/// Coarse grouping of [`ClassifierError`] values for batch callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The file could not be opened or read.
    Io,
    /// The file is readable but is not a valid PE container.
    MalformedHeader,
}

impl ClassifierError {
    /// Which failure family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::FileTooSmall { .. }
            | Self::InvalidHeaderOffset { .. }
            | Self::InvalidSignature { .. }
            | Self::TruncatedData { .. } => ErrorKind::MalformedHeader,
        }
    }

    /// True when the header bytes were present but malformed.
    pub fn is_malformed_header(&self) -> bool {
        self.kind() == ErrorKind::MalformedHeader
    }
}

/// Result type alias for classifier operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Errors raised while listing files and writing reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Directory traversal failed.
    #[error("failed to list files under {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Writing the report file failed.
    #[error("failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rendering the rows as JSON failed.
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClassifierError::FileTooSmall {
            expected: 64,
            actual: 4,
        };
        assert!(err.to_string().contains("64"));
        assert!(err.to_string().contains("4"));
    }

    #[test]
    fn test_signature_display() {
        let err = ClassifierError::InvalidSignature {
            expected: 0x4550,
            actual: 0xBEEF,
        };
        let msg = err.to_string();
        assert!(msg.contains("0000BEEF"));
        assert!(msg.contains("Can't find PE header"));
    }

    #[test]
    fn test_kinds() {
        let io = ClassifierError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(!io.is_malformed_header());

        let truncated = ClassifierError::TruncatedData {
            offset: 0x80,
            expected: 4,
            actual: 0,
        };
        assert_eq!(truncated.kind(), ErrorKind::MalformedHeader);
        assert!(ClassifierError::InvalidHeaderOffset { offset: -1 }.is_malformed_header());
    }
}
