//! Error kinds for the carving pipeline.
//!
//! [`CarveError::Io`] and [`CarveError::InvalidArgument`] end a run. Every
//! other variant describes why a single candidate was thrown away; the
//! driver logs it and keeps scanning.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CarveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated {structure} at {at}: need {needed} bytes, {available} available")]
    TruncatedRecord {
        structure: &'static str,
        at: usize,
        needed: usize,
        available: usize,
    },

    #[error("archive of {length} bytes cannot end at {end:#x}")]
    NegativeSpan { end: u64, length: u64 },

    #[error("archive span {start:#x}+{length} exceeds medium size {medium_size}")]
    SpanExceedsInput {
        start: u64,
        length: u64,
        medium_size: u64,
    },

    #[error("entry counts {this_disk}/{total} do not match the 3-entry MuseScore layout")]
    EntryCountMismatch { this_disk: u16, total: u16 },

    #[error("fewer than two local file headers in candidate")]
    FewerThanTwoLocalHeaders,

    #[error("second entry {name:?} is not a .mscx score")]
    NotMuseScore { name: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CarveError {
    /// Whether this error must stop the whole scan.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CarveError::Io(_) | CarveError::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, CarveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_medium_and_argument_errors_are_fatal() {
        let io = CarveError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_fatal());
        assert!(CarveError::InvalidArgument("chunk".into()).is_fatal());

        assert!(!CarveError::FewerThanTwoLocalHeaders.is_fatal());
        assert!(!CarveError::NegativeSpan { end: 10, length: 20 }.is_fatal());
        assert!(!CarveError::TruncatedRecord {
            structure: "EOCD record",
            at: 0,
            needed: 22,
            available: 3
        }
        .is_fatal());
    }

    #[test]
    fn messages_carry_offsets() {
        let err = CarveError::SpanExceedsInput {
            start: 0x10,
            length: 99,
            medium_size: 50,
        };
        assert_eq!(
            err.to_string(),
            "archive span 0x10+99 exceeds medium size 50"
        );
    }
}
