//! Failure taxonomy of the pipeline stages
//!
//! Stages report errors through [`PipelineError`] so that the retry policy can
//! tell transient I/O trouble (worth another attempt) apart from malformed
//! data (which will be just as malformed on the next attempt). Records that
//! merely lack a field inspected by a filter are not errors at all: they are
//! dropped by the filter.

use std::{io, path::Path};

/// Error from one of the pipeline stages
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A resource could not be read from or written to
    #[error("I/O failure while {action} {path}")]
    Io {
        /// What we were trying to do, e.g. "reading"
        action: &'static str,

        /// Resource that we were trying to access
        path: Box<str>,

        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A record lacks a required field or has a field of the wrong type
    #[error("malformed record at {location}: {detail}")]
    Schema {
        /// Where the record came from, e.g. "reviews.json:42"
        location: Box<str>,

        /// What is wrong with it
        detail: Box<str>,
    },

    /// Well-formed records could not be encoded into an output file
    #[error("failed to encode {path}: {detail}")]
    Encoding {
        /// Output file that was being produced
        path: Box<str>,

        /// Reported by the encoder
        detail: Box<str>,
    },

    /// An object store destination key escapes the store
    #[error("invalid destination key {key:?}")]
    Destination {
        /// Offending key
        key: Box<str>,
    },
}
//
impl PipelineError {
    /// Build an I/O error about some filesystem path
    pub fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.display().to_string().into(),
            source,
        }
    }

    /// Build a schema error
    pub fn schema(location: impl Into<Box<str>>, detail: impl ToString) -> Self {
        Self::Schema {
            location: location.into(),
            detail: detail.to_string().into(),
        }
    }

    /// Build an encoding error about some output file
    pub fn encoding(path: &Path, detail: impl ToString) -> Self {
        Self::Encoding {
            path: path.display().to_string().into(),
            detail: detail.to_string().into(),
        }
    }

    /// Truth that retrying the failed operation could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
