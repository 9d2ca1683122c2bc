//! Storage error kinds.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`RecordLog`](super::RecordLog) and the typed stores on
/// top of it.
///
/// A missing partition is never an error: queries and totals over a chat
/// that has not written anything yet return empty results.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure while opening, writing, syncing or reading a partition.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored line could not be parsed back into a record. The format is
    /// produced only by this crate, so this indicates a storage bug or an
    /// externally edited file.
    #[error("malformed record in partition '{partition}': {reason} (line: {line:?})")]
    Parse {
        partition: String,
        line: String,
        reason: String,
    },

    /// A field would corrupt the line format if written.
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: usize, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
