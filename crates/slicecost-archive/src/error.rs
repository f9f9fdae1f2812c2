//! Error types for archive operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a sliced job archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The container is missing, unreadable, or not a ZIP archive
    #[error("Failed to open archive {}: {source}", path.display())]
    Open {
        /// Path that was being opened
        path: PathBuf,
        /// Underlying ZIP (or I/O) failure
        #[source]
        source: zip::result::ZipError,
    },

    /// No entry with the requested exact path
    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    /// Decompression or I/O failure while reading a selected entry
    #[error("Failed to read archive entry '{entry}': {source}")]
    Read {
        /// Entry path within the archive
        entry: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Entry exceeds the buffering limit
    #[error("Entry '{name}' is too large ({size} bytes, max {max} bytes)")]
    FileTooLarge {
        /// Entry path within the archive
        name: String,
        /// Declared uncompressed size in bytes
        size: u64,
        /// Maximum allowed size in bytes
        max: u64,
    },
}

impl ArchiveError {
    /// Build a read error for `entry` from an I/O failure on its stream.
    pub fn read(entry: &str, source: std::io::Error) -> Self {
        Self::Read {
            entry: entry.to_string(),
            source,
        }
    }

    /// Build a read error for `entry` from a ZIP-level failure.
    pub(crate) fn zip_read(entry: &str, source: zip::result::ZipError) -> Self {
        Self::read(entry, source.into())
    }
}
