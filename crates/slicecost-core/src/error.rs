//! Error types for slice analysis.
//!
//! Every extraction failure aborts the whole job. Missing optional data
//! inside an otherwise well-formed stream (no `filament` element, no
//! duration annotation) is not an error and is reported as zero instead.

use slicecost_archive::ArchiveError;
use std::path::PathBuf;
use thiserror::Error;

/// Error types that can occur while analyzing a sliced job.
///
/// # Examples
///
/// ```no_run
/// use slicecost_core::{AnalysisPipeline, SliceError};
/// use std::path::Path;
///
/// let pipeline = AnalysisPipeline::default();
/// match pipeline.analyze(Path::new("slice.3mf"), Path::new("out/")) {
///     Ok(result) => println!("{} s", result.print_time_summary.total_seconds),
///     Err(SliceError::NoPrintableOutput { dir }) => {
///         eprintln!("slicer produced no G-code in {}", dir.display());
///     }
///     Err(e) => eprintln!("analysis failed: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum SliceError {
    /// Archive could not be opened, an entry is missing, or an entry
    /// could not be decompressed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The material-usage XML is not well formed.
    #[error("Failed to parse metadata entry '{entry}': {message}")]
    MetadataParse {
        /// Archive entry holding the XML
        entry: String,
        /// Parser diagnostic
        message: String,
    },

    /// A plate descriptor is not valid JSON or lacks its object list.
    #[error("Failed to parse plate descriptor '{entry}': {message}")]
    PlateParse {
        /// Archive entry holding the descriptor
        entry: String,
        /// Parser diagnostic
        message: String,
    },

    /// The duration-source directory holds no G-code at all.
    #[error("No printable output (.gcode) found in {}", dir.display())]
    NoPrintableOutput {
        /// Directory that was searched
        dir: PathBuf,
    },

    /// I/O failure while enumerating or reading duration streams.
    #[error("Failed to read print output {}: {source}", path.display())]
    DurationRead {
        /// File or directory being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Plate descriptors and duration streams disagree on the plate count.
    #[error(
        "Plate count mismatch: {descriptors} plate descriptor(s) but {outputs} print output(s)"
    )]
    PlateCountMismatch {
        /// Distinct plates described in the archive
        descriptors: usize,
        /// G-code streams found
        outputs: usize,
    },

    /// Cost inputs or material profile out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for slice analysis.
pub type Result<T> = std::result::Result<T, SliceError>;
