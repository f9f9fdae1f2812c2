//! Read-only access to sliced job archives
//!
//! A slicing run exports a 3MF file: a ZIP container holding per-plate
//! JSON descriptors and an XML material-usage config under `Metadata/`.
//! This crate opens such a container and hands out entry streams, either
//! one entry by exact path or every entry whose path satisfies a predicate.
//!
//! # Usage
//!
//! ## Read a single entry
//!
//! ```no_run
//! use slicecost_archive::SlicedArchive;
//! use std::io::Read;
//! use std::path::Path;
//!
//! let mut archive = SlicedArchive::open(Path::new("slice.3mf")).unwrap();
//! let mut config = String::new();
//! archive
//!     .open_single("Metadata/slice_info.config")
//!     .unwrap()
//!     .read_to_string(&mut config)
//!     .unwrap();
//! ```
//!
//! ## Visit matching entries
//!
//! ```no_run
//! use slicecost_archive::{ArchiveError, SlicedArchive};
//! use std::path::Path;
//!
//! let mut archive = SlicedArchive::open(Path::new("slice.3mf")).unwrap();
//! let names = archive
//!     .visit_matching(
//!         |name| name.ends_with(".json"),
//!         |name, _reader| Ok::<_, ArchiveError>(name.to_string()),
//!     )
//!     .unwrap();
//! println!("{names:?}");
//! ```

pub mod error;
pub mod reader;

/// Maximum uncompressed size of an entry that may be buffered in memory (16 MB).
///
/// Plate descriptors are a few kilobytes; anything past this limit is
/// refused rather than read.
pub const MAX_ENTRY_SIZE: u64 = 16 * 1024 * 1024;

pub use error::ArchiveError;
pub use reader::{read_bounded, read_entry, SlicedArchive};
