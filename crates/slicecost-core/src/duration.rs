//! Print duration aggregation over per-plate G-code output
//!
//! The slicer annotates each G-code file with lines such as
//! `; total estimated time: 1d 2h 3m 4s`, where every unit is optional.
//! Files are read line by line and never loaded whole.

use crate::error::{Result, SliceError};
use crate::types::PrintTimeSummary;
use regex::Regex;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

/// File extension of eligible duration streams
pub const GCODE_EXTENSION: &str = "gcode";

/// Source label reported when [`PrintDurationAggregator::from_streams`] gets nothing
pub const IN_MEMORY_STREAMS: &str = "(in-memory streams)";

static RE_TOTAL_ESTIMATED_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"total estimated time: (?:(\d+)d\s*)?(?:(\d+)h\s*)?(?:(\d+)m\s*)?(?:(\d+)s)?")
        .expect("valid estimated time regex")
});

/// Seconds stated by a duration annotation on `line`, if it carries one.
///
/// ```
/// use slicecost_core::duration::annotated_seconds;
///
/// assert_eq!(annotated_seconds("; total estimated time: 1h 30m"), Some(5400));
/// assert_eq!(annotated_seconds("G1 X10 Y10"), None);
/// ```
#[must_use]
pub fn annotated_seconds(line: &str) -> Option<u64> {
    let caps = RE_TOTAL_ESTIMATED_TIME.captures(line)?;

    let unit = |index: usize, scale: u64| -> u64 {
        caps.get(index).map_or(0, |m| match m.as_str().parse::<u64>() {
            Ok(value) => value.saturating_mul(scale),
            Err(e) => {
                log::warn!("Ignoring out-of-range time component '{}': {e}", m.as_str());
                0
            }
        })
    };

    Some(
        unit(1, 86_400)
            .saturating_add(unit(2, 3_600))
            .saturating_add(unit(3, 60))
            .saturating_add(unit(4, 1)),
    )
}

/// Sum every duration annotation in one stream.
///
/// A stream without annotations yields `0`. Lines are decoded lossily so
/// stray non-UTF-8 bytes in G-code comments do not abort the read.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub fn stream_seconds<R: BufRead>(reader: R) -> std::io::Result<u64> {
    reader.split(b'\n').try_fold(0_u64, |total, line| {
        let line = line?;
        let seconds = annotated_seconds(&String::from_utf8_lossy(&line)).unwrap_or(0);
        Ok(total.saturating_add(seconds))
    })
}

/// Aggregates print durations across a job's G-code streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintDurationAggregator;

impl PrintDurationAggregator {
    /// Aggregate every `*.gcode` file directly inside `dir`, sorted by file name.
    ///
    /// # Errors
    ///
    /// `SliceError::NoPrintableOutput` if `dir` holds no G-code file,
    /// `SliceError::DurationRead` on any I/O failure.
    pub fn from_directory(&self, dir: &Path) -> Result<PrintTimeSummary> {
        let read_err = |path: &Path, source: std::io::Error| SliceError::DurationRead {
            path: path.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for dir_entry in fs::read_dir(dir).map_err(|e| read_err(dir, e))? {
            let dir_entry = dir_entry.map_err(|e| read_err(dir, e))?;
            let path = dir_entry.path();
            let is_gcode = path
                .extension()
                .is_some_and(|ext| ext == GCODE_EXTENSION);
            if is_gcode && path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if files.is_empty() {
            return Err(SliceError::NoPrintableOutput {
                dir: dir.to_path_buf(),
            });
        }

        let plates = files
            .iter()
            .map(|path| {
                let file = File::open(path).map_err(|e| read_err(path, e))?;
                let seconds = stream_seconds(BufReader::new(file)).map_err(|e| read_err(path, e))?;
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                log::debug!("{name}: {seconds} s estimated");
                Ok((name, seconds))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PrintTimeSummary::from_plates(plates))
    }

    /// Aggregate already-open named streams, keeping their given order.
    ///
    /// # Errors
    ///
    /// `SliceError::NoPrintableOutput` if `streams` is empty,
    /// `SliceError::DurationRead` if a stream fails mid-read.
    pub fn from_streams<I, R>(&self, streams: I) -> Result<PrintTimeSummary>
    where
        I: IntoIterator<Item = (String, R)>,
        R: BufRead,
    {
        let plates = streams
            .into_iter()
            .map(|(name, reader)| {
                let seconds = stream_seconds(reader).map_err(|source| SliceError::DurationRead {
                    path: name.clone().into(),
                    source,
                })?;
                Ok((name, seconds))
            })
            .collect::<Result<Vec<_>>>()?;

        if plates.is_empty() {
            return Err(SliceError::NoPrintableOutput {
                dir: IN_MEMORY_STREAMS.into(),
            });
        }

        Ok(PrintTimeSummary::from_plates(plates))
    }
}
