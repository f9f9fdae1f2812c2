//! ZIP container access for sliced job archives
//!
//! Entries are decompressed on demand. Entries that are not selected are
//! never decompressed, so enumeration runs in constant memory regardless
//! of what else the slicer packed into the archive.

use crate::error::ArchiveError;
use crate::MAX_ENTRY_SIZE;
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::ZipArchive;

/// An open, read-only sliced job archive.
///
/// Holds a single read handle to the underlying file, released when the
/// value is dropped (including on every error path).
#[derive(Debug)]
pub struct SlicedArchive {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl SlicedArchive {
    /// Open the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::Open` if the file is missing, unreadable, or
    /// not a valid ZIP container.
    #[must_use = "opening an archive returns a handle that should be used"]
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let open_err = |source: ZipError| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(|e| open_err(ZipError::Io(e)))?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(open_err)?;

        debug!(
            "Opened archive {} ({} entries)",
            path.display(),
            archive.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Path this archive was opened from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries (files and directories) in the central directory
    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive has no entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Entry paths in central-directory order
    #[must_use]
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_owned).collect()
    }

    /// Open the entry whose path is exactly `exact_path`.
    ///
    /// The returned stream is sequential and meant to be read once.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::EntryNotFound` if no entry has that path, or
    /// `ArchiveError::Read` if the entry header cannot be decoded.
    pub fn open_single(&mut self, exact_path: &str) -> Result<impl Read + '_, ArchiveError> {
        match self.archive.by_name(exact_path) {
            Ok(entry) => {
                debug!("Reading entry {exact_path} ({} bytes)", entry.size());
                Ok(entry)
            }
            Err(ZipError::FileNotFound) => Err(ArchiveError::EntryNotFound(exact_path.to_string())),
            Err(e) => Err(ArchiveError::zip_read(exact_path, e)),
        }
    }

    /// Visit every file entry whose path satisfies `predicate`, in
    /// central-directory order.
    ///
    /// `visitor` receives the entry path and its decompressed stream and
    /// runs to completion before the next entry is opened. The first error,
    /// from the archive or from `visitor`, aborts the remaining enumeration.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::Read` (converted into `E`) if a selected entry
    /// cannot be opened, or whatever error `visitor` returns.
    pub fn visit_matching<T, E, P, F>(&mut self, mut predicate: P, mut visitor: F) -> Result<Vec<T>, E>
    where
        P: FnMut(&str) -> bool,
        F: FnMut(&str, &mut dyn Read) -> Result<T, E>,
        E: From<ArchiveError>,
    {
        let selected: Vec<String> = self
            .archive
            .file_names()
            .filter(|name| !name.ends_with('/') && predicate(name))
            .map(str::to_owned)
            .collect();

        debug!(
            "{} of {} entries selected in {}",
            selected.len(),
            self.archive.len(),
            self.path.display()
        );

        let mut results = Vec::with_capacity(selected.len());
        for name in &selected {
            let mut entry = self
                .archive
                .by_name(name)
                .map_err(|e| ArchiveError::zip_read(name, e))?;
            results.push(visitor(name, &mut entry)?);
        }

        Ok(results)
    }
}

/// Read a whole entry stream into memory, refusing anything over `max` bytes.
///
/// # Errors
///
/// Returns `ArchiveError::FileTooLarge` when the stream yields more than
/// `max` bytes, or `ArchiveError::Read` on I/O failure.
pub fn read_bounded(name: &str, reader: &mut dyn Read, max: u64) -> Result<Vec<u8>, ArchiveError> {
    let mut contents = Vec::new();
    reader
        .take(max.saturating_add(1))
        .read_to_end(&mut contents)
        .map_err(|e| ArchiveError::read(name, e))?;

    let size = contents.len() as u64;
    if size > max {
        return Err(ArchiveError::FileTooLarge {
            name: name.to_string(),
            size,
            max,
        });
    }

    Ok(contents)
}

/// [`read_bounded`] with the crate-wide [`MAX_ENTRY_SIZE`] limit.
///
/// # Errors
///
/// See [`read_bounded`].
pub fn read_entry(name: &str, reader: &mut dyn Read) -> Result<Vec<u8>, ArchiveError> {
    read_bounded(name, reader, MAX_ENTRY_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use zip::write::{SimpleFileOptions, ZipWriter};

    /// Helper: Create a small sliced-job-like archive
    fn create_test_archive() -> Result<NamedTempFile, Box<dyn std::error::Error>> {
        let temp_file = NamedTempFile::new()?;
        let mut zip = ZipWriter::new(temp_file.reopen()?);
        let options = SimpleFileOptions::default();

        zip.add_directory("Metadata/", options)?;

        zip.start_file("Metadata/slice_info.config", options)?;
        zip.write_all(b"<config></config>")?;

        zip.start_file("Metadata/plate_1.json", options)?;
        zip.write_all(b"{\"bbox_objects\":[]}")?;

        zip.start_file("Metadata/plate_2.json", options)?;
        zip.write_all(b"{\"bbox_objects\":[]}")?;

        zip.start_file("3D/3dmodel.model", options)?;
        zip.write_all(b"<model/>")?;

        zip.finish()?;

        Ok(temp_file)
    }

    #[test]
    fn test_open_single_reads_entry() {
        let temp_zip = create_test_archive().expect("Failed to create test archive");
        let mut archive = SlicedArchive::open(temp_zip.path()).expect("Failed to open archive");

        let mut content = String::new();
        archive
            .open_single("Metadata/slice_info.config")
            .expect("entry should exist")
            .read_to_string(&mut content)
            .expect("entry should be readable");

        assert_eq!(content, "<config></config>");
    }

    #[test]
    fn test_open_single_missing_entry() {
        let temp_zip = create_test_archive().expect("Failed to create test archive");
        let mut archive = SlicedArchive::open(temp_zip.path()).expect("Failed to open archive");

        let result = archive.open_single("Metadata/does_not_exist.config");
        assert!(
            matches!(result, Err(ArchiveError::EntryNotFound(ref name)) if name == "Metadata/does_not_exist.config"),
            "Should report the missing path"
        );
    }

    #[test]
    fn test_open_single_requires_exact_path() {
        let temp_zip = create_test_archive().expect("Failed to create test archive");
        let mut archive = SlicedArchive::open(temp_zip.path()).expect("Failed to open archive");

        assert!(archive.open_single("slice_info.config").is_err());
        assert!(archive.open_single("metadata/slice_info.config").is_err());
    }

    #[test]
    fn test_visit_matching_selects_entries_in_order() {
        let temp_zip = create_test_archive().expect("Failed to create test archive");
        let mut archive = SlicedArchive::open(temp_zip.path()).expect("Failed to open archive");

        let visited = archive
            .visit_matching(
                |name| name.starts_with("Metadata/plate_"),
                |name, reader| {
                    let bytes = read_entry(name, reader)?;
                    Ok::<_, ArchiveError>((name.to_string(), bytes.len()))
                },
            )
            .expect("Failed to visit entries");

        assert_eq!(
            visited,
            vec![
                ("Metadata/plate_1.json".to_string(), 19),
                ("Metadata/plate_2.json".to_string(), 19),
            ]
        );
    }

    #[test]
    fn test_visit_matching_skips_directories() {
        let temp_zip = create_test_archive().expect("Failed to create test archive");
        let mut archive = SlicedArchive::open(temp_zip.path()).expect("Failed to open archive");

        let visited = archive
            .visit_matching(
                |name| name.starts_with("Metadata"),
                |name, _| Ok::<_, ArchiveError>(name.to_string()),
            )
            .expect("Failed to visit entries");

        assert_eq!(visited.len(), 3);
        assert!(!visited.iter().any(|name| name.ends_with('/')));
    }

    #[test]
    fn test_visit_matching_stops_on_visitor_error() {
        let temp_zip = create_test_archive().expect("Failed to create test archive");
        let mut archive = SlicedArchive::open(temp_zip.path()).expect("Failed to open archive");

        let mut calls = 0;
        let result: Result<Vec<()>, ArchiveError> = archive.visit_matching(
            |name| name.ends_with(".json"),
            |name, _| {
                calls += 1;
                Err(ArchiveError::EntryNotFound(name.to_string()))
            },
        );

        assert!(result.is_err());
        assert_eq!(calls, 1, "Enumeration should abort after the first failure");
    }

    #[test]
    fn test_entry_names_in_directory_order() {
        let temp_zip = create_test_archive().expect("Failed to create test archive");
        let archive = SlicedArchive::open(temp_zip.path()).expect("Failed to open archive");

        assert_eq!(
            archive.entry_names(),
            vec![
                "Metadata/",
                "Metadata/slice_info.config",
                "Metadata/plate_1.json",
                "Metadata/plate_2.json",
                "3D/3dmodel.model",
            ]
        );
        assert_eq!(archive.len(), 5);
    }

    #[test]
    fn test_corrupt_entry_data_is_read_error() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        {
            let mut zip = ZipWriter::new(temp_file.reopen().expect("Failed to reopen temp file"));
            let options = SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            zip.start_file("Metadata/plate_1.json", options)
                .expect("Failed to start entry");
            for id in 0..32 {
                write!(zip, "{{\"id\":{id},\"name\":\"part_{id}\",\"bbox\":[{id}.5,2.5,3.5]}}")
                    .expect("Failed to write entry");
            }
            zip.finish().expect("Failed to finish archive");
        }

        let (start, len) = {
            let mut zip = ZipArchive::new(File::open(temp_file.path()).expect("Failed to open"))
                .expect("Failed to read archive");
            let entry = zip.by_name("Metadata/plate_1.json").expect("entry should exist");
            (entry.data_start() as usize, entry.compressed_size() as usize)
        };
        assert!(len > 12);
        let mut bytes = std::fs::read(temp_file.path()).expect("Failed to read archive bytes");
        for byte in &mut bytes[start + 4..start + 12] {
            *byte ^= 0xA5;
        }
        std::fs::write(temp_file.path(), bytes).expect("Failed to write archive bytes");

        let mut archive = SlicedArchive::open(temp_file.path()).expect("Central directory is intact");
        let result = archive.visit_matching(
            |name| name.ends_with(".json"),
            |name, reader| read_entry(name, reader),
        );
        assert!(
            matches!(result, Err(ArchiveError::Read { ref entry, .. }) if entry == "Metadata/plate_1.json"),
            "got {result:?}"
        );
    }

    #[test]
    fn test_read_bounded_rejects_oversized_entry() {
        let mut data: &[u8] = b"0123456789";
        let result = read_bounded("big.json", &mut data, 4);
        assert!(matches!(
            result,
            Err(ArchiveError::FileTooLarge { size: 5, max: 4, .. })
        ));
    }

    #[test]
    fn test_read_bounded_accepts_exact_limit() {
        let mut data: &[u8] = b"0123";
        let bytes = read_bounded("small.json", &mut data, 4).expect("Should fit");
        assert_eq!(bytes, b"0123");
    }

    #[test]
    fn test_open_nonexistent_file() {
        let result = SlicedArchive::open(Path::new("nonexistent.3mf"));
        assert!(matches!(result, Err(ArchiveError::Open { .. })));
    }

    #[test]
    fn test_open_corrupt_archive() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        temp_file
            .write_all(b"this is not a zip container")
            .expect("Failed to write temp file");

        let result = SlicedArchive::open(temp_file.path());
        assert!(matches!(result, Err(ArchiveError::Open { .. })));
    }
}
