//! Filament usage extraction from `Metadata/slice_info.config`
//!
//! The slicer writes one `<filament .../>` element per filament slot and
//! plate, each with a `used_m` attribute holding meters of filament
//! consumed. The document is read incrementally; the total is a fold over
//! the attribute values of every matching element.

use crate::error::{Result, SliceError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use slicecost_archive::{ArchiveError, SlicedArchive};
use std::io::{BufRead, BufReader, Read};

/// Archive entry holding the slicer's material-usage XML
pub const SLICE_INFO_ENTRY: &str = "Metadata/slice_info.config";

/// Element carrying per-filament usage
pub const FILAMENT_TAG: &str = "filament";

/// Attribute holding the used length in meters
pub const USED_METERS_ATTRIBUTE: &str = "used_m";

/// Sums a numeric attribute across every element with a given tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilamentUsageExtractor {
    tag: String,
    attribute: String,
}

impl Default for FilamentUsageExtractor {
    fn default() -> Self {
        Self::new(FILAMENT_TAG, USED_METERS_ATTRIBUTE)
    }
}

impl FilamentUsageExtractor {
    #[must_use]
    pub fn new(tag: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attribute: attribute.into(),
        }
    }

    /// Read [`SLICE_INFO_ENTRY`] from `archive` and return the used length in meters.
    ///
    /// # Errors
    ///
    /// `SliceError::Archive` if the entry is missing or unreadable,
    /// `SliceError::MetadataParse` if the XML is malformed.
    pub fn from_archive(&self, archive: &mut SlicedArchive) -> Result<f64> {
        let stream = archive.open_single(SLICE_INFO_ENTRY)?;
        self.used_length(SLICE_INFO_ENTRY, stream)
    }

    /// Sum the configured attribute over the XML document in `reader`.
    ///
    /// Elements lacking the attribute, or carrying a value that is not a
    /// finite non-negative number, contribute nothing. A document with no
    /// matching element yields `0.0`.
    ///
    /// # Errors
    ///
    /// `SliceError::MetadataParse` on malformed XML, including input with no
    /// root element or stray text at the top level. `SliceError::Archive`
    /// if the underlying stream fails.
    pub fn used_length<R: Read>(&self, entry: &str, reader: R) -> Result<f64> {
        let total = AttributeValues::new(self, entry, BufReader::new(reader))
            .try_fold(0.0_f64, |total, value| value.map(|v| total + v.unwrap_or(0.0)))?;

        log::debug!("{entry}: {total:.4} m of filament used");
        Ok(total)
    }
}

/// Lazily yields the parsed attribute of each closed matching element.
///
/// `Ok(None)` marks an element whose attribute is absent or unusable.
struct AttributeValues<'a, R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    tag: &'a [u8],
    attribute: &'a [u8],
    entry: &'a str,
    /// Attribute values of matching elements awaiting their end tag
    open: Vec<Option<f64>>,
    depth: usize,
    seen_root: bool,
    finished: bool,
}

impl<'a, R: BufRead> AttributeValues<'a, R> {
    fn new(extractor: &'a FilamentUsageExtractor, entry: &'a str, source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        Self {
            reader,
            buf: Vec::new(),
            tag: extractor.tag.as_bytes(),
            attribute: extractor.attribute.as_bytes(),
            entry,
            open: Vec::new(),
            depth: 0,
            seen_root: false,
            finished: false,
        }
    }
}

impl<R: BufRead> AttributeValues<'_, R> {
    /// Stop iterating and report `message` against the entry.
    fn malformed(&mut self, message: String) -> SliceError {
        self.finished = true;
        SliceError::MetadataParse {
            entry: self.entry.to_string(),
            message,
        }
    }
}

impl<R: BufRead> Iterator for AttributeValues<'_, R> {
    type Item = Result<Option<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Empty(e)) => {
                    self.seen_root = true;
                    if e.name().as_ref() == self.tag {
                        return Some(Ok(attribute_value(&e, self.attribute, self.entry)));
                    }
                }
                Ok(Event::Start(e)) => {
                    self.seen_root = true;
                    self.depth += 1;
                    if e.name().as_ref() == self.tag {
                        let value = attribute_value(&e, self.attribute, self.entry);
                        self.open.push(value);
                    }
                }
                Ok(Event::End(e)) => {
                    self.depth = self.depth.saturating_sub(1);
                    if e.name().as_ref() == self.tag {
                        if let Some(value) = self.open.pop() {
                            return Some(Ok(value));
                        }
                    }
                }
                // Whitespace is trimmed, so any text outside the root is content
                Ok(Event::Text(_)) if self.depth == 0 => {
                    return Some(Err(self.malformed(
                        "character data outside the root element".to_string(),
                    )));
                }
                Ok(Event::Eof) => {
                    if self.depth > 0 {
                        let message = format!(
                            "unexpected end of document with {} unclosed element(s)",
                            self.depth
                        );
                        return Some(Err(self.malformed(message)));
                    }
                    if !self.seen_root {
                        return Some(Err(self.malformed("no root element".to_string())));
                    }
                    self.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(quick_xml::Error::Io(e)) => {
                    let source = std::io::Error::new(e.kind(), e.to_string());
                    let error = SliceError::Archive(ArchiveError::read(self.entry, source));
                    self.finished = true;
                    return Some(Err(error));
                }
                Err(e) => {
                    let message = format!("{e} (at byte {})", self.reader.buffer_position());
                    return Some(Err(self.malformed(message)));
                }
            }
        }
    }
}

fn attribute_value(element: &BytesStart<'_>, attribute: &[u8], entry: &str) -> Option<f64> {
    let attr = element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == attribute)?;
    let raw = String::from_utf8_lossy(&attr.value);

    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        _ => {
            log::warn!(
                "{entry}: ignoring unusable {}=\"{raw}\"",
                String::from_utf8_lossy(attribute)
            );
            None
        }
    }
}
