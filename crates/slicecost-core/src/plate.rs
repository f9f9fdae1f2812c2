//! Plate descriptor extraction from `Metadata/plate_<n>.json`
//!
//! Each descriptor is small, so it is buffered whole and decoded with
//! serde. Entries with other names are never decompressed.

use crate::error::{Result, SliceError};
use crate::types::ObjectBoundingBox;
use regex::Regex;
use serde::Deserialize;
use slicecost_archive::{read_entry, SlicedArchive};
use std::sync::LazyLock;

static RE_PLATE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Metadata/plate_(\d+)\.json$").expect("valid plate entry regex")
});

/// Plate number encoded in a descriptor entry path, if the path is one.
///
/// ```
/// use slicecost_core::plate::plate_number;
///
/// assert_eq!(plate_number("Metadata/plate_3.json"), Some(3));
/// assert_eq!(plate_number("Metadata/plate_3.png"), None);
/// ```
#[must_use]
pub fn plate_number(entry: &str) -> Option<u32> {
    RE_PLATE_ENTRY
        .captures(entry)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Objects placed on one build plate.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateDescriptor {
    pub plate: u32,
    pub objects: Vec<ObjectBoundingBox>,
}

#[derive(Debug, Deserialize)]
struct PlateDocument {
    bbox_objects: Vec<PlateObject>,
}

#[derive(Debug, Deserialize)]
struct PlateObject {
    name: String,
    area: f64,
    bbox: Vec<f64>,
}

impl PlateObject {
    /// `bbox` is `[h, w, d]`; each axis is rounded up independently so the
    /// reported footprint never understates the object.
    fn into_bounding_box(self, plate: u32, entry: &str) -> Result<ObjectBoundingBox> {
        let [h, w, d] = match self.bbox.as_slice() {
            [h, w, d, ..] => [*h, *w, *d],
            other => {
                return Err(SliceError::PlateParse {
                    entry: entry.to_string(),
                    message: format!(
                        "object '{}' has {} bbox value(s), expected 3",
                        self.name,
                        other.len()
                    ),
                })
            }
        };

        Ok(ObjectBoundingBox {
            plate,
            name: self.name,
            area: self.area,
            x: w.ceil() as i64,
            y: d.ceil() as i64,
            z: h.ceil() as i64,
        })
    }
}

/// Reads every plate descriptor in a sliced archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlateDescriptorExtractor;

impl PlateDescriptorExtractor {
    /// Parse all `Metadata/plate_<n>.json` entries, ordered by plate number.
    ///
    /// # Errors
    ///
    /// `SliceError::PlateParse` if any descriptor is malformed; the whole
    /// extraction fails rather than returning a partial plate list.
    pub fn from_archive(&self, archive: &mut SlicedArchive) -> Result<Vec<PlateDescriptor>> {
        let mut plates = archive.visit_matching(
            |name| plate_number(name).is_some(),
            |name, reader| {
                let plate = plate_number(name).unwrap_or_default();
                let bytes = read_entry(name, reader)?;
                self.parse(name, plate, &bytes)
            },
        )?;

        plates.sort_by_key(|descriptor| descriptor.plate);
        log::debug!("Parsed {} plate descriptor(s)", plates.len());
        Ok(plates)
    }

    /// Decode one descriptor document.
    ///
    /// # Errors
    ///
    /// `SliceError::PlateParse` on invalid JSON, a missing `bbox_objects`
    /// list, or an object without a usable `bbox`.
    pub fn parse(&self, entry: &str, plate: u32, bytes: &[u8]) -> Result<PlateDescriptor> {
        let document: PlateDocument =
            serde_json::from_slice(bytes).map_err(|e| SliceError::PlateParse {
                entry: entry.to_string(),
                message: e.to_string(),
            })?;

        let objects = document
            .bbox_objects
            .into_iter()
            .map(|object| object.into_bounding_box(plate, entry))
            .collect::<Result<Vec<_>>>()?;

        Ok(PlateDescriptor { plate, objects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLATE_JSON: &str = r#"{
        "bbox_all": [80.1, 80.2, 175.9, 175.8],
        "bed_type": "textured_plate",
        "bbox_objects": [
            {"area": 52.02, "bbox": [10.2, 5.1, 3.9], "id": 97, "layer_height": 0.2, "name": "bracket.stl"},
            {"area": 400.0, "bbox": [20.0, 20.0, 20.0], "id": 112, "layer_height": 0.2, "name": "cube"}
        ],
        "first_extruder": 0
    }"#;

    #[test]
    fn test_plate_number_matches_descriptor_paths_only() {
        assert_eq!(plate_number("Metadata/plate_1.json"), Some(1));
        assert_eq!(plate_number("Metadata/plate_12.json"), Some(12));
        assert_eq!(plate_number("Metadata/plate_1.png"), None);
        assert_eq!(plate_number("Metadata/plate_.json"), None);
        assert_eq!(plate_number("Metadata/plate_no_light_1.png"), None);
        assert_eq!(plate_number("Other/Metadata/plate_1.json"), None);
        assert_eq!(plate_number("Metadata/plate_1.json.bak"), None);
    }

    #[test]
    fn test_bbox_axes_reordered_and_rounded_up() {
        let descriptor = PlateDescriptorExtractor
            .parse("Metadata/plate_1.json", 1, PLATE_JSON.as_bytes())
            .expect("valid descriptor");

        let bracket = &descriptor.objects[0];
        assert_eq!(bracket.name, "bracket.stl");
        assert_eq!((bracket.x, bracket.y, bracket.z), (6, 4, 11));
        assert!((bracket.area - 52.02).abs() < 1e-9);
        assert_eq!(bracket.plate, 1);
    }

    #[test]
    fn test_whole_numbers_are_not_bumped() {
        let descriptor = PlateDescriptorExtractor
            .parse("Metadata/plate_1.json", 1, PLATE_JSON.as_bytes())
            .expect("valid descriptor");

        let cube = &descriptor.objects[1];
        assert_eq!((cube.x, cube.y, cube.z), (20, 20, 20));
    }

    #[test]
    fn test_empty_object_list_is_valid() {
        let descriptor = PlateDescriptorExtractor
            .parse("Metadata/plate_2.json", 2, br#"{"bbox_objects": []}"#)
            .expect("valid descriptor");
        assert!(descriptor.objects.is_empty());
    }

    #[test]
    fn test_missing_object_list_is_error() {
        let result = PlateDescriptorExtractor.parse("Metadata/plate_1.json", 1, br#"{"bbox_all": []}"#);
        assert!(matches!(result, Err(SliceError::PlateParse { .. })));
    }

    #[test]
    fn test_short_bbox_is_error() {
        let json = br#"{"bbox_objects": [{"name": "a", "area": 1.0, "bbox": [1.0, 2.0]}]}"#;
        let result = PlateDescriptorExtractor.parse("Metadata/plate_1.json", 1, json);
        assert!(
            matches!(result, Err(SliceError::PlateParse { ref message, .. }) if message.contains("expected 3"))
        );
    }

    #[test]
    fn test_invalid_json_is_error() {
        let result = PlateDescriptorExtractor.parse("Metadata/plate_1.json", 1, b"{not json");
        assert!(matches!(result, Err(SliceError::PlateParse { .. })));
    }
}
