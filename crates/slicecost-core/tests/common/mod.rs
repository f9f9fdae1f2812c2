//! Fixture builders for sliced job output.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::ZipArchive;

pub const SLICE_INFO: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <header>
    <header_item key="X-BBL-Client-Type" value="slicer"/>
    <header_item key="X-BBL-Client-Version" value="01.09.00.70"/>
  </header>
  <plate>
    <metadata key="index" value="1"/>
    <filament id="1" type="PLA" color="#FFFFFF" used_m="1.5" used_g="4.47"/>
  </plate>
  <plate>
    <metadata key="index" value="2"/>
    <filament id="1" type="PLA" color="#FFFFFF" used_m="0.5" used_g="1.49"/>
  </plate>
</config>"##;

pub fn plate_json(objects: &[(&str, f64, [f64; 3])]) -> String {
    let objects: Vec<serde_json::Value> = objects
        .iter()
        .map(|(name, area, bbox)| {
            serde_json::json!({
                "area": area,
                "bbox": bbox,
                "id": 100,
                "layer_height": 0.2,
                "name": name,
            })
        })
        .collect();
    serde_json::json!({
        "bbox_objects": objects,
        "bed_type": "textured_plate",
        "nozzle_diameter": 0.4,
    })
    .to_string()
}

/// A slicer output directory: `slice.3mf` plus G-code files.
pub struct SlicedJob {
    pub dir: TempDir,
}

impl SlicedJob {
    pub fn archive(&self) -> PathBuf {
        self.dir.path().join("slice.3mf")
    }

    pub fn output_dir(&self) -> &Path {
        self.dir.path()
    }
}

pub struct JobBuilder {
    entries: Vec<(String, Vec<u8>)>,
    gcode: Vec<(String, String)>,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            gcode: Vec::new(),
        }
    }

    /// Two plates, two objects, 1h30m45s + 20m of printing, 2 m of PLA.
    pub fn two_plates() -> Self {
        Self::new()
            .entry("3D/3dmodel.model", "<model/>")
            .entry("Metadata/slice_info.config", SLICE_INFO)
            .entry(
                "Metadata/plate_2.json",
                &plate_json(&[("lid", 30.0, [4.0, 20.5, 20.5])]),
            )
            .entry(
                "Metadata/plate_1.json",
                &plate_json(&[("box", 52.02, [10.2, 5.1, 3.9])]),
            )
            .entry("Metadata/plate_1.png", "png")
            .gcode(
                "plate_1.gcode",
                "; HEADER_BLOCK_START\n; total estimated time: 1h 30m\n; HEADER_BLOCK_END\nG28\n; total estimated time: 45s\n",
            )
            .gcode("plate_2.gcode", "; total estimated time: 20m\nG28\n")
    }

    pub fn entry(mut self, name: &str, content: &str) -> Self {
        self.entries.push((name.to_string(), content.as_bytes().to_vec()));
        self
    }

    pub fn without_entry(mut self, name: &str) -> Self {
        self.entries.retain(|(entry, _)| entry != name);
        self
    }

    pub fn gcode(mut self, name: &str, content: &str) -> Self {
        self.gcode.push((name.to_string(), content.to_string()));
        self
    }

    pub fn without_gcode(mut self) -> Self {
        self.gcode.clear();
        self
    }

    pub fn build(self) -> SlicedJob {
        let dir = TempDir::new().expect("Failed to create temp dir");

        let file = fs::File::create(dir.path().join("slice.3mf")).expect("Failed to create archive");
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, content) in &self.entries {
            zip.start_file(name.as_str(), options).expect("Failed to start entry");
            zip.write_all(content).expect("Failed to write entry");
        }
        zip.finish().expect("Failed to finish archive");

        for (name, content) in &self.gcode {
            fs::write(dir.path().join(name), content).expect("Failed to write gcode");
        }

        SlicedJob { dir }
    }
}

/// Flip a run of bytes inside the compressed data of `entry`, leaving the
/// headers and central directory intact.
pub fn corrupt_entry_data(archive: &Path, entry: &str) {
    let (start, len) = {
        let mut zip = ZipArchive::new(fs::File::open(archive).expect("Failed to open archive"))
            .expect("Failed to read archive");
        let file = zip.by_name(entry).expect("entry should exist");
        (file.data_start() as usize, file.compressed_size() as usize)
    };
    assert!(len > 12, "entry too small to corrupt");

    let mut bytes = fs::read(archive).expect("Failed to read archive bytes");
    for byte in &mut bytes[start + 4..start + 12] {
        *byte ^= 0xA5;
    }
    fs::write(archive, bytes).expect("Failed to write archive bytes");
}
