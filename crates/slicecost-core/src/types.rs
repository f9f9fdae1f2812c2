//! Result records produced by an analysis run.

use crate::cost::CostBreakdown;
use serde::{Deserialize, Serialize};

/// Footprint of one printed object, rounded up per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectBoundingBox {
    /// Plate number taken from `plate_<n>.json`
    pub plate: u32,
    /// Object name as exported by the slicer
    pub name: String,
    /// Projected area on the build plate
    pub area: f64,
    /// Width, `ceil(bbox[1])`
    pub x: i64,
    /// Depth, `ceil(bbox[2])`
    pub y: i64,
    /// Height, `ceil(bbox[0])`
    pub z: i64,
}

/// Estimated print time across all plates.
///
/// `total_seconds` is the sum of `plate_times`, and `plate_count` is its
/// length. Order follows `sources`, which is sorted by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintTimeSummary {
    pub total_seconds: u64,
    pub plate_times: Vec<u64>,
    pub plate_count: usize,
    /// Stream names, one per entry of `plate_times`
    pub sources: Vec<String>,
}

impl PrintTimeSummary {
    /// Build a summary from `(source name, seconds)` pairs, preserving order.
    #[must_use]
    pub fn from_plates(plates: Vec<(String, u64)>) -> Self {
        let (sources, plate_times): (Vec<String>, Vec<u64>) = plates.into_iter().unzip();
        Self {
            total_seconds: plate_times.iter().sum(),
            plate_count: plate_times.len(),
            plate_times,
            sources,
        }
    }
}

/// Everything derived from one sliced job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub bounding_boxes: Vec<ObjectBoundingBox>,
    pub print_time_summary: PrintTimeSummary,
    /// Summed `used_m` across all filament entries
    pub filament_length_meters: f64,
    /// Filament weight in grams, rounded up
    pub filament_usage: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_breakdown: Option<CostBreakdown>,
}
