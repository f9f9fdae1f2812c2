//! # Slicecost Core - Print Metrics and Cost Estimation
//!
//! Turns the output of a slicing run into print facts and a price quote.
//! The input is a 3MF archive exported by the slicer plus the directory of
//! per-plate G-code it wrote alongside.
//!
//! ## Quick Start
//!
//! ```no_run
//! use slicecost_core::{AnalysisOptions, AnalysisPipeline};
//! use std::path::Path;
//!
//! let pipeline = AnalysisPipeline::new(AnalysisOptions {
//!     include_cost: true,
//!     ..AnalysisOptions::default()
//! });
//! let result = pipeline.analyze(Path::new("out/slice.3mf"), Path::new("out"))?;
//!
//! println!("{} s on {} plate(s)", result.print_time_summary.total_seconds,
//!     result.print_time_summary.plate_count);
//! if let Some(cost) = &result.cost_breakdown {
//!     println!("quote: {:.2}", cost.price_estimate);
//! }
//! # Ok::<(), slicecost_core::SliceError>(())
//! ```
//!
//! ## What is extracted
//!
//! | Source | Extractor | Result |
//! |--------|-----------|--------|
//! | `Metadata/slice_info.config` (XML, streamed) | [`FilamentUsageExtractor`] | meters of filament |
//! | `Metadata/plate_<n>.json` (JSON, buffered) | [`PlateDescriptorExtractor`] | object bounding boxes |
//! | `*.gcode` in the output directory (text, line by line) | [`PrintDurationAggregator`] | per-plate and total seconds |
//!
//! The [`CostModel`] then prices filament weight and machine time using a
//! [`MaterialProfile`] and [`ProcessRates`].

pub mod cost;
pub mod duration;
pub mod error;
pub mod filament;
pub mod pipeline;
pub mod plate;
pub mod types;

pub use cost::{CostBreakdown, CostModel, MaterialProfile, ProcessRates};
pub use duration::PrintDurationAggregator;
pub use error::{Result, SliceError};
pub use filament::FilamentUsageExtractor;
pub use pipeline::{AnalysisOptions, AnalysisPipeline, PlateCountPolicy};
pub use plate::{PlateDescriptor, PlateDescriptorExtractor};
pub use types::{AnalysisResult, ObjectBoundingBox, PrintTimeSummary};
