//! End-to-end analysis of one sliced job.
//!
//! The three extraction steps read disjoint sources and run concurrently
//! on the rayon pool. Each step that needs the archive opens its own
//! handle, which is closed when the step returns, whether it succeeded or
//! failed. The job fails as a whole if any step fails.

use crate::cost::{filament_weight_grams, CostModel, MaterialProfile, ProcessRates};
use crate::duration::PrintDurationAggregator;
use crate::error::{Result, SliceError};
use crate::filament::FilamentUsageExtractor;
use crate::plate::{PlateDescriptor, PlateDescriptorExtractor};
use crate::types::AnalysisResult;
use serde::{Deserialize, Serialize};
use slicecost_archive::SlicedArchive;
use std::path::Path;

/// What to do when plate descriptors and G-code files disagree in number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlateCountPolicy {
    /// Fail the job with `SliceError::PlateCountMismatch`
    #[default]
    Strict,
    /// Log a warning and continue
    Lenient,
}

/// Per-run settings for [`AnalysisPipeline`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Attach a [`crate::CostBreakdown`] to the result
    pub include_cost: bool,
    pub plate_count_policy: PlateCountPolicy,
    pub material: MaterialProfile,
    pub rates: ProcessRates,
}

/// Composes the extractors and the cost model over one archive and one
/// directory of G-code output.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPipeline {
    options: AnalysisOptions,
    filament: FilamentUsageExtractor,
    plates: PlateDescriptorExtractor,
    durations: PrintDurationAggregator,
    cost_model: CostModel,
}

impl AnalysisPipeline {
    #[must_use]
    pub fn new(options: AnalysisOptions) -> Self {
        Self {
            cost_model: CostModel::new(options.rates.clone()),
            options,
            ..Self::default()
        }
    }

    /// Analyze the archive at `archive_path` together with the G-code files
    /// in `output_dir`.
    ///
    /// # Errors
    ///
    /// Any [`SliceError`] raised by an extraction step, a plate count
    /// mismatch under [`PlateCountPolicy::Strict`], or invalid material and
    /// rate settings.
    pub fn analyze(&self, archive_path: &Path, output_dir: &Path) -> Result<AnalysisResult> {
        let material = &self.options.material;
        material.validate()?;
        if self.options.include_cost {
            self.options.rates.validate()?;
        }

        let ((usage, plates), durations) = rayon::join(
            || {
                rayon::join(
                    || self.filament_usage(archive_path),
                    || self.plate_descriptors(archive_path),
                )
            },
            || self.durations.from_directory(output_dir),
        );
        let used_length_m = usage?;
        let plates = plates?;
        let print_time_summary = durations?;

        self.check_plate_count(plates.len(), print_time_summary.plate_count)?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let filament_usage =
            filament_weight_grams(used_length_m, material.diameter, material.density).ceil() as u64;

        let cost_breakdown = if self.options.include_cost {
            Some(self.cost_model.breakdown(
                used_length_m,
                print_time_summary.total_seconds,
                material,
            )?)
        } else {
            None
        };

        let bounding_boxes = plates.into_iter().flat_map(|plate| plate.objects).collect::<Vec<_>>();

        log::info!(
            "Analyzed {}: {} object(s) on {} plate(s), {} s, {:.3} m ({} g) filament",
            archive_path.display(),
            bounding_boxes.len(),
            print_time_summary.plate_count,
            print_time_summary.total_seconds,
            used_length_m,
            filament_usage
        );

        Ok(AnalysisResult {
            bounding_boxes,
            print_time_summary,
            filament_length_meters: used_length_m,
            filament_usage,
            cost_breakdown,
        })
    }

    fn filament_usage(&self, archive_path: &Path) -> Result<f64> {
        let mut archive = SlicedArchive::open(archive_path)?;
        self.filament.from_archive(&mut archive)
    }

    fn plate_descriptors(&self, archive_path: &Path) -> Result<Vec<PlateDescriptor>> {
        let mut archive = SlicedArchive::open(archive_path)?;
        self.plates.from_archive(&mut archive)
    }

    fn check_plate_count(&self, descriptors: usize, outputs: usize) -> Result<()> {
        if descriptors == outputs {
            return Ok(());
        }
        match self.options.plate_count_policy {
            PlateCountPolicy::Strict => Err(SliceError::PlateCountMismatch {
                descriptors,
                outputs,
            }),
            PlateCountPolicy::Lenient => {
                log::warn!(
                    "{descriptors} plate descriptor(s) but {outputs} print output(s); continuing"
                );
                Ok(())
            }
        }
    }
}
