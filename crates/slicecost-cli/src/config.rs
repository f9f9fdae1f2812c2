//! Configuration file support for `.slicecost.toml`
//!
//! Files are layered, lowest precedence first:
//! 1. User config (`~/.slicecost.toml`)
//! 2. Project config (`./.slicecost.toml`)
//! 3. Explicit `--config <FILE>`
//!
//! Each layer overrides individual fields of the layers below it.
//! Command-line flags override all of them.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use slicecost_core::{AnalysisOptions, MaterialProfile, PlateCountPolicy, ProcessRates};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the home and current directories
pub const CONFIG_FILE_NAME: &str = ".slicecost.toml";

/// Template written by `slicecost config init`
pub const DEFAULT_CONFIG: &str = r#"# slicecost configuration
#
# Precedence (highest first): command-line flags, --config FILE,
# ./.slicecost.toml, ~/.slicecost.toml, built-in defaults.

[analysis]
# Attach a cost breakdown to `slicecost analyze` output
include_cost = false
# "strict" fails when plate descriptors and G-code files differ in number,
# "lenient" only warns
plate_count_policy = "strict"

[material]
name = "PolyLite PLA"
cost_per_kg = 20.0   # currency units per kg
density = 1.24       # g/cm3
diameter = 1.75      # mm

[rates]
labor_rate_per_hour = 26.0
labor_factor = 0.09375           # labor hours per print hour
electricity_rate_per_kwh = 0.14
printer_power_kw = 0.3
maintenance_rate_per_hour = 0.6
material_cost_multiplier = 3.5
scrap_percentage = 0.02
"#;

/// Configuration file structure for .slicecost.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rates: Option<RatesConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_cost: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_count_policy: Option<PlateCountPolicy>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaterialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labor_rate_per_hour: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labor_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electricity_rate_per_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printer_power_kw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_rate_per_hour: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_cost_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrap_percentage: Option<f64>,
}

/// Effective settings as printed by `slicecost config show`
#[derive(Debug, Serialize)]
struct EffectiveConfig<'a> {
    analysis: AnalysisConfig,
    material: &'a MaterialProfile,
    rates: &'a ProcessRates,
}

/// Overwrite `target` with `value` when the layer sets it.
fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Keep `higher` where set, fall back to `lower`.
fn layer<T>(lower: Option<T>, higher: Option<T>) -> Option<T> {
    higher.or(lower)
}

impl MaterialConfig {
    fn layered(self, higher: Self) -> Self {
        Self {
            name: layer(self.name, higher.name),
            cost_per_kg: layer(self.cost_per_kg, higher.cost_per_kg),
            density: layer(self.density, higher.density),
            diameter: layer(self.diameter, higher.diameter),
        }
    }

    fn apply(self, material: &mut MaterialProfile) {
        set(&mut material.name, self.name);
        set(&mut material.cost_per_kg, self.cost_per_kg);
        set(&mut material.density, self.density);
        set(&mut material.diameter, self.diameter);
    }
}

impl RatesConfig {
    fn layered(self, higher: Self) -> Self {
        Self {
            labor_rate_per_hour: layer(self.labor_rate_per_hour, higher.labor_rate_per_hour),
            labor_factor: layer(self.labor_factor, higher.labor_factor),
            electricity_rate_per_kwh: layer(
                self.electricity_rate_per_kwh,
                higher.electricity_rate_per_kwh,
            ),
            printer_power_kw: layer(self.printer_power_kw, higher.printer_power_kw),
            maintenance_rate_per_hour: layer(
                self.maintenance_rate_per_hour,
                higher.maintenance_rate_per_hour,
            ),
            material_cost_multiplier: layer(
                self.material_cost_multiplier,
                higher.material_cost_multiplier,
            ),
            scrap_percentage: layer(self.scrap_percentage, higher.scrap_percentage),
        }
    }

    fn apply(self, rates: &mut ProcessRates) {
        set(&mut rates.labor_rate_per_hour, self.labor_rate_per_hour);
        set(&mut rates.labor_factor, self.labor_factor);
        set(&mut rates.electricity_rate_per_kwh, self.electricity_rate_per_kwh);
        set(&mut rates.printer_power_kw, self.printer_power_kw);
        set(&mut rates.maintenance_rate_per_hour, self.maintenance_rate_per_hour);
        set(&mut rates.material_cost_multiplier, self.material_cost_multiplier);
        set(&mut rates.scrap_percentage, self.scrap_percentage);
    }
}

impl AnalysisConfig {
    fn layered(self, higher: Self) -> Self {
        Self {
            include_cost: layer(self.include_cost, higher.include_cost),
            plate_count_policy: layer(self.plate_count_policy, higher.plate_count_policy),
        }
    }
}

fn merge_section<T>(lower: Option<T>, higher: Option<T>, layered: fn(T, T) -> T) -> Option<T> {
    match (lower, higher) {
        (Some(lower), Some(higher)) => Some(layered(lower, higher)),
        (lower, higher) => higher.or(lower),
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load a discovered config file, warning instead of failing
    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                eprintln!(
                    "{} Ignoring config {}: {e:#}",
                    "Warning:".yellow().bold(),
                    path.display()
                );
                None
            }
        }
    }

    /// User-level config path (`~/.slicecost.toml`)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Project-level config path (`./.slicecost.toml`)
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Discover and merge the user and project configs, then `explicit` on top.
    ///
    /// Unlike discovered files, an explicit config that cannot be loaded is an error.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let user = Self::user_config_path().and_then(|path| Self::load_optional(&path));
        let project = Self::load_optional(&Self::project_config_path());
        let explicit = explicit.map(Self::load_from_file).transpose()?;

        Ok([user, project, explicit]
            .into_iter()
            .flatten()
            .fold(Self::default(), Self::layered))
    }

    /// Merge `higher` over `self`, field by field
    #[must_use]
    pub fn layered(self, higher: Self) -> Self {
        Self {
            analysis: merge_section(self.analysis, higher.analysis, AnalysisConfig::layered),
            material: merge_section(self.material, higher.material, MaterialConfig::layered),
            rates: merge_section(self.rates, higher.rates, RatesConfig::layered),
        }
    }

    /// Analysis options with this config applied over built-in defaults
    pub fn analysis_options(&self) -> AnalysisOptions {
        let mut options = AnalysisOptions::default();
        if let Some(analysis) = self.analysis.clone() {
            set(&mut options.include_cost, analysis.include_cost);
            set(&mut options.plate_count_policy, analysis.plate_count_policy);
        }
        if let Some(material) = self.material.clone() {
            material.apply(&mut options.material);
        }
        if let Some(rates) = self.rates.clone() {
            rates.apply(&mut options.rates);
        }
        options
    }

    /// Render effective `options` as TOML
    pub fn render_effective(options: &AnalysisOptions) -> Result<String> {
        let effective = EffectiveConfig {
            analysis: AnalysisConfig {
                include_cost: Some(options.include_cost),
                plate_count_policy: Some(options.plate_count_policy),
            },
            material: &options.material,
            rates: &options.rates,
        };
        toml::to_string_pretty(&effective).context("Failed to render configuration")
    }
}
