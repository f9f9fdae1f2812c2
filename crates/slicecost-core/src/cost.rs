//! Material and machine-time cost model.
//!
//! Every reported figure is rounded up: monetary values to the cent,
//! labor hours to a tenth of an hour, filament weight to the whole gram.
//! A quote derived from these numbers never undershoots the raw estimate.

use crate::error::{Result, SliceError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Physical and economic constants of one filament type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialProfile {
    pub name: String,
    /// Price per kilogram of filament
    pub cost_per_kg: f64,
    /// Density in g/cm³
    pub density: f64,
    /// Filament diameter in mm
    pub diameter: f64,
}

impl Default for MaterialProfile {
    fn default() -> Self {
        Self::polylite_pla()
    }
}

impl MaterialProfile {
    /// Built-in PLA preset used when nothing else is configured.
    #[must_use]
    pub fn polylite_pla() -> Self {
        Self {
            name: "PolyLite PLA".to_string(),
            cost_per_kg: 20.00,
            density: 1.24,
            diameter: 1.75,
        }
    }

    /// Same profile with a caller-supplied density.
    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Check that the profile describes a physical filament.
    ///
    /// # Errors
    ///
    /// `SliceError::InvalidInput` for a non-finite value, a non-positive
    /// density or diameter, or a negative cost.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("cost_per_kg", self.cost_per_kg, false),
            ("density", self.density, true),
            ("diameter", self.diameter, true),
        ];
        for (field, value, strictly_positive) in fields {
            let in_range = if strictly_positive { value > 0.0 } else { value >= 0.0 };
            if !value.is_finite() || !in_range {
                return Err(SliceError::InvalidInput(format!(
                    "material '{}': {field} = {value} is out of range",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Process constants applied to every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessRates {
    /// Operator cost per hour of labor
    pub labor_rate_per_hour: f64,
    /// Labor hours charged per hour of printing
    pub labor_factor: f64,
    pub electricity_rate_per_kwh: f64,
    /// Printer draw in kW
    pub printer_power_kw: f64,
    pub maintenance_rate_per_hour: f64,
    /// Markup applied to raw material cost
    pub material_cost_multiplier: f64,
    /// Surcharge for failed prints, as a fraction (0.02 = 2%)
    pub scrap_percentage: f64,
}

impl Default for ProcessRates {
    fn default() -> Self {
        Self {
            labor_rate_per_hour: 26.00,
            labor_factor: 0.093_75,
            electricity_rate_per_kwh: 0.14,
            printer_power_kw: 0.300,
            maintenance_rate_per_hour: 0.60,
            material_cost_multiplier: 3.5,
            scrap_percentage: 0.02,
        }
    }
}

impl ProcessRates {
    /// # Errors
    ///
    /// `SliceError::InvalidInput` if any rate is negative or non-finite.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("labor_rate_per_hour", self.labor_rate_per_hour),
            ("labor_factor", self.labor_factor),
            ("electricity_rate_per_kwh", self.electricity_rate_per_kwh),
            ("printer_power_kw", self.printer_power_kw),
            ("maintenance_rate_per_hour", self.maintenance_rate_per_hour),
            ("material_cost_multiplier", self.material_cost_multiplier),
            ("scrap_percentage", self.scrap_percentage),
        ];
        match fields
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            Some((field, value)) => Err(SliceError::InvalidInput(format!(
                "rate {field} = {value} is out of range"
            ))),
            None => Ok(()),
        }
    }
}

/// Itemized cost of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    /// Filament cost at purchase price
    pub material_cost: f64,
    /// Filament cost after markup
    pub material_price: f64,
    pub labor_hours: f64,
    pub labor_cost: f64,
    pub electricity_cost: f64,
    pub maintenance_cost: f64,
    /// Electricity plus maintenance for the print duration
    pub machine_cost: f64,
    pub total_print_time_seconds: u64,
    /// Quoted price: marked-up material plus machine cost, plus scrap
    pub price_estimate: f64,
    /// Raw cost: material at purchase price plus machine cost
    pub cost_estimate: f64,
    pub filament_usage_grams: u64,
}

/// Round `value` up to `places` decimal places.
#[must_use]
pub fn ceil_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).ceil() / factor
}

/// Weight in grams of a filament cylinder `length_m` meters long.
#[must_use]
pub fn filament_weight_grams(length_m: f64, diameter_mm: f64, density: f64) -> f64 {
    let radius_cm = diameter_mm / 20.0;
    let length_cm = length_m * 100.0;
    PI * radius_cm.powi(2) * length_cm * density
}

/// Pure cost function over a fixed set of [`ProcessRates`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostModel {
    rates: ProcessRates,
}

impl CostModel {
    #[must_use]
    pub fn new(rates: ProcessRates) -> Self {
        Self { rates }
    }

    #[must_use]
    pub fn rates(&self) -> &ProcessRates {
        &self.rates
    }

    /// Cost of printing `used_length_m` meters of `material` over `print_seconds`.
    ///
    /// # Errors
    ///
    /// `SliceError::InvalidInput` for a negative or non-finite length, or an
    /// invalid material profile or rate.
    pub fn breakdown(
        &self,
        used_length_m: f64,
        print_seconds: u64,
        material: &MaterialProfile,
    ) -> Result<CostBreakdown> {
        if !used_length_m.is_finite() || used_length_m < 0.0 {
            return Err(SliceError::InvalidInput(format!(
                "filament length {used_length_m} m is out of range"
            )));
        }
        material.validate()?;
        self.rates.validate()?;

        let rates = &self.rates;
        #[allow(clippy::cast_precision_loss)]
        let print_hours = print_seconds as f64 / SECONDS_PER_HOUR;

        let weight_g = filament_weight_grams(used_length_m, material.diameter, material.density);
        let material_cost = weight_g * (material.cost_per_kg / 1000.0);
        let material_price = material_cost * rates.material_cost_multiplier;

        let labor_hours = print_hours * rates.labor_factor;
        let labor_cost = labor_hours * rates.labor_rate_per_hour;

        let electricity_cost = rates.printer_power_kw * (print_hours * rates.electricity_rate_per_kwh);
        let maintenance_cost = rates.maintenance_rate_per_hour * print_hours;
        let machine_cost = electricity_cost + maintenance_cost;

        let price_estimate = (material_price + machine_cost) * (1.0 + rates.scrap_percentage);
        let cost_estimate = material_cost + machine_cost;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let filament_usage_grams = weight_g.ceil() as u64;

        Ok(CostBreakdown {
            material_cost: ceil_to(material_cost, 2),
            material_price: ceil_to(material_price, 2),
            labor_hours: ceil_to(labor_hours, 1),
            labor_cost: ceil_to(labor_cost, 2),
            electricity_cost: ceil_to(electricity_cost, 2),
            maintenance_cost: ceil_to(maintenance_cost, 2),
            machine_cost: ceil_to(machine_cost, 2),
            total_print_time_seconds: print_seconds,
            price_estimate: ceil_to(price_estimate, 2),
            cost_estimate: ceil_to(cost_estimate, 2),
            filament_usage_grams,
        })
    }
}
