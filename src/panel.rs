use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// Manufacturing metadata for a registered perovskite panel.
/// Immutable once it enters the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelRecord {
    pub panel_id: String,
    pub production_date: NaiveDate,
    /// Nominal module efficiency in percent, 0 < e <= 100.
    pub nominal_efficiency_pct: f64,
    pub size_m2: f64,
    pub manufacturer: String,
    /// Embodied footprint of the manufacturing process.
    pub manufacturing_footprint_kgco2: f64,
    pub lifetime_years: u32,
    /// Avoided emissions per kWh generated (kgCO2/kWh).
    pub carbon_reduction_factor: f64,
    pub owner: String,
}

impl PanelRecord {
    /// Field-level checks applied before a record may enter the registry.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.panel_id.trim().is_empty() {
            return Err(ChainError::InvalidPanel("panel_id must not be empty".into()));
        }
        if !(self.nominal_efficiency_pct > 0.0 && self.nominal_efficiency_pct <= 100.0) {
            return Err(ChainError::InvalidPanel(format!(
                "efficiency must be in (0, 100], got {}",
                self.nominal_efficiency_pct
            )));
        }
        if !(self.size_m2 > 0.0) {
            return Err(ChainError::InvalidPanel(format!(
                "size must be positive, got {} m2",
                self.size_m2
            )));
        }
        if !(self.manufacturing_footprint_kgco2 >= 0.0) {
            return Err(ChainError::InvalidPanel(format!(
                "manufacturing footprint must be non-negative, got {}",
                self.manufacturing_footprint_kgco2
            )));
        }
        if self.lifetime_years < 1 {
            return Err(ChainError::InvalidPanel(
                "lifetime must be at least one year".into(),
            ));
        }
        if !(self.carbon_reduction_factor >= 0.0) {
            return Err(ChainError::InvalidPanel(format!(
                "carbon reduction factor must be non-negative, got {}",
                self.carbon_reduction_factor
            )));
        }
        if self.owner.trim().is_empty() {
            return Err(ChainError::InvalidPanel("owner must not be empty".into()));
        }
        Ok(())
    }
}
