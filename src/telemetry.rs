use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChainError;
use crate::wallet::{signature_well_formed, SAMPLE_SIG_HEX_LEN};

/// One signed operational reading from an inverter. Sits in the pending
/// pool until a carbon-aware block seals it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InverterSample {
    pub inverter_id: String,
    pub panel_id: String,
    pub timestamp: DateTime<Utc>,
    pub power_output_kw: f64,
    pub irradiance_w_per_m2: f64,
    pub module_temperature_c: f64,
    /// Cumulative-day energy counter; the quantity that gets credited.
    pub energy_generated_kwh: f64,
    pub location_tag: String,
    pub signature: String,
}

impl InverterSample {
    /// Opaque signature predicate for telemetry (hex, 64 characters).
    pub fn signature_ok(&self) -> bool {
        signature_well_formed(&self.signature, SAMPLE_SIG_HEX_LEN)
    }

    /// Structural checks applied before the sample enters the pending pool.
    /// Panel existence is deliberately not checked here: unknown panels are
    /// still carried in the block payload, they just earn no credit.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.inverter_id.trim().is_empty() || self.panel_id.trim().is_empty() {
            return Err(ChainError::InvalidTransaction(
                "sample must carry inverter_id and panel_id".into(),
            ));
        }
        if !(self.energy_generated_kwh >= 0.0) {
            return Err(ChainError::InvalidTransaction(format!(
                "energy counter must be non-negative, got {}",
                self.energy_generated_kwh
            )));
        }
        if !self.signature_ok() {
            return Err(ChainError::InvalidTransaction(
                "sample signature must be 64 hex characters".into(),
            ));
        }
        Ok(())
    }

    /// Contribution of this sample to the block hash preimage.
    pub fn digest_fragment(&self) -> String {
        format!("{}{}", self.inverter_id, self.energy_generated_kwh)
    }
}
