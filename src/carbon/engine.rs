use crate::carbon::region::RegionType;
use crate::panel::PanelRecord;
use crate::telemetry::InverterSample;

/// Default annual solar resource assumed at registration time (kWh/m2/year).
pub const SOLAR_IRRADIANCE_KWH_PER_M2_YEAR: f64 = 1500.0;

/// Perovskite module power temperature coefficient (per degree C above STC).
pub const TEMP_COEFFICIENT_PER_C: f64 = -0.0045;

/// Standard test condition module temperature.
pub const STC_TEMPERATURE_C: f64 = 25.0;

/// Lifetime energy and reduction figures for a panel, derived from its
/// manufacturing metadata. Drives the issuance formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifetimeProfile {
    pub annual_energy_kwh: f64,
    pub lifetime_energy_kwh: f64,
    /// Total avoided emissions over the panel's rated lifetime (kgCO2).
    pub lifetime_reduction_kg: f64,
    /// Embodied footprint amortized over lifetime energy (kgCO2/kWh).
    pub carbon_intensity_kg_per_kwh: f64,
}

/// Compute the lifetime profile for a validated panel record.
/// `lifetime_energy_kwh` is positive because registration enforces
/// efficiency > 0, size > 0 and lifetime >= 1.
pub fn lifetime_profile(panel: &PanelRecord) -> LifetimeProfile {
    let annual_energy_kwh =
        (panel.nominal_efficiency_pct / 100.0) * panel.size_m2 * SOLAR_IRRADIANCE_KWH_PER_M2_YEAR;
    let lifetime_energy_kwh = annual_energy_kwh * panel.lifetime_years as f64;
    let lifetime_reduction_kg =
        annual_energy_kwh * panel.carbon_reduction_factor * panel.lifetime_years as f64;
    let carbon_intensity_kg_per_kwh = panel.manufacturing_footprint_kgco2 / lifetime_energy_kwh;
    LifetimeProfile {
        annual_energy_kwh,
        lifetime_energy_kwh,
        lifetime_reduction_kg,
        carbon_intensity_kg_per_kwh,
    }
}

/// Per-sample reduction figures. `theoretical_output_kw` is informational
/// (a plausibility reference for the reported power), only `effective_kg`
/// is credited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReduction {
    pub theoretical_output_kw: f64,
    pub raw_kg: f64,
    pub effective_kg: f64,
}

/// Real-time reduction for a sample: grid emissions avoided by the reported
/// energy, minus the panel-side embodied emissions for the same energy,
/// scaled by the regional compensation multiplier.
pub fn sample_reduction(
    sample: &InverterSample,
    panel: &PanelRecord,
    grid_factor_kg_per_kwh: f64,
    region: RegionType,
) -> SampleReduction {
    let profile = lifetime_profile(panel);

    let temp_adjust =
        1.0 + TEMP_COEFFICIENT_PER_C * (sample.module_temperature_c - STC_TEMPERATURE_C);
    let theoretical_output_kw = (panel.nominal_efficiency_pct / 100.0)
        * panel.size_m2
        * (sample.irradiance_w_per_m2 / 1000.0)
        * temp_adjust;

    let grid_emission_kg = sample.energy_generated_kwh * grid_factor_kg_per_kwh;
    let panel_emission_kg = sample.energy_generated_kwh * profile.carbon_intensity_kg_per_kwh;
    let raw_kg = grid_emission_kg - panel_emission_kg;
    let effective_kg = raw_kg * region.compensation();

    SampleReduction {
        theoretical_output_kw,
        raw_kg,
        effective_kg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn panel() -> PanelRecord {
        PanelRecord {
            panel_id: "PV-001".into(),
            production_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            nominal_efficiency_pct: 22.5,
            size_m2: 1.8,
            manufacturer: "Helios".into(),
            manufacturing_footprint_kgco2: 1200.0,
            lifetime_years: 25,
            carbon_reduction_factor: 0.4,
            owner: "alice".into(),
        }
    }

    fn sample(energy: f64, temperature: f64) -> InverterSample {
        InverterSample {
            inverter_id: "INV-1".into(),
            panel_id: "PV-001".into(),
            timestamp: Utc::now(),
            power_output_kw: 0.3,
            irradiance_w_per_m2: 1000.0,
            module_temperature_c: temperature,
            energy_generated_kwh: energy,
            location_tag: "江苏省".into(),
            signature: "0".repeat(64),
        }
    }

    #[test]
    fn lifetime_profile_matches_hand_computation() {
        let p = lifetime_profile(&panel());
        assert!((p.annual_energy_kwh - 607.5).abs() < 1e-9);
        assert!((p.lifetime_energy_kwh - 15_187.5).abs() < 1e-9);
        assert!((p.lifetime_reduction_kg - 6075.0).abs() < 1e-9);
        assert!((p.carbon_intensity_kg_per_kwh - 1200.0 / 15_187.5).abs() < 1e-12);
    }

    #[test]
    fn hot_module_loses_theoretical_output() {
        let cool = sample_reduction(&sample(4.0, 25.0), &panel(), 0.681, RegionType::TypeIII);
        let hot = sample_reduction(&sample(4.0, 45.0), &panel(), 0.681, RegionType::TypeIII);
        assert!(hot.theoretical_output_kw < cool.theoretical_output_kw);
        // credited energy is the reported counter, so reduction is unchanged
        assert!((hot.effective_kg - cool.effective_kg).abs() < 1e-12);
    }

    #[test]
    fn reduction_scales_with_region_compensation() {
        let s = sample(4.0, 25.0);
        let p = panel();
        let base = sample_reduction(&s, &p, 0.681, RegionType::TypeII);
        let plateau = sample_reduction(&s, &p, 0.681, RegionType::TypeI);
        let lowland = sample_reduction(&s, &p, 0.681, RegionType::TypeIII);
        assert!((plateau.effective_kg - base.raw_kg * 0.9).abs() < 1e-12);
        assert!((lowland.effective_kg - base.raw_kg * 1.2).abs() < 1e-12);
        assert!((base.effective_kg - base.raw_kg).abs() < 1e-12);
    }

    #[test]
    fn dirty_grid_credits_more() {
        let s = sample(4.0, 25.0);
        let p = panel();
        let north = sample_reduction(&s, &p, 0.920, RegionType::TypeIII);
        let south = sample_reduction(&s, &p, 0.587, RegionType::TypeIII);
        assert!(north.raw_kg > south.raw_kg);
    }
}
