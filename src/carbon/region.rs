use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Region used when a location tag matches nothing in the table.
pub const DEFAULT_REGION: &str = "CN-EC";

/// Solar irradiance tier of a grid region. Controls the compensation
/// multiplier applied to credited reduction: high-irradiance regions are
/// penalized, low-irradiance regions rewarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionType {
    TypeI,
    TypeII,
    TypeIII,
}

impl RegionType {
    pub fn compensation(self) -> f64 {
        match self {
            RegionType::TypeI => 0.9,
            RegionType::TypeII => 1.0,
            RegionType::TypeIII => 1.2,
        }
    }
}

/// Irradiance tier from region code. Type I covers the Tibetan plateau,
/// Type II the northwestern high-irradiance provinces, Type III the rest.
pub fn region_type(code: &str) -> RegionType {
    match code {
        "CN-XZ" | "CN-QH" => RegionType::TypeI,
        "CN-XJ" | "CN-GS" | "CN-NM" => RegionType::TypeII,
        _ => RegionType::TypeIII,
    }
}

/// Regional grid emission factors in kgCO2 per kWh. Values must stay
/// bit-exact with the published table.
const GRID_FACTORS: &[(&str, &str, f64)] = &[
    ("CN-HB", "华北", 0.920),
    ("CN-NE", "东北", 0.776),
    ("CN-EC", "华东", 0.681),
    ("CN-SC", "华南", 0.587),
    ("CN-NW", "西北", 0.724),
    ("CN-SW", "西南", 0.628),
];

/// Location substring resolution, first match wins.
const LOCATION_REGIONS: &[(&str, &str)] = &[
    ("北京", "CN-HB"),
    ("天津", "CN-HB"),
    ("河北", "CN-HB"),
    ("山西", "CN-HB"),
    ("山东", "CN-HB"),
    ("内蒙古", "CN-HB"),
    ("上海", "CN-EC"),
    ("江苏", "CN-EC"),
    ("浙江", "CN-EC"),
    ("安徽", "CN-EC"),
    ("广东", "CN-SC"),
    ("广西", "CN-SC"),
    ("福建", "CN-SC"),
    ("海南", "CN-SC"),
    ("西藏", "CN-XZ"),
    ("青海", "CN-XZ"),
];

/// Resolve a free-form location tag to a region code.
pub fn resolve_region(location_tag: &str) -> &'static str {
    for (needle, code) in LOCATION_REGIONS {
        if location_tag.contains(needle) {
            return code;
        }
    }
    DEFAULT_REGION
}

/// Display name for a grid region code, if it carries one.
pub fn region_name(code: &str) -> Option<&'static str> {
    GRID_FACTORS
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, name, _)| *name)
}

/// Emission factor table keyed by region code. Regions without a factor
/// (e.g. the plateau codes) exist for compensation purposes only; samples
/// resolved there are carried in blocks but earn no credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridFactorTable {
    factors: BTreeMap<String, f64>,
}

impl Default for GridFactorTable {
    fn default() -> Self {
        let factors = GRID_FACTORS
            .iter()
            .map(|(code, _, f)| (code.to_string(), *f))
            .collect();
        Self { factors }
    }
}

impl GridFactorTable {
    pub fn factor(&self, code: &str) -> Option<f64> {
        self.factors.get(code).copied()
    }

    pub fn insert(&mut self, code: impl Into<String>, factor: f64) {
        self.factors.insert(code.into(), factor);
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}
