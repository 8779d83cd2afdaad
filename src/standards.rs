//! Legacy equipment efficiency standards
//!
//! AFUE ratings are stored pre-normalized to BTU/Wh (AFUE x 3.412141633,
//! nine decimals). SEER, HSPF and EER are already BTU/Wh ratios, so the
//! electric catalog lists them as published.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{EmissionsError, Result};
use crate::models::{EfficiencyStandard, FuelFamily};

const fn standard(label: &'static str, btu_per_watt_hour: f64) -> EfficiencyStandard {
    EfficiencyStandard {
        label,
        btu_per_watt_hour,
    }
}

static GAS_PROPANE_STANDARDS: [EfficiencyStandard; 10] = [
    standard("AFUE - Gas Furnace - Standing Pilot", 2.217892061),
    standard("AFUE - Gas Furnace - Non-Condensing", 2.729713306),
    standard("AFUE - Gas Furnace - Mid-Efficiency", 2.900320388),
    standard("AFUE - Gas Furnace - Condensing", 3.241534551),
    standard("AFUE - Gas Furnace - High-Efficiency Condensing", 3.309777384),
    standard("AFUE - Gas Boiler - Non-Condensing", 2.797956139),
    standard("AFUE - Gas Boiler - Condensing", 3.07092747),
    standard("AFUE - Gas Wall Furnace - Gravity", 2.388499143),
    standard("AFUE - Propane Furnace - Non-Condensing", 2.729713306),
    standard("AFUE - Propane Furnace - Condensing", 3.241534551),
];

static OIL_STANDARDS: [EfficiencyStandard; 9] = [
    standard("AFUE - Oil Furnace - Pre-1992", 2.217892061),
    standard("AFUE - Oil Furnace - Pre-2015 Federal Minimum", 2.661470474),
    standard("AFUE - Oil Furnace - Non-Condensing", 2.832077555),
    standard("AFUE - Oil Furnace - Mid-Efficiency", 2.934441804),
    standard("AFUE - Oil Furnace - Condensing", 3.241534551),
    standard("AFUE - Oil Boiler - Steam", 2.559106225),
    standard("AFUE - Oil Boiler - Non-Condensing", 2.866198972),
    standard("AFUE - Oil Boiler - Mid-Efficiency", 2.968563221),
    standard("AFUE - Oil Boiler - Condensing", 3.139170302),
];

static ELECTRIC_STANDARDS: [EfficiencyStandard; 15] = [
    standard("SEER - Central Air Conditioner - Pre-2006", 10.0),
    standard("SEER - Central Air Conditioner - Federal Minimum", 14.0),
    standard("SEER - Central Air Conditioner - ENERGY STAR", 15.0),
    standard("SEER - Air-Source Heat Pump - Standard", 15.0),
    standard("SEER - Air-Source Heat Pump - High-Efficiency", 18.0),
    standard("SEER - Ductless Mini-Split - High-Efficiency", 20.0),
    standard("HSPF - Electric Resistance", 3.412141633),
    standard("HSPF - Air-Source Heat Pump - Pre-2006", 6.8),
    standard("HSPF - Air-Source Heat Pump - Federal Minimum", 8.2),
    standard("HSPF - Air-Source Heat Pump - ENERGY STAR", 8.5),
    standard("HSPF - Ductless Mini-Split - High-Efficiency", 10.0),
    standard("HSPF - Cold-Climate Heat Pump", 10.5),
    standard("EER - Room Air Conditioner - Federal Minimum", 10.0),
    standard("EER - Room Air Conditioner - ENERGY STAR", 12.0),
    standard("EER - Ground-Source Heat Pump - Closed Loop", 17.1),
];

/// All standards of a family, in catalog order
pub fn list_standards(family: FuelFamily) -> &'static [EfficiencyStandard] {
    match family {
        FuelFamily::GasPropane => &GAS_PROPANE_STANDARDS,
        FuelFamily::Oil => &OIL_STANDARDS,
        FuelFamily::Electric => &ELECTRIC_STANDARDS,
    }
}

/// Exact, case-sensitive label lookup
pub fn lookup_standard(family: FuelFamily, label: &str) -> Result<f64> {
    list_standards(family)
        .iter()
        .find(|s| s.label == label)
        .map(|s| s.btu_per_watt_hour)
        .ok_or_else(|| EmissionsError::UnknownStandard {
            family,
            label: label.to_string(),
        })
}

/// Serializes a catalog as a `{label: btu_per_watt_hour}` object in catalog order
pub struct Catalog(pub FuelFamily);

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let standards = list_standards(self.0);
        let mut map = serializer.serialize_map(Some(standards.len()))?;
        for s in standards {
            map.serialize_entry(s.label, &s.btu_per_watt_hour)?;
        }
        map.end()
    }
}
