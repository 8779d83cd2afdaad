//! Data models for HVAC upgrade requests and emissions results

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{EmissionsError, Result};
use crate::units;

/// Combustion fuels burned on-site by an existing unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fuel {
    NaturalGas,
    Oil,
    Propane,
}

impl Fuel {
    pub const ALL: [Fuel; 3] = [Fuel::NaturalGas, Fuel::Oil, Fuel::Propane];

    /// Key used in the reference store and import files
    pub fn key(self) -> &'static str {
        match self {
            Fuel::NaturalGas => "natural_gas",
            Fuel::Oil => "oil",
            Fuel::Propane => "propane",
        }
    }

    pub fn from_key(key: &str) -> Option<Fuel> {
        Fuel::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// Selects one of the three efficiency standards catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuelFamily {
    GasPropane,
    Oil,
    Electric,
}

impl fmt::Display for FuelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FuelFamily::GasPropane => "natural gas and propane",
            FuelFamily::Oil => "oil",
            FuelFamily::Electric => "electric",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpgradePath {
    NaturalGasToElectric,
    OilToElectric,
    PropaneToElectric,
    ElectricToElectric,
}

impl UpgradePath {
    /// Fuel burned by the existing unit, `None` when it draws grid power
    pub fn combustion_fuel(self) -> Option<Fuel> {
        match self {
            UpgradePath::NaturalGasToElectric => Some(Fuel::NaturalGas),
            UpgradePath::OilToElectric => Some(Fuel::Oil),
            UpgradePath::PropaneToElectric => Some(Fuel::Propane),
            UpgradePath::ElectricToElectric => None,
        }
    }

    pub fn fuel_family(self) -> FuelFamily {
        match self {
            UpgradePath::NaturalGasToElectric | UpgradePath::PropaneToElectric => {
                FuelFamily::GasPropane
            }
            UpgradePath::OilToElectric => FuelFamily::Oil,
            UpgradePath::ElectricToElectric => FuelFamily::Electric,
        }
    }

    pub fn consumption_unit(self) -> &'static str {
        match self {
            UpgradePath::NaturalGasToElectric => "cubic feet per year",
            UpgradePath::OilToElectric | UpgradePath::PropaneToElectric => "gallons per year",
            UpgradePath::ElectricToElectric => "kWh per year",
        }
    }

    /// Annual energy consumed by the existing unit, in BTU
    pub fn consumption_to_btu(self, quantity: f64) -> Result<f64> {
        match self {
            UpgradePath::NaturalGasToElectric => units::cubic_feet_natural_gas_to_btu(quantity),
            UpgradePath::OilToElectric => units::gallons_oil_to_btu(quantity),
            UpgradePath::PropaneToElectric => units::gallons_propane_to_btu(quantity),
            UpgradePath::ElectricToElectric => units::kwh_to_btu(quantity),
        }
    }
}

impl fmt::Display for UpgradePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpgradePath::NaturalGasToElectric => "natural-gas-to-electric",
            UpgradePath::OilToElectric => "oil-to-electric",
            UpgradePath::PropaneToElectric => "propane-to-electric",
            UpgradePath::ElectricToElectric => "electric-to-electric",
        };
        f.write_str(name)
    }
}

/// Five-digit US postal code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZipCode(String);

impl ZipCode {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == 5 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(ZipCode(trimmed.to_string()))
        } else {
            Err(EmissionsError::invalid(format!(
                "zip code must be five digits, got {raw:?}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Three-digit sectional center prefix
    pub fn prefix(&self) -> &str {
        &self.0[..3]
    }
}

impl FromStr for ZipCode {
    type Err = EmissionsError;

    fn from_str(s: &str) -> Result<Self> {
        ZipCode::parse(s)
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named legacy-equipment efficiency classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyStandard {
    pub label: &'static str,
    pub btu_per_watt_hour: f64,
}

/// Input for a single emissions computation
#[derive(Debug, Clone, PartialEq)]
pub struct HvacUpgradeRequest {
    pub path: UpgradePath,
    pub zip_code: ZipCode,
    pub new_unit_efficiency_btu_per_watt_hour: f64,
    pub existing_efficiency_btu_per_watt_hour: f64,
    /// Annual consumption in the unit selected by `path`
    pub existing_consumption: f64,
}

impl HvacUpgradeRequest {
    pub fn new(
        path: UpgradePath,
        zip_code: &str,
        new_unit_efficiency_btu_per_watt_hour: f64,
        existing_efficiency_btu_per_watt_hour: f64,
        existing_consumption: f64,
    ) -> Result<Self> {
        let request = HvacUpgradeRequest {
            path,
            zip_code: ZipCode::parse(zip_code)?,
            new_unit_efficiency_btu_per_watt_hour,
            existing_efficiency_btu_per_watt_hour,
            existing_consumption,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        require_positive(
            "new unit efficiency (BTU/Wh)",
            self.new_unit_efficiency_btu_per_watt_hour,
        )?;
        require_positive(
            "existing efficiency (BTU/Wh)",
            self.existing_efficiency_btu_per_watt_hour,
        )?;
        require_positive(
            &format!("existing consumption ({})", self.path.consumption_unit()),
            self.existing_consumption,
        )
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EmissionsError::invalid(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

/// Emissions for one upgrade, in metric tons CO2e per year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionsResult {
    pub existing_emissions_tons_co2e: f64,
    pub new_unit_emissions_metric_tons_co2e: f64,
    /// existing - new; positive means a reduction
    pub emissions_reduced_metric_tons_co2e: f64,
    pub further_information: String,
}

impl EmissionsResult {
    pub fn new(existing: f64, new_unit: f64, further_information: &str) -> Self {
        EmissionsResult {
            existing_emissions_tons_co2e: existing,
            new_unit_emissions_metric_tons_co2e: new_unit,
            emissions_reduced_metric_tons_co2e: existing - new_unit,
            further_information: further_information.to_string(),
        }
    }
}
