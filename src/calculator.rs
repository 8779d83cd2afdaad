//! Emissions calculator for heat pump upgrades

use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::factors::RegionalEmissionsFactorTable;
use crate::models::{EmissionsResult, HvacUpgradeRequest, UpgradePath};
use crate::units::{self, BTU_PER_MMBTU, BTU_PER_WATT_HOUR, KG_PER_METRIC_TON, KWH_PER_MWH};

pub const DEFAULT_FURTHER_INFORMATION: &str = "Estimates follow the residential HVAC \
methodology used for Greenhouse Gas Reduction Fund reporting. Existing fossil-fuel \
emissions use direct-combustion factors; electric emissions use the grid subregion \
serving the zip code.";

/// Emissions result plus the intermediate values it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub path: UpgradePath,
    pub zip_code: String,
    pub region_id: String,
    pub grid_kg_co2e_per_mwh: f64,
    /// kg CO2e per MMBtu; `None` for the electric path
    pub combustion_kg_co2e_per_mmbtu: Option<f64>,
    pub consumed_btu: f64,
    pub delivered_heat_btu: f64,
    pub baseline_kwh: f64,
    pub new_unit_kwh: f64,
    pub result: EmissionsResult,
}

pub struct EmissionsCalculator {
    factors: RegionalEmissionsFactorTable,
    further_information: String,
}

impl EmissionsCalculator {
    pub fn new(factors: RegionalEmissionsFactorTable) -> Self {
        EmissionsCalculator {
            factors,
            further_information: DEFAULT_FURTHER_INFORMATION.to_string(),
        }
    }

    pub fn with_further_information(mut self, text: impl Into<String>) -> Self {
        self.further_information = text.into();
        self
    }

    pub fn natural_gas_to_electric(
        &self,
        zip_code: &str,
        new_unit_efficiency_btu_per_watt_hour: f64,
        existing_efficiency_btu_per_watt_hour: f64,
        existing_consumption_cubic_feet_per_year: f64,
    ) -> Result<EmissionsResult> {
        self.calculate(&HvacUpgradeRequest::new(
            UpgradePath::NaturalGasToElectric,
            zip_code,
            new_unit_efficiency_btu_per_watt_hour,
            existing_efficiency_btu_per_watt_hour,
            existing_consumption_cubic_feet_per_year,
        )?)
    }

    pub fn oil_to_electric(
        &self,
        zip_code: &str,
        new_unit_efficiency_btu_per_watt_hour: f64,
        existing_efficiency_btu_per_watt_hour: f64,
        existing_consumption_gallons_per_year: f64,
    ) -> Result<EmissionsResult> {
        self.calculate(&HvacUpgradeRequest::new(
            UpgradePath::OilToElectric,
            zip_code,
            new_unit_efficiency_btu_per_watt_hour,
            existing_efficiency_btu_per_watt_hour,
            existing_consumption_gallons_per_year,
        )?)
    }

    pub fn propane_to_electric(
        &self,
        zip_code: &str,
        new_unit_efficiency_btu_per_watt_hour: f64,
        existing_efficiency_btu_per_watt_hour: f64,
        existing_consumption_gallons_per_year: f64,
    ) -> Result<EmissionsResult> {
        self.calculate(&HvacUpgradeRequest::new(
            UpgradePath::PropaneToElectric,
            zip_code,
            new_unit_efficiency_btu_per_watt_hour,
            existing_efficiency_btu_per_watt_hour,
            existing_consumption_gallons_per_year,
        )?)
    }

    pub fn electric_to_electric(
        &self,
        zip_code: &str,
        new_unit_efficiency_btu_per_watt_hour: f64,
        existing_efficiency_btu_per_watt_hour: f64,
        annual_hvac_usage_kwh: f64,
    ) -> Result<EmissionsResult> {
        self.calculate(&HvacUpgradeRequest::new(
            UpgradePath::ElectricToElectric,
            zip_code,
            new_unit_efficiency_btu_per_watt_hour,
            existing_efficiency_btu_per_watt_hour,
            annual_hvac_usage_kwh,
        )?)
    }

    pub fn calculate(&self, request: &HvacUpgradeRequest) -> Result<EmissionsResult> {
        Ok(self.assess(request)?.result)
    }

    /// Shared algorithm behind all four upgrade paths
    pub fn assess(&self, request: &HvacUpgradeRequest) -> Result<Assessment> {
        request.validate()?;

        let factors = self.factors.lookup(&request.zip_code)?;
        let grid = factors.grid_kg_co2e_per_mwh;
        let existing_eff = request.existing_efficiency_btu_per_watt_hour;
        let new_eff = request.new_unit_efficiency_btu_per_watt_hour;

        let consumed_btu = request.path.consumption_to_btu(request.existing_consumption)?;
        let delivered_heat_btu = consumed_btu * (existing_eff / BTU_PER_WATT_HOUR);

        // Combustion emissions depend on fuel burned, not heat delivered. Fuel
        // paths carry the delivered heat forward as an electric-equivalent load
        // and size the heat pump with the same efficiency ratio as the electric path.
        let combustion = request
            .path
            .combustion_fuel()
            .map(|fuel| factors.combustion.for_fuel(fuel));
        let (existing, baseline_kwh) = match combustion {
            Some(kg_per_mmbtu) => (
                combustion_metric_tons(consumed_btu, kg_per_mmbtu),
                units::btu_to_kwh(delivered_heat_btu)?,
            ),
            None => {
                let kwh = request.existing_consumption;
                (grid_metric_tons(kwh, grid), kwh)
            }
        };

        let new_unit_kwh = baseline_kwh * existing_eff / new_eff;
        let new_unit = grid_metric_tons(new_unit_kwh, grid);

        debug!(
            "{} zip={} region={} consumed={:.0} BTU baseline={:.1} kWh new={:.1} kWh",
            request.path,
            request.zip_code,
            factors.region_id,
            consumed_btu,
            baseline_kwh,
            new_unit_kwh
        );

        Ok(Assessment {
            path: request.path,
            zip_code: request.zip_code.to_string(),
            region_id: factors.region_id,
            grid_kg_co2e_per_mwh: grid,
            combustion_kg_co2e_per_mmbtu: combustion,
            consumed_btu,
            delivered_heat_btu,
            baseline_kwh,
            new_unit_kwh,
            result: EmissionsResult::new(existing, new_unit, &self.further_information),
        })
    }
}

fn grid_metric_tons(kwh: f64, kg_co2e_per_mwh: f64) -> f64 {
    kwh * kg_co2e_per_mwh / KWH_PER_MWH / KG_PER_METRIC_TON
}

fn combustion_metric_tons(btu: f64, kg_co2e_per_mmbtu: f64) -> f64 {
    btu * kg_co2e_per_mmbtu / BTU_PER_MMBTU / KG_PER_METRIC_TON
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.path)?;
        writeln!(
            f,
            "Zip code: {} (grid region {}, {:.1} kg CO2e/MWh)",
            self.zip_code, self.region_id, self.grid_kg_co2e_per_mwh
        )?;
        if let Some(kg) = self.combustion_kg_co2e_per_mmbtu {
            writeln!(f, "Combustion factor: {:.2} kg CO2e/MMBtu", kg)?;
        }
        writeln!(f)?;

        writeln!(f, "Energy:")?;
        writeln!(f, "  Consumed:        {:.0} BTU/yr", self.consumed_btu)?;
        writeln!(f, "  Heat delivered:  {:.0} BTU/yr", self.delivered_heat_btu)?;
        writeln!(f, "  Baseline load:   {:.1} kWh/yr", self.baseline_kwh)?;
        writeln!(f, "  Heat pump input: {:.1} kWh/yr", self.new_unit_kwh)?;
        writeln!(f)?;

        let r = &self.result;
        writeln!(f, "Emissions (metric tons CO2e/yr):")?;
        writeln!(f, "  Existing:  {:.2}", r.existing_emissions_tons_co2e)?;
        writeln!(f, "  New unit:  {:.2}", r.new_unit_emissions_metric_tons_co2e)?;
        writeln!(f, "  Reduced:   {:.2}", r.emissions_reduced_metric_tons_co2e)?;
        writeln!(f)?;
        write!(f, "{}", r.further_information)
    }
}
