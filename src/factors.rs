//! Regional grid and fuel combustion emissions factors keyed by zip code

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{EmissionsError, Result};
use crate::models::{Fuel, ZipCode};

/// Region id reported when the national average stands in for an unmapped zip
pub const NATIONAL_REGION_ID: &str = "US";

/// Direct-combustion factors, kg CO2e per MMBtu of fuel burned
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CombustionFactors {
    pub natural_gas: f64,
    pub oil: f64,
    pub propane: f64,
}

impl Default for CombustionFactors {
    fn default() -> Self {
        CombustionFactors {
            natural_gas: 55.12,
            oil: 86.79,
            propane: 86.66,
        }
    }
}

impl CombustionFactors {
    pub fn for_fuel(&self, fuel: Fuel) -> f64 {
        match fuel {
            Fuel::NaturalGas => self.natural_gas,
            Fuel::Oil => self.oil,
            Fuel::Propane => self.propane,
        }
    }

    pub fn set(&mut self, fuel: Fuel, kg_co2e_per_mmbtu: f64) {
        match fuel {
            Fuel::NaturalGas => self.natural_gas = kg_co2e_per_mmbtu,
            Fuel::Oil => self.oil = kg_co2e_per_mmbtu,
            Fuel::Propane => self.propane = kg_co2e_per_mmbtu,
        }
    }
}

/// Electricity grid subregion (eGRID style)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRegion {
    pub id: String,
    pub name: String,
    pub kg_co2e_per_mwh: f64,
}

/// Maps a five-digit zip or a three-digit prefix to a grid region
#[derive(Debug, Clone, PartialEq)]
pub struct ZipRegion {
    pub zip: String,
    pub region_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalFactors {
    pub region_id: String,
    pub grid_kg_co2e_per_mwh: f64,
    pub combustion: CombustionFactors,
}

/// Read-only after construction; share it freely across threads.
#[derive(Debug, Clone)]
pub struct RegionalEmissionsFactorTable {
    regions: HashMap<String, GridRegion>,
    zips: HashMap<String, String>,
    combustion: CombustionFactors,
    national_average_kg_co2e_per_mwh: Option<f64>,
}

impl RegionalEmissionsFactorTable {
    pub fn from_parts(
        regions: Vec<GridRegion>,
        zips: Vec<ZipRegion>,
        combustion: CombustionFactors,
    ) -> Self {
        RegionalEmissionsFactorTable {
            regions: regions.into_iter().map(|r| (r.id.clone(), r)).collect(),
            zips: zips.into_iter().map(|z| (z.zip, z.region_id)).collect(),
            combustion,
            national_average_kg_co2e_per_mwh: None,
        }
    }

    /// Answer unmapped zip codes with a national average grid factor
    /// instead of failing with `UnknownRegion`.
    pub fn with_national_fallback(mut self, kg_co2e_per_mwh: f64) -> Self {
        self.national_average_kg_co2e_per_mwh = Some(kg_co2e_per_mwh);
        self
    }

    pub fn lookup(&self, zip: &ZipCode) -> Result<RegionalFactors> {
        let region_id = self
            .zips
            .get(zip.as_str())
            .or_else(|| self.zips.get(zip.prefix()));

        if let Some(region) = region_id.and_then(|id| self.region_for(zip, id)) {
            debug!(
                "zip {} -> {} ({} kg CO2e/MWh)",
                zip, region.id, region.kg_co2e_per_mwh
            );
            return Ok(RegionalFactors {
                region_id: region.id.clone(),
                grid_kg_co2e_per_mwh: region.kg_co2e_per_mwh,
                combustion: self.combustion,
            });
        }

        match self.national_average_kg_co2e_per_mwh {
            Some(average) => {
                warn!("zip {} is unmapped, using national average grid factor", zip);
                Ok(RegionalFactors {
                    region_id: NATIONAL_REGION_ID.to_string(),
                    grid_kg_co2e_per_mwh: average,
                    combustion: self.combustion,
                })
            }
            None => Err(EmissionsError::UnknownRegion(zip.to_string())),
        }
    }

    fn region_for(&self, zip: &ZipCode, region_id: &str) -> Option<&GridRegion> {
        let region = self.regions.get(region_id);
        if region.is_none() {
            warn!("zip {} maps to region {} which has no grid data", zip, region_id);
        }
        region
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn combustion(&self) -> CombustionFactors {
        self.combustion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, kg: f64) -> GridRegion {
        GridRegion {
            id: id.to_string(),
            name: format!("{id} test region"),
            kg_co2e_per_mwh: kg,
        }
    }

    fn zip(zip: &str, region_id: &str) -> ZipRegion {
        ZipRegion {
            zip: zip.to_string(),
            region_id: region_id.to_string(),
        }
    }

    fn table() -> RegionalEmissionsFactorTable {
        RegionalEmissionsFactorTable::from_parts(
            vec![region("SRSO", 407.1015873015873), region("NEWE", 245.0), region("RFCE", 298.4)],
            vec![
                zip("303", "SRSO"),
                zip("029", "NEWE"),
                zip("30399", "RFCE"),
                zip("999", "GONE"),
            ],
            CombustionFactors::default(),
        )
    }

    fn code(raw: &str) -> ZipCode {
        ZipCode::parse(raw).unwrap()
    }

    #[test]
    fn prefix_lookup() {
        let factors = table().lookup(&code("30306")).unwrap();
        assert_eq!(factors.region_id, "SRSO");
        assert_eq!(factors.grid_kg_co2e_per_mwh, 407.1015873015873);
        assert_eq!(factors.combustion, CombustionFactors::default());

        assert_eq!(table().lookup(&code("02906")).unwrap().region_id, "NEWE");
    }

    #[test]
    fn exact_zip_beats_prefix() {
        assert_eq!(table().lookup(&code("30399")).unwrap().region_id, "RFCE");
    }

    #[test]
    fn unmapped_zip_fails_fast() {
        let err = table().lookup(&code("10001")).unwrap_err();
        assert!(matches!(err, EmissionsError::UnknownRegion(ref z) if z == "10001"));

        // mapped to a region with no grid data
        assert!(matches!(
            table().lookup(&code("99901")),
            Err(EmissionsError::UnknownRegion(_))
        ));
    }

    #[test]
    fn national_fallback_when_configured() {
        let table = table().with_national_fallback(371.4);
        let factors = table.lookup(&code("10001")).unwrap();
        assert_eq!(factors.region_id, NATIONAL_REGION_ID);
        assert_eq!(factors.grid_kg_co2e_per_mwh, 371.4);

        // mapped zips are unaffected
        assert_eq!(table.lookup(&code("30306")).unwrap().region_id, "SRSO");
    }

    #[test]
    fn combustion_factors_are_region_invariant() {
        let table = table();
        let a = table.lookup(&code("30306")).unwrap().combustion;
        let b = table.lookup(&code("02906")).unwrap().combustion;
        assert_eq!(a, b);
        assert_eq!(a.for_fuel(Fuel::Oil), 86.79);
    }

    #[test]
    fn combustion_override() {
        let mut factors = CombustionFactors::default();
        factors.set(Fuel::Propane, 62.87);
        assert_eq!(factors.for_fuel(Fuel::Propane), 62.87);
        assert_eq!(factors.for_fuel(Fuel::NaturalGas), 55.12);
    }
}
