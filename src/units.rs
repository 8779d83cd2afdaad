//! Fuel and energy unit conversion

use crate::error::{EmissionsError, Result};

pub const BTU_PER_CUBIC_FOOT_NATURAL_GAS: f64 = 1_036.0;
pub const BTU_PER_GALLON_OIL: f64 = 138_500.0;
pub const BTU_PER_GALLON_PROPANE: f64 = 138_700.0;
pub const BTU_PER_KWH: f64 = 3_412.141633;

/// One watt-hour of heat; an efficiency of this many BTU/Wh is 100%.
pub const BTU_PER_WATT_HOUR: f64 = 3.412141633;

pub const BTU_PER_MMBTU: f64 = 1_000_000.0;
pub const KWH_PER_MWH: f64 = 1_000.0;
pub const KG_PER_METRIC_TON: f64 = 1_000.0;
pub const KG_PER_POUND: f64 = 0.45359237;

fn require_non_negative(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EmissionsError::invalid(format!(
            "{what} must be a non-negative number, got {value}"
        )))
    }
}

pub fn cubic_feet_natural_gas_to_btu(cubic_feet: f64) -> Result<f64> {
    Ok(require_non_negative("natural gas volume", cubic_feet)? * BTU_PER_CUBIC_FOOT_NATURAL_GAS)
}

pub fn gallons_oil_to_btu(gallons: f64) -> Result<f64> {
    Ok(require_non_negative("heating oil volume", gallons)? * BTU_PER_GALLON_OIL)
}

pub fn gallons_propane_to_btu(gallons: f64) -> Result<f64> {
    Ok(require_non_negative("propane volume", gallons)? * BTU_PER_GALLON_PROPANE)
}

pub fn kwh_to_btu(kwh: f64) -> Result<f64> {
    Ok(require_non_negative("electric energy", kwh)? * BTU_PER_KWH)
}

pub fn btu_to_kwh(btu: f64) -> Result<f64> {
    Ok(require_non_negative("heat energy", btu)? / BTU_PER_KWH)
}

/// eGRID publishes output rates in lb/MWh
pub fn pounds_per_mwh_to_kg(lb_per_mwh: f64) -> Result<f64> {
    Ok(require_non_negative("emission rate", lb_per_mwh)? * KG_PER_POUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuel_conversions() {
        assert_eq!(cubic_feet_natural_gas_to_btu(70_000.0).unwrap(), 72_520_000.0);
        assert_eq!(gallons_oil_to_btu(1_000.0).unwrap(), 138_500_000.0);
        assert_eq!(gallons_propane_to_btu(1_000.0).unwrap(), 138_700_000.0);
        assert_ne!(BTU_PER_GALLON_OIL, BTU_PER_GALLON_PROPANE);
    }

    #[test]
    fn electric_conversions() {
        assert_eq!(kwh_to_btu(1.0).unwrap(), BTU_PER_KWH);
        assert!((btu_to_kwh(kwh_to_btu(2_000.0).unwrap()).unwrap() - 2_000.0).abs() < 1e-9);
        assert!((BTU_PER_KWH / 1_000.0 - BTU_PER_WATT_HOUR).abs() < 1e-12);
    }

    #[test]
    fn zero_is_allowed() {
        assert_eq!(gallons_oil_to_btu(0.0).unwrap(), 0.0);
        assert_eq!(kwh_to_btu(0.0).unwrap(), 0.0);
    }

    #[test]
    fn negative_and_non_finite_input_rejected() {
        for value in [-1.0, f64::NAN, f64::NEG_INFINITY] {
            assert!(matches!(
                cubic_feet_natural_gas_to_btu(value),
                Err(EmissionsError::InvalidArgument(_))
            ));
            assert!(matches!(
                gallons_propane_to_btu(value),
                Err(EmissionsError::InvalidArgument(_))
            ));
            assert!(matches!(btu_to_kwh(value), Err(EmissionsError::InvalidArgument(_))));
        }
    }

    #[test]
    fn pound_rates_convert_to_kilograms() {
        let kg = pounds_per_mwh_to_kg(1_000.0).unwrap();
        assert!((kg - 453.59237).abs() < 1e-9);
    }
}
