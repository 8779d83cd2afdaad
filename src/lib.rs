//! Emissions reduction estimates for residential HVAC heat pump upgrades
//!
//! [`calculator::EmissionsCalculator`] turns an existing heating unit's
//! annual consumption into existing, new-unit and avoided emissions using
//! regional grid factors ([`factors`]) and fuel conversions ([`units`]).

pub mod calculator;
pub mod config;
pub mod db;
pub mod error;
pub mod factors;
pub mod import;
pub mod models;
pub mod standards;
pub mod units;
