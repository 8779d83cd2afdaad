//! HVAC Emissions Calculator
//!
//! Estimates the greenhouse-gas reduction from replacing a residential
//! heating unit with an electric heat pump.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use hvac_emissions::calculator::EmissionsCalculator;
use hvac_emissions::config::{Config, LogConfig};
use hvac_emissions::factors::{GridRegion, RegionalEmissionsFactorTable, ZipRegion};
use hvac_emissions::models::{FuelFamily, HvacUpgradeRequest, UpgradePath, ZipCode};
use hvac_emissions::standards::{self, Catalog};
use hvac_emissions::{db, import};

#[derive(Parser)]
#[command(name = "hvac-emissions")]
#[command(about = "Emissions reduction calculator for residential HVAC heat pump upgrades")]
struct Cli {
    /// Path to the SQLite reference database (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Same JSON bodies as the web service
    Json,
    /// Human-readable summary
    Text,
}

#[derive(Clone, Copy, ValueEnum)]
enum FamilyArg {
    GasPropane,
    Oil,
    Electric,
}

impl From<FamilyArg> for FuelFamily {
    fn from(arg: FamilyArg) -> Self {
        match arg {
            FamilyArg::GasPropane => FuelFamily::GasPropane,
            FamilyArg::Oil => FuelFamily::Oil,
            FamilyArg::Electric => FuelFamily::Electric,
        }
    }
}

#[derive(Args)]
struct UpgradeArgs {
    /// Five-digit zip code of the home
    #[arg(long)]
    zip_code: String,

    /// Rated efficiency of the replacement heat pump
    #[arg(long)]
    new_unit_efficiency_btu_per_watt_hour: f64,

    /// Efficiency of the existing unit
    #[arg(long, required_unless_present = "existing_standard")]
    existing_efficiency_btu_per_watt_hour: Option<f64>,

    /// Catalog label of the existing unit, instead of a numeric efficiency
    #[arg(long, conflicts_with = "existing_efficiency_btu_per_watt_hour")]
    existing_standard: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Natural gas furnace or boiler replaced by a heat pump
    NaturalGasToElectric {
        #[command(flatten)]
        upgrade: UpgradeArgs,

        #[arg(long)]
        existing_consumption_cubic_feet_per_year: f64,
    },

    /// Heating oil furnace or boiler replaced by a heat pump
    OilToElectric {
        #[command(flatten)]
        upgrade: UpgradeArgs,

        #[arg(long)]
        existing_consumption_gallons_per_year: f64,
    },

    /// Propane furnace replaced by a heat pump
    PropaneToElectric {
        #[command(flatten)]
        upgrade: UpgradeArgs,

        #[arg(long)]
        existing_consumption_gallons_per_year: f64,
    },

    /// Electric heating or cooling replaced by a heat pump
    ElectricToElectric {
        #[command(flatten)]
        upgrade: UpgradeArgs,

        #[arg(long)]
        annual_hvac_usage_kwh: f64,
    },

    /// List natural gas and propane efficiency standards
    NaturalGasAndPropaneEfficiencyStandards,

    /// List oil efficiency standards
    OilEfficiencyStandards,

    /// List electric efficiency standards
    ElectricEfficiencyStandards,

    /// Look up one efficiency standard by its exact label
    Standard {
        #[arg(value_enum)]
        family: FamilyArg,

        label: String,
    },

    /// Show the emissions factors used for a zip code
    Region { zip_code: String },

    /// List grid regions in the database
    ListRegions,

    /// Import reference data from a directory of CSV files
    Import {
        source_dir: PathBuf,

        /// Clear existing data before import
        #[arg(long)]
        clear: bool,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample grid regions and zip mappings
    LoadSample {
        /// Clear existing data before loading
        #[arg(long)]
        clear: bool,
    },
}

fn init_logging(log: &LogConfig, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("hvac_emissions=debug")
        } else {
            EnvFilter::new(&log.level)
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config.log, cli.verbose);

    let database = cli.database.clone().unwrap_or_else(|| config.database.clone());
    let conn = Connection::open(&database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::NaturalGasToElectric {
            upgrade,
            existing_consumption_cubic_feet_per_year,
        } => run_upgrade(
            &conn,
            &config,
            cli.format,
            UpgradePath::NaturalGasToElectric,
            &upgrade,
            existing_consumption_cubic_feet_per_year,
        )?,

        Commands::OilToElectric {
            upgrade,
            existing_consumption_gallons_per_year,
        } => run_upgrade(
            &conn,
            &config,
            cli.format,
            UpgradePath::OilToElectric,
            &upgrade,
            existing_consumption_gallons_per_year,
        )?,

        Commands::PropaneToElectric {
            upgrade,
            existing_consumption_gallons_per_year,
        } => run_upgrade(
            &conn,
            &config,
            cli.format,
            UpgradePath::PropaneToElectric,
            &upgrade,
            existing_consumption_gallons_per_year,
        )?,

        Commands::ElectricToElectric {
            upgrade,
            annual_hvac_usage_kwh,
        } => run_upgrade(
            &conn,
            &config,
            cli.format,
            UpgradePath::ElectricToElectric,
            &upgrade,
            annual_hvac_usage_kwh,
        )?,

        Commands::NaturalGasAndPropaneEfficiencyStandards => {
            print_catalog(FuelFamily::GasPropane, cli.format)?
        }
        Commands::OilEfficiencyStandards => print_catalog(FuelFamily::Oil, cli.format)?,
        Commands::ElectricEfficiencyStandards => print_catalog(FuelFamily::Electric, cli.format)?,

        Commands::Standard { family, label } => {
            let value = standards::lookup_standard(family.into(), &label)?;
            match cli.format {
                Format::Json => {
                    let mut body = serde_json::Map::new();
                    body.insert(label, value.into());
                    println!("{}", serde_json::Value::Object(body));
                }
                Format::Text => println!("{}: {} BTU/Wh", label, value),
            }
        }

        Commands::Region { zip_code } => {
            let zip = ZipCode::parse(&zip_code)?;
            let table = load_table(&conn, &config)?;
            let factors = table.lookup(&zip)?;
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&factors)?),
                Format::Text => {
                    println!("Zip code: {}", zip);
                    println!("  Grid region: {}", factors.region_id);
                    println!("  Grid factor: {} kg CO2e/MWh", factors.grid_kg_co2e_per_mwh);
                    println!("  Natural gas: {} kg CO2e/MMBtu", factors.combustion.natural_gas);
                    println!("  Oil:         {} kg CO2e/MMBtu", factors.combustion.oil);
                    println!("  Propane:     {} kg CO2e/MMBtu", factors.combustion.propane);
                }
            }
        }

        Commands::ListRegions => {
            let regions = db::list_regions(&conn)?;
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&regions)?),
                Format::Text if regions.is_empty() => {
                    println!("No grid regions in database. Run 'import' or 'load-sample' first.");
                }
                Format::Text => {
                    let counts = db::count_zip_mappings(&conn)?;
                    println!("{:<8} {:<32} {:>14} {:>6}", "Region", "Name", "kg CO2e/MWh", "Zips");
                    println!("{}", "-".repeat(63));
                    for r in regions {
                        let zips = counts
                            .iter()
                            .find(|(id, _)| *id == r.id)
                            .map_or(0, |(_, n)| *n);
                        println!(
                            "{:<8} {:<32} {:>14.1} {:>6}",
                            r.id, r.name, r.kg_co2e_per_mwh, zips
                        );
                    }
                    let combustion = load_table(&conn, &config)?.combustion();
                    println!();
                    println!(
                        "Combustion (kg CO2e/MMBtu): natural gas {}, oil {}, propane {}",
                        combustion.natural_gas, combustion.oil, combustion.propane
                    );
                }
            }
        }

        Commands::Import { source_dir, clear } => {
            if clear {
                println!("Clearing existing data...");
            }

            let stats = import::import_to_database(&conn, &source_dir, clear)?;
            println!("{}", stats);
        }

        Commands::Init => {
            println!("Database initialized at: {}", database.display());
        }

        Commands::LoadSample { clear } => {
            if clear {
                println!("Clearing existing data...");
            }
            load_sample_data(&conn, clear)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

fn load_table(conn: &Connection, config: &Config) -> Result<RegionalEmissionsFactorTable> {
    let table = db::load_factor_table(conn)?;
    if table.region_count() == 0 {
        warn!("no grid regions in database, run 'import' or 'load-sample' first");
    }
    Ok(if config.lookup.fallback_to_national_average {
        table.with_national_fallback(config.lookup.national_average_kg_co2e_per_mwh)
    } else {
        table
    })
}

fn run_upgrade(
    conn: &Connection,
    config: &Config,
    format: Format,
    path: UpgradePath,
    args: &UpgradeArgs,
    existing_consumption: f64,
) -> Result<()> {
    let existing_efficiency = match (
        &args.existing_standard,
        args.existing_efficiency_btu_per_watt_hour,
    ) {
        (Some(label), _) => standards::lookup_standard(path.fuel_family(), label)?,
        (None, Some(value)) => value,
        (None, None) => anyhow::bail!("an existing efficiency or standard is required"),
    };

    let request = HvacUpgradeRequest::new(
        path,
        &args.zip_code,
        args.new_unit_efficiency_btu_per_watt_hour,
        existing_efficiency,
        existing_consumption,
    )?;

    let calculator = EmissionsCalculator::new(load_table(conn, config)?)
        .with_further_information(config.report.further_information.clone());
    let assessment = calculator.assess(&request)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&assessment.result)?),
        Format::Text => println!("{}", assessment),
    }
    Ok(())
}

fn print_catalog(family: FuelFamily, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&Catalog(family))?),
        Format::Text => {
            println!("{:<52} {:>12}", "Standard", "BTU/Wh");
            println!("{}", "-".repeat(65));
            for s in standards::list_standards(family) {
                println!("{:<52} {:>12.9}", s.label, s.btu_per_watt_hour);
            }
        }
    }
    Ok(())
}

/// eGRID-style subregions, kg CO2e per MWh of delivered electricity
const SAMPLE_REGIONS: &[(&str, &str, f64)] = &[
    ("CAMX", "WECC California", 225.6),
    ("ERCT", "ERCOT All", 373.1),
    ("FRCC", "FRCC All", 383.9),
    ("MROW", "MRO West", 427.5),
    ("NEWE", "NPCC New England", 245.0),
    ("NWPP", "WECC Northwest", 287.9),
    ("NYCW", "NPCC NYC/Westchester", 398.3),
    ("NYUP", "NPCC Upstate NY", 106.2),
    ("RFCE", "RFC East", 298.4),
    ("RFCW", "RFC West", 464.3),
    ("RMPA", "WECC Rockies", 544.0),
    ("SRSO", "SERC South", 407.1015873015873),
    ("SRVC", "SERC Virginia/Carolina", 307.6),
];

/// Three-digit zip prefixes per sample region
const SAMPLE_ZIP_PREFIXES: &[(&str, &[&str])] = &[
    ("CAMX", &["900", "902", "941", "945"]),
    ("ERCT", &["750", "752", "770", "787"]),
    ("FRCC", &["320", "321", "331", "336"]),
    ("MROW", &["553", "554", "580"]),
    ("NEWE", &["021", "022", "028", "029", "060", "061"]),
    ("NWPP", &["970", "972", "980", "981"]),
    ("NYCW", &["100", "101", "104"]),
    ("NYUP", &["122", "142"]),
    ("RFCE", &["070", "080", "190", "191"]),
    ("RFCW", &["152", "432", "452"]),
    ("RMPA", &["800", "802"]),
    ("SRSO", &["300", "301", "302", "303", "305", "306", "350", "352"]),
    ("SRVC", &["232", "275", "276", "282"]),
];

/// Load sample reference data for trying the calculator without an import.
/// Sample rows replace same-keyed rows; everything else is kept unless `clear`.
fn load_sample_data(conn: &Connection, clear: bool) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    if clear {
        db::clear_reference_data(&tx)?;
    } else if !db::list_regions(&tx)?.is_empty() {
        warn!("merging sample data into existing reference data, pass --clear to replace it");
    }

    for (id, name, kg_co2e_per_mwh) in SAMPLE_REGIONS {
        db::upsert_region(
            &tx,
            &GridRegion {
                id: id.to_string(),
                name: name.to_string(),
                kg_co2e_per_mwh: *kg_co2e_per_mwh,
            },
        )?;
    }

    let mut mappings = 0;
    for (region_id, prefixes) in SAMPLE_ZIP_PREFIXES {
        for prefix in *prefixes {
            db::upsert_zip_region(
                &tx,
                &ZipRegion {
                    zip: prefix.to_string(),
                    region_id: region_id.to_string(),
                },
            )?;
            mappings += 1;
        }
    }
    tx.commit()?;

    println!(
        "Loaded {} sample regions and {} zip prefixes",
        SAMPLE_REGIONS.len(),
        mappings
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_parses_wire_parameter_names() {
        let cli = Cli::try_parse_from([
            "hvac-emissions",
            "natural-gas-to-electric",
            "--zip-code",
            "30306",
            "--new-unit-efficiency-btu-per-watt-hour",
            "17.0",
            "--existing-efficiency-btu-per-watt-hour",
            "4.0",
            "--existing-consumption-cubic-feet-per-year",
            "70000",
        ])
        .unwrap();
        match cli.command {
            Commands::NaturalGasToElectric {
                upgrade,
                existing_consumption_cubic_feet_per_year,
            } => {
                assert_eq!(upgrade.zip_code, "30306");
                assert_eq!(upgrade.existing_efficiency_btu_per_watt_hour, Some(4.0));
                assert_eq!(existing_consumption_cubic_feet_per_year, 70_000.0);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn cli_requires_exactly_one_existing_efficiency() {
        let base = [
            "hvac-emissions",
            "electric-to-electric",
            "--zip-code",
            "30306",
            "--new-unit-efficiency-btu-per-watt-hour",
            "17",
            "--annual-hvac-usage-kwh",
            "2000",
        ];
        assert!(Cli::try_parse_from(base).is_err());

        let mut with_standard = base.to_vec();
        with_standard.extend(["--existing-standard", "SEER - Central Air Conditioner - Pre-2006"]);
        assert!(Cli::try_parse_from(with_standard.clone()).is_ok());

        let mut both = with_standard.clone();
        both.extend(["--existing-efficiency-btu-per-watt-hour", "10"]);
        assert!(Cli::try_parse_from(both).is_err());
    }

    #[test]
    fn sample_data_covers_published_scenarios() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        load_sample_data(&conn, false).unwrap();

        let calculator = EmissionsCalculator::new(load_table(&conn, &Config::default()).unwrap());
        let electric = calculator.electric_to_electric("30306", 17.0, 10.0, 2_000.0).unwrap();
        assert_eq!(electric.existing_emissions_tons_co2e, 0.8142031746031746);

        let oil = calculator.oil_to_electric("02906", 16.0, 2.661470474, 1_000.0).unwrap();
        assert!((oil.new_unit_emissions_metric_tons_co2e - 1.29).abs() < 0.005);
    }

    #[test]
    fn load_sample_keeps_imported_data_unless_cleared() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let imported = GridRegion {
            id: "AKGD".to_string(),
            name: "ASCC Alaska Grid".to_string(),
            kg_co2e_per_mwh: 476.2,
        };
        db::upsert_region(&conn, &imported).unwrap();

        load_sample_data(&conn, false).unwrap();
        let regions = db::list_regions(&conn).unwrap();
        assert_eq!(regions.len(), SAMPLE_REGIONS.len() + 1);
        assert!(regions.contains(&imported));

        load_sample_data(&conn, true).unwrap();
        let regions = db::list_regions(&conn).unwrap();
        assert_eq!(regions.len(), SAMPLE_REGIONS.len());
        assert!(!regions.contains(&imported));
    }

    #[test]
    fn sample_prefixes_reference_sample_regions() {
        for (region_id, _) in SAMPLE_ZIP_PREFIXES {
            assert!(SAMPLE_REGIONS.iter().any(|(id, _, _)| id == region_id));
        }
    }
}
