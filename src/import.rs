//! Reference data import from CSV files
//!
//! Walks a directory for `*.csv` files and loads every file whose header
//! names a known layout:
//!
//! | Header                            | Loaded into          |
//! |-----------------------------------|----------------------|
//! | `region,name,kg_co2e_per_mwh`     | grid regions         |
//! | `region,name,co2e_lb_per_mwh`     | grid regions (lb→kg) |
//! | `zip,region`                      | zip mappings         |
//! | `fuel,kg_co2e_per_mmbtu`          | combustion factors   |
//!
//! The whole import runs in one transaction. A file that cannot be read or
//! decoded aborts it and leaves the store as it was; a row with bad fields
//! is logged, counted and skipped.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use rusqlite::Connection;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::factors::{GridRegion, ZipRegion};
use crate::models::Fuel;
use crate::units;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    RegionsKg,
    RegionsLb,
    Zips,
    Combustion,
}

impl FileKind {
    fn from_header(header: &StringRecord) -> Option<FileKind> {
        let normalized: String = header
            .iter()
            .map(|c| c.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(",");
        match normalized.as_str() {
            "region,name,kg_co2e_per_mwh" => Some(FileKind::RegionsKg),
            "region,name,co2e_lb_per_mwh" => Some(FileKind::RegionsLb),
            "zip,region" => Some(FileKind::Zips),
            "fuel,kg_co2e_per_mmbtu" => Some(FileKind::Combustion),
            _ => None,
        }
    }

    fn field_count(self) -> usize {
        match self {
            FileKind::RegionsKg | FileKind::RegionsLb => 3,
            FileKind::Zips | FileKind::Combustion => 2,
        }
    }
}

/// Parsed row before database insertion
#[derive(Debug, Clone, PartialEq)]
enum Record {
    Region(GridRegion),
    Zip(ZipRegion),
    Combustion(Fuel, f64),
}

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.trim(Trim::All).comment(Some(b'#')).flexible(true);
    builder
}

/// Field validators; the CSV reader has already split and unquoted the row
struct FieldPatterns {
    region_id: Regex,
    zip: Regex,
    fuel: Regex,
    rate: Regex,
}

impl FieldPatterns {
    fn new() -> Result<Self> {
        Ok(FieldPatterns {
            // SRSO
            region_id: Regex::new(r"^[A-Za-z0-9]{2,8}$")?,
            // 30306 or 303
            zip: Regex::new(r"^(?:[0-9]{5}|[0-9]{3})$")?,
            // natural_gas
            fuel: Regex::new(r"^[A-Za-z_]+$")?,
            // 407.1
            rate: Regex::new(r"^[0-9]+(?:\.[0-9]+)?$")?,
        })
    }

    fn parse(&self, kind: FileKind, row: &StringRecord) -> Result<Record> {
        if row.len() != kind.field_count() {
            bail!("expected {} fields, found {}", kind.field_count(), row.len());
        }

        match kind {
            FileKind::RegionsKg | FileKind::RegionsLb => {
                let id = self.region_id(&row[0])?;
                let name = row[1].trim();
                if name.is_empty() {
                    bail!("region {id} has no name");
                }
                let mut rate = self.rate(&row[2])?;
                if kind == FileKind::RegionsLb {
                    rate = units::pounds_per_mwh_to_kg(rate)?;
                }
                Ok(Record::Region(GridRegion {
                    id,
                    name: name.to_string(),
                    kg_co2e_per_mwh: rate,
                }))
            }
            FileKind::Zips => {
                if !self.zip.is_match(&row[0]) {
                    bail!("not a zip code or 3-digit prefix: {:?}", &row[0]);
                }
                Ok(Record::Zip(ZipRegion {
                    zip: row[0].to_string(),
                    region_id: self.region_id(&row[1])?,
                }))
            }
            FileKind::Combustion => {
                if !self.fuel.is_match(&row[0]) {
                    bail!("not a fuel key: {:?}", &row[0]);
                }
                let key = row[0].to_ascii_lowercase();
                let fuel =
                    Fuel::from_key(&key).with_context(|| format!("unknown fuel {:?}", &row[0]))?;
                Ok(Record::Combustion(fuel, self.rate(&row[1])?))
            }
        }
    }

    fn region_id(&self, field: &str) -> Result<String> {
        if !self.region_id.is_match(field) {
            bail!("not a region id: {field:?}");
        }
        Ok(field.to_ascii_uppercase())
    }

    fn rate(&self, field: &str) -> Result<f64> {
        if !self.rate.is_match(field) {
            bail!("not a non-negative number: {field:?}");
        }
        Ok(field.parse()?)
    }
}

/// Find all CSV files under a directory, sorted for a stable import order
pub fn find_reference_files(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(source_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Import all recognised reference files into the database, optionally
/// clearing existing reference data first. Nothing is written unless the
/// whole import succeeds.
pub fn import_to_database(
    conn: &Connection,
    source_dir: &Path,
    clear: bool,
) -> Result<ImportStats> {
    let patterns = FieldPatterns::new()?;
    let mut stats = ImportStats::default();

    info!("scanning {} for reference data", source_dir.display());
    let files = find_reference_files(source_dir)?;
    info!("found {} CSV files", files.len());

    let tx = conn.unchecked_transaction()?;
    if clear {
        db::clear_reference_data(&tx)?;
    }

    for path in &files {
        import_file(&tx, path, &patterns, &mut stats)
            .with_context(|| format!("Failed to import {}", path.display()))?;
    }

    tx.commit()?;
    Ok(stats)
}

fn import_file(
    conn: &Connection,
    path: &Path,
    patterns: &FieldPatterns,
    stats: &mut ImportStats,
) -> Result<()> {
    let mut reader = reader_builder().from_path(path)?;

    let Some(kind) = FileKind::from_header(reader.headers()?) else {
        debug!("skipping {} (unrecognised header)", path.display());
        stats.skipped_files += 1;
        return Ok(());
    };

    for row in reader.records() {
        let row = row?;
        match patterns.parse(kind, &row) {
            Ok(record) => {
                store(conn, &record)?;
                stats.count(&record);
            }
            Err(e) => {
                let line = row.position().map_or(0, |p| p.line());
                warn!("{}:{}: {}", path.display(), line, e);
                stats.errors += 1;
            }
        }
    }
    stats.files += 1;
    Ok(())
}

fn store(conn: &Connection, record: &Record) -> Result<()> {
    match record {
        Record::Region(region) => db::upsert_region(conn, region),
        Record::Zip(mapping) => db::upsert_zip_region(conn, mapping),
        Record::Combustion(fuel, value) => db::upsert_combustion_factor(conn, *fuel, *value),
    }
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub regions: usize,
    pub zip_mappings: usize,
    pub combustion_factors: usize,
    pub skipped_files: usize,
    pub errors: usize,
}

impl ImportStats {
    fn count(&mut self, record: &Record) {
        match record {
            Record::Region(_) => self.regions += 1,
            Record::Zip(_) => self.zip_mappings += 1,
            Record::Combustion(..) => self.combustion_factors += 1,
        }
    }
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} files ({} regions, {} zip mappings, {} combustion factors). \
             Skipped: {}, Errors: {}",
            self.files,
            self.regions,
            self.zip_mappings,
            self.combustion_factors,
            self.skipped_files,
            self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::models::ZipCode;

    fn parse_line(kind: FileKind, line: &str) -> Result<Record> {
        let row = reader_builder()
            .has_headers(false)
            .from_reader(line.as_bytes())
            .records()
            .next()
            .unwrap()?;
        FieldPatterns::new()?.parse(kind, &row)
    }

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn header_detection() {
        let header = |fields: &[&str]| StringRecord::from(fields.to_vec());
        assert_eq!(FileKind::from_header(&header(&["zip", "region"])), Some(FileKind::Zips));
        assert_eq!(FileKind::from_header(&header(&[" ZIP ", " Region "])), Some(FileKind::Zips));
        assert_eq!(
            FileKind::from_header(&header(&["\u{feff}region", "name", "co2e_lb_per_mwh"])),
            Some(FileKind::RegionsLb)
        );
        assert_eq!(FileKind::from_header(&header(&["id", "value"])), None);
    }

    #[test]
    fn row_parsing() {
        let record = parse_line(FileKind::RegionsKg, r#"srso,"SERC South",407.1015873015873"#)
            .unwrap();
        assert_eq!(
            record,
            Record::Region(GridRegion {
                id: "SRSO".to_string(),
                name: "SERC South".to_string(),
                kg_co2e_per_mwh: 407.1015873015873,
            })
        );

        match parse_line(FileKind::RegionsLb, "NEWE,NPCC New England,1000").unwrap() {
            Record::Region(r) => assert!((r.kg_co2e_per_mwh - 453.59237).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }

        assert!(parse_line(FileKind::Zips, "3030,SRSO").is_err());
        assert!(parse_line(FileKind::Zips, "30306,SRSO,extra").is_err());
        assert!(parse_line(FileKind::Combustion, "coal,95.5").is_err());
        assert!(parse_line(FileKind::RegionsKg, "SRSO,SERC South,-4").is_err());
        assert_eq!(
            parse_line(FileKind::Combustion, "oil, 74.14").unwrap(),
            Record::Combustion(Fuel::Oil, 74.14)
        );
    }

    #[test]
    fn quoted_names_may_contain_commas() {
        let record =
            parse_line(FileKind::RegionsKg, r#"NYCW,"NPCC NYC/Westchester, NY",398.3"#).unwrap();
        assert_eq!(
            record,
            Record::Region(GridRegion {
                id: "NYCW".to_string(),
                name: "NPCC NYC/Westchester, NY".to_string(),
                kg_co2e_per_mwh: 398.3,
            })
        );
    }

    #[test]
    fn fuel_keys_are_case_insensitive() {
        assert_eq!(
            parse_line(FileKind::Combustion, "Natural_Gas,53.06").unwrap(),
            Record::Combustion(Fuel::NaturalGas, 53.06)
        );
        assert_eq!(
            parse_line(FileKind::Combustion, "PROPANE,62.87").unwrap(),
            Record::Combustion(Fuel::Propane, 62.87)
        );
    }

    #[test]
    fn imports_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("egrid");
        fs::create_dir(&nested).unwrap();

        fs::write(
            nested.join("subregions.csv"),
            "region,name,kg_co2e_per_mwh\n\
             SRSO,SERC South,407.1015873015873\n\
             NEWE,NPCC New England,245\n\
             NYCW,\"NPCC NYC/Westchester, NY\",398.3\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("zips.CSV"),
            "zip,region\n# Georgia\n303,SRSO\n\n02906,NEWE\nbad row\n",
        )
        .unwrap();
        fs::write(dir.path().join("fuels.csv"), "fuel,kg_co2e_per_mmbtu\npropane,62.87\n").unwrap();
        fs::write(dir.path().join("notes.csv"), "title,body\na,b\n").unwrap();
        fs::write(dir.path().join("readme.txt"), "zip,region\n999,XXXX\n").unwrap();

        let conn = open();
        let stats = import_to_database(&conn, dir.path(), false).unwrap();

        assert_eq!(stats.files, 3);
        assert_eq!(stats.regions, 3);
        assert_eq!(stats.zip_mappings, 2);
        assert_eq!(stats.combustion_factors, 1);
        assert_eq!(stats.skipped_files, 1);
        assert_eq!(stats.errors, 1);

        let table = db::load_factor_table(&conn).unwrap();
        let factors = table.lookup(&ZipCode::parse("02906").unwrap()).unwrap();
        assert_eq!(factors.region_id, "NEWE");
        assert_eq!(factors.grid_kg_co2e_per_mwh, 245.0);
        assert_eq!(factors.combustion.propane, 62.87);
        assert!(table.lookup(&ZipCode::parse("99901").unwrap()).is_err());
    }

    #[test]
    fn failed_import_leaves_store_unchanged() {
        let conn = open();
        db::upsert_region(
            &conn,
            &GridRegion {
                id: "CAMX".to_string(),
                name: "WECC California".to_string(),
                kg_co2e_per_mwh: 225.6,
            },
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "region,name,kg_co2e_per_mwh\nNEWE,New England,245\n")
            .unwrap();
        // Latin-1 export
        fs::write(
            dir.path().join("b.csv"),
            b"region,name,kg_co2e_per_mwh\nERCT,Caf\xe9\xff,373.1\n".as_slice(),
        )
        .unwrap();

        let err = import_to_database(&conn, dir.path(), true).unwrap_err();
        assert!(format!("{err:#}").contains("b.csv"));

        let regions = db::list_regions(&conn).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, "CAMX");
    }

    #[test]
    fn clear_replaces_existing_data() {
        let conn = open();
        db::upsert_zip_region(
            &conn,
            &ZipRegion {
                zip: "100".to_string(),
                region_id: "NYCW".to_string(),
            },
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zips.csv"), "zip,region\n303,SRSO\n").unwrap();

        import_to_database(&conn, dir.path(), true).unwrap();
        assert_eq!(db::count_zip_mappings(&conn).unwrap(), vec![("SRSO".to_string(), 1)]);
    }
}
