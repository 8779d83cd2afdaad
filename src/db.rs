//! Reference database schema and operations

use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error;
use crate::factors::{CombustionFactors, GridRegion, RegionalEmissionsFactorTable, ZipRegion};
use crate::models::Fuel;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Electricity grid subregions and their output emission rates
        CREATE TABLE IF NOT EXISTS grid_regions (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            kg_co2e_per_mwh REAL NOT NULL
        );

        -- Five-digit zip codes or three-digit prefixes
        CREATE TABLE IF NOT EXISTS zip_regions (
            zip TEXT PRIMARY KEY,
            region_id TEXT NOT NULL
        );

        -- Overrides for the built-in direct-combustion factors
        CREATE TABLE IF NOT EXISTS combustion_factors (
            fuel TEXT PRIMARY KEY,
            kg_co2e_per_mmbtu REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_zip_regions_region ON zip_regions(region_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace a grid region
pub fn upsert_region(conn: &Connection, region: &GridRegion) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO grid_regions (id, name, kg_co2e_per_mwh) VALUES (?1, ?2, ?3)",
        (&region.id, &region.name, region.kg_co2e_per_mwh),
    )?;
    Ok(())
}

/// Insert or replace a zip (or prefix) mapping
pub fn upsert_zip_region(conn: &Connection, mapping: &ZipRegion) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO zip_regions (zip, region_id) VALUES (?1, ?2)",
        (&mapping.zip, &mapping.region_id),
    )?;
    Ok(())
}

pub fn upsert_combustion_factor(
    conn: &Connection,
    fuel: Fuel,
    kg_co2e_per_mmbtu: f64,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO combustion_factors (fuel, kg_co2e_per_mmbtu) VALUES (?1, ?2)",
        (fuel.key(), kg_co2e_per_mmbtu),
    )?;
    Ok(())
}

/// Clear all reference data (for re-import)
pub fn clear_reference_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM combustion_factors;
        DELETE FROM zip_regions;
        DELETE FROM grid_regions;
        "#,
    )?;
    Ok(())
}

/// List all grid regions ordered by id
pub fn list_regions(conn: &Connection) -> Result<Vec<GridRegion>> {
    Ok(query_regions(conn)?)
}

/// Number of zip mappings pointing at each region, ordered by region id
pub fn count_zip_mappings(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT region_id, COUNT(*) FROM zip_regions GROUP BY region_id ORDER BY region_id",
    )?;

    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as usize)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Read the whole reference store into an immutable lookup table
pub fn load_factor_table(conn: &Connection) -> error::Result<RegionalEmissionsFactorTable> {
    let regions = query_regions(conn)?;

    let mut stmt = conn.prepare("SELECT zip, region_id FROM zip_regions")?;
    let rows = stmt.query_map([], |row| {
        Ok(ZipRegion {
            zip: row.get(0)?,
            region_id: row.get(1)?,
        })
    })?;
    let mut zips = Vec::new();
    for row in rows {
        zips.push(row?);
    }

    let mut combustion = CombustionFactors::default();
    let mut stmt = conn.prepare("SELECT fuel, kg_co2e_per_mmbtu FROM combustion_factors")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
    for row in rows {
        let (key, value) = row?;
        match Fuel::from_key(&key) {
            Some(fuel) => combustion.set(fuel, value),
            None => warn!("ignoring combustion factor for unknown fuel {:?}", key),
        }
    }

    info!(
        "loaded {} grid regions and {} zip mappings",
        regions.len(),
        zips.len()
    );
    Ok(RegionalEmissionsFactorTable::from_parts(regions, zips, combustion))
}

fn query_regions(conn: &Connection) -> rusqlite::Result<Vec<GridRegion>> {
    let mut stmt =
        conn.prepare("SELECT id, name, kg_co2e_per_mwh FROM grid_regions ORDER BY id")?;

    let rows = stmt.query_map([], |row| {
        Ok(GridRegion {
            id: row.get(0)?,
            name: row.get(1)?,
            kg_co2e_per_mwh: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}
