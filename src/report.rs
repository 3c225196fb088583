//! Flattening of match results into report rows, and the CSV writer.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use tracing::info;

use crate::models::{MatchResult, ReportRow};

/// Header row of the written report
const HEADERS: [&str; 10] = [
    "origin_longitude",
    "origin_latitude",
    "origin_name",
    "origin_population",
    "match_name",
    "match_longitude",
    "match_latitude",
    "match_kind",
    "match_population",
    "distance_km",
];

/// Round to 2 decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One row per (origin, settlement) pair.
///
/// Origins without matches produce no rows. Only the distance is rounded.
pub fn assemble(results: &[MatchResult]) -> Vec<ReportRow> {
    results
        .iter()
        .flat_map(|result| {
            let origin = &result.origin;
            result.matches.iter().map(move |settlement| ReportRow {
                origin_longitude: origin.location.lon,
                origin_latitude: origin.location.lat,
                origin_name: origin.name.clone(),
                origin_population: origin.population,
                match_name: settlement.name.clone(),
                match_longitude: settlement.location.lon,
                match_latitude: settlement.location.lat,
                match_kind: settlement.kind.to_string(),
                match_population: settlement.population,
                distance_km: round2(settlement.distance_km),
            })
        })
        .collect()
}

/// Write rows as CSV. Coordinates get 6 decimals, distances 2.
pub fn write_rows<W: Write>(writer: W, rows: &[ReportRow]) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(HEADERS)?;

    for row in rows {
        csv_writer.write_record([
            format!("{:.6}", row.origin_longitude),
            format!("{:.6}", row.origin_latitude),
            row.origin_name.clone(),
            row.origin_population.to_string(),
            row.match_name.clone(),
            format!("{:.6}", row.match_longitude),
            format!("{:.6}", row.match_latitude),
            row.match_kind.clone(),
            row.match_population.to_string(),
            format!("{:.2}", row.distance_km),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write the report file, replacing any existing one
pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    write_rows(file, rows)?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
