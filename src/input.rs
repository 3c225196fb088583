//! Readers for the candidate grid and the exclusion list.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::models::CandidateRecord;

/// Parse a coordinate cell.
///
/// Whitespace (including non-breaking and narrow spaces used as digit
/// grouping) is ignored and a comma is accepted as the decimal separator.
pub fn parse_decimal(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a population cell; empty or unparseable values become 0.
///
/// Fractional values are truncated, negative ones count as unparseable.
pub fn parse_population(cell: &str) -> u64 {
    match parse_decimal(cell) {
        Some(v) if v >= 0.0 => v.trunc() as u64,
        _ => 0,
    }
}

/// Read candidate points from CSV.
///
/// Columns are positional: longitude, latitude, name, population. The
/// first row is a header. Rows without usable coordinates are skipped.
pub fn read_candidates<R: Read>(reader: R) -> Result<Vec<CandidateRecord>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut candidates = Vec::new();

    for (i, result) in csv_reader.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to read row {}: {}", line, e);
                continue;
            }
        };

        let lon = record.get(0).and_then(parse_decimal);
        let lat = record.get(1).and_then(parse_decimal);
        let (Some(lon), Some(lat)) = (lon, lat) else {
            warn!("Row {} has no usable coordinates, skipping", line);
            continue;
        };
        if !(-90.0..=90.0).contains(&lat) {
            warn!("Row {} latitude {} out of range, skipping", line, lat);
            continue;
        }

        candidates.push(CandidateRecord::new(
            lon,
            lat,
            record.get(2).unwrap_or_default(),
            record.get(3).map(parse_population).unwrap_or(0),
        ));
    }

    Ok(candidates)
}

pub fn load_candidates(path: &Path) -> Result<Vec<CandidateRecord>> {
    info!("Loading candidate points from {}", path.display());

    let file = File::open(path).context("Failed to open candidate points file")?;
    let candidates = read_candidates(file)?;

    info!("Loaded {} candidate points", candidates.len());
    Ok(candidates)
}

/// Read exclusion names, one per line; blank lines are ignored
pub fn read_exclusions<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

pub fn load_exclusions(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).context("Failed to open exclusion list")?;
    let names = read_exclusions(BufReader::new(file))?;

    info!("Read {} excluded names", names.len());
    Ok(names)
}
