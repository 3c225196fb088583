//! Flat report row handed to the output writer.

use serde::{Deserialize, Serialize};

/// One (origin, nearby settlement) pair.
///
/// Column order here is the column order of the written report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub origin_longitude: f64,
    pub origin_latitude: f64,
    pub origin_name: String,
    pub origin_population: u64,
    pub match_name: String,
    pub match_longitude: f64,
    pub match_latitude: f64,
    pub match_kind: String,
    pub match_population: u64,
    /// Rounded to 2 decimals
    pub distance_km: f64,
}
