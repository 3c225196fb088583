//! Point and settlement types shared by the filter, matcher and report.

use serde::{Deserialize, Serialize};

use crate::geodesy::normalize_longitude;

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a point with longitude reduced into [-180, 180]
    pub fn normalized(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon: normalize_longitude(lon),
        }
    }

    /// Same point with longitude reduced into [-180, 180]
    pub fn normalize(self) -> Self {
        Self::normalized(self.lat, self.lon)
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Convert to a geo point (x = lon, y = lat)
    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }
}

/// Kind of populated place, from the OSM `place` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementKind {
    City,
    Town,
    Village,
    Unknown,
}

impl SettlementKind {
    pub fn from_place_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some("city") => SettlementKind::City,
            Some("town") => SettlementKind::Town,
            Some("village") => SettlementKind::Village,
            _ => SettlementKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementKind::City => "city",
            SettlementKind::Town => "town",
            SettlementKind::Village => "village",
            SettlementKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SettlementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grid point read from the input file.
///
/// `location` keeps the longitude exactly as read; spatial predicates
/// normalize it on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub location: GeoPoint,
    pub name: String,
    pub population: u64,
}

impl CandidateRecord {
    pub fn new(lon: f64, lat: f64, name: impl Into<String>, population: u64) -> Self {
        Self {
            location: GeoPoint::new(lat, lon),
            name: name.into(),
            population,
        }
    }
}

/// Populated place as returned by the settlement lookup, before validation.
///
/// Tag values are kept as delivered; the matcher decides how to read them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSettlementRecord {
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<String>,
}

/// A validated settlement near an origin point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub name: String,
    pub kind: SettlementKind,
    pub location: GeoPoint,
    /// 0 when the source population was missing or unparseable
    pub population: u64,
    /// Great-circle distance from the origin in kilometers
    pub distance_km: f64,
}

/// All settlements matched for one origin point
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub origin: CandidateRecord,
    pub matches: Vec<Settlement>,
}

impl MatchResult {
    pub fn new(origin: CandidateRecord, matches: Vec<Settlement>) -> Self {
        Self { origin, matches }
    }

    pub fn empty(origin: CandidateRecord) -> Self {
        Self::new(origin, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(SettlementKind::from_place_tag(Some("town")), SettlementKind::Town);
        assert_eq!(SettlementKind::from_place_tag(Some("city")), SettlementKind::City);
        assert_eq!(
            SettlementKind::from_place_tag(Some("hamlet")),
            SettlementKind::Unknown
        );
        assert_eq!(SettlementKind::from_place_tag(None), SettlementKind::Unknown);
    }

    #[test]
    fn test_normalized_point() {
        let p = GeoPoint::normalized(10.0, 190.0);
        assert_eq!(p.lon, -170.0);
        assert_eq!(p.lat, 10.0);
    }
}
