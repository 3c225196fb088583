//! Turns raw settlement lookup results into validated matches for an origin.

use hashbrown::HashSet;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::geodesy::haversine_km;
use crate::models::{
    CandidateRecord, GeoPoint, RawSettlementRecord, Settlement, SettlementKind,
};
use crate::pip::BorderIndex;

/// Names made only of Russian Cyrillic letters, whitespace and hyphens
pub const CYRILLIC_NAME_PATTERN: &str = r"^[А-Яа-я\s-]+$";

/// Name used when a record carries no `name` tag
const UNKNOWN_NAME: &str = "Unknown";

/// Accepts settlement names written in the target script
#[derive(Debug, Clone)]
pub struct NameValidator {
    pattern: Regex,
}

impl NameValidator {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn cyrillic() -> Self {
        Self {
            pattern: Regex::new(CYRILLIC_NAME_PATTERN).expect("static pattern is valid"),
        }
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}

impl Default for NameValidator {
    fn default() -> Self {
        Self::cyrillic()
    }
}

/// Why a raw record did not become a match
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    InvalidCoordinates,
    OutsideBorder,
    InvalidName(String),
    Excluded(String),
    SelfMatch(String),
    Duplicate(String),
}

/// Filters lookup results down to settlements worth reporting.
///
/// Holds the read-only pieces shared by every origin: the border index,
/// the name validator and the global exclusion list.
pub struct SettlementMatcher<'a> {
    index: &'a BorderIndex,
    validator: NameValidator,
    exclusions: HashSet<String>,
}

impl<'a> SettlementMatcher<'a> {
    pub fn new(
        index: &'a BorderIndex,
        validator: NameValidator,
        exclusions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            index,
            validator,
            exclusions: exclusions.into_iter().collect(),
        }
    }

    pub fn exclusion_count(&self) -> usize {
        self.exclusions.len()
    }

    /// Validate the raw records for one origin, keeping source order.
    ///
    /// A place reported more than once (same name at the same location) is
    /// kept only the first time.
    pub fn match_settlements(
        &self,
        origin: &CandidateRecord,
        raw: Vec<RawSettlementRecord>,
    ) -> Vec<Settlement> {
        let mut matches = Vec::with_capacity(raw.len());
        let mut seen: HashSet<(String, u64, u64)> = HashSet::with_capacity(raw.len());

        for record in raw {
            let evaluated = self.evaluate(origin, record).and_then(|settlement| {
                let key = (
                    settlement.name.clone(),
                    settlement.location.lat.to_bits(),
                    settlement.location.lon.to_bits(),
                );
                if seen.insert(key) {
                    Ok(settlement)
                } else {
                    Err(Rejection::Duplicate(settlement.name))
                }
            });

            match evaluated {
                Ok(settlement) => {
                    debug!(
                        "Found: {:<20} | kind: {:<8} | population: {:<8} | distance: {:.2} km",
                        settlement.name,
                        settlement.kind,
                        settlement.population,
                        settlement.distance_km
                    );
                    matches.push(settlement);
                }
                Err(Rejection::Excluded(name)) => {
                    info!("Settlement {} is on the exclusion list, skipping", name);
                }
                Err(Rejection::SelfMatch(name)) => {
                    info!("Settlement {} is the origin itself, skipping", name);
                }
                Err(Rejection::InvalidCoordinates) => {
                    warn!("Settlement record with invalid coordinates, skipping");
                }
                Err(reason) => {
                    debug!("Settlement rejected: {:?}", reason);
                }
            }
        }

        info!("{} settlements matched near {}", matches.len(), origin.name);
        matches
    }

    /// Run every check on one record
    pub fn evaluate(
        &self,
        origin: &CandidateRecord,
        record: RawSettlementRecord,
    ) -> Result<Settlement, Rejection> {
        let location = GeoPoint::normalized(record.lat, record.lon);
        if !location.is_finite() {
            return Err(Rejection::InvalidCoordinates);
        }
        if !self.index.contains(&location) {
            return Err(Rejection::OutsideBorder);
        }

        let name = record
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());

        if !self.validator.is_valid(&name) {
            return Err(Rejection::InvalidName(name));
        }
        if self.exclusions.contains(&name) {
            return Err(Rejection::Excluded(name));
        }
        if name == origin.name {
            return Err(Rejection::SelfMatch(name));
        }

        let from = origin.location.normalize();
        let distance_km = haversine_km(from.lat, from.lon, location.lat, location.lon);

        Ok(Settlement {
            name,
            kind: SettlementKind::from_place_tag(record.place.as_deref()),
            location,
            population: parse_population(record.population.as_deref()),
            distance_km,
        })
    }
}

/// Population tag as an integer, 0 when missing or unparseable
fn parse_population(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0)
}
