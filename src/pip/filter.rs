//! Border membership filter for candidate grid points.

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::BorderIndex;
use crate::geodesy::{disk, normalize_longitude};
use crate::models::{CandidateRecord, GeoPoint};

/// Default buffer radius around a point, in degrees (about 10 m)
pub const DEFAULT_BUFFER_DEGREES: f64 = 0.0001;

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("coordinates are not finite (lat {lat}, lon {lon})")]
    NonFinite { lat: f64, lon: f64 },
}

/// Retry policy for boundary datasets with a seam near the antimeridian.
///
/// When a point close to ±180 misses the border, the buffered test is
/// repeated with the point nudged east, then west, by `shift_degrees`.
/// The nudged longitude is used as-is, even past 180, because the seam
/// artifacts this targets are stored that way in the boundary data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeamRetry {
    /// Retries only run when |normalized longitude| exceeds this
    pub threshold_degrees: f64,
    pub shift_degrees: f64,
}

impl Default for SeamRetry {
    fn default() -> Self {
        Self {
            threshold_degrees: 170.0,
            shift_degrees: 0.0001,
        }
    }
}

impl SeamRetry {
    pub fn applies(&self, normalized_lon: f64) -> bool {
        normalized_lon.abs() > self.threshold_degrees
    }

    /// Longitudes to try, in order
    pub fn candidates(&self, normalized_lon: f64) -> [f64; 2] {
        [
            normalized_lon + self.shift_degrees,
            normalized_lon - self.shift_degrees,
        ]
    }
}

/// How a point was found to be inside the border
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Membership {
    /// The buffered point itself intersects the border
    Direct,
    /// A shifted retry intersected; holds the longitude that matched
    SeamRetry(f64),
    Outside,
}

impl Membership {
    pub fn is_inside(&self) -> bool {
        !matches!(self, Membership::Outside)
    }
}

/// Keeps the candidate points that fall inside the national border
pub struct PointFilter<'a> {
    index: &'a BorderIndex,
    buffer_degrees: f64,
    seam_retry: Option<SeamRetry>,
}

impl<'a> PointFilter<'a> {
    pub fn new(index: &'a BorderIndex) -> Self {
        Self {
            index,
            buffer_degrees: DEFAULT_BUFFER_DEGREES,
            seam_retry: Some(SeamRetry::default()),
        }
    }

    pub fn with_buffer(mut self, buffer_degrees: f64) -> Self {
        self.buffer_degrees = buffer_degrees;
        self
    }

    /// Replace the seam retry policy; `None` disables it
    pub fn with_seam_retry(mut self, seam_retry: Option<SeamRetry>) -> Self {
        self.seam_retry = seam_retry;
        self
    }

    /// Decide border membership for one point
    pub fn membership(&self, point: &GeoPoint) -> Result<Membership, FilterError> {
        if !point.is_finite() {
            return Err(FilterError::NonFinite {
                lat: point.lat,
                lon: point.lon,
            });
        }

        let lon = normalize_longitude(point.lon);
        if self.buffered_hit(lon, point.lat) {
            return Ok(Membership::Direct);
        }

        if let Some(retry) = self.seam_retry.filter(|r| r.applies(lon)) {
            for shifted in retry.candidates(lon) {
                if self.buffered_hit(shifted, point.lat) {
                    return Ok(Membership::SeamRetry(shifted));
                }
            }
        }

        Ok(Membership::Outside)
    }

    fn buffered_hit(&self, lon: f64, lat: f64) -> bool {
        self.index.intersects(&disk(lon, lat, self.buffer_degrees))
    }

    /// Whether to keep a record; failures are logged and count as "drop"
    fn keep(&self, record: &CandidateRecord) -> bool {
        match self.membership(&record.location) {
            Ok(Membership::Outside) => {
                debug!(
                    "Point {} ({}, {}) excluded",
                    record.name, record.location.lon, record.location.lat
                );
                false
            }
            Ok(membership) => {
                debug!(
                    "Point {} ({}, {}) kept ({:?})",
                    record.name, record.location.lon, record.location.lat, membership
                );
                true
            }
            Err(e) => {
                warn!("Failed to process point {}: {}", record.name, e);
                false
            }
        }
    }

    /// Keep the records inside the border, preserving input order
    pub fn filter(&self, records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
        let total = records.len();
        let kept: Vec<CandidateRecord> = records.into_iter().filter(|r| self.keep(r)).collect();
        info!("{} of {} points inside the border", kept.len(), total);
        kept
    }

    /// Same as [`PointFilter::filter`], spread over the rayon pool
    pub fn filter_parallel(&self, records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
        let total = records.len();
        let kept: Vec<CandidateRecord> = records
            .into_par_iter()
            .filter(|r| self.keep(r))
            .collect();
        info!("{} of {} points inside the border", kept.len(), total);
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pip::test_index;

    #[test]
    fn test_direct_hit() {
        let index = test_index();
        let filter = PointFilter::new(&index);
        assert_eq!(
            filter.membership(&GeoPoint::new(55.0, 37.0)).unwrap(),
            Membership::Direct
        );
    }

    #[test]
    fn test_buffer_catches_edge_point() {
        let index = test_index();
        let filter = PointFilter::new(&index);
        // 5e-5 degrees east of the mainland edge
        assert!(filter
            .membership(&GeoPoint::new(55.0, 60.00005))
            .unwrap()
            .is_inside());
        assert!(!PointFilter::new(&index)
            .with_buffer(0.00001)
            .membership(&GeoPoint::new(55.0, 60.00005))
            .unwrap()
            .is_inside());
    }

    #[test]
    fn test_outside() {
        let index = test_index();
        let filter = PointFilter::new(&index);
        assert_eq!(
            filter.membership(&GeoPoint::new(40.0, 37.0)).unwrap(),
            Membership::Outside
        );
    }

    #[test]
    fn test_unnormalized_input_longitude() {
        let index = test_index();
        let filter = PointFilter::new(&index);
        assert_eq!(
            filter.membership(&GeoPoint::new(55.0, 397.0)).unwrap(),
            Membership::Direct
        );
    }

    #[test]
    fn test_seam_retry_east() {
        let index = test_index();
        let filter = PointFilter::new(&index);
        let point = GeoPoint::new(65.0, 179.9999);

        match filter.membership(&point).unwrap() {
            Membership::SeamRetry(lon) => assert!((lon - 180.0).abs() < 1e-9),
            other => panic!("expected seam retry, got {:?}", other),
        }

        let strict = PointFilter::new(&index).with_seam_retry(None);
        assert_eq!(strict.membership(&point).unwrap(), Membership::Outside);
    }

    #[test]
    fn test_seam_retry_west() {
        let index = test_index();
        let filter = PointFilter::new(&index);
        // Far-east block ends at 179.99975; only the westward nudge reaches it
        let point = GeoPoint::new(62.0, 179.9999);

        match filter.membership(&point).unwrap() {
            Membership::SeamRetry(lon) => assert!((lon - 179.9998).abs() < 1e-9),
            other => panic!("expected seam retry, got {:?}", other),
        }
    }

    #[test]
    fn test_seam_retry_below_threshold() {
        let index = test_index();
        let retry = SeamRetry {
            threshold_degrees: 179.99995,
            shift_degrees: 0.0001,
        };
        let filter = PointFilter::new(&index).with_seam_retry(Some(retry));
        assert_eq!(
            filter.membership(&GeoPoint::new(62.0, 179.9999)).unwrap(),
            Membership::Outside
        );
    }

    #[test]
    fn test_non_finite_is_error() {
        let index = test_index();
        let filter = PointFilter::new(&index);
        assert!(matches!(
            filter.membership(&GeoPoint::new(f64::NAN, 37.0)),
            Err(FilterError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_filter_keeps_order_and_drops_bad() {
        let index = test_index();
        let filter = PointFilter::new(&index);
        let records = vec![
            CandidateRecord::new(37.0, 55.0, "Москва", 100),
            CandidateRecord::new(37.0, 40.0, "Outside", 5),
            CandidateRecord::new(f64::NAN, 55.0, "Broken", 0),
            CandidateRecord::new(179.9999, 65.0, "Seam", 7),
            CandidateRecord::new(175.0, 62.0, "East", 1),
        ];

        let kept = filter.filter(records.clone());
        let names: Vec<&str> = kept.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Москва", "Seam", "East"]);

        let kept_parallel = filter.filter_parallel(records);
        assert_eq!(kept_parallel, kept);
    }
}
