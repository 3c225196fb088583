//! Spherical-earth helpers: longitude normalization, haversine distance
//! and the small disk used as a border buffer.

use geo::{Coord, LineString, Polygon};

/// Earth radius used for all distances, in kilometers.
///
/// Reports produced by earlier runs were computed with this radius, so it
/// must not be swapped for the 6371 km mean radius.
pub const EARTH_RADIUS_KM: f64 = 6376.5;

/// Vertices used to approximate a buffer disk
const DISK_SEGMENTS: usize = 32;

/// Reduce a longitude into [-180, 180].
///
/// Values already in range are returned untouched, so both 180 and -180
/// survive as-is. Out-of-range values are shifted by whole turns toward the
/// range: 540 becomes 180, -190 becomes 170.
pub fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) || !lon.is_finite() {
        return lon;
    }

    let reduced = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if reduced == -180.0 && lon > 0.0 {
        180.0
    } else {
        reduced
    }
}

/// Great-circle distance in kilometers between two lat/lon pairs
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Polygon approximating a disk of `radius` degrees around (lon, lat).
///
/// Planar in degree space, matching how the boundary itself is stored.
pub fn disk(lon: f64, lat: f64, radius: f64) -> Polygon<f64> {
    let mut ring: Vec<Coord<f64>> = (0..DISK_SEGMENTS)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / DISK_SEGMENTS as f64;
            Coord {
                x: lon + radius * theta.cos(),
                y: lat + radius * theta.sin(),
            }
        })
        .collect();
    ring.push(ring[0]);

    Polygon::new(LineString::new(ring), vec![])
}
