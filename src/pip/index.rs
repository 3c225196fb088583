//! Spatial index over the parts of the national border.

use geo::{BoundingRect, Contains, Intersects, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use super::{BorderError, BorderPolygon};
use crate::models::GeoPoint;

/// Wrapper for R-tree indexing of border parts
struct IndexedPart {
    polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPart {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedPart {
    fn new(polygon: Polygon<f64>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        Some(Self {
            envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            polygon,
        })
    }
}

/// Read-only membership index for a national border.
///
/// Each polygon part (islands, exclaves, the pieces either side of the
/// antimeridian) is indexed by its envelope, so a query only runs the exact
/// predicate against parts whose envelope overlaps the query.
pub struct BorderIndex {
    tree: RTree<IndexedPart>,
}

impl BorderIndex {
    /// Build spatial index from the border
    pub fn build(border: BorderPolygon) -> Result<Self, BorderError> {
        let parts = border.into_parts();
        info!("Building spatial index for {} border parts...", parts.len());

        let indexed: Vec<IndexedPart> = parts.into_iter().filter_map(IndexedPart::new).collect();
        if indexed.is_empty() {
            return Err(BorderError::NoPolygons);
        }

        let tree = RTree::bulk_load(indexed);
        info!("Spatial index built with {} entries", tree.size());

        Ok(Self { tree })
    }

    /// Whether the point lies strictly inside the border.
    ///
    /// The longitude is normalized before testing.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let point = point.normalize();
        let geo_point = point.to_geo();
        let query_envelope = AABB::from_point([point.lon, point.lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .any(|part| part.polygon.contains(&geo_point))
    }

    /// Whether the geometry touches or overlaps any part of the border
    pub fn intersects(&self, geometry: &Polygon<f64>) -> bool {
        let Some(rect) = geometry.bounding_rect() else {
            return false;
        };
        let query_envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .any(|part| part.polygon.intersects(geometry))
    }

    /// Get total number of indexed parts
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
