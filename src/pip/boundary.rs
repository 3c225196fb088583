//! National boundary loading from GeoJSON.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use geo::{BoundingRect, Geometry, MultiPolygon, Polygon};
use geojson::GeoJson;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Failures that make the boundary unusable. All of them abort the run.
#[derive(Debug, Error)]
pub enum BorderError {
    #[error("failed to read boundary file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download boundary from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("boundary source returned an empty document")]
    EmptyDocument,

    #[error("invalid boundary GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("boundary contains no polygon geometry")]
    NoPolygons,
}

/// Where the boundary GeoJSON comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundarySource {
    File(PathBuf),
    Remote(Url),
}

impl BoundarySource {
    /// Interpret `value` as an http(s) URL, falling back to a file path
    pub fn parse(value: &str) -> Self {
        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => BoundarySource::Remote(url),
            _ => BoundarySource::File(PathBuf::from(value)),
        }
    }
}

impl std::fmt::Display for BoundarySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundarySource::File(path) => write!(f, "{}", path.display()),
            BoundarySource::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Immutable national border, possibly made of many parts.
#[derive(Debug, Clone)]
pub struct BorderPolygon {
    geometry: MultiPolygon<f64>,
}

impl BorderPolygon {
    /// Wrap a multipolygon. Rejects geometry without any polygon.
    pub fn new(geometry: MultiPolygon<f64>) -> Result<Self, BorderError> {
        if geometry.0.is_empty() {
            return Err(BorderError::NoPolygons);
        }
        Ok(Self { geometry })
    }

    pub fn parts(&self) -> &[Polygon<f64>] {
        &self.geometry.0
    }

    pub fn into_parts(self) -> Vec<Polygon<f64>> {
        self.geometry.0
    }

    /// Get the bounding box of the whole border
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

/// Load the border from a file or URL
pub async fn load_border(
    source: &BoundarySource,
    client: &reqwest::Client,
) -> Result<BorderPolygon, BorderError> {
    info!("Loading national boundary from {}", source);

    let text = match source {
        BoundarySource::File(path) => read_boundary_file(path)?,
        BoundarySource::Remote(url) => download_boundary(url, client).await?,
    };

    let border = parse_border(&text)?;
    info!(
        "Boundary loaded with {} polygon parts, bbox {:?}",
        border.parts().len(),
        border.bbox()
    );
    Ok(border)
}

fn read_boundary_file(path: &Path) -> Result<String, BorderError> {
    std::fs::read_to_string(path).map_err(|source| BorderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn download_boundary(url: &Url, client: &reqwest::Client) -> Result<String, BorderError> {
    let http_err = |source: reqwest::Error| BorderError::Http {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(http_err)?
        .error_for_status()
        .map_err(http_err)?;

    response.text().await.map_err(http_err)
}

/// Parse a GeoJSON document into a border.
///
/// Accepts a FeatureCollection, a single Feature or a bare geometry. For a
/// collection the first feature carrying polygonal geometry is used.
pub fn parse_border(text: &str) -> Result<BorderPolygon, BorderError> {
    if text.trim().is_empty() {
        return Err(BorderError::EmptyDocument);
    }

    let geojson = GeoJson::from_str(text)?;

    let geometry = match geojson {
        GeoJson::FeatureCollection(collection) => {
            let mut found = None;
            for (i, feature) in collection.features.into_iter().enumerate() {
                let Some(geometry) = feature.geometry else {
                    debug!("Feature {} has no geometry, skipping", i);
                    continue;
                };
                let polygons = polygonal_parts(Geometry::try_from(geometry)?);
                if !polygons.is_empty() {
                    found = Some(polygons);
                    break;
                }
                debug!("Feature {} is not polygonal, skipping", i);
            }
            found.unwrap_or_default()
        }
        GeoJson::Feature(feature) => match feature.geometry {
            Some(geometry) => polygonal_parts(Geometry::try_from(geometry)?),
            None => Vec::new(),
        },
        GeoJson::Geometry(geometry) => polygonal_parts(Geometry::try_from(geometry)?),
    };

    BorderPolygon::new(MultiPolygon::new(geometry))
}

/// Collect every polygon in a geometry, flattening collections
fn polygonal_parts(geometry: Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0,
        Geometry::GeometryCollection(gc) => gc.0.into_iter().flat_map(polygonal_parts).collect(),
        _ => Vec::new(),
    }
}
