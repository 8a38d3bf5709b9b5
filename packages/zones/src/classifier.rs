//! Point-in-polygon flood risk classification.
//!
//! Zone polygons are loaded into an R-tree keyed by bounding box. A lookup
//! tests every zone whose envelope covers the point and returns the `risk`
//! of the zone that appears first in the collection. Overlaps are resolved
//! purely by collection order, never by area or specificity.
//!
//! Containment is boundary-inclusive: a point exactly on a zone edge is
//! inside that zone. Holes are excluded.

use geo::{BoundingRect, Intersects, MultiPolygon};
use geojson::FeatureCollection;
use rstar::{AABB, RTree, RTreeObject};

/// Risk reported for a point outside every zone.
pub const NO_RISK: &str = "None";

/// Risk reported for a point inside a zone that has no string `risk`
/// property.
pub const UNKNOWN_RISK: &str = "Unknown";

/// A zone polygon stored in the R-tree with its position and risk.
struct ZoneEntry {
    /// Position of the feature in the source collection.
    order: usize,
    risk: Option<String>,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over a zone collection.
///
/// Built once per collection; lookups do not allocate.
pub struct RiskClassifier {
    zones: RTree<ZoneEntry>,
    skipped: usize,
}

impl RiskClassifier {
    /// Indexes every polygon feature in `collection`.
    ///
    /// Features without geometry, with non-polygon geometry, or with
    /// malformed coordinates are skipped with a warning.
    #[must_use]
    pub fn new(collection: &FeatureCollection) -> Self {
        let mut entries = Vec::with_capacity(collection.features.len());
        let mut skipped = 0;

        for (order, feature) in collection.features.iter().enumerate() {
            let Some(polygon) = feature.geometry.as_ref().and_then(to_multipolygon) else {
                log::warn!("Skipping flood zone #{order}: missing or malformed polygon geometry");
                skipped += 1;
                continue;
            };

            let Some(envelope) = compute_envelope(&polygon) else {
                log::warn!("Skipping flood zone #{order}: empty polygon");
                skipped += 1;
                continue;
            };

            let risk = feature
                .properties
                .as_ref()
                .and_then(|props| props.get("risk"))
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string);

            entries.push(ZoneEntry {
                order,
                risk,
                envelope,
                polygon,
            });
        }

        Self {
            zones: RTree::bulk_load(entries),
            skipped,
        }
    }

    /// Number of zones usable for classification.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.size()
    }

    /// Returns `true` if no zone could be indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.size() == 0
    }

    /// Number of features that were skipped while indexing.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Returns the risk level at (`lat`, `lng`).
    ///
    /// [`NO_RISK`] if no zone contains the point, [`UNKNOWN_RISK`] if the
    /// first containing zone carries no `risk` string.
    #[must_use]
    pub fn classify(&self, lat: f64, lng: f64) -> &str {
        // GeoJSON ordering: x = longitude, y = latitude.
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.zones
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&point))
            .min_by_key(|entry| entry.order)
            .map_or(NO_RISK, |entry| entry.risk.as_deref().unwrap_or(UNKNOWN_RISK))
    }
}

/// Classifies a single point against `zones`.
///
/// Convenience wrapper that builds a [`RiskClassifier`] for one lookup.
#[must_use]
pub fn classify(lat: f64, lng: f64, zones: &FeatureCollection) -> String {
    RiskClassifier::new(zones).classify(lat, lng).to_string()
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: &geojson::Geometry) -> Option<MultiPolygon<f64>> {
    if !is_well_formed(&geometry.value) {
        return None;
    }

    let geo_geom: geo::Geometry<f64> = geometry.clone().try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Checks that every ring is non-empty and every position has at least two
/// finite ordinates, so conversion cannot trip over short positions.
fn is_well_formed(value: &geojson::Value) -> bool {
    fn ring_ok(ring: &[Vec<f64>]) -> bool {
        !ring.is_empty()
            && ring
                .iter()
                .all(|pos| pos.len() >= 2 && pos[0].is_finite() && pos[1].is_finite())
    }

    fn polygon_ok(rings: &[Vec<Vec<f64>>]) -> bool {
        !rings.is_empty() && rings.iter().all(|ring| ring_ok(ring))
    }

    match value {
        geojson::Value::Polygon(rings) => polygon_ok(rings),
        geojson::Value::MultiPolygon(polygons) => {
            !polygons.is_empty() && polygons.iter().all(|rings| polygon_ok(rings))
        }
        _ => false,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
