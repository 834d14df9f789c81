//! TopoJSON boundary decoding for the choropleth map.
//!
//! Only what the world boundary file needs is supported: a named
//! `GeometryCollection` of `Polygon` / `MultiPolygon` geometries, optionally
//! quantised with a `transform`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::DataLoadError;

/// A closed ring of `[x, y]` (longitude, latitude) positions.
pub type Ring = Vec<[f64; 2]>;

/// One named region; each polygon is a list of rings, outer ring first.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: String,
    pub polygons: Vec<Vec<Ring>>,
}

impl Feature {
    /// Whether `point` lies inside any outer ring, minus its holes.
    pub fn contains(&self, point: [f64; 2]) -> bool {
        self.polygons.iter().any(|rings| match rings.split_first() {
            Some((outer, holes)) => {
                ring_contains(outer, point) && !holes.iter().any(|h| ring_contains(h, point))
            }
            None => false,
        })
    }
}

/// Even-odd ray casting.
fn ring_contains(ring: &[[f64; 2]], [x, y]: [f64; 2]) -> bool {
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);
    for (i, &[xi, yi]) in ring.iter().enumerate() {
        let [xj, yj] = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    arcs: Vec<Vec<Vec<f64>>>,
    objects: BTreeMap<String, TopoObject>,
}

#[derive(Debug, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct TopoObject {
    #[serde(default)]
    geometries: Vec<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    arcs: JsonValue,
    #[serde(default)]
    properties: BTreeMap<String, JsonValue>,
}

/// Decode the geometries of `object` in a TopoJSON document.
pub fn decode_topojson(text: &str, object: &str, dataset: &str) -> Result<Vec<Feature>, DataLoadError> {
    let geo_err = |reason: String| DataLoadError::Geo {
        dataset: dataset.to_string(),
        reason,
    };

    let topo: Topology = serde_json::from_str(text).map_err(|e| geo_err(e.to_string()))?;
    let arcs = decode_arcs(&topo);
    let collection = topo
        .objects
        .get(object)
        .ok_or_else(|| geo_err(format!("no object named '{object}'")))?;

    let mut features = Vec::with_capacity(collection.geometries.len());
    for geometry in &collection.geometries {
        let Some(name) = geometry.properties.get("name").and_then(JsonValue::as_str) else {
            log::debug!("skipping unnamed {} geometry", geometry.kind);
            continue;
        };

        let polygons: Vec<Vec<Vec<i64>>> = match geometry.kind.as_str() {
            "Polygon" => vec![serde_json::from_value(geometry.arcs.clone())
                .map_err(|e| geo_err(format!("{name}: {e}")))?],
            "MultiPolygon" => serde_json::from_value(geometry.arcs.clone())
                .map_err(|e| geo_err(format!("{name}: {e}")))?,
            _ => continue,
        };

        let polygons = polygons
            .iter()
            .map(|rings| {
                rings
                    .iter()
                    .map(|ring| stitch_ring(&arcs, ring))
                    .collect::<Result<Vec<Ring>, String>>()
            })
            .collect::<Result<Vec<_>, String>>()
            .map_err(|e| geo_err(format!("{name}: {e}")))?;

        features.push(Feature {
            name: name.to_string(),
            polygons,
        });
    }
    Ok(features)
}

/// Absolute coordinates of every arc. Quantised topologies store positions
/// as deltas from the previous point of the same arc.
fn decode_arcs(topo: &Topology) -> Vec<Ring> {
    topo.arcs
        .iter()
        .map(|arc| {
            let mut x = 0.0;
            let mut y = 0.0;
            arc.iter()
                .filter(|p| p.len() >= 2)
                .map(|p| match &topo.transform {
                    Some(t) => {
                        x += p[0];
                        y += p[1];
                        [x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1]]
                    }
                    None => [p[0], p[1]],
                })
                .collect()
        })
        .collect()
}

/// Join arcs into one ring. A negative index `i` means arc `!i` reversed;
/// consecutive arcs share their junction point, which is kept once.
fn stitch_ring(arcs: &[Ring], indices: &[i64]) -> Result<Ring, String> {
    let mut ring: Ring = Vec::new();
    for &i in indices {
        let (idx, reversed) = if i >= 0 { (i as usize, false) } else { (!i as usize, true) };
        let arc = arcs
            .get(idx)
            .ok_or_else(|| format!("arc index {i} out of range"))?;
        let mut points = arc.clone();
        if reversed {
            points.reverse();
        }
        let skip = usize::from(!ring.is_empty());
        ring.extend(points.into_iter().skip(skip));
    }
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two unit squares sharing the edge x = 1; arc 1 is that shared edge.
    const TOPO: &str = r#"{
        "type": "Topology",
        "transform": {"scale": [1, 1], "translate": [0, 0]},
        "arcs": [
            [[1, 0], [-1, 0], [0, 1], [1, 0]],
            [[1, 1], [0, -1]],
            [[1, 0], [1, 0], [0, 1], [-1, 0]]
        ],
        "objects": {
            "countries1": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "arcs": [[0, 1]], "properties": {"name": "West"}},
                    {"type": "MultiPolygon", "arcs": [[[2, -2]]], "properties": {"name": "East"}},
                    {"type": "Polygon", "arcs": [[0]]}
                ]
            }
        }
    }"#;

    #[test]
    fn decodes_quantised_arcs_and_reversed_indices() {
        let features = decode_topojson(TOPO, "countries1", "boundaries").unwrap();
        assert_eq!(features.len(), 2);

        assert_eq!(features[0].name, "West");
        assert_eq!(
            features[0].polygons[0][0],
            vec![[1.0, 0.0], [0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
        );

        assert_eq!(features[1].name, "East");
        assert_eq!(
            features[1].polygons[0][0],
            vec![[1.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
        );
    }

    #[test]
    fn point_lookup_finds_the_enclosing_feature() {
        let features = decode_topojson(TOPO, "countries1", "boundaries").unwrap();
        let hit: Vec<_> = features
            .iter()
            .filter(|f| f.contains([1.5, 0.5]))
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(hit, vec!["East"]);
        assert!(!features[0].contains([5.0, 5.0]));
    }

    #[test]
    fn unknown_object_is_a_geo_error() {
        let err = decode_topojson(TOPO, "land", "boundaries").unwrap_err();
        assert!(matches!(err, DataLoadError::Geo { .. }));
    }

    #[test]
    fn bad_arc_index_is_reported() {
        let text = r#"{"arcs": [], "objects": {"o": {"geometries": [
            {"type": "Polygon", "arcs": [[3]], "properties": {"name": "X"}}]}}}"#;
        let err = decode_topojson(text, "o", "boundaries").unwrap_err();
        assert!(err.to_string().contains("arc index 3"));
    }
}
