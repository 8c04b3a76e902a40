//! Structural GeoJSON FeatureCollection validation for `spatial` properties.

use serde::Deserialize;
use serde_json::{Map, Value};

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: String,
    geometry: Option<Geometry>,
    #[allow(dead_code)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

/// Check that `value` is a GeoJSON FeatureCollection, either as a JSON object
/// or as a string holding one. Returns the reason on failure.
pub fn check_feature_collection(value: &Value) -> Result<(), String> {
    let parsed;
    let value = match value {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text).map_err(|e| e.to_string())?;
            &parsed
        }
        other => other,
    };

    let collection = FeatureCollection::deserialize(value).map_err(|e| e.to_string())?;
    if collection.kind != "FeatureCollection" {
        return Err(format!("expected type FeatureCollection, found {}", collection.kind));
    }

    for (index, feature) in collection.features.iter().enumerate() {
        if feature.kind != "Feature" {
            return Err(format!("features[{index}] has type {}", feature.kind));
        }
        if let Some(geometry) = &feature.geometry {
            check_geometry(geometry).map_err(|reason| format!("features[{index}]: {reason}"))?;
        }
    }

    Ok(())
}

fn check_geometry(geometry: &Geometry) -> Result<(), String> {
    match geometry {
        Geometry::Point { coordinates } => check_position(coordinates),
        Geometry::MultiPoint { coordinates } => coordinates.iter().try_for_each(check_position),
        Geometry::LineString { coordinates } => check_line(coordinates),
        Geometry::MultiLineString { coordinates } => coordinates.iter().try_for_each(|l| check_line(l)),
        Geometry::Polygon { coordinates } => check_polygon(coordinates),
        Geometry::MultiPolygon { coordinates } => {
            coordinates.iter().try_for_each(|p| check_polygon(p))
        }
        Geometry::GeometryCollection { geometries } => {
            geometries.iter().try_for_each(check_geometry)
        }
    }
}

fn check_position(position: &Position) -> Result<(), String> {
    if !(2..=3).contains(&position.len()) {
        return Err(format!(
            "position must have 2 or 3 coordinates, found {}",
            position.len()
        ));
    }
    if position.iter().any(|c| !c.is_finite()) {
        return Err("position has a non-finite coordinate".to_string());
    }
    Ok(())
}

fn check_line(line: &[Position]) -> Result<(), String> {
    if line.len() < 2 {
        return Err("line string needs at least 2 positions".to_string());
    }
    line.iter().try_for_each(check_position)
}

fn check_polygon(rings: &[Vec<Position>]) -> Result<(), String> {
    if rings.is_empty() {
        return Err("polygon has no rings".to_string());
    }
    for ring in rings {
        if ring.len() < 4 {
            return Err("linear ring needs at least 4 positions".to_string());
        }
        ring.iter().try_for_each(check_position)?;
        if ring.first() != ring.last() {
            return Err("linear ring is not closed".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point_collection() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-123.37, 48.42] },
                "properties": {}
            }]
        })
    }

    #[test]
    fn accepts_point_collection_object_and_string() {
        assert!(check_feature_collection(&point_collection()).is_ok());
        let text = Value::String(point_collection().to_string());
        assert!(check_feature_collection(&text).is_ok());
    }

    #[test]
    fn accepts_closed_polygon_and_null_geometry() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                    },
                    "properties": null
                },
                { "type": "Feature", "geometry": null, "properties": {} }
            ]
        });
        assert!(check_feature_collection(&value).is_ok());
    }

    #[test]
    fn rejects_bare_geometry_and_open_ring() {
        let bare = json!({ "type": "Point", "coordinates": [1.0, 2.0] });
        assert!(check_feature_collection(&bare).is_err());

        let open_ring = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.5, 0.5]]]
                },
                "properties": {}
            }]
        });
        let reason = check_feature_collection(&open_ring).unwrap_err();
        assert!(reason.contains("not closed"));
    }

    #[test]
    fn rejects_bad_positions_and_non_json_text() {
        let short = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [1.0] },
                "properties": {}
            }]
        });
        assert!(check_feature_collection(&short).is_err());
        assert!(check_feature_collection(&json!("POINT (1 2)")).is_err());
        assert!(check_feature_collection(&json!({ "type": "FeatureCollection" })).is_err());
    }
}
