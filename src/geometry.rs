//! GeoJSON enrichment: stop points plus one street-following line per
//! vehicle route.
//!
//! All legs of all routes must decode for the collection to be produced; a
//! single failure drops the whole enrichment so consumers never see a route
//! with half its path. Route/ETA correctness never depends on this module.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use rayon::prelude::*;
use tracing::debug;

use crate::extract::VehicleRoute;
use crate::model::Stop;
use crate::traits::{BackendError, RoutingBackend};

fn point_feature(index: usize, stop: &Stop) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("index".to_string(), JsonValue::from(index));
    properties.insert("name".to_string(), JsonValue::from(stop.name.clone()));
    properties.insert("demand".to_string(), JsonValue::from(stop.demand));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![stop.lon, stop.lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn line_feature(vehicle: &str, points: Vec<(f64, f64)>) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("vehicle".to_string(), JsonValue::from(vehicle.to_string()));

    let coordinates = points.into_iter().map(|(lat, lon)| vec![lon, lat]).collect();
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coordinates))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Fetches and concatenates the path for every consecutive visited pair of
/// one route. Legs are independent, so they fan out across the rayon pool.
fn route_line<B>(backend: &B, stops: &[Stop], route: &VehicleRoute) -> Result<Feature, BackendError>
where
    B: RoutingBackend + Sync,
{
    let legs: Vec<((f64, f64), (f64, f64))> = route
        .stops
        .windows(2)
        .map(|pair| {
            (
                stops[pair[0].index].location(),
                stops[pair[1].index].location(),
            )
        })
        .collect();

    let paths = legs
        .par_iter()
        .map(|&(from, to)| backend.leg_path(from, to))
        .collect::<Result<Vec<_>, _>>()?;

    let mut points = Vec::new();
    for path in paths {
        points.extend(path.into_points());
    }
    Ok(line_feature(&route.vehicle, points))
}

/// Builds the full feature collection: every stop as a point, every vehicle
/// route as a line.
pub fn build_geometry<B>(
    backend: &B,
    stops: &[Stop],
    routes: &[VehicleRoute],
) -> Result<FeatureCollection, BackendError>
where
    B: RoutingBackend + Sync,
{
    let mut features: Vec<Feature> = stops
        .iter()
        .enumerate()
        .map(|(index, stop)| point_feature(index, stop))
        .collect();

    for route in routes {
        features.push(route_line(backend, stops, route)?);
    }

    debug!(features = features.len(), "geometry assembled");
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
