//! Test fixtures for route-planner.
//!
//! Provides real Damascus-area delivery locations plus helpers for building
//! planning requests from them.

pub mod damascus_locations;

#[allow(unused_imports)]
pub use damascus_locations::*;

use route_planner::model::{PlanRequest, Stop, Vehicle};

/// A request over the depot and the first `count` delivery points.
#[allow(dead_code)]
pub fn damascus_request(count: usize, vehicles: Vec<Vehicle>) -> PlanRequest {
    let mut stops = vec![Stop::depot(DEPOT.name, DEPOT.lat, DEPOT.lon)];
    stops.extend(
        DELIVERY_POINTS
            .iter()
            .take(count)
            .map(|loc| Stop::new(loc.name, loc.lat, loc.lon).with_demand(loc.demand)),
    );
    PlanRequest::new(stops, vehicles)
}
