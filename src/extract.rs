//! Solution extractor: turns the optimizer's raw node sequences into
//! annotated per-vehicle itineraries ready for presentation and export.

use serde::{Deserialize, Serialize};

use crate::matrix::TravelMatrix;
use crate::model::{Stop, Vehicle};
use crate::solver::RawRoute;

/// Drive statistics for the leg arriving at a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub from_index: usize,
    pub to_index: usize,
    pub drive_min: i64,
    pub distance_m: f64,
}

/// One visit in a vehicle's itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopVisit {
    pub index: usize,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub arrival_min: i64,
    pub arrival_hhmm: String,
    pub demand: i64,
    pub service_min: i64,
    pub time_window: Option<(i64, i64)>,
    /// Load aboard after servicing this stop.
    pub load: i64,
    /// Absent for the first visit of a route.
    pub leg: Option<Leg>,
}

/// One vehicle's ordered itinerary with totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRoute {
    pub vehicle: String,
    pub vehicle_index: usize,
    pub stops: Vec<StopVisit>,
    pub total_drive_min: i64,
    pub total_distance_m: f64,
}

/// Formats minutes from day start as a zero-padded clock string.
pub fn format_hhmm(minutes: i64) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Resolves raw routes against the stop list and the unscaled base matrix.
/// Vehicles come out in solver order (input order), visits in visitation
/// order.
pub fn extract_routes(
    stops: &[Stop],
    vehicles: &[Vehicle],
    matrix: &TravelMatrix,
    raw: &[RawRoute],
) -> Vec<VehicleRoute> {
    raw.iter()
        .map(|route| {
            let mut visits = Vec::with_capacity(route.visits.len());
            let mut load = 0i64;
            let mut total_drive_min = 0i64;
            let mut total_distance_m = 0f64;
            let mut prev: Option<usize> = None;

            for visit in &route.visits {
                let stop = &stops[visit.node];
                let leg = prev.map(|from| {
                    let drive_min = matrix.duration_min[from][visit.node];
                    let distance_m = matrix.distance_m[from][visit.node];
                    total_drive_min += drive_min;
                    total_distance_m += distance_m;
                    Leg {
                        from_index: from,
                        to_index: visit.node,
                        drive_min,
                        distance_m,
                    }
                });

                load += stop.demand;
                visits.push(StopVisit {
                    index: visit.node,
                    name: stop.name.clone(),
                    lat: stop.lat,
                    lon: stop.lon,
                    arrival_min: visit.arrival_min,
                    arrival_hhmm: format_hhmm(visit.arrival_min),
                    demand: stop.demand,
                    service_min: stop.service_min,
                    time_window: stop.time_window,
                    load,
                    leg,
                });
                prev = Some(visit.node);
            }

            VehicleRoute {
                vehicle: vehicles[route.vehicle].name.clone(),
                vehicle_index: route.vehicle,
                stops: visits,
                total_drive_min,
                total_distance_m,
            }
        })
        .collect()
}
