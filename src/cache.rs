//! Single-slot result cache.
//!
//! Remembers the last solved payload so an export that immediately follows a
//! solve skips the optimizer and the geometry fetches. One entry,
//! last-solve-wins, mutex-guarded; a miss just re-runs the pipeline, so the
//! cache is never a source of truth.

use std::sync::Mutex;

use serde_json::{Value, json};
use tracing::debug;

use crate::model::{PlanRequest, Stop, Vehicle};

/// A one-entry keyed cache. `T` is whatever the pipeline produced for the
/// keyed request.
#[derive(Debug)]
pub struct SolveCache<T> {
    slot: Mutex<Option<(String, T)>>,
}

impl<T> Default for SolveCache<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T: Clone> SolveCache<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let slot = self.slot.lock().ok()?;
        match slot.as_ref() {
            Some((stored, value)) if stored == key => {
                debug!("solve cache hit");
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub fn store(&self, key: String, value: T) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some((key, value));
        }
    }
}

fn micro_degrees(value: f64) -> i64 {
    (value * 1e6).round() as i64
}

fn canonical_stop(stop: &Stop) -> Value {
    json!({
        "name": stop.name,
        // Integer micro-degrees keep the key stable against float
        // formatting differences.
        "lat": micro_degrees(stop.lat),
        "lon": micro_degrees(stop.lon),
        "demand": stop.demand,
        "service_min": stop.service_min,
        "tw": stop.time_window.map(|(start, end)| vec![start, end]),
    })
}

fn canonical_vehicle(vehicle: &Vehicle) -> Value {
    json!({
        "name": vehicle.name,
        "capacity": vehicle.capacity,
        "start_index": vehicle.start_index,
        "end_index": vehicle.end_index,
        "max_route_min": vehicle.max_route_min,
        "speed_factor_milli": (vehicle.speed_factor * 1e3).round() as i64,
    })
}

/// Canonical, order-sensitive key for a planning request.
pub fn cache_key(request: &PlanRequest) -> String {
    let canon = json!({
        "stops": request.stops.iter().map(canonical_stop).collect::<Vec<_>>(),
        "vehicles": request.vehicles.iter().map(canonical_vehicle).collect::<Vec<_>>(),
    });
    canon.to_string()
}
