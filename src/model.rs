//! Planning request domain model: stops, vehicles, validation.
//!
//! Index 0 of the stop list is always the depot. Field-level parsing (JSON
//! presence/typing) belongs to the request layer; this module checks the
//! range invariants the solver relies on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One operating day in minutes. Stops without an explicit time window are
/// treated as open for the whole day, and no route may run past this bound.
pub const HORIZON_MIN: i64 = 24 * 60;

/// A delivery stop (or the depot, at index 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub demand: i64,
    /// Minutes spent servicing the stop, charged once when leaving it.
    #[serde(default)]
    pub service_min: i64,
    /// Inclusive visit window in minutes from day start.
    #[serde(default)]
    pub time_window: Option<(i64, i64)>,
}

impl Stop {
    /// A regular delivery stop with the default demand and service time.
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            demand: 1,
            service_min: 5,
            time_window: None,
        }
    }

    /// The depot: no demand, no service time.
    pub fn depot(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            demand: 0,
            service_min: 0,
            time_window: None,
        }
    }

    pub fn with_demand(mut self, demand: i64) -> Self {
        self.demand = demand;
        self
    }

    pub fn with_service_min(mut self, minutes: i64) -> Self {
        self.service_min = minutes;
        self
    }

    pub fn with_time_window(mut self, start: i64, end: i64) -> Self {
        self.time_window = Some((start, end));
        self
    }

    pub fn location(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

fn default_speed_factor() -> f64 {
    1.0
}

/// A vehicle available for the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: String,
    /// Maximum total demand the vehicle can carry. When absent, defaults to
    /// the total demand across all stops so one vehicle can always cover
    /// everything in principle.
    #[serde(default)]
    pub capacity: Option<i64>,
    /// Stop index the route starts from.
    #[serde(default)]
    pub start_index: usize,
    /// Stop index the route ends at; same as the start when absent.
    #[serde(default)]
    pub end_index: Option<usize>,
    /// Hard ceiling on route duration in minutes (last arrival minus
    /// effective departure).
    #[serde(default)]
    pub max_route_min: Option<i64>,
    /// Multiplier on travel times (traffic fudge); must be finite and > 0.
    #[serde(default = "default_speed_factor")]
    pub speed_factor: f64,
}

impl Vehicle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: None,
            start_index: 0,
            end_index: None,
            max_route_min: None,
            speed_factor: 1.0,
        }
    }

    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_start(mut self, index: usize) -> Self {
        self.start_index = index;
        self
    }

    pub fn with_end(mut self, index: usize) -> Self {
        self.end_index = Some(index);
        self
    }

    pub fn with_max_route_min(mut self, minutes: i64) -> Self {
        self.max_route_min = Some(minutes);
        self
    }

    pub fn with_speed_factor(mut self, factor: f64) -> Self {
        self.speed_factor = factor;
        self
    }

    /// End stop index, falling back to the start index.
    pub fn end_or_start(&self) -> usize {
        self.end_index.unwrap_or(self.start_index)
    }
}

/// Validation failures for a planning request. These are rejected before any
/// backend call and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("provide at least a depot and one delivery stop")]
    TooFewStops,
    #[error("stop '{name}' has negative demand")]
    NegativeDemand { name: String },
    #[error("stop '{name}' has negative service minutes")]
    NegativeService { name: String },
    #[error("stop '{name}' has an invalid time window")]
    BadTimeWindow { name: String },
    #[error("vehicle '{name}' start index {index} is out of range")]
    StartIndexOutOfRange { name: String, index: usize },
    #[error("vehicle '{name}' end index {index} is out of range")]
    EndIndexOutOfRange { name: String, index: usize },
    #[error("vehicle '{name}' capacity must be at least 1")]
    BadCapacity { name: String },
    #[error("vehicle '{name}' has a non-positive max route duration")]
    BadMaxRouteMin { name: String },
    #[error("vehicle '{name}' speed factor must be finite and positive")]
    BadSpeedFactor { name: String },
}

/// A validated-input bundle for one solve: depot + stops, and the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub stops: Vec<Stop>,
    /// May be empty; a single depot-based vehicle is synthesized.
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

impl PlanRequest {
    pub fn new(stops: Vec<Stop>, vehicles: Vec<Vehicle>) -> Self {
        Self { stops, vehicles }
    }

    pub fn total_demand(&self) -> i64 {
        self.stops.iter().map(|s| s.demand).sum()
    }

    /// The fleet to plan with: the configured vehicles, or a single default
    /// vehicle sized to carry all demand when none were given.
    pub fn effective_vehicles(&self) -> Vec<Vehicle> {
        if self.vehicles.is_empty() {
            vec![Vehicle::new("Vehicle 1").with_capacity(self.total_demand().max(1))]
        } else {
            self.vehicles.clone()
        }
    }

    /// Range-checks the request. Field presence/typing is assumed to already
    /// hold (request-layer responsibility).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stops.len() < 2 {
            return Err(ValidationError::TooFewStops);
        }

        for stop in &self.stops {
            if stop.demand < 0 {
                return Err(ValidationError::NegativeDemand {
                    name: stop.name.clone(),
                });
            }
            if stop.service_min < 0 {
                return Err(ValidationError::NegativeService {
                    name: stop.name.clone(),
                });
            }
            if let Some((start, end)) = stop.time_window {
                if start < 0 || end < start {
                    return Err(ValidationError::BadTimeWindow {
                        name: stop.name.clone(),
                    });
                }
            }
        }

        for vehicle in &self.vehicles {
            if vehicle.start_index >= self.stops.len() {
                return Err(ValidationError::StartIndexOutOfRange {
                    name: vehicle.name.clone(),
                    index: vehicle.start_index,
                });
            }
            if let Some(end) = vehicle.end_index {
                if end >= self.stops.len() {
                    return Err(ValidationError::EndIndexOutOfRange {
                        name: vehicle.name.clone(),
                        index: end,
                    });
                }
            }
            if let Some(capacity) = vehicle.capacity {
                if capacity < 1 {
                    return Err(ValidationError::BadCapacity {
                        name: vehicle.name.clone(),
                    });
                }
            }
            if let Some(limit) = vehicle.max_route_min {
                if limit <= 0 {
                    return Err(ValidationError::BadMaxRouteMin {
                        name: vehicle.name.clone(),
                    });
                }
            }
            if !vehicle.speed_factor.is_finite() || vehicle.speed_factor <= 0.0 {
                return Err(ValidationError::BadSpeedFactor {
                    name: vehicle.name.clone(),
                });
            }
        }

        Ok(())
    }
}
