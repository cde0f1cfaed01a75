//! End-to-end planning pipeline: validate, fetch the travel matrix, build
//! the model, search, extract, enrich, cache.
//!
//! Synchronous by design: one worker handles one request end to end, and the
//! only suspension points are the backend calls. The cache is the single
//! piece of shared mutable state.

use std::time::Instant;

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{SolveCache, cache_key};
use crate::extract::{VehicleRoute, extract_routes};
use crate::geometry::build_geometry;
use crate::model::{PlanRequest, ValidationError};
use crate::solver::{SolveOptions, build_model, solve};
use crate::traits::{BackendError, RoutingBackend};

/// Pipeline failure taxonomy. Geometry problems are not here: enrichment
/// degrades instead of failing the request.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Malformed/out-of-range request, rejected before any backend call.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Routing backend unreachable past the retry ceiling.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Legitimate domain outcome: no assignment satisfies every hard
    /// constraint within the time budget.
    #[error("no feasible route assignment within the time budget")]
    Infeasible,
}

/// Solve timing metadata for the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMeta {
    pub stops: usize,
    pub vehicles: usize,
    pub build_ms: f64,
    pub solve_ms: f64,
}

/// The full planning response: annotated routes, optional geometry, timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSolution {
    pub routes: Vec<VehicleRoute>,
    /// Absent whenever any leg geometry failed; route/ETA data never
    /// depends on it.
    pub geometry: Option<FeatureCollection>,
    pub meta: PlanMeta,
}

fn elapsed_ms(since: Instant) -> f64 {
    (since.elapsed().as_secs_f64() * 10_000.0).round() / 10.0
}

/// Owns the backend, the solver options, and the single-slot cache.
pub struct Planner<B> {
    backend: B,
    options: SolveOptions,
    cache: SolveCache<PlanSolution>,
}

impl<B: RoutingBackend + Sync> Planner<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            options: SolveOptions::default(),
            cache: SolveCache::new(),
        }
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the whole pipeline for one request.
    pub fn plan(&self, request: &PlanRequest) -> Result<PlanSolution, PlanError> {
        request.validate()?;

        let key = cache_key(request);
        if let Some(hit) = self.cache.get(&key) {
            info!("serving cached solution");
            return Ok(hit);
        }

        let vehicles = request.effective_vehicles();
        let locations: Vec<(f64, f64)> = request.stops.iter().map(|s| s.location()).collect();

        let build_started = Instant::now();
        let matrix = self.backend.travel_matrix(&locations)?;
        let model = build_model(&request.stops, &vehicles, &matrix);
        let build_ms = elapsed_ms(build_started);

        let solve_started = Instant::now();
        let raw = solve(&model, &self.options).ok_or(PlanError::Infeasible)?;
        let solve_ms = elapsed_ms(solve_started);

        let routes = extract_routes(&request.stops, &vehicles, &matrix, &raw);

        let geometry = match build_geometry(&self.backend, &request.stops, &routes) {
            Ok(collection) => Some(collection),
            Err(err) => {
                warn!(error = %err, "leg geometry failed, returning solution without it");
                None
            }
        };

        let solution = PlanSolution {
            routes,
            geometry,
            meta: PlanMeta {
                stops: request.stops.len(),
                vehicles: vehicles.len(),
                build_ms,
                solve_ms,
            },
        };

        self.cache.store(key, solution.clone());
        info!(
            stops = solution.meta.stops,
            vehicles = solution.meta.vehicles,
            routes = solution.routes.len(),
            "plan complete"
        );
        Ok(solution)
    }
}
