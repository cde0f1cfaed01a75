//! End-to-end pipeline tests over mock routing backends and realistic
//! Damascus-area fixtures.

mod fixtures;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use route_planner::haversine::HaversineBackend;
use route_planner::matrix::TravelMatrix;
use route_planner::model::{PlanRequest, Stop, Vehicle};
use route_planner::pipeline::{PlanError, Planner};
use route_planner::polyline::Polyline;
use route_planner::retry::{BackoffPolicy, retry_with_backoff};
use route_planner::solver::SolveOptions;
use route_planner::traits::{BackendError, RoutingBackend};

use fixtures::damascus_request;

// ============================================================================
// Mock backends
// ============================================================================

/// Wraps the haversine backend with call counters and switchable failures.
#[derive(Default)]
struct CountingBackend {
    inner: HaversineBackend,
    matrix_calls: AtomicUsize,
    path_calls: AtomicUsize,
    fail_matrix: bool,
    fail_geometry: bool,
}

impl CountingBackend {
    fn failing_geometry() -> Self {
        Self {
            fail_geometry: true,
            ..Self::default()
        }
    }

    fn unavailable() -> Self {
        Self {
            fail_matrix: true,
            ..Self::default()
        }
    }
}

impl RoutingBackend for CountingBackend {
    fn travel_matrix(&self, locations: &[(f64, f64)]) -> Result<TravelMatrix, BackendError> {
        self.matrix_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_matrix {
            return Err(BackendError::Unavailable(
                "no replicas past retry ceiling".to_string(),
            ));
        }
        self.inner.travel_matrix(locations)
    }

    fn leg_path(&self, from: (f64, f64), to: (f64, f64)) -> Result<Polyline, BackendError> {
        self.path_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_geometry {
            return Err(BackendError::Malformed("no geometry for leg".to_string()));
        }
        self.inner.leg_path(from, to)
    }
}

/// Backend whose first two matrix fetches fail, recovering afterwards; the
/// cold-start retry schedule lives inside the backend, as it does in the
/// HTTP adapter.
struct ColdStartBackend {
    inner: HaversineBackend,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl ColdStartBackend {
    fn recovering_after(failures: usize) -> Self {
        Self {
            inner: HaversineBackend::default(),
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }
}

impl RoutingBackend for ColdStartBackend {
    fn travel_matrix(&self, locations: &[(f64, f64)]) -> Result<TravelMatrix, BackendError> {
        let policy = BackoffPolicy {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            ceiling: Duration::from_millis(250),
        };
        retry_with_backoff(
            &policy,
            || true,
            || {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                if self
                    .failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return Err(BackendError::Unavailable("replica warming up".to_string()));
                }
                self.inner.travel_matrix(locations)
            },
        )
    }

    fn leg_path(&self, from: (f64, f64), to: (f64, f64)) -> Result<Polyline, BackendError> {
        self.inner.leg_path(from, to)
    }
}

fn quick_options() -> SolveOptions {
    SolveOptions {
        time_limit: Duration::from_millis(200),
        ..SolveOptions::default()
    }
}

fn fleet(count: usize, capacity: i64) -> Vec<Vehicle> {
    (1..=count)
        .map(|i| Vehicle::new(format!("Van {i}")).with_capacity(capacity))
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn plans_a_damascus_fleet_end_to_end() {
    let planner = Planner::new(HaversineBackend::default()).with_options(quick_options());
    let request = damascus_request(12, fleet(3, 10));

    let solution = planner.plan(&request).expect("plan");

    // Every delivery point appears exactly once across all routes.
    let mut seen = HashSet::new();
    for route in &solution.routes {
        for visit in &route.stops {
            if visit.index != 0 {
                assert!(seen.insert(visit.index), "stop {} visited twice", visit.index);
            }
        }
    }
    assert_eq!(seen.len(), 12);

    assert!(solution.geometry.is_some());
    assert_eq!(solution.meta.stops, 13);
    assert_eq!(solution.meta.vehicles, 3);
    assert!(solution.meta.solve_ms >= 0.0);

    // Itineraries start and end at the depot by default.
    for route in &solution.routes {
        assert_eq!(route.stops.first().unwrap().index, 0);
        assert_eq!(route.stops.last().unwrap().index, 0);
        assert!(route.total_drive_min > 0);
    }
}

#[test]
fn geometry_failure_degrades_to_routes_only() {
    let backend = CountingBackend::failing_geometry();
    let planner = Planner::new(backend).with_options(quick_options());
    let request = damascus_request(6, fleet(2, 10));

    let solution = planner.plan(&request).expect("plan");

    assert!(solution.geometry.is_none());
    assert!(!solution.routes.is_empty());
    // Route/ETA data is intact.
    let total: i64 = solution.routes.iter().map(|r| r.total_drive_min).sum();
    assert!(total > 0);
}

#[test]
fn identical_request_is_served_from_cache() {
    let backend = CountingBackend::default();
    let planner = Planner::new(&backend).with_options(quick_options());
    let request = damascus_request(6, fleet(2, 10));

    let first = planner.plan(&request).expect("plan");
    let geometry_calls = backend.path_calls.load(Ordering::SeqCst);
    let second = planner.plan(&request).expect("plan");

    assert_eq!(first, second);
    // The repeat request never reached the backend: no second matrix fetch,
    // no fresh geometry legs.
    assert_eq!(backend.matrix_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.path_calls.load(Ordering::SeqCst), geometry_calls);
}

#[test]
fn changed_request_misses_the_cache() {
    let backend = CountingBackend::default();
    let planner = Planner::new(&backend).with_options(quick_options());
    let request = damascus_request(5, fleet(1, 20));

    planner.plan(&request).expect("plan");
    planner.plan(&request).expect("plan");
    assert_eq!(backend.matrix_calls.load(Ordering::SeqCst), 1);

    let mut changed = request.clone();
    changed.stops[2].demand += 1;
    planner.plan(&changed).expect("plan");
    assert_eq!(backend.matrix_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn validation_failure_precedes_any_backend_call() {
    let backend = CountingBackend::default();
    let planner = Planner::new(&backend).with_options(quick_options());

    let request = PlanRequest::new(
        vec![
            Stop::depot("Depot", 33.5130, 36.2920),
            Stop::new("Market", 33.5138, 36.3091),
        ],
        vec![Vehicle::new("Van").with_start(9)],
    );

    let err = planner.plan(&request).expect_err("must fail validation");
    assert!(matches!(err, PlanError::Validation(_)));
    assert_eq!(backend.matrix_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn backend_unavailable_is_surfaced_distinctly() {
    let planner = Planner::new(CountingBackend::unavailable()).with_options(quick_options());
    let request = damascus_request(4, fleet(1, 20));

    let err = planner.plan(&request).expect_err("must fail");
    assert!(matches!(err, PlanError::Backend(_)));
}

#[test]
fn backend_recovering_within_ceiling_still_plans() {
    let backend = ColdStartBackend::recovering_after(2);
    let planner = Planner::new(&backend).with_options(quick_options());
    let request = damascus_request(4, fleet(1, 20));

    let solution = planner.plan(&request).expect("plan after recovery");
    assert_eq!(backend.attempts.load(Ordering::SeqCst), 3);
    assert!(!solution.routes.is_empty());
}

#[test]
fn impossible_window_reports_infeasible() {
    let mut request = damascus_request(4, fleet(1, 20));
    // Harran al Awamid is ~25km out; one minute is never enough.
    let far = Stop::new("Harran al Awamid Depot", 33.4935, 36.5255)
        .with_demand(1)
        .with_time_window(0, 1);
    request.stops.push(far);

    let planner = Planner::new(HaversineBackend::default()).with_options(quick_options());
    let err = planner.plan(&request).expect_err("must be infeasible");
    assert!(matches!(err, PlanError::Infeasible));
}

#[test]
fn missing_fleet_gets_a_default_vehicle() {
    let planner = Planner::new(HaversineBackend::default()).with_options(quick_options());
    let request = damascus_request(5, Vec::new());

    let solution = planner.plan(&request).expect("plan");
    assert_eq!(solution.meta.vehicles, 1);
    assert_eq!(solution.routes.len(), 1);

    let visited: usize = solution.routes[0]
        .stops
        .iter()
        .filter(|v| v.index != 0)
        .count();
    assert_eq!(visited, 5);
}

#[test]
fn arrivals_in_response_respect_windows() {
    let mut request = damascus_request(6, fleet(2, 10));
    request.stops[1].time_window = Some((9 * 60, 12 * 60));
    request.stops[3].time_window = Some((8 * 60, 17 * 60));

    let planner = Planner::new(HaversineBackend::default()).with_options(quick_options());
    let solution = planner.plan(&request).expect("plan");

    for route in &solution.routes {
        for visit in &route.stops {
            if let Some((open, close)) = visit.time_window {
                assert!(
                    visit.arrival_min >= open && visit.arrival_min <= close,
                    "{} at minute {} outside [{}, {}]",
                    visit.name,
                    visit.arrival_min,
                    open,
                    close
                );
            }
        }
    }
}
