//! Route optimizer.
//!
//! Builds an immutable model bundle from validated stops/vehicles plus the
//! travel matrix, then runs a bounded-time search: deterministic
//! cheapest-next-arc construction followed by guided local search (2-opt and
//! relocate moves over a penalty-augmented objective).
//!
//! Capacity and elapsed time are both expressed as cumulative dimensions: a
//! monotone accumulator advanced arc by arc and bounded at every node. An
//! infeasible request yields `None`, never an error.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::matrix::{TravelMatrix, UNREACHABLE_MIN};
use crate::model::{HORIZON_MIN, Stop, Vehicle};

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Wall-clock budget for the whole search. Larger instances need
    /// proportionally more to reach feasibility.
    pub time_limit: Duration,
    /// Guided-local-search penalty weight, as a fraction of the mean arc
    /// cost of the construction solution.
    pub gls_lambda: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(20),
            gls_lambda: 0.1,
        }
    }
}

/// Immutable optimization input bundle. Built once per solve; no I/O.
#[derive(Debug, Clone)]
pub struct RoutingModel {
    pub node_count: usize,
    pub starts: Vec<usize>,
    pub ends: Vec<usize>,
    pub demands: Vec<i64>,
    pub service_min: Vec<i64>,
    /// Per-node inclusive visit windows; `[0, HORIZON_MIN]` when the stop
    /// had none.
    pub windows: Vec<(i64, i64)>,
    pub capacities: Vec<i64>,
    pub max_route_min: Vec<Option<i64>>,
    /// Per-vehicle travel minutes, speed-scaled. The unreachable sentinel is
    /// never scaled.
    durations: Vec<Vec<Vec<i64>>>,
}

impl RoutingModel {
    pub fn vehicle_count(&self) -> usize {
        self.starts.len()
    }

    /// Travel minutes for `vehicle` on arc `from -> to`; `None` when the
    /// street network has no path.
    fn travel(&self, vehicle: usize, from: usize, to: usize) -> Option<i64> {
        let minutes = self.durations[vehicle][from][to];
        (minutes < UNREACHABLE_MIN).then_some(minutes)
    }

    /// Arc transit: travel plus the service time charged when leaving
    /// `from`. This is both the cost function and the time-dimension step,
    /// so dwell time is paid exactly once per visited stop.
    fn transit(&self, vehicle: usize, from: usize, to: usize) -> Option<i64> {
        self.travel(vehicle, from, to)
            .map(|minutes| minutes + self.service_min[from])
    }

    /// Nodes that must be visited: everything that is not some vehicle's
    /// start or end.
    pub fn visit_nodes(&self) -> Vec<usize> {
        (0..self.node_count)
            .filter(|node| !self.starts.contains(node) && !self.ends.contains(node))
            .collect()
    }
}

/// Assembles the model bundle. Inputs are assumed validated.
pub fn build_model(stops: &[Stop], vehicles: &[Vehicle], matrix: &TravelMatrix) -> RoutingModel {
    let total_demand: i64 = stops.iter().map(|s| s.demand).sum();
    let default_capacity = total_demand.max(1);

    let durations = vehicles
        .iter()
        .map(|vehicle| scale_durations(&matrix.duration_min, vehicle.speed_factor))
        .collect();

    RoutingModel {
        node_count: stops.len(),
        starts: vehicles.iter().map(|v| v.start_index).collect(),
        ends: vehicles.iter().map(|v| v.end_or_start()).collect(),
        demands: stops.iter().map(|s| s.demand).collect(),
        service_min: stops.iter().map(|s| s.service_min).collect(),
        windows: stops
            .iter()
            .map(|s| s.time_window.unwrap_or((0, HORIZON_MIN)))
            .collect(),
        capacities: vehicles
            .iter()
            .map(|v| v.capacity.unwrap_or(default_capacity))
            .collect(),
        max_route_min: vehicles.iter().map(|v| v.max_route_min).collect(),
        durations,
    }
}

fn scale_durations(base: &[Vec<i64>], factor: f64) -> Vec<Vec<i64>> {
    if (factor - 1.0).abs() < f64::EPSILON {
        return base.to_vec();
    }
    base.iter()
        .map(|row| {
            row.iter()
                .map(|&minutes| {
                    if minutes >= UNREACHABLE_MIN {
                        minutes
                    } else {
                        (minutes as f64 * factor).round() as i64
                    }
                })
                .collect()
        })
        .collect()
}

// ============================================================================
// Cumulative dimensions
// ============================================================================

/// A monotone per-route accumulator bounded at every node. Capacity and time
/// share this one mechanism.
trait Dimension {
    /// Cumul entering the vehicle's start node; `None` when even the start
    /// violates a bound.
    fn start(&self, model: &RoutingModel, vehicle: usize) -> Option<i64>;

    /// Cumul after traversing `from -> to`; `None` when a bound is violated.
    fn advance(
        &self,
        model: &RoutingModel,
        vehicle: usize,
        cumul: i64,
        from: usize,
        to: usize,
    ) -> Option<i64>;

    /// Whole-route check once all cumuls are known.
    fn finish(
        &self,
        _model: &RoutingModel,
        _vehicle: usize,
        _path: &[usize],
        _cumuls: &[i64],
    ) -> bool {
        true
    }
}

/// Cumulative load, bounded above by vehicle capacity.
struct LoadDimension;

impl Dimension for LoadDimension {
    fn start(&self, model: &RoutingModel, vehicle: usize) -> Option<i64> {
        let load = model.demands[model.starts[vehicle]];
        (load <= model.capacities[vehicle]).then_some(load)
    }

    fn advance(
        &self,
        model: &RoutingModel,
        vehicle: usize,
        cumul: i64,
        _from: usize,
        to: usize,
    ) -> Option<i64> {
        let load = cumul + model.demands[to];
        (load <= model.capacities[vehicle]).then_some(load)
    }
}

/// Minutes since day start, clamped up to each window's open (waiting) and
/// rejected past its close. `finish` enforces the optional max route
/// duration.
struct TimeDimension;

impl Dimension for TimeDimension {
    fn start(&self, model: &RoutingModel, vehicle: usize) -> Option<i64> {
        let (open, close) = model.windows[model.starts[vehicle]];
        (open <= close).then_some(open)
    }

    fn advance(
        &self,
        model: &RoutingModel,
        vehicle: usize,
        cumul: i64,
        from: usize,
        to: usize,
    ) -> Option<i64> {
        let arrival = cumul + model.transit(vehicle, from, to)?;
        let (open, close) = model.windows[to];
        let arrival = arrival.max(open);
        (arrival <= close).then_some(arrival)
    }

    fn finish(
        &self,
        model: &RoutingModel,
        vehicle: usize,
        path: &[usize],
        cumuls: &[i64],
    ) -> bool {
        let Some(limit) = model.max_route_min[vehicle] else {
            return true;
        };
        let Some(&last) = cumuls.last() else {
            return true;
        };
        last - effective_departure(model, vehicle, path, cumuls) <= limit
    }
}

/// When the vehicle can leave its start later and still make the first stop
/// on time, the route clock starts at that later departure; waiting before
/// the first leg does not count against the duration ceiling.
fn effective_departure(model: &RoutingModel, vehicle: usize, path: &[usize], cumuls: &[i64]) -> i64 {
    let depart = cumuls[0];
    if path.len() >= 2 {
        if let Some(transit) = model.transit(vehicle, path[0], path[1]) {
            let latest = cumuls[1] - transit;
            let close = model.windows[path[0]].1;
            return depart.max(latest.min(close));
        }
    }
    depart
}

fn dimensions() -> [&'static dyn Dimension; 2] {
    [&LoadDimension, &TimeDimension]
}

const DIM_TIME: usize = 1;

// ============================================================================
// Route evaluation
// ============================================================================

#[derive(Debug, Clone)]
struct RouteEval {
    /// Full node path including the vehicle's start and end.
    path: Vec<usize>,
    /// Time-dimension cumul per path position.
    arrivals: Vec<i64>,
    cost: i64,
}

/// Walks start -> stops -> end applying every dimension. `None` when any
/// bound is violated or an arc is unreachable. An empty stop sequence means
/// the vehicle is unused: zero cost, no legs.
fn evaluate_route(model: &RoutingModel, vehicle: usize, stops_seq: &[usize]) -> Option<RouteEval> {
    let dims = dimensions();

    if stops_seq.is_empty() {
        let start = model.starts[vehicle];
        let arrival = dims[DIM_TIME].start(model, vehicle)?;
        return Some(RouteEval {
            path: vec![start],
            arrivals: vec![arrival],
            cost: 0,
        });
    }

    let mut path = Vec::with_capacity(stops_seq.len() + 2);
    path.push(model.starts[vehicle]);
    path.extend_from_slice(stops_seq);
    path.push(model.ends[vehicle]);

    let mut cumuls: Vec<Vec<i64>> = Vec::with_capacity(dims.len());
    for dim in &dims {
        cumuls.push(vec![dim.start(model, vehicle)?]);
    }

    let mut cost = 0i64;
    for pair in path.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        cost += model.transit(vehicle, from, to)?;
        for (d, dim) in dims.iter().enumerate() {
            let prev = *cumuls[d].last().unwrap();
            let next = dim.advance(model, vehicle, prev, from, to)?;
            cumuls[d].push(next);
        }
    }

    for (d, dim) in dims.iter().enumerate() {
        if !dim.finish(model, vehicle, &path, &cumuls[d]) {
            return None;
        }
    }

    Some(RouteEval {
        path,
        arrivals: cumuls.swap_remove(DIM_TIME),
        cost,
    })
}

fn total_cost(model: &RoutingModel, routes: &[Vec<usize>]) -> Option<i64> {
    let mut total = 0;
    for (vehicle, seq) in routes.iter().enumerate() {
        total += evaluate_route(model, vehicle, seq)?.cost;
    }
    Some(total)
}

// ============================================================================
// Construction: cheapest next arc, insertion fallback
// ============================================================================

fn construct(model: &RoutingModel) -> Option<Vec<Vec<usize>>> {
    let vehicle_count = model.vehicle_count();
    let mut routes: Vec<Vec<usize>> = vec![Vec::new(); vehicle_count];
    let mut unassigned = model.visit_nodes();

    // Greedily extend route tails by the cheapest feasible next arc.
    while !unassigned.is_empty() {
        let mut best: Option<(usize, usize, i64)> = None;
        for vehicle in 0..vehicle_count {
            let tail = *routes[vehicle].last().unwrap_or(&model.starts[vehicle]);
            for (slot, &node) in unassigned.iter().enumerate() {
                let Some(delta) = model.transit(vehicle, tail, node) else {
                    continue;
                };
                if best.is_some_and(|(_, _, cheapest)| delta >= cheapest) {
                    continue;
                }
                routes[vehicle].push(node);
                let feasible = evaluate_route(model, vehicle, &routes[vehicle]).is_some();
                routes[vehicle].pop();
                if feasible {
                    best = Some((vehicle, slot, delta));
                }
            }
        }
        match best {
            Some((vehicle, slot, _)) => {
                let node = unassigned.swap_remove(slot);
                routes[vehicle].push(node);
            }
            None => break,
        }
    }

    // Tail extension can strand a stop that still fits mid-route; fall back
    // to cheapest feasible insertion anywhere.
    while let Some(&node) = unassigned.first() {
        let mut best: Option<(usize, usize, i64)> = None;
        for vehicle in 0..vehicle_count {
            for position in 0..=routes[vehicle].len() {
                let mut candidate = routes[vehicle].clone();
                candidate.insert(position, node);
                if let Some(eval) = evaluate_route(model, vehicle, &candidate) {
                    if best.is_none_or(|(_, _, cost)| eval.cost < cost) {
                        best = Some((vehicle, position, eval.cost));
                    }
                }
            }
        }
        let (vehicle, position, _) = best?;
        routes[vehicle].insert(position, node);
        unassigned.swap_remove(0);
    }

    Some(routes)
}

// ============================================================================
// Improvement: guided local search
// ============================================================================

type ArcPenalties = HashMap<(usize, usize), i64>;

fn augmented_route_cost(
    model: &RoutingModel,
    vehicle: usize,
    seq: &[usize],
    penalties: &ArcPenalties,
    lambda: i64,
) -> Option<i64> {
    let eval = evaluate_route(model, vehicle, seq)?;
    let mut cost = eval.cost;
    for pair in eval.path.windows(2) {
        if let Some(penalty) = penalties.get(&(pair[0], pair[1])) {
            cost += lambda * penalty;
        }
    }
    Some(cost)
}

/// 2-opt within one route: reverse a segment when it lowers the augmented
/// cost. First improvement wins.
fn two_opt_improve(
    model: &RoutingModel,
    vehicle: usize,
    route: &mut Vec<usize>,
    penalties: &ArcPenalties,
    lambda: i64,
) -> bool {
    if route.len() < 2 {
        return false;
    }
    let Some(current) = augmented_route_cost(model, vehicle, route, penalties, lambda) else {
        return false;
    };

    let n = route.len();
    for i in 0..n - 1 {
        for j in i + 1..n {
            route[i..=j].reverse();
            match augmented_route_cost(model, vehicle, route, penalties, lambda) {
                Some(cost) if cost < current => return true,
                _ => route[i..=j].reverse(),
            }
        }
    }

    false
}

/// Relocate one stop within or between routes when the summed augmented cost
/// drops. First improvement wins.
fn relocate_improve(
    model: &RoutingModel,
    routes: &mut [Vec<usize>],
    penalties: &ArcPenalties,
    lambda: i64,
) -> bool {
    let mut costs = Vec::with_capacity(routes.len());
    for (vehicle, seq) in routes.iter().enumerate() {
        match augmented_route_cost(model, vehicle, seq, penalties, lambda) {
            Some(cost) => costs.push(cost),
            None => return false,
        }
    }

    for from_route in 0..routes.len() {
        for visit_idx in 0..routes[from_route].len() {
            let node = routes[from_route][visit_idx];

            let mut donor = routes[from_route].clone();
            donor.remove(visit_idx);
            let Some(donor_cost) =
                augmented_route_cost(model, from_route, &donor, penalties, lambda)
            else {
                continue;
            };

            for to_route in 0..routes.len() {
                if to_route == from_route {
                    // Re-insertion into the shortened donor route.
                    for position in 0..=donor.len() {
                        if position == visit_idx {
                            continue;
                        }
                        let mut candidate = donor.clone();
                        candidate.insert(position, node);
                        if let Some(cost) =
                            augmented_route_cost(model, to_route, &candidate, penalties, lambda)
                        {
                            if cost < costs[from_route] {
                                routes[from_route] = candidate;
                                return true;
                            }
                        }
                    }
                } else {
                    for position in 0..=routes[to_route].len() {
                        let mut candidate = routes[to_route].clone();
                        candidate.insert(position, node);
                        if let Some(cost) =
                            augmented_route_cost(model, to_route, &candidate, penalties, lambda)
                        {
                            if donor_cost + cost < costs[from_route] + costs[to_route] {
                                routes[from_route] = donor;
                                routes[to_route] = candidate;
                                return true;
                            }
                        }
                    }
                }
            }
        }
    }

    false
}

/// Bumps the penalty of the maximum-utility arc (`cost / (1 + penalty)`) of
/// the incumbent so the next passes are pushed off it.
fn penalize_worst_arc(
    model: &RoutingModel,
    routes: &[Vec<usize>],
    penalties: &mut ArcPenalties,
) -> bool {
    let mut worst: Option<((usize, usize), f64)> = None;
    for (vehicle, seq) in routes.iter().enumerate() {
        let Some(eval) = evaluate_route(model, vehicle, seq) else {
            continue;
        };
        for pair in eval.path.windows(2) {
            let arc = (pair[0], pair[1]);
            let Some(cost) = model.transit(vehicle, arc.0, arc.1) else {
                continue;
            };
            let penalty = penalties.get(&arc).copied().unwrap_or(0);
            let utility = cost as f64 / (1.0 + penalty as f64);
            if worst.is_none_or(|(_, best)| utility > best) {
                worst = Some((arc, utility));
            }
        }
    }

    match worst {
        Some((arc, _)) => {
            *penalties.entry(arc).or_insert(0) += 1;
            true
        }
        None => false,
    }
}

fn improve(
    model: &RoutingModel,
    routes: &mut Vec<Vec<usize>>,
    options: &SolveOptions,
    deadline: Instant,
) {
    let Some(initial_cost) = total_cost(model, routes) else {
        return;
    };
    let arc_count: usize = routes
        .iter()
        .filter(|seq| !seq.is_empty())
        .map(|seq| seq.len() + 1)
        .sum();
    if arc_count == 0 {
        return;
    }
    let lambda = ((options.gls_lambda * initial_cost as f64) / arc_count as f64)
        .round()
        .max(1.0) as i64;

    let mut penalties = ArcPenalties::new();
    let mut best_routes = routes.clone();
    let mut best_cost = initial_cost;

    while Instant::now() < deadline {
        let mut improved = false;
        for vehicle in 0..routes.len() {
            let mut seq = std::mem::take(&mut routes[vehicle]);
            if two_opt_improve(model, vehicle, &mut seq, &penalties, lambda) {
                improved = true;
            }
            routes[vehicle] = seq;
        }
        if relocate_improve(model, routes, &penalties, lambda) {
            improved = true;
        }

        if let Some(cost) = total_cost(model, routes) {
            if cost < best_cost {
                best_cost = cost;
                best_routes = routes.clone();
            }
        }

        if !improved && !penalize_worst_arc(model, routes, &mut penalties) {
            break;
        }
    }

    debug!(
        initial_cost,
        best_cost,
        penalized_arcs = penalties.len(),
        "improvement phase finished"
    );
    *routes = best_routes;
}

// ============================================================================
// Entry point
// ============================================================================

/// One visited node with its arrival minute. For the first visit of a route
/// this is the departure minute instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVisit {
    pub node: usize,
    pub arrival_min: i64,
}

/// One vehicle's raw node sequence, endpoints included. Vehicles serving no
/// stop are omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRoute {
    pub vehicle: usize,
    pub visits: Vec<RawVisit>,
}

/// Runs the bounded search. `None` means no assignment satisfied every hard
/// constraint within the budget; that is a domain outcome, not a fault.
pub fn solve(model: &RoutingModel, options: &SolveOptions) -> Option<Vec<RawRoute>> {
    let started = Instant::now();
    let deadline = started + options.time_limit;

    let mut routes = construct(model)?;
    improve(model, &mut routes, options, deadline);

    let mut raw = Vec::new();
    for (vehicle, seq) in routes.iter().enumerate() {
        if seq.is_empty() {
            continue;
        }
        let eval = evaluate_route(model, vehicle, seq)?;
        // Report the start visit at the effective departure, the same clock
        // the duration ceiling is checked against, so the emitted schedule
        // satisfies the span bound as written.
        let mut arrivals = eval.arrivals;
        arrivals[0] = effective_departure(model, vehicle, &eval.path, &arrivals);
        raw.push(RawRoute {
            vehicle,
            visits: eval
                .path
                .iter()
                .zip(&arrivals)
                .map(|(&node, &arrival_min)| RawVisit { node, arrival_min })
                .collect(),
        });
    }

    info!(
        vehicles_used = raw.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "search finished"
    );
    Some(raw)
}
