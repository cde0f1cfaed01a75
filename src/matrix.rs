//! Pairwise travel matrices as returned by the routing backend.
//!
//! Durations arrive in seconds and are stored as whole minutes for the
//! solver; distances stay in metres. Built once per solve, never mutated.

/// Sentinel duration for arcs the street network cannot serve. Large enough
/// to dominate any real route, small enough that summing a route of them
/// cannot overflow.
pub const UNREACHABLE_MIN: i64 = i64::MAX / 4;

/// Square duration/distance matrices indexed by stop index.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelMatrix {
    /// Whole minutes, round-half-up from backend seconds. `UNREACHABLE_MIN`
    /// marks arcs with no path.
    pub duration_min: Vec<Vec<i64>>,
    /// Metres. Missing entries are 0.0; they only matter for reporting and an
    /// unreachable arc never appears in a feasible route.
    pub distance_m: Vec<Vec<f64>>,
}

impl TravelMatrix {
    /// Builds the matrix from raw backend annotations (seconds / metres,
    /// `None` for unreachable pairs).
    pub fn from_backend(
        durations_sec: Vec<Vec<Option<f64>>>,
        distances_m: Vec<Vec<Option<f64>>>,
    ) -> Self {
        let duration_min = durations_sec
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Some(seconds) => (seconds / 60.0).round() as i64,
                        None => UNREACHABLE_MIN,
                    })
                    .collect()
            })
            .collect();

        let distance_m = distances_m
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.unwrap_or(0.0)).collect())
            .collect();

        Self {
            duration_min,
            distance_m,
        }
    }

    /// Number of stops covered by the matrix.
    pub fn node_count(&self) -> usize {
        self.duration_min.len()
    }

    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.duration_min[from][to] < UNREACHABLE_MIN
    }
}
