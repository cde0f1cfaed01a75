//! OSRM HTTP adapter: all-pairs table query, per-leg route query, and the
//! liveness probe used while a scaled-to-zero backend wakes up.

use serde::Deserialize;
use tracing::{debug, info};

use crate::matrix::TravelMatrix;
use crate::polyline::Polyline;
use crate::retry::{BackoffPolicy, retry_with_backoff};
use crate::traits::{BackendError, RoutingBackend};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
    /// Cold-start retry schedule for the table query.
    pub backoff: BackoffPolicy,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 30,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl OsrmConfig {
    /// Default config with the base URL taken from `OSRM_BASE` when set
    /// (docker compose / hosted deployments).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base) = std::env::var("OSRM_BASE") {
            if !base.is_empty() {
                config.base_url = base;
            }
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Liveness probe. Any HTTP response counts as alive: a cold backend
    /// refuses the connection outright, while a warm OSRM answers even on
    /// paths it does not know.
    pub fn is_alive(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);
        self.client.get(url).send().is_ok()
    }

    /// `lon,lat;lon,lat;...` as OSRM expects.
    fn coord_path(locations: &[(f64, f64)]) -> String {
        locations
            .iter()
            .map(|(lat, lon)| format!("{:.6},{:.6}", lon, lat))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn fetch_table(&self, locations: &[(f64, f64)]) -> Result<TravelMatrix, BackendError> {
        let url = format!(
            "{}/table/v1/{}/{}?annotations=duration,distance",
            self.config.base_url,
            self.config.profile,
            Self::coord_path(locations),
        );
        debug!(stops = locations.len(), "requesting OSRM table");

        let body: TableResponse = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json()?;

        table_to_matrix(body, locations.len())
    }

    fn fetch_leg(&self, from: (f64, f64), to: (f64, f64)) -> Result<Polyline, BackendError> {
        let url = format!(
            "{}/route/v1/{}/{}?overview=full&geometries=polyline",
            self.config.base_url,
            self.config.profile,
            Self::coord_path(&[from, to]),
        );

        let body: RouteResponse = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json()?;

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("route response without routes".into()))?;

        Polyline::from_encoded(&route.geometry).map_err(BackendError::Malformed)
    }
}

impl RoutingBackend for OsrmClient {
    fn travel_matrix(&self, locations: &[(f64, f64)]) -> Result<TravelMatrix, BackendError> {
        if locations.is_empty() {
            return Ok(TravelMatrix::from_backend(Vec::new(), Vec::new()));
        }

        let matrix = retry_with_backoff(
            &self.config.backoff,
            || self.is_alive(),
            || self.fetch_table(locations),
        )
        .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        info!(stops = locations.len(), "OSRM table received");
        Ok(matrix)
    }

    fn leg_path(&self, from: (f64, f64), to: (f64, f64)) -> Result<Polyline, BackendError> {
        // No retry here: geometry is an enrichment and its caller degrades
        // gracefully on failure.
        self.fetch_leg(from, to)
    }
}

/// Checks the table is square over `expected` locations before it reaches
/// the solver; a ragged or truncated response is a malformed reply, not an
/// index panic later.
fn table_to_matrix(body: TableResponse, expected: usize) -> Result<TravelMatrix, BackendError> {
    let durations = body
        .durations
        .ok_or_else(|| BackendError::Malformed("table response without durations".into()))?;
    check_grid("durations", &durations, expected)?;

    let distances = match body.distances {
        Some(distances) => {
            check_grid("distances", &distances, expected)?;
            distances
        }
        None => vec![vec![None; expected]; expected],
    };

    Ok(TravelMatrix::from_backend(durations, distances))
}

fn check_grid(
    field: &str,
    grid: &[Vec<Option<f64>>],
    expected: usize,
) -> Result<(), BackendError> {
    if grid.len() != expected {
        return Err(BackendError::Malformed(format!(
            "table {field} has {} rows for {expected} locations",
            grid.len()
        )));
    }
    for (row_index, row) in grid.iter().enumerate() {
        if row.len() != expected {
            return Err(BackendError::Malformed(format!(
                "table {field} row {row_index} has {} entries for {expected} locations",
                row.len()
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct TableResponse {
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: String,
}
