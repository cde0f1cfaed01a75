//! Great-circle fallback backend.
//!
//! Estimates travel from straight-line distance and an assumed speed. Less
//! accurate than a street-network backend (ignores roads) but needs no
//! network, which also makes it the workhorse of the test suites.

use crate::matrix::TravelMatrix;
use crate::polyline::Polyline;
use crate::traits::{BackendError, RoutingBackend};

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone)]
pub struct HaversineBackend {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineBackend {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineBackend {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Great-circle distance between two points in kilometers.
    fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lon1) = from;
        let (lat2, lon2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lon = (lon2 - lon1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    fn km_to_seconds(&self, km: f64) -> f64 {
        km / self.speed_kmh * 3600.0
    }
}

impl RoutingBackend for HaversineBackend {
    fn travel_matrix(&self, locations: &[(f64, f64)]) -> Result<TravelMatrix, BackendError> {
        let n = locations.len();
        let mut durations = vec![vec![Some(0.0); n]; n];
        let mut distances = vec![vec![Some(0.0); n]; n];

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate() {
                if i != j {
                    let km = Self::haversine_km(*from, *to);
                    durations[i][j] = Some(self.km_to_seconds(km));
                    distances[i][j] = Some(km * 1000.0);
                }
            }
        }

        Ok(TravelMatrix::from_backend(durations, distances))
    }

    fn leg_path(&self, from: (f64, f64), to: (f64, f64)) -> Result<Polyline, BackendError> {
        // No street graph to follow; a straight segment is the best estimate.
        Ok(Polyline::new(vec![from, to]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero_distance() {
        let dist = HaversineBackend::haversine_km((36.1, -115.1), (36.1, -115.1));
        assert!(dist < 0.001, "same point should have ~0 distance");
    }

    #[test]
    fn known_distance_is_close() {
        // Las Vegas (36.17, -115.14) to Los Angeles (34.05, -118.24),
        // actual distance ~370 km.
        let dist = HaversineBackend::haversine_km((36.17, -115.14), (34.05, -118.24));
        assert!(
            dist > 350.0 && dist < 400.0,
            "LV to LA should be ~370km, got {dist}"
        );
    }

    #[test]
    fn matrix_diagonal_is_zero_and_symmetric() {
        let backend = HaversineBackend::default();
        let locations = vec![(36.1, -115.1), (36.2, -115.2), (36.3, -115.3)];
        let matrix = backend.travel_matrix(&locations).expect("matrix");

        for i in 0..locations.len() {
            assert_eq!(matrix.duration_min[i][i], 0);
        }
        assert_eq!(matrix.duration_min[0][1], matrix.duration_min[1][0]);
    }

    #[test]
    fn travel_time_matches_assumed_speed() {
        let backend = HaversineBackend::new(40.0);
        // 10 km at 40 km/h = 15 minutes.
        assert!((backend.km_to_seconds(10.0) - 900.0).abs() < 1e-9);
    }

    #[test]
    fn leg_path_is_a_straight_segment() {
        let backend = HaversineBackend::default();
        let path = backend
            .leg_path((33.51, 36.29), (33.49, 36.30))
            .expect("path");
        assert_eq!(path.points(), &[(33.51, 36.29), (33.49, 36.30)]);
    }
}
