//! Decoded path geometry for one route leg.
//!
//! Internally a leg is a plain `(lat, lon)` sequence; the compact encoded
//! polyline format only exists at the backend boundary, where
//! [`Polyline::from_encoded`] decodes it.

use serde::{Deserialize, Serialize};

/// OSRM encodes polylines with 1e-5 coordinate precision.
const OSRM_PRECISION: u32 = 5;

/// A route-leg geometry as decoded coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    /// Builds a polyline from already-decoded `(lat, lon)` points.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Decodes a backend-encoded polyline string.
    pub fn from_encoded(encoded: &str) -> Result<Self, String> {
        let line = polyline::decode_polyline(encoded, OSRM_PRECISION)
            .map_err(|err| err.to_string())?;
        // geo coords are x = lon, y = lat.
        let points = line.into_iter().map(|coord| (coord.y, coord.x)).collect();
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
