//! Routing backend seam.
//!
//! Everything the pipeline needs from the street-network service goes
//! through [`RoutingBackend`], so tests and fallbacks can swap the HTTP
//! adapter out.

use thiserror::Error;

use crate::matrix::TravelMatrix;
use crate::polyline::Polyline;

/// Failures at the routing backend boundary.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend stayed unreachable past the retry ceiling.
    #[error("routing backend unavailable: {0}")]
    Unavailable(String),
    /// Transport-level failure on a single request.
    #[error("routing backend transport error")]
    Transport(#[from] reqwest::Error),
    /// The backend answered but the body was not usable.
    #[error("routing backend returned a malformed response: {0}")]
    Malformed(String),
}

/// Source of travel-time/distance matrices and per-leg path geometries.
///
/// Locations are `(lat, lon)` pairs in stop-index order; the returned matrix
/// is indexed the same way.
pub trait RoutingBackend {
    /// All-pairs travel matrix for the given locations, in one backend
    /// round-trip. Implementations own their cold-start retry policy.
    fn travel_matrix(&self, locations: &[(f64, f64)]) -> Result<TravelMatrix, BackendError>;

    /// Driving path between two locations, decoded to coordinates.
    fn leg_path(&self, from: (f64, f64), to: (f64, f64)) -> Result<Polyline, BackendError>;
}

impl<B: RoutingBackend + ?Sized> RoutingBackend for &B {
    fn travel_matrix(&self, locations: &[(f64, f64)]) -> Result<TravelMatrix, BackendError> {
        (**self).travel_matrix(locations)
    }

    fn leg_path(&self, from: (f64, f64), to: (f64, f64)) -> Result<Polyline, BackendError> {
        (**self).leg_path(from, to)
    }
}
