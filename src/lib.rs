//! route-planner core
//!
//! Plans capacitated, time-windowed delivery routes for a single-depot fleet
//! using travel estimates from a street-network routing backend. The
//! pipeline runs matrix fetch -> model build -> bounded search -> extraction
//! -> optional geometry enrichment, with a single-slot cache over the whole
//! thing.

pub mod cache;
pub mod extract;
pub mod geometry;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod osrm;
pub mod pipeline;
pub mod polyline;
pub mod retry;
pub mod solver;
pub mod traits;
