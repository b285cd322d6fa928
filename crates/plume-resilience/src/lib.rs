//! # Plume Resilience
//!
//! Resilience helpers for Plume. Currently a bounded timeout wrapper used
//! around every cache store round trip.

pub mod timeout;

pub use timeout::*;
