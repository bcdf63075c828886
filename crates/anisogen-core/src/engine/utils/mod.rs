//! Utility functions for the engine module.
//!
//! Currently only the temperature-controlled sampling used to draw donor
//! patterns.

pub mod sampling;
