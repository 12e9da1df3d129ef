//! # Config Crate
//!
//! Centralized configuration constants for the mesh evaluation pipeline.
//! All magic numbers and tunable parameters are defined here to ensure
//! consistency across crates and easy configuration management.
//!
//! ## Usage
//!
//! ```rust
//! use config::constants::{EPSILON, ORIGINDEX_NONE};
//!
//! // Use EPSILON for floating-point comparisons
//! let value: f64 = 0.00000000001; // 1e-11, smaller than EPSILON (1e-10)
//! let is_zero = value.abs() < EPSILON;
//! assert!(is_zero);
//!
//! // Newly created elements have no origin in the base mesh
//! let origin: i32 = ORIGINDEX_NONE;
//! assert_eq!(origin, -1);
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All constants defined once, used everywhere
//! - **Pipeline Compatible**: One set of defaults shared by every crate
//! - **Well-Documented**: Every constant has clear documentation

pub mod constants;

#[cfg(test)]
mod tests;
