//! # Tests for Config Constants
//!
//! Unit tests verifying the correctness of configuration constants
//! and helper functions.

use crate::constants::*;

// =============================================================================
// PRECISION TESTS
// =============================================================================

#[test]
fn test_epsilon_is_positive() {
    assert!(EPSILON > 0.0, "EPSILON must be positive");
}

#[test]
fn test_epsilon_is_small() {
    assert!(EPSILON < 1e-6, "EPSILON should be small for precision");
}

#[test]
fn test_degenerate_length_below_epsilon() {
    assert!(
        DEGENERATE_LENGTH_SQ < EPSILON,
        "DEGENERATE_LENGTH_SQ should be stricter than EPSILON"
    );
}

// =============================================================================
// ATTRIBUTE TESTS
// =============================================================================

#[test]
fn test_origindex_none_is_negative() {
    assert!(ORIGINDEX_NONE < 0, "ORIGINDEX_NONE must not be a valid index");
}

#[test]
fn test_layer_limits_are_sane() {
    assert!(MAX_UV_CHANNELS >= 1);
    assert!(MAX_NAMED_LAYERS >= MAX_UV_CHANNELS);
}

// =============================================================================
// NORMAL TESTS
// =============================================================================

#[test]
fn test_auto_smooth_angle_in_range() {
    assert!(DEFAULT_AUTO_SMOOTH_ANGLE > 0.0);
    assert!(DEFAULT_AUTO_SMOOTH_ANGLE < std::f64::consts::PI);
}

// =============================================================================
// HELPER TESTS
// =============================================================================

#[test]
fn test_approx_equal() {
    assert!(approx_equal(2.0, 2.0));
    assert!(approx_equal(2.0, 2.0 + EPSILON / 2.0));
    assert!(!approx_equal(2.0, 2.0 + EPSILON * 10.0));
}

#[test]
fn test_approx_zero() {
    assert!(approx_zero(0.0));
    assert!(approx_zero(-EPSILON / 2.0));
    assert!(!approx_zero(EPSILON * 10.0));
}
