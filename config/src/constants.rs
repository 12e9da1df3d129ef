//! # Configuration Constants
//!
//! Centralized constants for the mesh evaluation pipeline. All geometry
//! calculations, attribute layer limits, and precision values are defined
//! here.
//!
//! ## Categories
//!
//! - **Precision**: Floating-point comparison tolerances
//! - **Attributes**: Layer limits and sentinel values
//! - **Normals**: Split-normal defaults

// =============================================================================
// PRECISION CONSTANTS
// =============================================================================

/// Epsilon for floating-point comparisons.
///
/// Used for determining if two floating-point values are "equal" within
/// numerical tolerance. This value is chosen to balance precision with
/// robustness against floating-point errors.
///
/// # Example
///
/// ```rust
/// use config::constants::EPSILON;
///
/// fn approximately_equal(a: f64, b: f64) -> bool {
///     (a - b).abs() < EPSILON
/// }
///
/// assert!(approximately_equal(1.0, 1.0 + 1e-11));
/// ```
pub const EPSILON: f64 = 1e-10;

/// Minimum squared length below which a vector is considered degenerate.
///
/// Polygon and vertex normals shorter than this fall back to a stable
/// default direction instead of being normalized.
///
/// # Example
///
/// ```rust
/// use config::constants::DEGENERATE_LENGTH_SQ;
///
/// let length_sq: f64 = 1e-25;
/// assert!(length_sq < DEGENERATE_LENGTH_SQ);
/// ```
pub const DEGENERATE_LENGTH_SQ: f64 = 1e-20;

// =============================================================================
// ATTRIBUTE LAYER CONSTANTS
// =============================================================================

/// Sentinel origin index for elements with no source in the base mesh.
///
/// Constructive modifiers that create new elements (e.g. subdivision
/// midpoints) record this value in the origin-index layer.
///
/// # Example
///
/// ```rust
/// use config::constants::ORIGINDEX_NONE;
///
/// let origin: i32 = ORIGINDEX_NONE;
/// assert!(origin < 0);
/// ```
pub const ORIGINDEX_NONE: i32 = -1;

/// Maximum number of UV channels per mesh.
///
/// Tangent layers are derived per UV channel, so the same limit applies
/// to them.
pub const MAX_UV_CHANNELS: usize = 8;

/// Maximum number of instances for other multi-instance layer types
/// (colors, generic scalar channels, shape keys).
pub const MAX_NAMED_LAYERS: usize = 64;

// =============================================================================
// NORMAL CONSTANTS
// =============================================================================

/// Default auto-smooth angle in radians (30 degrees).
///
/// Split normals treat edges between polygons whose normals diverge by
/// more than this angle as sharp.
///
/// # Example
///
/// ```rust
/// use config::constants::DEFAULT_AUTO_SMOOTH_ANGLE;
///
/// assert!((DEFAULT_AUTO_SMOOTH_ANGLE.to_degrees() - 30.0).abs() < 1e-9);
/// ```
pub const DEFAULT_AUTO_SMOOTH_ANGLE: f64 = 30.0 * std::f64::consts::PI / 180.0;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Checks if two f64 values are approximately equal within EPSILON.
///
/// # Example
///
/// ```rust
/// use config::constants::approx_equal;
///
/// assert!(approx_equal(1.0, 1.0 + 1e-11));
/// assert!(!approx_equal(1.0, 1.1));
/// ```
#[inline]
pub fn approx_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Checks if a f64 value is approximately zero within EPSILON.
///
/// # Example
///
/// ```rust
/// use config::constants::approx_zero;
///
/// assert!(approx_zero(1e-11));
/// assert!(!approx_zero(0.1));
/// ```
#[inline]
pub fn approx_zero(value: f64) -> bool {
    value.abs() < EPSILON
}
