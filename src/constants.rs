//! Tolerances, resolver limits, and search parameters.
//!
//! Everything that the geometry resolvers and the search engine treat as a
//! tunable lives here, so that a topology author can see in one place which
//! numeric assumptions the engine makes about a board.

// =============================================================================
// Geometry
// =============================================================================

/// Absolute tolerance for coordinate, slope and distance comparisons.
pub const EPSILON: f64 = 0.001;

/// Slopes beyond this magnitude compare as vertical.
pub const INFINITY_SLOPE: f64 = 1000.0;

/// Maximum deviation from straight continuation, in degrees, accepted by the
/// bearing resolver when growing a corridor.
pub const BEARING_TOLERANCE_DEG: f64 = 45.0;

/// Vertex cap for a single corridor grown by the bearing resolver.
pub const MAX_BEARING_CORRIDOR: usize = 11;

/// Corridors shorter than this bound no capture and are discarded.
pub const MIN_CORRIDOR_LEN: usize = 3;

/// Maximum number of combine / cull rounds applied after resolution.
pub const NORMALIZE_ROUNDS: usize = 3;

/// Distance factor, in units of edge length, from a corridor's second point
/// to the midpoint of the opposite triangle edge when the corridor continues
/// through the triangle: `1 + sqrt(3) / 2`.
pub fn keystone_factor() -> f64 {
    1.0 + 3f64.sqrt() / 2.0
}

// =============================================================================
// Search
// =============================================================================

/// Default deepest iteration attempted by the iterative deepening loop.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Default wall-clock budget for a single search invocation.
pub const DEFAULT_BUDGET_MS: u64 = 2000;

/// Pause before a worker retries a search that produced no result.
pub const RETRY_DELAY_MS: u64 = 100;
