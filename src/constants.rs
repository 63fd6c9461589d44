//! Constants for board limits, search parameters, and rule defaults.
//!
//! This module collects the tunable knobs of the engine in one place. The
//! board is dynamically sized, so unlike fixed-array engines there are no
//! compile-time geometry tables here, only the bounds a game may be created
//! with and the defaults the players fall back to.

// =============================================================================
// Board Geometry
// =============================================================================

/// Smallest accepted board dimension (rows and columns independently).
pub const MIN_BOARD_DIM: usize = 2;

/// Largest accepted board dimension (rows and columns independently).
pub const MAX_BOARD_DIM: usize = 25;

/// Dimension used when a player is created before any explicit game setup.
pub const DEFAULT_SIZE: usize = 19;

/// Komi applied when none is given. Matches the common even-game value.
pub const DEFAULT_KOMI: f32 = 6.5;

// =============================================================================
// Search Parameters
// =============================================================================

/// Default number of simulated games per move request.
pub const DEFAULT_PLAYOUTS: usize = 1000;

/// UCT exploration constant. Higher values favor unvisited moves.
pub const EXPLORATION: f64 = 1.0;

/// A simulated game ends once its position history holds this many times the
/// board area. Keeps rollouts from wandering forever on sparse boards.
pub const GAME_LEN_FACTOR: usize = 2;

// =============================================================================
// Rule Variants
// =============================================================================

/// Capture-game target when none is given: first capture wins.
pub const DEFAULT_CAPTURE_TARGET: u32 = 1;
