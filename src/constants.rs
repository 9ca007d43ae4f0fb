//! Engine-wide constants and search defaults.
//!
//! Board geometry is a runtime property of each rule set, so only the
//! fixed-size structures and the default search parameters live here.
//! [`crate::search::SearchParams`] starts from these values.

// =============================================================================
// Positions
// =============================================================================

/// Number of plies kept in the rolling position-hash ring.
pub const HISTORY_LEN: usize = 16;

/// Largest supported board edge.
pub const MAX_BOARD_SIZE: usize = 32;

/// Largest number of piece types a rule set may declare (codes are `i8`).
pub const MAX_PIECE_TYPES: usize = 127;

// =============================================================================
// Search Parameters
// =============================================================================

/// Default number of search iterations per move.
pub const DEFAULT_ITERATIONS: usize = 1600;

/// Default exploration coefficient.
pub const DEFAULT_EXPLORATION: f64 = 1.0;

/// Default move-picking temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Priority bonus (or penalty) for a child that ends the game immediately.
pub const TERMINAL_BIAS: f64 = 100.0;

/// Noise scale for the initial value of undetermined nodes, used to break ties.
pub const VALUE_JITTER: f32 = 0.0001;

// =============================================================================
// Dirichlet Strategy
// =============================================================================

/// Values of a win, a loss and a draw for the Dirichlet strategy.
pub const DIRICHLET_VALUES: [f32; 3] = [1.0, 0.0, 0.5];

/// Standard deviations added to the expected value during selection.
pub const DIRICHLET_SEARCH_SDEVS: f32 = 4.0;

/// Standard deviations added to the expected value when picking a move.
pub const DIRICHLET_PICK_SDEVS: f32 = -1.0;

/// Pseudo-count each outcome starts with for undetermined nodes.
pub const DIRICHLET_PRIOR: f32 = 0.1;

// =============================================================================
// Chess
// =============================================================================

/// Ply count at which a chess game is declared drawn.
pub const CHESS_MOVE_LIMIT: u16 = 200;

/// Occurrences of a position in the hash ring that make a chess draw.
pub const CHESS_REPETITIONS: usize = 3;
