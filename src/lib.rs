//! Tabula: a rule-configurable board game engine with Monte Carlo tree search.
//!
//! Games are described declaratively by a [`rules::RuleSpec`]: board size,
//! symmetry, piece types with move templates, and an ordered list of
//! termination conditions. The template engine turns any such description
//! into legal moves and outcomes; hand-coded engines such as
//! [`chess::ChessEngine`] can stand in for it where the rules need more.
//!
//! ## Modules
//!
//! - [`constants`] - Engine limits and default search parameters
//! - [`error`] - Rule and engine error types
//! - [`rules`] - Declarative rule sets: pieces, move templates, termination
//! - [`position`] - Board snapshots with a rolling position-hash history
//! - [`movegen`] - Template-driven successor generation
//! - [`outcome`] - Termination conditions
//! - [`engine`] - The rules engine interface and [`engine::Game`]
//! - [`chess`] - Hand-coded chess with castling, en passant and FEN
//! - [`games`] - Built-in rule sets
//! - [`registry`] - Game identifiers mapped to factories
//! - [`tree`] - Position arena with memoized successors and outcomes
//! - [`evaluator`] - Value and policy oracles for model-assisted search
//! - [`encoding`] - Move indices, board reflections and recorded games
//! - [`strategy`] - Pluggable expansion, selection and backup rules
//! - [`search`] - Tree search and other move pickers
//! - [`play`] - Self-play driver
//! - [`protocol`] - Text command protocol
//!
//! ## Example
//!
//! ```
//! use tabula::engine::Game;
//! use tabula::games;
//! use tabula::search::{MonteCarloTreeSearch, SearchAlgo, SearchParams};
//! use tabula::strategy::VanillaStrategy;
//! use tabula::tree::GameTree;
//!
//! let game = Game::new(games::tictactoe().unwrap()).unwrap();
//! let mut tree = GameTree::new(game).unwrap();
//!
//! let params = SearchParams::default().with_iterations(100).with_seed(1);
//! let mut search = MonteCarloTreeSearch::new(VanillaStrategy::new(params.clone()), &params);
//! let start = tree.start();
//! let (next, _) = search.next(&mut tree, start).unwrap();
//! println!("Best move: {}", tree.move_name(start, next).unwrap());
//! ```

pub mod chess;
pub mod constants;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod games;
pub mod movegen;
pub mod outcome;
pub mod play;
pub mod position;
pub mod protocol;
pub mod registry;
pub mod rules;
pub mod search;
pub mod strategy;
pub mod tree;
