//! Game registry.
//!
//! Maps a game identifier to a factory building the [`Game`]. The registry is
//! an ordinary value populated at startup, normally with
//! [`GameRegistry::builtin`]; callers may register their own rule sets on top.

use std::collections::BTreeMap;

use log::warn;

use crate::chess::ChessEngine;
use crate::engine::Game;
use crate::error::{EngineError, Result};
use crate::games;

/// Factory function building a fresh game.
pub type GameFactory = fn() -> Result<Game>;

#[derive(Debug, Clone, Default)]
pub struct GameRegistry {
    factories: BTreeMap<String, GameFactory>,
}

impl GameRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in game.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("tictactoe", || Game::new(games::tictactoe()?));
        registry.register("connect4", || Game::new(games::connect4()?));
        registry.register("othello", || Game::new(games::othello()?));
        registry.register("chess", || Game::new(games::chess()?));
        registry.register("chess2", || Game::with_engine(games::chess_hand_coded()?, ChessEngine));
        registry
    }

    /// Register `factory` under `id`, replacing any previous registration.
    pub fn register(&mut self, id: &str, factory: GameFactory) {
        if self.factories.insert(id.to_string(), factory).is_some() {
            warn!("overriding existing registration for game `{id}`");
        }
    }

    /// Build the game registered under `id`.
    pub fn create(&self, id: &str) -> Result<Game> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| EngineError::UnknownGame(id.to_string()))?;
        factory()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_games() {
        let registry = GameRegistry::builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, ["chess", "chess2", "connect4", "othello", "tictactoe"]);
        for name in names {
            let game = registry.create(name).unwrap();
            assert_eq!(game.name(), name);
            assert!(!game.successors(&game.initial().unwrap()).unwrap().is_empty());
        }
    }

    #[test]
    fn test_engine_selection() {
        let registry = GameRegistry::builtin();
        assert_eq!(registry.create("chess").unwrap().engine().name(), "template");
        assert_eq!(registry.create("chess2").unwrap().engine().name(), "chess");
    }

    #[test]
    fn test_unknown_game() {
        let registry = GameRegistry::builtin();
        assert!(!registry.contains("go"));
        assert!(matches!(registry.create("go"), Err(EngineError::UnknownGame(id)) if id == "go"));
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = GameRegistry::new();
        registry.register("small", || Game::new(games::tictactoe()?));
        registry.register("small", || Game::new(games::connect4()?));
        assert_eq!(registry.create("small").unwrap().name(), "connect4");
    }
}
