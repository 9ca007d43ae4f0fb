//! Rules engines.
//!
//! A [`RulesEngine`] turns a rule set into legal successors and outcomes.
//! [`TemplateEngine`] interprets the declarative templates of any
//! [`RuleSpec`]; hand-coded engines such as [`crate::chess::ChessEngine`]
//! implement the same trait and are chosen when the [`Game`] is built.

use std::fmt;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::movegen;
use crate::outcome::{self, Outcome};
use crate::position::{Position, square_name};
use crate::rules::RuleSpec;

/// Move generation and game-end detection for one family of rule sets.
pub trait RulesEngine {
    /// Short identifier shown in logs and protocol output.
    fn name(&self) -> &'static str;

    /// The starting position.
    fn initial(&self, rules: &RuleSpec) -> Result<Position> {
        Ok(Position::initial(rules)?)
    }

    /// Legal successors of `pos`, in generation order.
    fn successors(&self, rules: &RuleSpec, pos: &Position) -> Result<Vec<Position>>;

    /// Outcome of `pos` for its side to move. `no_moves` reports whether
    /// [`RulesEngine::successors`] is empty and may be memoized by the caller.
    fn outcome(
        &self,
        rules: &RuleSpec,
        pos: &Position,
        no_moves: &mut dyn FnMut() -> Result<bool>,
    ) -> Result<Outcome>;

    /// Text name of the move that led from `parent` to `child`.
    fn move_name(&self, _rules: &RuleSpec, _parent: &Position, child: &Position) -> String {
        let m = child.last_move();
        if child.on_board(m.from.0, m.from.1) {
            format!("{}{}", square_name(m.from), square_name(m.to))
        } else {
            square_name(m.to)
        }
    }

    /// Parse a position description such as FEN, if the engine has one.
    fn parse_position(&self, _rules: &RuleSpec, text: &str) -> Result<Position> {
        Err(EngineError::Parse(format!(
            "{} cannot read position `{text}`",
            self.name()
        )))
    }

    /// Describe a position in the format [`RulesEngine::parse_position`] reads.
    fn format_position(&self, _rules: &RuleSpec, _pos: &Position) -> Option<String> {
        None
    }
}

/// The generic engine driven entirely by the rule set's templates.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateEngine;

impl RulesEngine for TemplateEngine {
    fn name(&self) -> &'static str {
        "template"
    }

    fn successors(&self, rules: &RuleSpec, pos: &Position) -> Result<Vec<Position>> {
        Ok(movegen::successors(rules, pos)?)
    }

    fn outcome(
        &self,
        rules: &RuleSpec,
        pos: &Position,
        no_moves: &mut dyn FnMut() -> Result<bool>,
    ) -> Result<Outcome> {
        outcome::evaluate(rules, pos, no_moves)
    }
}

/// A rule set paired with the engine that plays it.
#[derive(Clone)]
pub struct Game {
    rules: Arc<RuleSpec>,
    engine: Arc<dyn RulesEngine + Send + Sync>,
}

impl Game {
    /// Play `rules` with the template engine. The rules are validated first.
    pub fn new(rules: RuleSpec) -> Result<Self> {
        Self::with_engine(rules, TemplateEngine)
    }

    /// Play `rules` with a specific engine.
    pub fn with_engine<E>(rules: RuleSpec, engine: E) -> Result<Self>
    where
        E: RulesEngine + Send + Sync + 'static,
    {
        rules.validate()?;
        Ok(Self {
            rules: Arc::new(rules),
            engine: Arc::new(engine),
        })
    }

    #[inline]
    pub fn rules(&self) -> &RuleSpec {
        &self.rules
    }

    #[inline]
    pub fn engine(&self) -> &(dyn RulesEngine + Send + Sync) {
        self.engine.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.rules.name
    }

    pub fn initial(&self) -> Result<Position> {
        self.engine.initial(&self.rules)
    }

    pub fn successors(&self, pos: &Position) -> Result<Vec<Position>> {
        self.engine.successors(&self.rules, pos)
    }

    /// Outcome without memoization; generates successors when needed.
    pub fn outcome(&self, pos: &Position) -> Result<Outcome> {
        let mut no_moves = || self.successors(pos).map(|m| m.is_empty());
        self.engine.outcome(&self.rules, pos, &mut no_moves)
    }

    pub fn move_name(&self, parent: &Position, child: &Position) -> String {
        self.engine.move_name(&self.rules, parent, child)
    }
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("rules", &self.rules.name)
            .field("engine", &self.engine.name())
            .finish()
    }
}
