//! Move selection: tree search and the trivial random player.
//!
//! A [`SearchAlgo`] is anything that picks the next position of a game.
//! [`MonteCarloTreeSearch`] repeats selection, expansion and backpropagation
//! for a fixed number of iterations and then lets its [`Strategy`] pick the
//! move. Each iteration:
//! 1. descends from the root to the highest-priority child until it reaches a
//!    node that is not yet expanded or that ends the game
//! 2. expands that node (terminal nodes only count the visit)
//! 3. backs the node's value up along the path it came down

use fastrand::Rng;
use log::{debug, trace};

use crate::constants::{DEFAULT_EXPLORATION, DEFAULT_ITERATIONS, DEFAULT_TEMPERATURE};
use crate::encoding::RecordedSlice;
use crate::error::{EngineError, Result};
use crate::strategy::{Strategy, Verdict, pick_index, verdicts};
use crate::tree::{GameTree, NodeId};

/// Runtime search configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Search iterations per move. At least one is always run.
    pub iterations: usize,

    /// Scale of the exploration bonus during selection.
    pub exploration: f64,

    /// Temperature for picking the move once the search is done.
    /// 0.0 always picks the most visited move; 1.0 samples by visits.
    pub temperature: f64,

    /// Starting temperature and ply count of a linear ramp towards
    /// `temperature`. Without a ramp `temperature` applies from the first ply.
    pub temperature_ramp: Option<(f64, u16)>,

    /// Per-ply discount applied to backed up values.
    pub depth_discount: Option<f64>,

    /// Number of board frames (1, 2 or 4) an evaluator sees per position.
    pub reflections: usize,

    /// Seed for the search's random number generator.
    pub seed: Option<u64>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            exploration: DEFAULT_EXPLORATION,
            temperature: DEFAULT_TEMPERATURE,
            temperature_ramp: None,
            depth_discount: None,
            reflections: 1,
            seed: None,
        }
    }
}

impl SearchParams {
    /// A fast, deterministic configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            iterations: 50,
            temperature: 0.0,
            seed: Some(0),
            ..Self::default()
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Start at `start` and reach `temperature` after `plies` plies.
    pub fn with_temperature_ramp(mut self, start: f64, plies: u16) -> Self {
        self.temperature_ramp = Some((start, plies));
        self
    }

    pub fn with_depth_discount(mut self, discount: f64) -> Self {
        self.depth_discount = Some(discount);
        self
    }

    pub fn with_reflections(mut self, reflections: usize) -> Self {
        self.reflections = reflections.clamp(1, 4);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Temperature for picking a move at ply `depth`.
    pub fn temperature_at(&self, depth: u16) -> f64 {
        match self.temperature_ramp {
            Some((start, plies)) if depth < plies => {
                let t = f64::from(depth) / f64::from(plies);
                start + (self.temperature - start) * t
            }
            _ => self.temperature,
        }
    }

    /// A random number generator seeded from `seed`, or from entropy.
    pub fn rng(&self) -> Rng {
        match self.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        }
    }
}

/// Something that picks moves.
pub trait SearchAlgo {
    fn name(&self) -> &str;

    /// The position to move to from `id`, with the statistics recorded for
    /// training when the algorithm keeps any.
    fn next(&mut self, tree: &mut GameTree, id: NodeId) -> Result<(NodeId, Option<RecordedSlice>)>;

    /// Called when a game ends; drops per-game state.
    fn game_over(&mut self) {}
}

impl<T: SearchAlgo + ?Sized> SearchAlgo for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next(&mut self, tree: &mut GameTree, id: NodeId) -> Result<(NodeId, Option<RecordedSlice>)> {
        (**self).next(tree, id)
    }

    fn game_over(&mut self) {
        (**self).game_over()
    }
}

/// Fail unless `id` is a position with moves left to play.
fn ensure_playable(tree: &mut GameTree, id: NodeId) -> Result<()> {
    if tree.outcome(id)?.is_terminal() {
        return Err(EngineError::GameOver);
    }
    if tree.legal_moves(id)?.is_empty() {
        return Err(EngineError::Invariant(
            "undetermined position without legal moves".into(),
        ));
    }
    Ok(())
}

/// Monte Carlo tree search driven by a [`Strategy`].
#[derive(Debug, Clone)]
pub struct MonteCarloTreeSearch<S> {
    strategy: S,
    iterations: usize,
    rng: Rng,
}

impl<S: Strategy> MonteCarloTreeSearch<S> {
    /// The strategy should have been built with the same `params`.
    pub fn new(strategy: S, params: &SearchParams) -> Self {
        Self {
            strategy,
            iterations: params.iterations.max(1),
            rng: params.rng(),
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// One selection, expansion and backpropagation pass from `root`.
    fn iterate(&mut self, tree: &mut GameTree, root: NodeId, path: &mut Vec<NodeId>) -> Result<()> {
        path.clear();
        let mut node = root;
        while self.strategy.expanded(tree, node)? && !tree.outcome(node)?.is_terminal() {
            path.push(node);
            let moves = tree.legal_moves(node)?;
            let mut best: Option<(NodeId, f64)> = None;
            for &child in moves.iter() {
                let priority = self.strategy.priority(tree, node, child)?;
                if best.is_none_or(|(_, p)| priority > p) {
                    best = Some((child, priority));
                }
            }
            node = best
                .map(|(child, _)| child)
                .ok_or_else(|| EngineError::Invariant("selection found no child to descend into".into()))?;
        }
        self.strategy.expand(tree, node, &mut self.rng)?;
        self.strategy.backprop(tree, path, node)
    }
}

impl<S: Strategy> SearchAlgo for MonteCarloTreeSearch<S> {
    fn name(&self) -> &str {
        self.strategy.name()
    }

    fn next(&mut self, tree: &mut GameTree, id: NodeId) -> Result<(NodeId, Option<RecordedSlice>)> {
        ensure_playable(tree, id)?;
        let mut path = Vec::new();
        for i in 0..self.iterations {
            self.iterate(tree, id, &mut path)?;
            trace!("iteration {i}: path length {}", path.len());
        }
        debug!(
            "{}: {} iterations, {} nodes cached, {} positions in tree",
            self.strategy.name(),
            self.iterations,
            self.strategy.cache_size(),
            tree.len()
        );
        let (child, slice) = self.strategy.pick_move(tree, id, &mut self.rng)?;
        Ok((child, Some(slice)))
    }

    fn game_over(&mut self) {
        self.strategy.game_over();
    }
}

/// Picks uniformly among the moves that do not lose on the spot, and takes
/// an immediate win when there is one.
#[derive(Debug, Clone)]
pub struct RandomPlayer {
    rng: Rng,
}

impl RandomPlayer {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: match seed {
                Some(seed) => Rng::with_seed(seed),
                None => Rng::new(),
            },
        }
    }
}

impl SearchAlgo for RandomPlayer {
    fn name(&self) -> &str {
        "random"
    }

    fn next(&mut self, tree: &mut GameTree, id: NodeId) -> Result<(NodeId, Option<RecordedSlice>)> {
        ensure_playable(tree, id)?;
        let moves = tree.legal_moves(id)?;
        let verdicts: Vec<Verdict> = verdicts(tree, id, &moves)?;
        let weights = vec![1.0; moves.len()];
        let pick = pick_index(&verdicts, &weights, &mut self.rng)
            .ok_or_else(|| EngineError::Invariant("no move to pick".into()))?;
        Ok((moves[pick], None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Game;
    use crate::games;
    use crate::outcome::Outcome;
    use crate::strategy::{DirichletStrategy, VanillaStrategy};

    fn setup(line: &[&str]) -> (GameTree, NodeId) {
        let mut tree = GameTree::new(Game::new(games::tictactoe().unwrap()).unwrap()).unwrap();
        let mut id = tree.start();
        for mv in line {
            id = tree.find_named(id, mv).unwrap().unwrap();
        }
        (tree, id)
    }

    #[test]
    fn test_default_params() {
        let params = SearchParams::default();
        assert_eq!(params.iterations, DEFAULT_ITERATIONS);
        assert_eq!(params.reflections, 1);
        assert!(params.seed.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let params = SearchParams::default()
            .with_iterations(10)
            .with_exploration(2.0)
            .with_temperature(0.5)
            .with_depth_discount(0.9)
            .with_reflections(8)
            .with_seed(42);
        assert_eq!(params.iterations, 10);
        assert_eq!(params.exploration, 2.0);
        assert_eq!(params.temperature, 0.5);
        assert_eq!(params.depth_discount, Some(0.9));
        assert_eq!(params.reflections, 4);
        assert_eq!(params.seed, Some(42));
    }

    #[test]
    fn test_temperature_ramp() {
        let params = SearchParams::default()
            .with_temperature(0.2)
            .with_temperature_ramp(1.0, 10);
        assert_eq!(params.temperature_at(0), 1.0);
        assert!((params.temperature_at(5) - 0.6).abs() < 1e-12);
        assert_eq!(params.temperature_at(10), 0.2);
        assert_eq!(params.temperature_at(40), 0.2);
        assert_eq!(SearchParams::default().temperature_at(0), DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_single_iteration_takes_the_win() {
        let params = SearchParams::default().with_iterations(1).with_seed(3);
        for seed in 0..5 {
            let (mut tree, root) = setup(&["a1", "a2", "b1", "b2"]);
            let params = params.clone().with_seed(seed);
            let mut search = MonteCarloTreeSearch::new(VanillaStrategy::new(params.clone()), &params);
            let (next, slice) = search.next(&mut tree, root).unwrap();
            assert_eq!(tree.move_name(root, next).unwrap(), "c1");
            assert_eq!(tree.outcome(next).unwrap(), Outcome::Lose);
            assert_eq!(slice.unwrap().results.len(), 5);
        }
    }

    #[test]
    fn test_search_blocks_the_threat() {
        // white threatens c1; black must block
        let params = SearchParams::for_testing().with_iterations(400);
        let (mut tree, root) = setup(&["a1", "b2", "b1"]);
        let mut search = MonteCarloTreeSearch::new(VanillaStrategy::new(params.clone()), &params);
        let (next, _) = search.next(&mut tree, root).unwrap();
        assert_eq!(tree.move_name(root, next).unwrap(), "c1");
    }

    #[test]
    fn test_seeded_search_is_deterministic() {
        let params = SearchParams::for_testing().with_exploration(0.0).with_seed(17);
        let mut picks = Vec::new();
        for _ in 0..2 {
            let (mut tree, root) = setup(&["b2"]);
            let mut search = MonteCarloTreeSearch::new(VanillaStrategy::new(params.clone()), &params);
            let (next, slice) = search.next(&mut tree, root).unwrap();
            picks.push((tree.move_name(root, next).unwrap(), slice));
        }
        assert_eq!(picks[0], picks[1]);
    }

    #[test]
    fn test_dirichlet_search() {
        let params = SearchParams::for_testing();
        let (mut tree, root) = setup(&["a1", "a2", "b1", "b2"]);
        let mut search = MonteCarloTreeSearch::new(DirichletStrategy::new(params.clone()), &params);
        assert_eq!(search.name(), "dirichlet");
        let (next, _) = search.next(&mut tree, root).unwrap();
        assert_eq!(tree.move_name(root, next).unwrap(), "c1");
    }

    #[test]
    fn test_next_on_finished_game() {
        let (mut tree, root) = setup(&["a1", "a2", "b1", "b2", "c1"]);
        let mut player = RandomPlayer::new(Some(1));
        assert!(matches!(player.next(&mut tree, root), Err(EngineError::GameOver)));
    }

    #[test]
    fn test_random_player() {
        let (mut tree, root) = setup(&["a1", "a2", "b1", "b2"]);
        let mut player: Box<dyn SearchAlgo> = Box::new(RandomPlayer::new(Some(1)));
        let (next, slice) = player.next(&mut tree, root).unwrap();
        assert!(slice.is_none());
        assert_eq!(tree.move_name(root, next).unwrap(), "c1");
        assert_eq!(player.name(), "random");
    }
}
