//! Pluggable search strategies.
//!
//! The search loop in [`crate::search`] only walks the tree; every value
//! judgment is delegated to a [`Strategy`]:
//! - `priority` ranks a child during selection
//! - `expand` gives a leaf its first value estimate and its children priors
//! - `backprop` folds a leaf's value into its ancestors
//! - `pick_move` turns the accumulated statistics into the move to play
//!
//! Strategies keep their statistics in an [`InfoCache`] keyed by ply depth,
//! so a whole ply can be dropped once the game has moved past it.
//!
//! Three strategies are provided: [`VanillaStrategy`] (random rollouts),
//! [`AlphaZeroStrategy`] (evaluator priors and values) and
//! [`DirichletStrategy`] (win/loss/draw pseudo-counts).

mod alphazero;
mod dirichlet;
mod vanilla;

pub use alphazero::AlphaZeroStrategy;
pub use dirichlet::DirichletStrategy;
pub use vanilla::VanillaStrategy;

use std::collections::{BTreeMap, HashMap};

use fastrand::Rng;
use log::{debug, trace};

use crate::constants::{TERMINAL_BIAS, VALUE_JITTER};
use crate::encoding::{RecordedSlice, SearchResult, move_index};
use crate::engine::Game;
use crate::error::{EngineError, Result};
use crate::outcome::Outcome;
use crate::position::Position;
use crate::rules::Side;
use crate::search::SearchParams;
use crate::tree::{GameTree, NodeId};

/// Node evaluation, selection and backup rules for the tree search.
pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Whether `id` already has a value estimate and its children have priors.
    fn expanded(&self, tree: &GameTree, id: NodeId) -> Result<bool>;

    /// Selection priority of moving from `parent` to `child`, for `parent`'s side.
    fn priority(&self, tree: &mut GameTree, parent: NodeId, child: NodeId) -> Result<f64>;

    /// Give `id` its first value estimate and its children their priors. For
    /// a terminal node this only counts the visit, so it may be called again.
    fn expand(&mut self, tree: &mut GameTree, id: NodeId, rng: &mut Rng) -> Result<()>;

    /// Fold the value of the just expanded node into every node of `path`.
    fn backprop(&mut self, tree: &mut GameTree, path: &[NodeId], expanded: NodeId) -> Result<()>;

    /// Choose the move to play from `root` and record the search statistics.
    /// Statistics for the root's ply and the one before it are dropped.
    fn pick_move(
        &mut self,
        tree: &mut GameTree,
        root: NodeId,
        rng: &mut Rng,
    ) -> Result<(NodeId, RecordedSlice)>;

    /// Forget everything.
    fn game_over(&mut self);

    /// Number of nodes with statistics.
    fn cache_size(&self) -> usize;
}

/// Per-node statistics grouped by ply depth.
#[derive(Debug, Clone)]
pub struct InfoCache<I> {
    by_depth: BTreeMap<u16, HashMap<NodeId, I>>,
}

impl<I> Default for InfoCache<I> {
    fn default() -> Self {
        Self {
            by_depth: BTreeMap::new(),
        }
    }
}

impl<I: Clone + Default> InfoCache<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics for `id`, or the defaults if it has none yet.
    pub fn read(&self, depth: u16, id: NodeId) -> I {
        self.by_depth
            .get(&depth)
            .and_then(|m| m.get(&id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn entry(&mut self, depth: u16, id: NodeId) -> &mut I {
        self.by_depth.entry(depth).or_default().entry(id).or_default()
    }

    /// [`InfoCache::read`] with the depth looked up in `tree`.
    pub fn info(&self, tree: &GameTree, id: NodeId) -> Result<I> {
        Ok(self.read(tree.depth(id)?, id))
    }

    /// [`InfoCache::entry`] with the depth looked up in `tree`.
    pub fn info_mut(&mut self, tree: &GameTree, id: NodeId) -> Result<&mut I> {
        Ok(self.entry(tree.depth(id)?, id))
    }

    /// Drop every entry at `depth`.
    pub fn evict(&mut self, depth: u16) {
        self.by_depth.remove(&depth);
    }

    /// Drop the root's ply and the one before it. The earlier ply may hold
    /// entries when two searches share a tree.
    pub fn evict_around(&mut self, depth: u16) {
        self.evict(depth);
        if let Some(prev) = depth.checked_sub(1) {
            self.evict(prev);
        }
    }

    pub fn clear(&mut self) {
        self.by_depth.clear();
    }

    pub fn len(&self) -> usize {
        self.by_depth.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a move does for the side making it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Ends the game with a win for the mover.
    Win,
    /// Ends the game with a loss for the mover.
    Loss,
    Open,
}

impl Verdict {
    /// Verdict of reaching a position with `outcome` and side to move
    /// `child_mover`, for the side `parent_mover` that moved there.
    pub fn of(outcome: Outcome, child_mover: Side, parent_mover: Side) -> Self {
        let same = child_mover == parent_mover;
        match (outcome, same) {
            (Outcome::Win, true) | (Outcome::Lose, false) => Verdict::Win,
            (Outcome::Lose, true) | (Outcome::Win, false) => Verdict::Loss,
            _ => Verdict::Open,
        }
    }
}

/// Choose a move index. An immediate win is taken if there is one (uniformly
/// among several). Otherwise the non-losing moves are sampled by `weights`,
/// a move being chosen when its cumulative weight first exceeds the sampled
/// point. Without positive weight the choice is uniform over the non-losing
/// moves, or over all moves when every move loses.
///
/// Returns `None` only when there are no moves.
pub fn pick_index(verdicts: &[Verdict], weights: &[f64], rng: &mut Rng) -> Option<usize> {
    if verdicts.is_empty() {
        return None;
    }
    let wins: Vec<usize> = (0..verdicts.len()).filter(|&i| verdicts[i] == Verdict::Win).collect();
    if !wins.is_empty() {
        return Some(wins[rng.usize(..wins.len())]);
    }

    let mut cumulative = Vec::with_capacity(verdicts.len());
    let mut total = 0.0;
    for (i, verdict) in verdicts.iter().enumerate() {
        let w = weights.get(i).copied().unwrap_or(0.0);
        if *verdict != Verdict::Loss && w.is_finite() && w > 0.0 {
            total += w;
        }
        cumulative.push(total);
    }
    if total > 0.0 && total.is_finite() {
        let point = rng.f64() * total;
        let count = cumulative.iter().filter(|&&c| c <= point).count();
        return Some(count.min(verdicts.len() - 1));
    }

    let open: Vec<usize> = (0..verdicts.len()).filter(|&i| verdicts[i] != Verdict::Loss).collect();
    if open.is_empty() {
        Some(rng.usize(..verdicts.len()))
    } else {
        Some(open[rng.usize(..open.len())])
    }
}

/// Verdicts of every move from `parent`, in the same order as `moves`.
pub fn verdicts(tree: &mut GameTree, parent: NodeId, moves: &[NodeId]) -> Result<Vec<Verdict>> {
    let mover = tree.position(parent)?.mover();
    let mut out = Vec::with_capacity(moves.len());
    for &child in moves {
        let outcome = tree.outcome(child)?;
        out.push(Verdict::of(outcome, tree.position(child)?.mover(), mover));
    }
    Ok(out)
}

/// `±TERMINAL_BIAS` when `child` wins or loses on the spot for `parent`.
pub fn terminal_bias(tree: &mut GameTree, parent: NodeId, child: NodeId) -> Result<f64> {
    Ok(if tree.win_for(child, parent)? {
        TERMINAL_BIAS
    } else if tree.loss_for(child, parent)? {
        -TERMINAL_BIAS
    } else {
        0.0
    })
}

/// `1`, `-1` or `0` for the side to move.
pub fn outcome_value(outcome: Outcome) -> f32 {
    match outcome {
        Outcome::Win => 1.0,
        Outcome::Lose => -1.0,
        Outcome::Draw | Outcome::Undetermined => 0.0,
    }
}

/// First value estimate of a node: its result when terminal, otherwise a
/// tiny random value that breaks ties between unvisited children.
pub fn initial_value(outcome: Outcome, rng: &mut Rng) -> f32 {
    match outcome {
        Outcome::Undetermined => rng.f32() * VALUE_JITTER,
        decided => outcome_value(decided),
    }
}

/// Selection weights for a move distribution at `temperature`. A
/// non-positive temperature puts all weight on the first most likely move.
pub fn temperature_weights(policy: &[f64], temperature: f64) -> Vec<f64> {
    if temperature <= 0.0 {
        let best = policy
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal).then(b.0.cmp(&a.0)))
            .map(|(i, _)| i);
        return (0..policy.len())
            .map(|i| if Some(i) == best { 1.0 } else { 0.0 })
            .collect();
    }
    policy.iter().map(|p| p.powf(1.0 / temperature)).collect()
}

/// The slice recorded for `root`: its board, side to move and one
/// probability per move.
pub fn record_slice(tree: &GameTree, root: NodeId, moves: &[NodeId], probs: &[f64]) -> Result<RecordedSlice> {
    let rules = tree.game().rules();
    let pos = tree.position(root)?;
    let mut results = Vec::with_capacity(moves.len());
    for (&child, &prob) in moves.iter().zip(probs) {
        results.push(SearchResult {
            index: move_index(rules, &tree.position(child)?.last_move()),
            prob: prob as f32,
        });
    }
    Ok(RecordedSlice {
        board: pos.board().to_vec(),
        mover: pos.mover(),
        results,
    })
}

/// `weights` scaled to sum to one, or uniform when they sum to nothing.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().filter(|w| w.is_finite()).sum();
    if total > 0.0 {
        weights
            .iter()
            .map(|&w| if w.is_finite() { w / total } else { 0.0 })
            .collect()
    } else {
        vec![1.0 / weights.len().max(1) as f64; weights.len()]
    }
}

// =============================================================================
// Rollouts
// =============================================================================

/// A rollout position with its successors memoized. Rollouts stay outside the
/// tree so they never grow it.
struct Scratch {
    pos: Position,
    moves: Option<Vec<Position>>,
    outcome: Option<Outcome>,
}

impl Scratch {
    fn new(pos: Position) -> Self {
        Self {
            pos,
            moves: None,
            outcome: None,
        }
    }

    fn outcome(&mut self, game: &Game) -> Result<Outcome> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }
        let Scratch { pos, moves, .. } = &mut *self;
        let pos: &Position = pos;
        let mut no_moves = || -> Result<bool> {
            if moves.is_none() {
                *moves = Some(game.successors(pos)?);
            }
            Ok(moves.as_ref().is_none_or(Vec::is_empty))
        };
        let outcome = game.engine().outcome(game.rules(), pos, &mut no_moves)?;
        self.outcome = Some(outcome);
        Ok(outcome)
    }

    fn into_moves(self, game: &Game) -> Result<Vec<Position>> {
        match self.moves {
            Some(moves) => Ok(moves),
            None => game.successors(&self.pos),
        }
    }
}

/// Play random moves from `start` until the game ends, always taking an
/// immediate win and avoiding immediate losses when possible.
///
/// Returns the side to move in the final position and its outcome.
pub fn rollout(game: &Game, start: &Position, rng: &mut Rng) -> Result<(Side, Outcome)> {
    let mut current = Scratch::new(start.clone());
    let mut plies = 0u32;
    loop {
        let outcome = current.outcome(game)?;
        if outcome.is_terminal() {
            trace!("rollout ended after {plies} plies: {outcome:?}");
            return Ok((current.pos.mover(), outcome));
        }
        let mover = current.pos.mover();
        let mut children: Vec<Scratch> = current.into_moves(game)?.into_iter().map(Scratch::new).collect();
        let mut verdicts = Vec::with_capacity(children.len());
        for child in &mut children {
            let outcome = child.outcome(game)?;
            verdicts.push(Verdict::of(outcome, child.pos.mover(), mover));
        }
        let weights = vec![1.0; children.len()];
        let pick = pick_index(&verdicts, &weights, rng).ok_or_else(|| {
            EngineError::Invariant("rollout reached an undetermined position without moves".into())
        })?;
        current = children.swap_remove(pick);
        plies += 1;
    }
}

// =============================================================================
// Mean-value statistics
// =============================================================================

/// Visit count, mean value and prior of a node, shared by the strategies
/// that back up mean values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeInfo {
    pub expanded: bool,
    pub n: u32,
    /// Mean value for the node's side to move.
    pub q: f32,
    pub p: f32,
}

/// Expand `id` by a random rollout, with a flat prior for every child.
pub fn expand_by_rollout(
    cache: &mut InfoCache<NodeInfo>,
    tree: &mut GameTree,
    id: NodeId,
    rng: &mut Rng,
) -> Result<()> {
    if !tree.outcome(id)?.is_terminal() {
        let moves = tree.legal_moves(id)?;
        for &child in moves.iter() {
            let q = initial_value(tree.outcome(child)?, rng);
            let info = cache.info_mut(tree, child)?;
            info.q = q;
            info.p = 1.0;
        }
        let start = tree.position(id)?.clone();
        let (mover, result) = rollout(tree.game(), &start, rng)?;
        let sign = if mover == start.mover() { 1.0 } else { -1.0 };
        cache.info_mut(tree, id)?.q = sign * outcome_value(result);
    }
    let info = cache.info_mut(tree, id)?;
    info.n += 1;
    info.expanded = true;
    Ok(())
}

/// Fold `expanded`'s value into the running mean of every node on `path`,
/// sign-adjusted for each node's side to move and optionally discounted by
/// the depth distance.
pub fn backprop_mean(
    cache: &mut InfoCache<NodeInfo>,
    tree: &GameTree,
    path: &[NodeId],
    expanded: NodeId,
    discount: Option<f64>,
) -> Result<()> {
    let value = cache.info(tree, expanded)?.q;
    let depth = tree.depth(expanded)?;
    for &ancestor in path {
        let mut v = value * tree.sign(ancestor, expanded)? as f32;
        if let Some(d) = discount {
            let distance = i32::from(depth.saturating_sub(tree.depth(ancestor)?));
            v *= d.powi(distance) as f32;
        }
        let info = cache.info_mut(tree, ancestor)?;
        info.q = (info.q * info.n as f32 + v) / (info.n + 1) as f32;
        info.n += 1;
    }
    Ok(())
}

/// Pick a move in proportion to visit counts sharpened by the temperature.
/// The recorded slice holds the plain visit distribution.
pub fn pick_by_visits(
    cache: &mut InfoCache<NodeInfo>,
    tree: &mut GameTree,
    root: NodeId,
    params: &SearchParams,
    rng: &mut Rng,
) -> Result<(NodeId, RecordedSlice)> {
    let moves = tree.legal_moves(root)?;
    if moves.is_empty() {
        return Err(EngineError::Invariant("picking a move from a position without moves".into()));
    }
    let depth = tree.depth(root)?;
    let root_info = cache.info(tree, root)?;
    debug!(
        "depth {depth}: value {:.3} after {} visits, {} nodes cached",
        root_info.q,
        root_info.n,
        cache.len()
    );

    let mut visits = Vec::with_capacity(moves.len());
    for &child in moves.iter() {
        let info = cache.info(tree, child)?;
        trace!(
            "{}\t{}\t{:.3}\t{:.3}",
            tree.move_name(root, child)?,
            info.n,
            info.q,
            info.p
        );
        visits.push(f64::from(info.n));
    }
    let policy = normalize(&visits);
    let slice = record_slice(tree, root, &moves, &policy)?;

    let weights = temperature_weights(&policy, params.temperature_at(depth));
    let verdicts = verdicts(tree, root, &moves)?;
    let pick = pick_index(&verdicts, &weights, rng)
        .ok_or_else(|| EngineError::Invariant("no move to pick".into()))?;
    cache.evict_around(depth);
    Ok((moves[pick], slice))
}
