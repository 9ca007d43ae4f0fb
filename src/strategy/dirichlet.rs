//! Win/loss/draw pseudo-count strategy.
//!
//! Each node keeps pseudo-counts of the wins, losses and draws seen below it
//! for its side to move. They are read as the parameters of a Dirichlet
//! posterior over the three results, whose expected value under
//! [`DIRICHLET_VALUES`] and standard deviation drive both selection
//! (optimistic) and the final pick (pessimistic).

use fastrand::Rng;
use log::{debug, trace};

use super::{
    InfoCache, Strategy, normalize, pick_index, record_slice, rollout, temperature_weights, verdicts,
};
use crate::constants::{
    DIRICHLET_PICK_SDEVS, DIRICHLET_PRIOR, DIRICHLET_SEARCH_SDEVS, DIRICHLET_VALUES, TERMINAL_BIAS,
};
use crate::encoding::RecordedSlice;
use crate::error::{EngineError, Result};
use crate::outcome::Outcome;
use crate::search::SearchParams;
use crate::tree::{GameTree, NodeId};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counts {
    pub expanded: bool,
    pub n: u32,
    /// Wins, losses and draws for the node's side to move.
    pub wld: [f32; 3],
}

/// Starting pseudo-counts: the result itself for a finished game, a small
/// uniform prior otherwise.
fn initial_counts(outcome: Outcome) -> [f32; 3] {
    match outcome {
        Outcome::Win => [1.0, 0.0, 0.0],
        Outcome::Lose => [0.0, 1.0, 0.0],
        Outcome::Draw => [0.0, 0.0, 1.0],
        Outcome::Undetermined => [DIRICHLET_PRIOR; 3],
    }
}

/// Counts seen by a node whose side to move differs when `sign` is negative.
#[inline]
fn seen_from(wld: [f32; 3], sign: i32) -> [f32; 3] {
    if sign < 0 { [wld[1], wld[0], wld[2]] } else { wld }
}

/// Expected value of the Dirichlet posterior plus `sdevs` standard deviations.
pub fn expected_value_plus_sdevs(wld: [f32; 3], values: [f32; 3], sdevs: f32) -> f32 {
    let n: f32 = wld.iter().sum();
    if n <= 0.0 {
        return 0.0;
    }
    let expected: f32 = (0..3).map(|i| values[i] * wld[i] / n).sum();
    let denom = n * n * (n + 1.0);
    let mut variance = 0.0f32;
    for i in 0..3 {
        for j in 0..3 {
            let cov = if i == j {
                wld[i] * (n - wld[i]) / denom
            } else {
                -wld[i] * wld[j] / denom
            };
            variance += cov * values[i] * values[j];
        }
    }
    expected + variance.max(0.0).sqrt() * sdevs
}

#[derive(Debug, Clone, Default)]
pub struct DirichletStrategy {
    params: SearchParams,
    cache: InfoCache<Counts>,
}

impl DirichletStrategy {
    pub fn new(params: SearchParams) -> Self {
        Self {
            params,
            cache: InfoCache::new(),
        }
    }

    pub fn counts(&self, tree: &GameTree, id: NodeId) -> Result<Counts> {
        self.cache.info(tree, id)
    }

    /// The child's counts from the parent's side.
    fn parent_view(&self, tree: &GameTree, parent: NodeId, child: NodeId) -> Result<[f32; 3]> {
        Ok(seen_from(self.cache.info(tree, child)?.wld, tree.sign(parent, child)?))
    }
}

impl Strategy for DirichletStrategy {
    fn name(&self) -> &'static str {
        "dirichlet"
    }

    fn expanded(&self, tree: &GameTree, id: NodeId) -> Result<bool> {
        Ok(self.cache.info(tree, id)?.expanded)
    }

    fn priority(&self, tree: &mut GameTree, parent: NodeId, child: NodeId) -> Result<f64> {
        let wld = self.parent_view(tree, parent, child)?;
        let value = expected_value_plus_sdevs(wld, DIRICHLET_VALUES, DIRICHLET_SEARCH_SDEVS);
        let bonus = if tree.win_for(child, parent)? { TERMINAL_BIAS } else { 0.0 };
        Ok(f64::from(value) + bonus)
    }

    fn expand(&mut self, tree: &mut GameTree, id: NodeId, rng: &mut Rng) -> Result<()> {
        if !tree.outcome(id)?.is_terminal() {
            let moves = tree.legal_moves(id)?;
            for &child in moves.iter() {
                let wld = initial_counts(tree.outcome(child)?);
                self.cache.info_mut(tree, child)?.wld = wld;
            }
            let start = tree.position(id)?.clone();
            let (mover, result) = rollout(tree.game(), &start, rng)?;
            let sign = if mover == start.mover() { 1 } else { -1 };
            let add = seen_from(initial_counts(result), sign);
            let counts = self.cache.info_mut(tree, id)?;
            for (c, a) in counts.wld.iter_mut().zip(add) {
                *c += a;
            }
        }
        let counts = self.cache.info_mut(tree, id)?;
        counts.n += 1;
        counts.expanded = true;
        Ok(())
    }

    fn backprop(&mut self, tree: &mut GameTree, path: &[NodeId], expanded: NodeId) -> Result<()> {
        let wld = self.cache.info(tree, expanded)?.wld;
        for &ancestor in path {
            let add = seen_from(wld, tree.sign(ancestor, expanded)?);
            let counts = self.cache.info_mut(tree, ancestor)?;
            for (c, a) in counts.wld.iter_mut().zip(add) {
                *c += a;
            }
            counts.n += 1;
        }
        Ok(())
    }

    fn pick_move(
        &mut self,
        tree: &mut GameTree,
        root: NodeId,
        rng: &mut Rng,
    ) -> Result<(NodeId, RecordedSlice)> {
        let moves = tree.legal_moves(root)?;
        if moves.is_empty() {
            return Err(EngineError::Invariant("picking a move from a position without moves".into()));
        }
        let depth = tree.depth(root)?;
        let root_counts = self.cache.info(tree, root)?;
        debug!(
            "depth {depth}: wld {:?} after {} visits, {} nodes cached",
            root_counts.wld,
            root_counts.n,
            self.cache.len()
        );

        let mut values = Vec::with_capacity(moves.len());
        for &child in moves.iter() {
            let wld = self.parent_view(tree, root, child)?;
            let value = expected_value_plus_sdevs(wld, DIRICHLET_VALUES, DIRICHLET_PICK_SDEVS);
            trace!("{}\t{:?}\t{:.3}", tree.move_name(root, child)?, wld, value);
            values.push(f64::from(value.max(0.0)));
        }
        let weights = temperature_weights(&values, self.params.temperature_at(depth));
        let slice = record_slice(tree, root, &moves, &normalize(&weights))?;
        let verdicts = verdicts(tree, root, &moves)?;
        let pick = pick_index(&verdicts, &weights, rng)
            .ok_or_else(|| EngineError::Invariant("no move to pick".into()))?;
        self.cache.evict_around(depth);
        Ok((moves[pick], slice))
    }

    fn game_over(&mut self) {
        self.cache.clear();
    }

    fn cache_size(&self) -> usize {
        self.cache.len()
    }
}
