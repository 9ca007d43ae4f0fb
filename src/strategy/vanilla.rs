//! Rollout-driven strategy.

use fastrand::Rng;

use super::{
    InfoCache, NodeInfo, Strategy, backprop_mean, expand_by_rollout, pick_by_visits, terminal_bias,
};
use crate::encoding::RecordedSlice;
use crate::error::Result;
use crate::search::SearchParams;
use crate::tree::{GameTree, NodeId};

/// Plain MCTS: leaves are valued by one random rollout, children start with
/// a flat prior, and selection balances the prior, the mean value and an
/// upper-confidence exploration bonus.
#[derive(Debug, Clone, Default)]
pub struct VanillaStrategy {
    params: SearchParams,
    cache: InfoCache<NodeInfo>,
}

impl VanillaStrategy {
    pub fn new(params: SearchParams) -> Self {
        Self {
            params,
            cache: InfoCache::new(),
        }
    }

    /// Statistics gathered for `id`.
    pub fn info(&self, tree: &GameTree, id: NodeId) -> Result<NodeInfo> {
        self.cache.info(tree, id)
    }
}

impl Strategy for VanillaStrategy {
    fn name(&self) -> &'static str {
        "vanilla"
    }

    fn expanded(&self, tree: &GameTree, id: NodeId) -> Result<bool> {
        Ok(self.cache.info(tree, id)?.expanded)
    }

    fn priority(&self, tree: &mut GameTree, parent: NodeId, child: NodeId) -> Result<f64> {
        let parent_info = self.cache.info(tree, parent)?;
        let info = self.cache.info(tree, child)?;
        let n = f64::from(info.n);

        // the prior counts as part of the value and fades with visits
        let prior = f64::from(info.p) * 2.0 / (4.0 + n).sqrt();
        let value = f64::from(tree.sign(parent, child)?) * f64::from(info.q);
        let bias = terminal_bias(tree, parent, child)?;
        let explore = if tree.outcome(child)?.is_terminal() {
            0.0
        } else {
            self.params.exploration * f64::from(parent_info.n).sqrt() / (1.0 + n)
        };
        Ok(prior + value + bias + explore)
    }

    fn expand(&mut self, tree: &mut GameTree, id: NodeId, rng: &mut Rng) -> Result<()> {
        expand_by_rollout(&mut self.cache, tree, id, rng)
    }

    fn backprop(&mut self, tree: &mut GameTree, path: &[NodeId], expanded: NodeId) -> Result<()> {
        backprop_mean(&mut self.cache, tree, path, expanded, self.params.depth_discount)
    }

    fn pick_move(
        &mut self,
        tree: &mut GameTree,
        root: NodeId,
        rng: &mut Rng,
    ) -> Result<(NodeId, RecordedSlice)> {
        pick_by_visits(&mut self.cache, tree, root, &self.params, rng)
    }

    fn game_over(&mut self) {
        self.cache.clear();
    }

    fn cache_size(&self) -> usize {
        self.cache.len()
    }
}
