//! Evaluator-guided strategy in the style of AlphaZero.

use fastrand::Rng;

use super::{
    InfoCache, NodeInfo, Strategy, backprop_mean, expand_by_rollout, initial_value, pick_by_visits,
    terminal_bias,
};
use crate::encoding::{RecordedSlice, Reflection, flip_move_index, move_index, observe, policy_size};
use crate::error::{EngineError, Result};
use crate::evaluator::{Evaluator, EvaluatorError, UniformEvaluator};
use crate::search::SearchParams;
use crate::tree::{GameTree, NodeId};

/// Selection by `sign·Q + bias + c·P·√N_parent/(1+N)`.
///
/// Leaves are valued by the evaluator, which also supplies each child's
/// prior. With [`SearchParams::reflections`] above one, the evaluator sees
/// the position in that many reflected frames and the results are averaged.
/// Without an evaluator, leaves fall back to random rollouts and flat priors.
#[derive(Debug, Clone)]
pub struct AlphaZeroStrategy<E> {
    evaluator: Option<E>,
    params: SearchParams,
    cache: InfoCache<NodeInfo>,
}

impl<E: Evaluator> AlphaZeroStrategy<E> {
    pub fn new(evaluator: E, params: SearchParams) -> Self {
        Self {
            evaluator: Some(evaluator),
            params,
            cache: InfoCache::new(),
        }
    }
}

impl AlphaZeroStrategy<UniformEvaluator> {
    /// The AlphaZero selection rule over rollout values.
    pub fn without_model(params: SearchParams) -> Self {
        Self {
            evaluator: None,
            params,
            cache: InfoCache::new(),
        }
    }
}

impl<E> AlphaZeroStrategy<E> {
    pub fn info(&self, tree: &GameTree, id: NodeId) -> Result<NodeInfo> {
        self.cache.info(tree, id)
    }
}

impl<E: Evaluator> AlphaZeroStrategy<E> {
    fn expand_with(
        evaluator: &E,
        params: &SearchParams,
        cache: &mut InfoCache<NodeInfo>,
        tree: &mut GameTree,
        id: NodeId,
        rng: &mut Rng,
    ) -> Result<()> {
        let moves = tree.legal_moves(id)?;
        let game = tree.game().clone();
        let rules = game.rules();

        let mut indices = Vec::with_capacity(moves.len());
        for &child in moves.iter() {
            indices.push(move_index(rules, &tree.position(child)?.last_move()));
        }
        let frames: Vec<Reflection> = Reflection::first(params.reflections).collect();
        let pos = tree.position(id)?;
        let batch: Vec<_> = frames.iter().map(|&r| observe(rules, pos, &indices, r)).collect();
        let results = evaluator.evaluate_batch(&batch)?;
        if results.len() != batch.len() {
            return Err(EngineError::Invariant(format!(
                "evaluator returned {} results for {} observations",
                results.len(),
                batch.len()
            )));
        }
        let expected = policy_size(rules);
        for result in &results {
            if result.policy.len() != expected || !result.value.is_finite() {
                return Err(EvaluatorError::EvaluationFailed(format!(
                    "policy of length {} (expected {expected}), value {}",
                    result.policy.len(),
                    result.value
                ))
                .into());
            }
        }

        let count = results.len() as f32;
        let value = results.iter().map(|r| r.value).sum::<f32>() / count;
        let mut priors = vec![0.0f32; moves.len()];
        for (&r, result) in frames.iter().zip(&results) {
            for (prior, &index) in priors.iter_mut().zip(&indices) {
                let flipped = flip_move_index(rules, index, r);
                *prior += result.policy.get(flipped).copied().unwrap_or(0.0) / count;
            }
        }

        cache.info_mut(tree, id)?.q = value;
        for (&child, &prior) in moves.iter().zip(&priors) {
            let q = initial_value(tree.outcome(child)?, rng);
            let info = cache.info_mut(tree, child)?;
            info.q = q;
            info.p = prior;
        }
        Ok(())
    }
}

impl<E: Evaluator> Strategy for AlphaZeroStrategy<E> {
    fn name(&self) -> &'static str {
        if self.evaluator.is_some() { "alphazero" } else { "alphazero-no-model" }
    }

    fn expanded(&self, tree: &GameTree, id: NodeId) -> Result<bool> {
        Ok(self.cache.info(tree, id)?.expanded)
    }

    fn priority(&self, tree: &mut GameTree, parent: NodeId, child: NodeId) -> Result<f64> {
        let parent_info = self.cache.info(tree, parent)?;
        let info = self.cache.info(tree, child)?;
        let value = f64::from(tree.sign(parent, child)?) * f64::from(info.q);
        let bias = terminal_bias(tree, parent, child)?;
        let explore = if tree.outcome(child)?.is_terminal() {
            0.0
        } else {
            self.params.exploration * f64::from(info.p) * f64::from(parent_info.n).sqrt()
                / (1.0 + f64::from(info.n))
        };
        Ok(value + bias + explore)
    }

    fn expand(&mut self, tree: &mut GameTree, id: NodeId, rng: &mut Rng) -> Result<()> {
        let Some(evaluator) = &self.evaluator else {
            return expand_by_rollout(&mut self.cache, tree, id, rng);
        };
        if !tree.outcome(id)?.is_terminal() {
            Self::expand_with(evaluator, &self.params, &mut self.cache, tree, id, rng)?;
        }
        let info = self.cache.info_mut(tree, id)?;
        info.n += 1;
        info.expanded = true;
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Game;
    use crate::evaluator::{EvalResult, EvaluatorError, Observation};
    use crate::games;

    /// Puts all weight on one square, in the frame it is shown.
    struct Favorite(usize);

    impl Evaluator for Favorite {
        fn evaluate(&self, obs: &Observation) -> std::result::Result<EvalResult, EvaluatorError> {
            let mut policy = vec![0.0; obs.policy_size];
            policy[self.0] = 1.0;
            Ok(EvalResult { policy, value: 0.25 })
        }
    }

    struct Broken;

    impl Evaluator for Broken {
        fn evaluate(&self, _obs: &Observation) -> std::result::Result<EvalResult, EvaluatorError> {
            Err(EvaluatorError::ModelError("no weights".into()))
        }
    }

    fn tictactoe() -> GameTree {
        GameTree::new(Game::new(games::tictactoe().unwrap()).unwrap()).unwrap()
    }

    #[test]
    fn test_expand_uses_evaluator() {
        let mut tree = tictactoe();
        let root = tree.start();
        let mut strategy = AlphaZeroStrategy::new(Favorite(0), SearchParams::default());
        let mut rng = Rng::with_seed(4);
        strategy.expand(&mut tree, root, &mut rng).unwrap();

        let info = strategy.info(&tree, root).unwrap();
        assert_eq!((info.n, info.q), (1, 0.25));
        let a1 = tree.find_named(root, "a1").unwrap().unwrap();
        let c3 = tree.find_named(root, "c3").unwrap().unwrap();
        assert_eq!(strategy.info(&tree, a1).unwrap().p, 1.0);
        assert_eq!(strategy.info(&tree, c3).unwrap().p, 0.0);
    }

    #[test]
    fn test_reflections_average_priors() {
        let mut tree = tictactoe();
        let root = tree.start();
        let params = SearchParams::default().with_reflections(2);
        let mut strategy = AlphaZeroStrategy::new(Favorite(0), params);
        let mut rng = Rng::with_seed(4);
        strategy.expand(&mut tree, root, &mut rng).unwrap();

        // the mirrored frame shows c1 where a1 was
        let a1 = tree.find_named(root, "a1").unwrap().unwrap();
        let c1 = tree.find_named(root, "c1").unwrap().unwrap();
        assert_eq!(strategy.info(&tree, a1).unwrap().p, 0.5);
        assert_eq!(strategy.info(&tree, c1).unwrap().p, 0.5);
    }

    #[test]
    fn test_priority_scales_exploration_by_prior() {
        let mut tree = tictactoe();
        let root = tree.start();
        let mut strategy = AlphaZeroStrategy::new(Favorite(0), SearchParams::default());
        let mut rng = Rng::with_seed(4);
        strategy.expand(&mut tree, root, &mut rng).unwrap();

        let a1 = tree.find_named(root, "a1").unwrap().unwrap();
        let c3 = tree.find_named(root, "c3").unwrap().unwrap();
        let favored = strategy.priority(&mut tree, root, a1).unwrap();
        let other = strategy.priority(&mut tree, root, c3).unwrap();
        assert!(favored > 0.9);
        assert!(other.abs() < 0.001);
    }

    #[test]
    fn test_evaluator_errors_propagate() {
        let mut tree = tictactoe();
        let root = tree.start();
        let mut strategy = AlphaZeroStrategy::new(Broken, SearchParams::default());
        let mut rng = Rng::with_seed(4);
        let err = strategy.expand(&mut tree, root, &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::Evaluator(EvaluatorError::ModelError(_))));
    }

    /// Answers with a policy one slot short.
    struct Truncated;

    impl Evaluator for Truncated {
        fn evaluate(&self, obs: &Observation) -> std::result::Result<EvalResult, EvaluatorError> {
            Ok(EvalResult {
                policy: vec![0.1; obs.policy_size - 1],
                value: 0.0,
            })
        }
    }

    #[test]
    fn test_malformed_evaluation_is_rejected() {
        let mut tree = tictactoe();
        let root = tree.start();
        let mut strategy = AlphaZeroStrategy::new(Truncated, SearchParams::default());
        let mut rng = Rng::with_seed(4);
        let err = strategy.expand(&mut tree, root, &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::Evaluator(EvaluatorError::EvaluationFailed(_))));
        assert_eq!(strategy.cache_size(), 0);
    }

    #[test]
    fn test_without_model_uses_rollouts() {
        let mut tree = tictactoe();
        let root = tree.start();
        let mut strategy = AlphaZeroStrategy::without_model(SearchParams::default());
        let mut rng = Rng::with_seed(4);
        strategy.expand(&mut tree, root, &mut rng).unwrap();
        assert_eq!(strategy.name(), "alphazero-no-model");
        let child = tree.legal_moves(root).unwrap()[0];
        assert_eq!(strategy.info(&tree, child).unwrap().p, 1.0);
        let q = strategy.info(&tree, root).unwrap().q;
        assert!(q == 1.0 || q == -1.0 || q == 0.0);
    }
}
