//! Value and policy oracles.
//!
//! An [`Evaluator`] scores an encoded position for the side to move and
//! returns a probability for every move index (see [`crate::encoding`]).
//! Model-assisted search strategies consult it once per expanded node. The
//! crate ships only [`UniformEvaluator`]; trained models plug in by
//! implementing the trait.

use thiserror::Error;

use crate::rules::Side;

/// Errors that can occur during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluatorError {
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    #[error("model error: {0}")]
    ModelError(String),
}

/// A position in the frame the evaluator sees it, possibly reflected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Signed piece codes indexed by `y * size + x`.
    pub board: Vec<i8>,
    pub size: usize,
    pub mover: Side,
    /// Move indices of the legal moves, in the same frame as `board`.
    pub legal: Vec<usize>,
    /// Length of the policy vector the evaluator must return.
    pub policy_size: usize,
}

/// Result of evaluating a position.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    /// Probability per move index; zero for illegal moves.
    pub policy: Vec<f32>,

    /// Value for the side to move, from -1.0 (certain loss) to 1.0 (certain win).
    pub value: f32,
}

pub trait Evaluator {
    fn evaluate(&self, obs: &Observation) -> Result<EvalResult, EvaluatorError>;

    /// Evaluate several observations. The default calls
    /// [`Evaluator::evaluate`] in a loop.
    fn evaluate_batch(&self, batch: &[Observation]) -> Result<Vec<EvalResult>, EvaluatorError> {
        batch.iter().map(|obs| self.evaluate(obs)).collect()
    }
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn evaluate(&self, obs: &Observation) -> Result<EvalResult, EvaluatorError> {
        (**self).evaluate(obs)
    }
}

/// Equal probability for every legal move and a neutral value.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEvaluator;

impl Evaluator for UniformEvaluator {
    fn evaluate(&self, obs: &Observation) -> Result<EvalResult, EvaluatorError> {
        if obs.board.len() != obs.size * obs.size {
            return Err(EvaluatorError::InvalidObservation(format!(
                "board of {} cells for size {}",
                obs.board.len(),
                obs.size
            )));
        }
        let mut policy = vec![0.0; obs.policy_size];
        if obs.legal.is_empty() {
            return Ok(EvalResult { policy, value: 0.0 });
        }
        let prob = 1.0 / obs.legal.len() as f32;
        for &i in &obs.legal {
            let slot = policy.get_mut(i).ok_or_else(|| {
                EvaluatorError::InvalidObservation(format!(
                    "move index {i} outside policy of size {}",
                    obs.policy_size
                ))
            })?;
            *slot = prob;
        }
        Ok(EvalResult { policy, value: 0.0 })
    }
}
