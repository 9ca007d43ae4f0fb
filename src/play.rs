//! Self-play driver.
//!
//! [`play_game`] alternates two [`SearchAlgo`]s from the start of a game until
//! it ends and labels every recorded search slice with the final result.

use log::{debug, info};

use crate::encoding::{TrainingInstance, record_game};
use crate::error::Result;
use crate::outcome::Outcome;
use crate::position::Position;
use crate::rules::Side;
use crate::search::SearchAlgo;
use crate::tree::{GameTree, NodeId};

/// A finished game.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub final_node: NodeId,
    pub final_position: Position,
    /// Outcome for the side to move in the final position.
    pub outcome: Outcome,
    pub winner: Option<Side>,
    pub moves: Vec<String>,
    pub instances: Vec<TrainingInstance>,
}

impl GameRecord {
    pub fn plies(&self) -> usize {
        self.moves.len()
    }

    /// `"white"`, `"black"` or `"draw"`.
    pub fn result(&self) -> &'static str {
        match self.winner {
            Some(Side::White) => "white",
            Some(Side::Black) => "black",
            None => "draw",
        }
    }
}

/// Play one game from the start of `tree`. Positions behind the current ply
/// are evicted as the game goes on.
pub fn play_game<W, B>(tree: &mut GameTree, white: &mut W, black: &mut B) -> Result<GameRecord>
where
    W: SearchAlgo + ?Sized,
    B: SearchAlgo + ?Sized,
{
    let mut node = tree.start();
    let mut moves = Vec::new();
    let mut slices = Vec::new();

    while !tree.outcome(node)?.is_terminal() {
        let (next, slice) = match tree.position(node)?.mover() {
            Side::White => white.next(tree, node)?,
            Side::Black => black.next(tree, node)?,
        };
        let name = tree.move_name(node, next)?;
        debug!("ply {}: {name}", tree.depth(node)?);
        moves.push(name);
        slices.extend(slice);
        node = next;
        tree.retain_from(tree.depth(node)?);
    }
    white.game_over();
    black.game_over();

    let outcome = tree.outcome(node)?;
    let final_position = tree.position(node)?.clone();
    let winner = outcome.winner(final_position.mover());
    debug!("final position:\n{}", final_position.render(tree.game().rules()));
    let instances = record_game(&final_position, outcome, slices)?;

    let record = GameRecord {
        final_node: node,
        final_position,
        outcome,
        winner,
        moves,
        instances,
    };
    info!(
        "{}: {} vs {}, result {} after {} plies",
        tree.game().name(),
        white.name(),
        black.name(),
        record.result(),
        record.plies()
    );
    Ok(record)
}
