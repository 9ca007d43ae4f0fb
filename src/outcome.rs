//! Termination conditions.
//!
//! Outcomes are always relative to the side to move in the evaluated
//! position: [`Outcome::Win`] means the player about to move has won.

use crate::position::Position;
use crate::rules::{Condition, Decision, RuleSpec, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Undetermined,
    Win,
    Lose,
    Draw,
}

impl Outcome {
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != Outcome::Undetermined
    }

    /// The winning side of a finished game, `None` for draws and unfinished games.
    pub fn winner(self, mover: Side) -> Option<Side> {
        match self {
            Outcome::Win => Some(mover),
            Outcome::Lose => Some(mover.opponent()),
            _ => None,
        }
    }

    /// Outcome of `winner` winning, seen from `mover`.
    fn for_mover(winner: Side, mover: Side) -> Outcome {
        if winner == mover { Outcome::Win } else { Outcome::Lose }
    }
}

/// Walk the termination list and return the first matching outcome.
///
/// `no_moves` reports whether the side to move has no legal move; it is only
/// called when a [`Condition::NoLegalMove`] entry is reached.
pub fn evaluate<E>(
    rules: &RuleSpec,
    pos: &Position,
    no_moves: &mut dyn FnMut() -> Result<bool, E>,
) -> Result<Outcome, E> {
    let (white, black) = pos.piece_counts(rules.pieces.len());
    let mover = pos.mover();

    for t in &rules.termination {
        let outcome = match t.condition {
            Condition::NoLegalMove => {
                if no_moves()? {
                    Some(decide(t.decision, &white, &black, mover))
                } else {
                    None
                }
            }
            Condition::MoveLimit => {
                (u32::from(pos.depth()) > t.param).then(|| decide(t.decision, &white, &black, mover))
            }
            Condition::BoardFull => {
                (pos.empty_cells() == 0).then(|| decide(t.decision, &white, &black, mover))
            }
            Condition::KeyPiecesCaptured => key_pieces_captured(rules, &white, &black, mover),
            Condition::NoPiecesOnBoard => {
                if white.iter().sum::<usize>() == 0 {
                    Some(Outcome::for_mover(Side::Black, mover))
                } else if black.iter().sum::<usize>() == 0 {
                    Some(Outcome::for_mover(Side::White, mover))
                } else {
                    None
                }
            }
            Condition::NInARow => {
                let n = t.param as i32;
                let (longest_white, longest_black) = longest_runs(pos, n);
                if longest_white >= n {
                    Some(Outcome::for_mover(Side::White, mover))
                } else if longest_black >= n {
                    Some(Outcome::for_mover(Side::Black, mover))
                } else {
                    None
                }
            }
            Condition::RepeatedPosition => {
                (pos.repetitions() >= t.param as usize).then_some(Outcome::Draw)
            }
        };
        if let Some(outcome) = outcome {
            return Ok(outcome);
        }
    }
    Ok(Outcome::Undetermined)
}

fn decide(decision: Decision, white: &[usize], black: &[usize], mover: Side) -> Outcome {
    match decision {
        Decision::Win => Outcome::Win,
        Decision::Loss => Outcome::Lose,
        Decision::Draw => Outcome::Draw,
        Decision::CountLivePieces => {
            let w: usize = white.iter().sum();
            let b: usize = black.iter().sum();
            match w.cmp(&b) {
                std::cmp::Ordering::Equal => Outcome::Draw,
                std::cmp::Ordering::Greater => Outcome::for_mover(Side::White, mover),
                std::cmp::Ordering::Less => Outcome::for_mover(Side::Black, mover),
            }
        }
    }
}

fn key_pieces_captured(rules: &RuleSpec, white: &[usize], black: &[usize], mover: Side) -> Option<Outcome> {
    for (i, piece) in rules.pieces.iter().enumerate() {
        let code = i + 1;
        if white[code] < piece.min {
            return Some(Outcome::for_mover(Side::Black, mover));
        }
        if black[code] < piece.min {
            return Some(Outcome::for_mover(Side::White, mover));
        }
    }
    None
}

/// Longest same-signed window of length `n` for white and black, over rows,
/// columns and both diagonals. Off-board squares count as empty.
pub fn longest_runs(pos: &Position, n: i32) -> (i32, i32) {
    let size = pos.size() as i32;
    let mut max_sum = 0;
    let mut min_sum = 0;
    for y in 0..size {
        for x in 0..size {
            let mut sums = [0i32; 4];
            for i in 0..n {
                sums[0] += pos.cell(x, y + i).signum() as i32;
                sums[1] += pos.cell(x + i, y).signum() as i32;
                sums[2] += pos.cell(x + i, y + i).signum() as i32;
                sums[3] += pos.cell(x + i, y - i).signum() as i32;
            }
            for s in sums {
                max_sum = max_sum.max(s);
                min_sum = min_sum.min(s);
            }
        }
    }
    (max_sum, -min_sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::games;
    use crate::movegen;
    use crate::position::LastMove;
    use crate::rules::{MoveSource, PieceSpec, Symmetry};

    fn outcome_of(rules: &RuleSpec, pos: &Position) -> Outcome {
        let mut no_moves = || movegen::successors(rules, pos).map(|m| m.is_empty());
        evaluate::<RuleError>(rules, pos, &mut no_moves).unwrap()
    }

    fn ttt(board: [i8; 9], mover: Side) -> Position {
        Position::new(3, board.to_vec(), mover, LastMove::NONE, 5)
    }

    #[test]
    fn test_three_in_a_row() {
        let rules = games::tictactoe().unwrap();
        // white owns the bottom row, black to move: black has lost
        let pos = ttt([1, 1, 1, -1, -1, 0, 0, 0, 0], Side::Black);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Lose);
        assert_eq!(Outcome::Lose.winner(Side::Black), Some(Side::White));

        // diagonal for black, white to move
        let pos = ttt([-1, 1, 1, 0, -1, 1, 0, 0, -1], Side::White);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Lose);

        // anti-diagonal
        let pos = ttt([1, 1, -1, 0, -1, 1, -1, 0, 0], Side::White);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Lose);

        let pos = ttt([1, -1, 0, 0, 0, 0, 0, 0, 0], Side::White);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Undetermined);
    }

    #[test]
    fn test_board_full_draw() {
        let rules = games::tictactoe().unwrap();
        let pos = ttt([1, -1, 1, 1, -1, -1, -1, 1, 1], Side::Black);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Draw);
    }

    #[test]
    fn test_longest_runs() {
        let pos = ttt([1, 1, 0, -1, -1, -1, 0, 0, 1], Side::White);
        assert_eq!(longest_runs(&pos, 3), (2, 3));
    }

    #[test]
    fn test_key_pieces_captured() {
        let rules = games::chess().unwrap();
        let pos = Position::setup(&rules, &[("K", "e1"), ("Q", "d1")], &[("P", "a7")], Side::Black, 3).unwrap();
        assert_eq!(outcome_of(&rules, &pos), Outcome::Lose);
        let pos = Position::setup(&rules, &[("K", "e1")], &[("K", "e8")], Side::White, 3).unwrap();
        assert_eq!(outcome_of(&rules, &pos), Outcome::Undetermined);
    }

    #[test]
    fn test_count_live_pieces_on_no_move() {
        let rules = games::othello().unwrap();
        // black cannot move; white has more pieces
        let pos = Position::setup(&rules, &[("P1", "a1,a2,b1")], &[("P1", "a3,b2")], Side::Black, 9).unwrap();
        assert_eq!(outcome_of(&rules, &pos), Outcome::Lose);
        let pos = Position::setup(&rules, &[("P1", "a1")], &[("P1", "h8,h7")], Side::Black, 9).unwrap();
        assert_eq!(outcome_of(&rules, &pos), Outcome::Win);
        let pos = Position::setup(&rules, &[("P1", "a1")], &[("P1", "h8")], Side::White, 9).unwrap();
        assert_eq!(outcome_of(&rules, &pos), Outcome::Draw);
    }

    #[test]
    fn test_no_pieces_on_board() {
        let rules = RuleSpec::new("t", 3, Symmetry::None, MoveSource::PiecesOnBoard)
            .piece(PieceSpec::new("A"))
            .ends_when(Condition::NoPiecesOnBoard, 0, Decision::Draw);
        let pos = Position::new(3, vec![0, 0, 0, 0, -1, 0, 0, 0, 0], Side::White, LastMove::NONE, 1);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Lose);
        let pos = Position::new(3, vec![0, 0, 0, 0, -1, 0, 0, 0, 0], Side::Black, LastMove::NONE, 1);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Win);
    }

    #[test]
    fn test_move_limit() {
        let rules = RuleSpec::new("t", 3, Symmetry::None, MoveSource::PiecesOnBoard)
            .piece(PieceSpec::new("A"))
            .ends_when(Condition::MoveLimit, 10, Decision::Draw);
        let board = vec![0, 0, 0, 0, 1, 0, 0, 0, -1];
        let pos = Position::new(3, board.clone(), Side::White, LastMove::NONE, 10);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Undetermined);
        let pos = Position::new(3, board, Side::White, LastMove::NONE, 11);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Draw);
    }

    #[test]
    fn test_first_matching_condition_wins() {
        let rules = games::tictactoe().unwrap();
        // full board that also holds a white row: the row is checked first
        let pos = ttt([1, 1, 1, -1, -1, 1, -1, 1, -1], Side::Black);
        assert_eq!(outcome_of(&rules, &pos), Outcome::Lose);
    }
}
