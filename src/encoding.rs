//! Move indices, board reflections and recorded games.
//!
//! Every move maps to one slot of a policy vector:
//! `index = source * area + destination`, where the destination is the flat
//! square index and the source is the flat origin square, or in
//! [`MoveSource::Ends`] mode the piece type (code minus one), since the
//! origin is virtual.
//!
//! Symmetric games can be shown to an evaluator in four frames: reflection
//! `r` flips columns when `r % 2 == 1` and swaps the sides (rows flipped,
//! piece signs and side to move negated) when `r / 2 == 1`. Boards and move
//! indices are flipped consistently.

use crate::error::{EngineError, Result};
use crate::evaluator::Observation;
use crate::outcome::Outcome;
use crate::position::{LastMove, Position, Square};
use crate::rules::{MoveSource, RuleSpec, Side};

/// One of the four board frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reflection {
    pub left_right: bool,
    pub reverse_sides: bool,
}

impl Reflection {
    pub const IDENTITY: Reflection = Reflection {
        left_right: false,
        reverse_sides: false,
    };

    pub fn from_index(r: usize) -> Self {
        Self {
            left_right: r % 2 == 1,
            reverse_sides: (r / 2) % 2 == 1,
        }
    }

    /// The first `count` frames, identity first. At most four.
    pub fn first(count: usize) -> impl Iterator<Item = Reflection> {
        (0..count.clamp(1, 4)).map(Reflection::from_index)
    }

    pub fn flip(self, size: usize, (x, y): Square) -> Square {
        let n = size as i32;
        let x = if self.left_right { n - 1 - x } else { x };
        let y = if self.reverse_sides { n - 1 - y } else { y };
        (x, y)
    }

    pub fn mover(self, side: Side) -> Side {
        if self.reverse_sides { side.opponent() } else { side }
    }
}

#[inline]
fn square_index(size: usize, (x, y): Square) -> usize {
    y as usize * size + x as usize
}

#[inline]
fn index_square(size: usize, index: usize) -> Square {
    ((index % size) as i32, (index / size) as i32)
}

/// Length of the policy vector for `rules`.
pub fn policy_size(rules: &RuleSpec) -> usize {
    let sources = match rules.move_source {
        MoveSource::PiecesOnBoard => rules.area(),
        MoveSource::Ends => rules.pieces.len(),
    };
    sources * rules.area()
}

/// Policy index of a move.
pub fn move_index(rules: &RuleSpec, m: &LastMove) -> usize {
    let size = rules.board_size;
    let dst = square_index(size, m.to);
    let src = match rules.move_source {
        MoveSource::Ends => (m.piece.unsigned_abs() as usize).saturating_sub(1),
        MoveSource::PiecesOnBoard => square_index(size, m.from),
    };
    src * rules.area() + dst
}

/// The move behind a policy index. In [`MoveSource::Ends`] mode the origin
/// is reported as `(0, 0)` and the piece as an unsigned code; otherwise the
/// piece is unknown and reported as `0`.
pub fn expand_move_index(rules: &RuleSpec, index: usize) -> LastMove {
    let size = rules.board_size;
    let area = rules.area();
    let to = index_square(size, index % area);
    let src = index / area;
    match rules.move_source {
        MoveSource::Ends => LastMove {
            piece: (src + 1) as i8,
            from: (0, 0),
            to,
        },
        MoveSource::PiecesOnBoard => LastMove {
            piece: 0,
            from: index_square(size, src),
            to,
        },
    }
}

/// The index of the same move seen in frame `r`.
pub fn flip_move_index(rules: &RuleSpec, index: usize, r: Reflection) -> usize {
    let size = rules.board_size;
    let mut m = expand_move_index(rules, index);
    m.to = r.flip(size, m.to);
    if rules.move_source == MoveSource::PiecesOnBoard {
        m.from = r.flip(size, m.from);
    }
    move_index(rules, &m)
}

/// The board seen in frame `r`.
pub fn reflect_board(size: usize, board: &[i8], r: Reflection) -> Vec<i8> {
    let mut out = vec![0i8; board.len()];
    for (i, &p) in board.iter().enumerate() {
        let sq = r.flip(size, index_square(size, i));
        out[square_index(size, sq)] = if r.reverse_sides { -p } else { p };
    }
    out
}

/// What an evaluator sees of `pos` in frame `r`, given the legal move indices
/// in the unreflected frame.
pub fn observe(rules: &RuleSpec, pos: &Position, legal: &[usize], r: Reflection) -> Observation {
    Observation {
        board: reflect_board(pos.size(), pos.board(), r),
        size: pos.size(),
        mover: r.mover(pos.mover()),
        legal: legal.iter().map(|&i| flip_move_index(rules, i, r)).collect(),
        policy_size: policy_size(rules),
    }
}

/// Search statistics for one move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub index: usize,
    pub prob: f32,
}

/// What a search recorded about one position it moved from.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSlice {
    pub board: Vec<i8>,
    pub mover: Side,
    pub results: Vec<SearchResult>,
}

/// A recorded position labelled with the final result of its game.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingInstance {
    pub board: Vec<i8>,
    pub mover: Side,
    /// Depth of the final position.
    pub game_length: u16,
    /// `1`, `-1` or `0` for a win, loss or draw of `mover`.
    pub outcome: i8,
    pub results: Vec<SearchResult>,
}

impl TrainingInstance {
    /// Policy vector seen in frame `r`.
    pub fn policy(&self, rules: &RuleSpec, r: Reflection) -> Vec<f32> {
        let mut policy = vec![0.0; policy_size(rules)];
        for res in &self.results {
            if let Some(slot) = policy.get_mut(flip_move_index(rules, res.index, r)) {
                *slot = res.prob;
            }
        }
        policy
    }
}

/// Label every slice with the result of the finished game.
pub fn record_game(
    final_pos: &Position,
    final_outcome: Outcome,
    slices: Vec<RecordedSlice>,
) -> Result<Vec<TrainingInstance>> {
    let winner = match final_outcome {
        Outcome::Undetermined => return Err(EngineError::GameNotOver),
        Outcome::Draw => None,
        decided => decided.winner(final_pos.mover()),
    };
    Ok(slices
        .into_iter()
        .map(|slice| TrainingInstance {
            outcome: match winner {
                None => 0,
                Some(side) if side == slice.mover => 1,
                Some(_) => -1,
            },
            board: slice.board,
            mover: slice.mover,
            game_length: final_pos.depth(),
            results: slice.results,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Game;
    use crate::games;
    use crate::position::square_name;

    #[test]
    fn test_move_index_pieces_on_board() {
        let rules = games::chess().unwrap();
        let e2e4 = LastMove { piece: 1, from: (4, 1), to: (4, 3) };
        let index = move_index(&rules, &e2e4);
        assert_eq!(index, (8 + 4) * 64 + 3 * 8 + 4);
        let back = expand_move_index(&rules, index);
        assert_eq!((back.from, back.to), (e2e4.from, e2e4.to));
        assert_eq!(policy_size(&rules), 64 * 64);
    }

    #[test]
    fn test_move_index_ends() {
        let rules = games::connect4().unwrap();
        let drop = LastMove { piece: -1, from: (3, -1), to: (3, 0) };
        let index = move_index(&rules, &drop);
        assert_eq!(index, 3);
        let back = expand_move_index(&rules, index);
        assert_eq!(back.piece, 1);
        assert_eq!(back.to, (3, 0));
        assert_eq!(policy_size(&rules), 49);
    }

    #[test]
    fn test_round_trip_over_legal_moves() {
        for rules in [games::chess().unwrap(), games::tictactoe().unwrap(), games::othello().unwrap()] {
            let game = Game::new(rules.clone()).unwrap();
            let start = game.initial().unwrap();
            for child in game.successors(&start).unwrap() {
                let index = move_index(&rules, &child.last_move());
                assert!(index < policy_size(&rules));
                assert_eq!(move_index(&rules, &expand_move_index(&rules, index)), index);
                for r in Reflection::first(4) {
                    let flipped = flip_move_index(&rules, index, r);
                    assert!(flipped < policy_size(&rules));
                    assert_eq!(flip_move_index(&rules, flipped, r), index);
                }
            }
        }
    }

    #[test]
    fn test_reflections_match_boards() {
        // white king d1 and knight b3, black king g7
        let rules = games::chess_hand_coded().unwrap();
        let pos = Position::setup(&rules, &[("K", "d1"), ("N", "b3")], &[("K", "g7")], Side::White, 0).unwrap();
        let frames: Vec<Vec<i8>> = Reflection::first(4).map(|r| reflect_board(8, pos.board(), r)).collect();

        let expect = |white: &[(&str, &str)], black: &[(&str, &str)]| {
            Position::setup(&rules, white, black, Side::White, 0).unwrap().board().to_vec()
        };
        assert_eq!(frames[0], pos.board());
        assert_eq!(frames[1], expect(&[("K", "e1"), ("N", "g3")], &[("K", "b7")]));
        assert_eq!(frames[2], expect(&[("K", "g2")], &[("K", "d8"), ("N", "b6")]));
        assert_eq!(frames[3], expect(&[("K", "b2")], &[("K", "e8"), ("N", "g6")]));
        assert_eq!(Reflection::from_index(2).mover(Side::White), Side::Black);
    }

    #[test]
    fn test_flip_move_index_follows_squares() {
        let rules = games::chess().unwrap();
        let b1c3 = LastMove { piece: 2, from: (1, 0), to: (2, 2) };
        let index = move_index(&rules, &b1c3);
        let flipped = expand_move_index(&rules, flip_move_index(&rules, index, Reflection::from_index(3)));
        assert_eq!(square_name(flipped.from), "g8");
        assert_eq!(square_name(flipped.to), "f6");
    }

    #[test]
    fn test_observe_flips_legal_moves() {
        let rules = games::tictactoe().unwrap();
        let game = Game::new(rules.clone()).unwrap();
        let start = game.initial().unwrap();
        let legal: Vec<usize> = game
            .successors(&start)
            .unwrap()
            .iter()
            .map(|c| move_index(&rules, &c.last_move()))
            .collect();
        let obs = observe(&rules, &start, &legal, Reflection::from_index(1));
        assert_eq!(obs.policy_size, 9);
        assert_eq!(obs.mover, Side::White);
        let mut flipped = obs.legal.clone();
        flipped.sort();
        assert_eq!(flipped, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_record_game_labels() {
        let rules = games::tictactoe().unwrap();
        let start = Position::initial(&rules).unwrap();
        let slices = vec![
            RecordedSlice { board: vec![0; 9], mover: Side::White, results: vec![] },
            RecordedSlice { board: vec![0; 9], mover: Side::Black, results: vec![] },
        ];
        // black to move and lost
        let end = Position::new(3, vec![1, 1, 1, -1, -1, 0, 0, 0, 0], Side::Black, LastMove::NONE, 5);
        let instances = record_game(&end, Outcome::Lose, slices.clone()).unwrap();
        assert_eq!(instances[0].outcome, 1);
        assert_eq!(instances[1].outcome, -1);
        assert_eq!(instances[0].game_length, 5);

        let instances = record_game(&end, Outcome::Draw, slices.clone()).unwrap();
        assert!(instances.iter().all(|i| i.outcome == 0));

        assert!(matches!(
            record_game(&start, Outcome::Undetermined, slices),
            Err(EngineError::GameNotOver)
        ));
    }

    #[test]
    fn test_training_policy_in_frame() {
        let rules = games::tictactoe().unwrap();
        let instance = TrainingInstance {
            board: vec![0; 9],
            mover: Side::White,
            game_length: 9,
            outcome: 0,
            results: vec![SearchResult { index: 0, prob: 0.75 }, SearchResult { index: 4, prob: 0.25 }],
        };
        let policy = instance.policy(&rules, Reflection::from_index(1));
        // a1 becomes c1, b2 stays
        assert_eq!(policy[2], 0.75);
        assert_eq!(policy[4], 0.25);
        assert_eq!(policy[0], 0.0);
    }
}
