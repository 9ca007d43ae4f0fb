//! Template-driven move generation.
//!
//! For every candidate mover (a piece of the side to move, or a virtual piece
//! just off the board in [`MoveSource::Ends`] mode) each move definition of
//! its type is interpreted as follows:
//!
//! 1. fold the templates left to right into a set of target squares
//! 2. drop targets off the board
//! 3. check the landing policy against the target's occupant
//! 4. check the jumping policy against every square strictly between origin
//!    and target, when the two are on one row, column or diagonal
//! 5. build the successor position
//!
//! Successors are bucketed by move priority and only the highest bucket is
//! returned.

use std::collections::BTreeMap;

use log::trace;

use crate::error::RuleError;
use crate::position::{LastMove, Position, Square};
use crate::rules::{
    Disposition, MoveDef, MoveSource, Occupant, Pattern, RuleSpec, SetOp, Side, Template,
};

/// All offsets within Chebyshev distance `size` of the origin, origin excluded.
///
/// Generated as four rotated quadrants so the pattern has no duplicates.
pub fn square(size: i32) -> Vec<Square> {
    let mut out = Vec::with_capacity((4 * size * (size + 1)).max(0) as usize);
    for i in 0..=size {
        for j in 1..=size {
            out.push((i, j));
            out.push((-j, i));
            out.push((-i, -j));
            out.push((j, -i));
        }
    }
    out
}

/// Orthogonal rays of length `size`.
pub fn plus(size: i32) -> Vec<Square> {
    square(size).into_iter().filter(|&(x, y)| x == 0 || y == 0).collect()
}

/// Diagonal rays of length `size`.
pub fn cross(size: i32) -> Vec<Square> {
    square(size).into_iter().filter(|&(x, y)| x.abs() == y.abs()).collect()
}

/// The half of [`square`] strictly ahead of the mover.
pub fn forward(size: i32, sign: i32) -> Vec<Square> {
    square(size).into_iter().filter(|&(_, y)| y * sign > 0).collect()
}

/// Direction of "forward" for `side` under the rule set's symmetry.
pub fn forward_sign(rules: &RuleSpec, side: Side) -> i32 {
    if side == Side::Black && rules.symmetry.flips_black() { -1 } else { 1 }
}

/// Absolute squares produced by one template for a piece at `origin`.
///
/// Every pattern is relative to the origin except `rank`, which names a fixed
/// row counted from the mover's back edge.
pub fn template_squares(rules: &RuleSpec, side: Side, origin: Square, t: &Template) -> Vec<Square> {
    let board = rules.board_size as i32;
    let size = if t.size == 0 { board } else { t.size as i32 };
    let sign = forward_sign(rules, side);
    let offsets = match t.pattern {
        Pattern::Square => square(size),
        Pattern::Plus => plus(size),
        Pattern::Cross => cross(size),
        Pattern::Forward => forward(size, sign),
        Pattern::Backward => forward(size, -sign),
        Pattern::Pass => vec![(0, 0)],
        Pattern::Rank => {
            let row = if sign > 0 { size - 1 } else { board - size };
            return (0..board).map(|x| (x, row)).collect();
        }
    };
    offsets
        .into_iter()
        .map(|(dx, dy)| (origin.0 + dx, origin.1 + dy))
        .collect()
}

/// Fold a move's templates into an ordered, duplicate-free target set.
pub fn target_squares(rules: &RuleSpec, side: Side, origin: Square, mv: &MoveDef) -> Vec<Square> {
    let mut targets: Vec<Square> = Vec::new();
    for t in &mv.templates {
        let squares = template_squares(rules, side, origin, t);
        match t.op {
            SetOp::Union => {
                for sq in squares {
                    if !targets.contains(&sq) {
                        targets.push(sq);
                    }
                }
            }
            SetOp::Intersect => targets.retain(|sq| squares.contains(sq)),
            SetOp::Subtract => targets.retain(|sq| !squares.contains(sq)),
        }
    }
    targets
}

/// Squares strictly between `from` and `to`, in order, if the two are on a
/// common row, column or diagonal. Otherwise nothing is jumped.
pub fn jumped_squares(from: Square, to: Square) -> Vec<Square> {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    if dx != 0 && dy != 0 && dx.abs() != dy.abs() {
        return Vec::new();
    }
    let steps = dx.abs().max(dy.abs());
    (1..steps)
        .map(|i| (from.0 + dx.signum() * i, from.1 + dy.signum() * i))
        .collect()
}

/// Successor positions in the highest priority class, or nothing if the side
/// to move has no legal move.
pub fn successors(rules: &RuleSpec, pos: &Position) -> Result<Vec<Position>, RuleError> {
    let mut buckets: BTreeMap<i32, Vec<Position>> = BTreeMap::new();
    let side = pos.mover();
    let n = rules.board_size as i32;

    match rules.move_source {
        MoveSource::PiecesOnBoard => {
            for y in 0..n {
                for x in 0..n {
                    let p = pos.at(x, y);
                    if p != 0 && p.signum() == side.sign() {
                        collect(rules, pos, &mut buckets, (x, y), p)?;
                    }
                }
            }
        }
        MoveSource::Ends => {
            for x in 0..n {
                for code in 1..=rules.pieces.len() as i8 {
                    let p = code * side.sign();
                    collect(rules, pos, &mut buckets, (x, -1), p)?;
                    collect(rules, pos, &mut buckets, (x, n), p)?;
                }
            }
        }
    }

    let moves = buckets.pop_last().map(|(_, v)| v).unwrap_or_default();
    trace!("{} successors at depth {}", moves.len(), pos.depth());
    Ok(moves)
}

fn collect(
    rules: &RuleSpec,
    pos: &Position,
    buckets: &mut BTreeMap<i32, Vec<Position>>,
    origin: Square,
    piece: i8,
) -> Result<(), RuleError> {
    let def = rules.piece_def(piece)?;
    for mv in &def.moves {
        for target in target_squares(rules, pos.mover(), origin, mv) {
            if !pos.on_board(target.0, target.1) {
                continue;
            }
            if !landing_allowed(pos, target, piece, mv) || !jumping_allowed(pos, origin, target, piece, mv) {
                continue;
            }
            let next = apply_move(rules, pos, origin, target, piece, mv)?;
            buckets.entry(mv.priority).or_default().push(next);
        }
    }
    Ok(())
}

#[inline]
fn landing_allowed(pos: &Position, to: Square, piece: i8, mv: &MoveDef) -> bool {
    let occupant = Occupant::classify(pos.at(to.0, to.1), piece);
    mv.land.get(occupant) != Disposition::Disallowed
}

fn jumping_allowed(pos: &Position, from: Square, to: Square, piece: i8, mv: &MoveDef) -> bool {
    jumped_squares(from, to).into_iter().all(|(x, y)| {
        let occupant = Occupant::classify(pos.cell(x, y), piece);
        mv.jump.get(occupant) != Disposition::Disallowed
    })
}

/// Build the position after `piece` moves from `from` to `to` under `mv`.
/// The move must already have passed the landing and jumping checks.
fn apply_move(
    rules: &RuleSpec,
    pos: &Position,
    from: Square,
    to: Square,
    piece: i8,
    mv: &MoveDef,
) -> Result<Position, RuleError> {
    let size = rules.board_size;
    let idx = |(x, y): Square| y as usize * size + x as usize;
    let from_on_board = pos.on_board(from.0, from.1);
    let mut board = pos.board().to_vec();

    // jumped squares first, origin to target
    for (x, y) in jumped_squares(from, to) {
        if !pos.on_board(x, y) {
            continue;
        }
        let jumped = pos.at(x, y);
        match (Occupant::classify(jumped, piece), mv.jump.own, mv.jump.opponent) {
            (Occupant::Own, Disposition::Capture, _) => board[idx((x, y))] = 0,
            (Occupant::Opponent, _, Disposition::Capture) => board[idx((x, y))] = 0,
            (Occupant::Opponent, _, Disposition::Impress) => board[idx((x, y))] = -jumped,
            _ => {}
        }
    }

    let target = pos.at(to.0, to.1);
    let def = rules.piece_def(piece)?;
    match Occupant::classify(target, piece) {
        Occupant::Empty => match mv.land.none {
            Disposition::Allowed => {
                board[idx(to)] = piece;
                if from_on_board {
                    board[idx(from)] = 0;
                }
            }
            Disposition::Deploy => board[idx(to)] = piece,
            _ => {
                return Err(RuleError::AmbiguousLanding {
                    piece: def.name.clone(),
                    class: Occupant::Empty.label(),
                });
            }
        },
        occupant => match mv.land.get(occupant) {
            Disposition::Swap => {
                if !from_on_board {
                    return Err(RuleError::VirtualSwap(def.name.clone()));
                }
                board[idx(from)] = target;
                board[idx(to)] = piece;
            }
            Disposition::Capture => {
                board[idx(to)] = piece;
                if from_on_board {
                    board[idx(from)] = 0;
                }
            }
            Disposition::Stay => {}
            _ => {
                return Err(RuleError::AmbiguousLanding {
                    piece: def.name.clone(),
                    class: occupant.label(),
                });
            }
        },
    }

    let side = pos.mover();
    if let Some(name) = &mv.exchange {
        let code = rules
            .piece_code(name)
            .ok_or_else(|| RuleError::UnknownPiece(name.clone()))?;
        board[idx(to)] = code * side.sign();
    }

    let mover = if mv.continues { side } else { side.opponent() };
    Ok(pos.successor(board, mover, LastMove { piece, from, to }))
}
