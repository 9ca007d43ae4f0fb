//! Hand-coded chess.
//!
//! Plays the piece set of [`crate::games::chess_hand_coded`] with full move
//! legality: check, castling, en passant and promotion to a queen. Castling
//! rights live on the board as two extra piece codes, an unmoved rook
//! ([`UROOK`]) and an unmoved king ([`UKING`]).
//!
//! The game is over when the side to move has no legal move (checkmate or
//! stalemate), on insufficient material, after [`CHESS_MOVE_LIMIT`] plies,
//! or when a position occurs for the third time in the hash ring.

use crate::constants::{CHESS_MOVE_LIMIT, CHESS_REPETITIONS};
use crate::engine::RulesEngine;
use crate::error::{EngineError, Result, RuleError};
use crate::outcome::Outcome;
use crate::position::{LastMove, Position, Square, parse_square, square_name};
use crate::rules::{RuleSpec, Side};

pub const PAWN: i8 = 1;
pub const KNIGHT: i8 = 2;
pub const BISHOP: i8 = 3;
pub const ROOK: i8 = 4;
pub const QUEEN: i8 = 5;
pub const KING: i8 = 6;
pub const UROOK: i8 = 7;
pub const UKING: i8 = 8;

const SIZE: i32 = 8;

const ORTHOGONAL: [Square; 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const DIAGONAL: [Square; 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_JUMPS: [Square; 8] = [
    (-1, -2),
    (1, -2),
    (-1, 2),
    (1, 2),
    (-2, -1),
    (2, -1),
    (-2, 1),
    (2, 1),
];

/// FEN letters for codes 1 to 8, white.
const FEN_PIECES: &[u8; 8] = b"PNBRQKRK";

#[inline]
fn on_board(x: i32, y: i32) -> bool {
    (0..SIZE).contains(&x) && (0..SIZE).contains(&y)
}

#[inline]
fn at(board: &[i8], x: i32, y: i32) -> i8 {
    if on_board(x, y) { board[(y * SIZE + x) as usize] } else { 0 }
}

#[inline]
fn set(board: &mut [i8], x: i32, y: i32, p: i8) {
    board[(y * SIZE + x) as usize] = p;
}

/// Whether the king at `king` is attacked along direction `dir`.
fn attacked(board: &[i8], king: Square, dir: Square) -> bool {
    // opponent pieces read positive after this
    let otp: i8 = if at(board, king.0, king.1) > 0 { -1 } else { 1 };
    let diagonal = dir.0 != 0 && dir.1 != 0;
    let mut i = 1;
    loop {
        let (x, y) = (king.0 + i * dir.0, king.1 + i * dir.1);
        if !on_board(x, y) {
            return false;
        }
        let piece = at(board, x, y) * otp;
        if piece != 0 {
            if piece < 0 {
                return false;
            }
            let adjacent = i == 1;
            return if diagonal {
                piece == QUEEN
                    || piece == BISHOP
                    || (adjacent && (piece == KING || piece == UKING))
                    || (adjacent && piece == PAWN && dir.1.signum() as i8 != otp)
            } else {
                piece == QUEEN
                    || piece == ROOK
                    || piece == UROOK
                    || (adjacent && (piece == KING || piece == UKING))
            };
        }
        i += 1;
    }
}

/// Whether the king standing on `king` is attacked. No king, no check.
pub fn in_check(board: &[i8], king: Option<Square>) -> bool {
    let Some(king) = king else {
        return false;
    };
    if ORTHOGONAL.iter().chain(&DIAGONAL).any(|&d| attacked(board, king, d)) {
        return true;
    }
    let otp: i8 = if at(board, king.0, king.1) > 0 { -1 } else { 1 };
    KNIGHT_JUMPS.iter().any(|&(dx, dy)| {
        let (x, y) = (king.0 + dx, king.1 + dy);
        on_board(x, y) && at(board, x, y) * otp == KNIGHT
    })
}

/// Square of `side`'s king, moved or not.
pub fn king_square(board: &[i8], side: Side) -> Option<Square> {
    let sign = side.sign();
    board.iter().position(|&p| p == KING * sign || p == UKING * sign).map(|i| {
        let i = i as i32;
        (i % SIZE, i / SIZE)
    })
}

/// Neither side can mate: no pawns, rooks or queens and at most one minor piece.
fn insufficient_material(board: &[i8]) -> bool {
    let mut minors = 0;
    for p in board {
        match p.abs() {
            KNIGHT | BISHOP => minors += 1,
            PAWN | ROOK | UROOK | QUEEN => return false,
            _ => {}
        }
    }
    minors <= 1
}

/// Successor generation for one position.
struct MoveGen<'a> {
    pos: &'a Position,
    board: &'a [i8],
    sign: i8,
    king: Option<Square>,
    out: Vec<Position>,
}

impl<'a> MoveGen<'a> {
    fn new(pos: &'a Position) -> Self {
        let board = pos.board();
        Self {
            pos,
            board,
            sign: pos.mover().sign(),
            king: king_square(board, pos.mover()),
            out: Vec::new(),
        }
    }

    /// Add the move if it does not leave the mover in check. Returns true
    /// only if the destination was an empty square, so sliders keep going.
    fn try_move(&mut self, from: Square, to: Square, piece: i8, king_moves: bool) -> bool {
        let ((x1, y1), (x2, y2)) = (from, to);
        if !on_board(x2, y2) {
            return false;
        }
        let orig = at(self.board, x1, y1);
        let target = at(self.board, x2, y2);
        if piece.signum() == target.signum() {
            return false;
        }

        let mut next = self.board.to_vec();
        set(&mut next, x2, y2, piece);
        set(&mut next, x1, y1, 0);

        // en passant
        if orig.abs() == PAWN && x1 != x2 && target == 0 {
            set(&mut next, x2, y1, 0);
        }

        // castling rights
        if y1 == 0 || y1 == SIZE - 1 {
            let sign = orig.signum();
            if orig.abs() == UKING {
                for corner in [0, SIZE - 1] {
                    if at(self.board, corner, y1) == UROOK * sign {
                        set(&mut next, corner, y1, ROOK * sign);
                    }
                }
            }
            if orig.abs() == UROOK
                && at(self.board, SIZE - 1 - x1, y1).abs() != UROOK
                && at(self.board, 4, y1).abs() == UKING
            {
                set(&mut next, 4, y1, KING * sign);
            }
        }

        let king = if king_moves { Some(to) } else { self.king };
        if !in_check(&next, king) {
            let last = LastMove { piece: orig, from, to };
            self.out.push(self.pos.successor(next, self.pos.mover().opponent(), last));
        }
        target == 0
    }

    fn slide(&mut self, from: Square, dirs: &[Square], reach: i32, piece: i8, king_moves: bool) {
        for &(dx, dy) in dirs {
            for i in 1..=reach {
                if !self.try_move(from, (from.0 + i * dx, from.1 + i * dy), piece, king_moves) {
                    break;
                }
            }
        }
    }

    fn pawn(&mut self, (x, y): Square) {
        let s = self.sign as i32;
        let own = at(self.board, x, y);
        let promoted = if y + s == 0 || y + s == SIZE - 1 {
            QUEEN * self.sign
        } else {
            PAWN * self.sign
        };

        if on_board(x, y + s) && at(self.board, x, y + s) == 0 {
            if (y - s) % (SIZE - 1) == 0 && at(self.board, x, y + 2 * s) == 0 {
                self.try_move((x, y), (x, y + 2 * s), own, false);
            }
            self.try_move((x, y), (x, y + s), promoted, false);
        }
        for dx in [-1, 1] {
            if at(self.board, x + dx, y + s) != 0 {
                self.try_move((x, y), (x + dx, y + s), promoted, false);
            }
        }

        let last = self.pos.last_move();
        let double_push = (last.from.1 == 1 && last.to.1 == 3) || (last.from.1 == 6 && last.to.1 == 4);
        if double_push
            && at(self.board, last.to.0, last.to.1).abs() == PAWN
            && y == last.to.1
            && (x - last.to.0).abs() == 1
        {
            self.try_move((x, y), (last.to.0, y + s), promoted, false);
        }
    }

    fn castle(&mut self, (xk, yk): Square) {
        let sign = at(self.board, xk, yk).signum();
        for (corner, dir) in [(0, -1), (SIZE - 1, 1)] {
            if at(self.board, corner, yk).abs() != UROOK {
                continue;
            }
            let clear = if dir < 0 {
                (1..xk).all(|x| at(self.board, x, yk) == 0)
            } else {
                (xk + 1..SIZE - 1).all(|x| at(self.board, x, yk) == 0)
            };
            if !clear || in_check(self.board, Some((xk, yk))) {
                continue;
            }

            // the king may not pass through check
            let mut next = self.board.to_vec();
            set(&mut next, xk, yk, 0);
            set(&mut next, xk + dir, yk, KING * sign);
            if in_check(&next, Some((xk + dir, yk))) {
                continue;
            }

            set(&mut next, xk + dir, yk, ROOK * sign);
            set(&mut next, xk + 2 * dir, yk, KING * sign);
            set(&mut next, corner, yk, 0);
            let other = SIZE - 1 - corner;
            if at(self.board, other, yk).abs() == UROOK {
                set(&mut next, other, yk, ROOK * sign);
            }
            if in_check(&next, Some((xk + 2 * dir, yk))) {
                continue;
            }
            let last = LastMove {
                piece: KING * sign,
                from: (xk, yk),
                to: (xk + 2 * dir, yk),
            };
            self.out.push(self.pos.successor(next, self.pos.mover().opponent(), last));
        }
    }

    fn generate(mut self) -> Vec<Position> {
        for i in 0..(SIZE * SIZE) {
            let from = (i % SIZE, i / SIZE);
            let p = self.board[i as usize];
            match p * self.sign {
                PAWN => self.pawn(from),
                KNIGHT => {
                    for (dx, dy) in KNIGHT_JUMPS {
                        self.try_move(from, (from.0 + dx, from.1 + dy), p, false);
                    }
                }
                BISHOP => self.slide(from, &DIAGONAL, SIZE - 1, p, false),
                ROOK | UROOK => self.slide(from, &ORTHOGONAL, SIZE - 1, ROOK * self.sign, false),
                QUEEN => {
                    self.slide(from, &ORTHOGONAL, SIZE - 1, p, false);
                    self.slide(from, &DIAGONAL, SIZE - 1, p, false);
                }
                KING | UKING => {
                    let king = KING * self.sign;
                    self.slide(from, &ORTHOGONAL, 1, king, true);
                    self.slide(from, &DIAGONAL, 1, king, true);
                    if p.abs() == UKING {
                        self.castle(from);
                    }
                }
                _ => {}
            }
        }
        self.out
    }
}

/// Chess with check, castling, en passant and FEN input/output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChessEngine;

impl ChessEngine {
    fn check_board(pos: &Position) -> Result<()> {
        if pos.size() != SIZE as usize {
            return Err(RuleError::BoardSize(pos.size()).into());
        }
        Ok(())
    }

    /// Whether the side to move is in check.
    pub fn in_check(pos: &Position) -> bool {
        in_check(pos.board(), king_square(pos.board(), pos.mover()))
    }
}

impl RulesEngine for ChessEngine {
    fn name(&self) -> &'static str {
        "chess"
    }

    fn successors(&self, _rules: &RuleSpec, pos: &Position) -> Result<Vec<Position>> {
        Self::check_board(pos)?;
        Ok(MoveGen::new(pos).generate())
    }

    fn outcome(
        &self,
        _rules: &RuleSpec,
        pos: &Position,
        no_moves: &mut dyn FnMut() -> Result<bool>,
    ) -> Result<Outcome> {
        Self::check_board(pos)?;
        if no_moves()? {
            return Ok(if Self::in_check(pos) { Outcome::Lose } else { Outcome::Draw });
        }
        if insufficient_material(pos.board())
            || pos.depth() >= CHESS_MOVE_LIMIT
            || pos.repetitions() == CHESS_REPETITIONS
        {
            return Ok(Outcome::Draw);
        }
        Ok(Outcome::Undetermined)
    }

    /// UCI notation, with a trailing `q` for promotions.
    fn move_name(&self, _rules: &RuleSpec, _parent: &Position, child: &Position) -> String {
        let m = child.last_move();
        let promoted = m.piece.abs() == PAWN && child.cell(m.to.0, m.to.1) != m.piece;
        format!(
            "{}{}{}",
            square_name(m.from),
            square_name(m.to),
            if promoted { "q" } else { "" }
        )
    }

    fn parse_position(&self, _rules: &RuleSpec, fen: &str) -> Result<Position> {
        parse_fen(fen)
    }

    fn format_position(&self, _rules: &RuleSpec, pos: &Position) -> Option<String> {
        (pos.size() == SIZE as usize).then(|| format_fen(pos))
    }
}

/// Read a FEN record. The half-move clock is ignored.
pub fn parse_fen(fen: &str) -> Result<Position> {
    let bad = |why: &str| EngineError::Parse(format!("{why} in FEN `{fen}`"));
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let placement = fields.first().ok_or_else(|| bad("missing board"))?;
    let mover = match fields.get(1).copied().unwrap_or("w") {
        "w" => Side::White,
        "b" => Side::Black,
        _ => return Err(bad("bad side to move")),
    };
    let castling = fields.get(2).copied().unwrap_or("-");
    let en_passant = fields.get(3).copied().unwrap_or("-");
    let full_move: u32 = match fields.get(5) {
        Some(n) => n.parse().map_err(|_| bad("bad move number"))?,
        None => 1,
    };

    let mut board = vec![0i8; (SIZE * SIZE) as usize];
    let rows: Vec<&str> = placement.split('/').collect();
    if rows.len() != SIZE as usize {
        return Err(bad("wrong number of ranks"));
    }
    for (y, row) in rows.iter().rev().enumerate() {
        let mut x = 0i32;
        for c in row.chars() {
            if let Some(skip) = c.to_digit(10) {
                x += skip as i32;
                continue;
            }
            let code = FEN_PIECES[..6]
                .iter()
                .position(|&f| f as char == c.to_ascii_uppercase())
                .ok_or_else(|| bad("unknown piece"))? as i8
                + 1;
            if !on_board(x, y as i32) {
                return Err(bad("rank too long"));
            }
            set(&mut board, x, y as i32, if c.is_ascii_uppercase() { code } else { -code });
            x += 1;
        }
        if x != SIZE {
            return Err(bad("rank of the wrong length"));
        }
    }

    for (flag, corner, rank) in [('K', 7, 0), ('Q', 0, 0), ('k', 7, 7), ('q', 0, 7)] {
        if castling.contains(flag) {
            let sign = if rank == 0 { 1 } else { -1 };
            let king = at(&board, 4, rank);
            if !(king == KING * sign || king == UKING * sign) || at(&board, corner, rank) != ROOK * sign {
                return Err(bad("castling rights without king and rook"));
            }
            set(&mut board, 4, rank, UKING * sign);
            set(&mut board, corner, rank, UROOK * sign);
        }
    }

    // an en passant square stands for the double push that made it, and is
    // dropped when no such pawn is there
    let last = match parse_square(en_passant) {
        Some((x, 2)) if mover == Side::Black && at(&board, x, 3) == PAWN => LastMove {
            piece: PAWN,
            from: (x, 1),
            to: (x, 3),
        },
        Some((x, 5)) if mover == Side::White && at(&board, x, 4) == -PAWN => LastMove {
            piece: -PAWN,
            from: (x, 6),
            to: (x, 4),
        },
        _ => LastMove::NONE,
    };

    let depth = full_move
        .max(1)
        .checked_mul(2)
        .and_then(|d| d.checked_sub(if mover == Side::White { 2 } else { 1 }))
        .and_then(|d| u16::try_from(d).ok())
        .ok_or_else(|| bad("bad move number"))?;
    Ok(Position::new(SIZE as usize, board, mover, last, depth))
}

/// Write a FEN record. The half-move clock is always `0`.
pub fn format_fen(pos: &Position) -> String {
    let board = pos.board();
    let mut ranks = Vec::with_capacity(SIZE as usize);
    for y in (0..SIZE).rev() {
        let mut rank = String::new();
        let mut skips = 0;
        for x in 0..SIZE {
            let p = at(board, x, y);
            if p == 0 {
                skips += 1;
                continue;
            }
            if skips > 0 {
                rank.push_str(&skips.to_string());
                skips = 0;
            }
            let c = FEN_PIECES[p.unsigned_abs() as usize - 1] as char;
            rank.push(if p > 0 { c } else { c.to_ascii_lowercase() });
        }
        if skips > 0 {
            rank.push_str(&skips.to_string());
        }
        ranks.push(rank);
    }

    let mut castling = String::new();
    for (flag, corner, rank, sign) in [('K', 7, 0, 1), ('Q', 0, 0, 1), ('k', 7, 7, -1), ('q', 0, 7, -1)] {
        if at(board, corner, rank) == UROOK * sign && at(board, 4, rank) == UKING * sign {
            castling.push(flag);
        }
    }
    if castling.is_empty() {
        castling.push('-');
    }

    let last = pos.last_move();
    let en_passant = if last.piece.abs() == PAWN && (last.to.1 - last.from.1).abs() == 2 {
        square_name((last.to.0, (last.from.1 + last.to.1) / 2))
    } else {
        "-".to_string()
    };

    let side = if pos.mover() == Side::White { "w" } else { "b" };
    let full_move = ((u32::from(pos.depth()) + 1) / 2 + u32::from(pos.mover() == Side::White)).max(1);
    format!("{} {side} {castling} {en_passant} 0 {full_move}", ranks.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Game;
    use crate::games;

    fn game() -> Game {
        Game::with_engine(games::chess_hand_coded().unwrap(), ChessEngine).unwrap()
    }

    fn board(white: &[(&str, &str)], black: &[(&str, &str)], mover: Side) -> Position {
        let rules = games::chess_hand_coded().unwrap();
        Position::setup(&rules, white, black, mover, 10).unwrap()
    }

    fn after(pos: &Position, last: LastMove) -> Position {
        Position::new(8, pos.board().to_vec(), pos.mover(), last, pos.depth())
    }

    fn moves(pos: &Position) -> Vec<String> {
        let game = game();
        let mut names: Vec<String> = game
            .successors(pos)
            .unwrap()
            .iter()
            .map(|c| format!("{}{}", square_name(c.last_move().from), square_name(c.last_move().to)))
            .collect();
        names.sort();
        names
    }

    fn play(pos: Position, line: &[&str]) -> Position {
        let game = game();
        line.iter().fold(pos, |pos, mv| {
            game.successors(&pos)
                .unwrap()
                .into_iter()
                .find(|c| game.move_name(&pos, c) == *mv)
                .unwrap_or_else(|| panic!("{mv} is not legal"))
        })
    }

    #[test]
    fn test_pawn_moves() {
        assert_eq!(moves(&board(&[("P", "a2")], &[], Side::White)), ["a2a3", "a2a4"]);
        assert_eq!(moves(&board(&[("P", "a3")], &[], Side::White)), ["a3a4"]);
        assert_eq!(moves(&board(&[("P", "a7")], &[], Side::White)), ["a7a8"]);
        assert!(moves(&board(&[("P", "a3")], &[("P", "a4")], Side::White)).is_empty());
        assert!(moves(&board(&[("P", "a3,a4")], &[("P", "a5")], Side::White)).is_empty());
        assert_eq!(
            moves(&board(&[("P", "b3")], &[("P", "a4,c4")], Side::White)),
            ["b3a4", "b3b4", "b3c4"]
        );
        assert_eq!(
            moves(&board(&[("P", "b2")], &[("P", "a3,c3")], Side::White)),
            ["b2a3", "b2b3", "b2b4", "b2c3"]
        );
        assert_eq!(
            moves(&board(&[("P", "a6,c6")], &[("P", "b7")], Side::Black)),
            ["b7a6", "b7b5", "b7b6", "b7c6"]
        );
        assert_eq!(moves(&board(&[], &[("P", "b2")], Side::Black)), ["b2b1"]);
    }

    #[test]
    fn test_en_passant() {
        let double = LastMove { piece: PAWN, from: (0, 1), to: (0, 3) };
        let pos = after(&board(&[("P", "a4")], &[("P", "b4")], Side::Black), double);
        assert_eq!(moves(&pos), ["b4a3", "b4b3"]);
        let taken = play(pos, &["b4a3"]);
        assert_eq!(taken.at(0, 3), 0);
        assert_eq!(taken.at(0, 2), -PAWN);

        let double = LastMove { piece: -PAWN, from: (1, 6), to: (1, 4) };
        let pos = after(&board(&[("P", "a5")], &[("P", "b5")], Side::White), double);
        assert_eq!(moves(&pos), ["a5a6", "a5b6"]);

        let single = LastMove { piece: PAWN, from: (0, 2), to: (0, 3) };
        let pos = after(&board(&[("P", "a4")], &[("P", "b4")], Side::Black), single);
        assert_eq!(moves(&pos), ["b4b3"]);

        let rook = LastMove { piece: ROOK, from: (0, 1), to: (0, 3) };
        let pos = after(&board(&[("R", "a4")], &[("P", "b4")], Side::Black), rook);
        assert_eq!(moves(&pos), ["b4b3"]);
    }

    #[test]
    fn test_promotion_names() {
        let game = game();
        let pos = board(&[("P", "a7"), ("K", "e1")], &[("K", "h5")], Side::White);
        let promoted = play(pos.clone(), &["a7a8q"]);
        assert_eq!(promoted.at(0, 7), QUEEN);
        let children = game.successors(&pos).unwrap();
        assert!(children.iter().any(|c| game.move_name(&pos, c) == "a7a8q"));
        assert!(children.iter().any(|c| game.move_name(&pos, c) == "e1d1"));
    }

    #[test]
    fn test_knight_moves() {
        assert_eq!(moves(&board(&[("N", "b1")], &[], Side::White)), ["b1a3", "b1c3", "b1d2"]);
        assert_eq!(
            moves(&board(&[("N", "d4")], &[], Side::White)),
            ["d4b3", "d4b5", "d4c2", "d4c6", "d4e2", "d4e6", "d4f3", "d4f5"]
        );
    }

    #[test]
    fn test_in_check() {
        let check = |black: &[(&str, &str)]| ChessEngine::in_check(&board(&[("K", "d3")], black, Side::White));
        assert!(check(&[("P", "e4")]));
        assert!(!check(&[("P", "d4")]));
        assert!(!check(&[("P", "f5")]));
        assert!(check(&[("R", "d8")]));
        assert!(!check(&[("R", "d8"), ("P", "d6")]));
        assert!(check(&[("N", "b2")]));
        assert!(check(&[("N", "c5")]));
        assert!(check(&[("B", "h7")]));
        // pawns only attack forward
        assert!(!check(&[("P", "c2")]));
    }

    #[test]
    fn test_castling() {
        assert_eq!(
            moves(&board(&[("R'", "a1"), ("K'", "d1"), ("P", "a2")], &[], Side::White)),
            ["a1b1", "a1c1", "a2a3", "a2a4", "d1b1", "d1c1", "d1c2", "d1d2", "d1e1", "d1e2"]
        );
        assert_eq!(
            moves(&board(&[("R'", "h1"), ("K'", "d1"), ("P", "h2")], &[], Side::White)),
            ["d1c1", "d1c2", "d1d2", "d1e1", "d1e2", "d1f1", "h1e1", "h1f1", "h1g1", "h2h3", "h2h4"]
        );
        assert_eq!(
            moves(&board(&[], &[("R'", "h8"), ("K'", "d8"), ("P", "h7")], Side::Black)),
            ["d8c7", "d8c8", "d8d7", "d8e7", "d8e8", "d8f8", "h7h5", "h7h6", "h8e8", "h8f8", "h8g8"]
        );
        // blocked
        assert_eq!(
            moves(&board(&[("R'", "a1"), ("K'", "d1"), ("P", "a2,d2"), ("B", "c1")], &[], Side::White)),
            ["a1b1", "a2a3", "a2a4", "c1a3", "c1b2", "d1c2", "d1e1", "d1e2", "d2d3", "d2d4"]
        );
        // the rook has moved
        assert_eq!(
            moves(&board(&[("R", "a1"), ("K'", "d1"), ("P", "a2")], &[], Side::White)),
            ["a1b1", "a1c1", "a2a3", "a2a4", "d1c1", "d1c2", "d1d2", "d1e1", "d1e2"]
        );
        // out of check
        assert_eq!(
            moves(&board(&[("R'", "a1"), ("K'", "d1"), ("P", "a2")], &[("R", "d8")], Side::White)),
            ["d1c1", "d1c2", "d1e1", "d1e2"]
        );
        // through check
        assert_eq!(
            moves(&board(&[("R'", "a1"), ("K'", "d1"), ("P", "a2")], &[("R", "c8")], Side::White)),
            ["a1b1", "a1c1", "a2a3", "a2a4", "d1d2", "d1e1", "d1e2"]
        );
        // into check
        assert_eq!(
            moves(&board(&[("R'", "a1"), ("K'", "d1"), ("P", "a2")], &[("R", "b8")], Side::White)),
            ["a1b1", "a1c1", "a2a3", "a2a4", "d1c1", "d1c2", "d1d2", "d1e1", "d1e2"]
        );
    }

    #[test]
    fn test_castling_moves_both_pieces() {
        let game = game();
        let start = game.initial().unwrap();
        let pos = play(start, &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "e1g1"]);
        assert_eq!(pos.at(6, 0), KING);
        assert_eq!(pos.at(5, 0), ROOK);
        assert_eq!(pos.at(7, 0), 0);
        // the other rook lost its rights too
        assert_eq!(pos.at(0, 0), ROOK);
        assert_eq!(format_fen(&pos), "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 b kq - 0 4");
    }

    #[test]
    fn test_checkmate_and_stalemate() {
        let game = game();
        let mate = board(
            &[("K", "d1"), ("B", "a2,e5"), ("R", "b7")],
            &[("K", "g8"), ("P", "g6,h6,g5"), ("B", "f8")],
            Side::Black,
        );
        assert!(game.successors(&mate).unwrap().is_empty());
        assert_eq!(game.outcome(&mate).unwrap(), Outcome::Lose);

        let stalemate = board(&[("K", "a1")], &[("K", "h8"), ("Q", "c2")], Side::White);
        assert!(game.successors(&stalemate).unwrap().is_empty());
        assert_eq!(game.outcome(&stalemate).unwrap(), Outcome::Draw);
    }

    #[test]
    fn test_insufficient_material() {
        let game = game();
        let outcome = |white: &[(&str, &str)]| {
            game.outcome(&board(white, &[("K", "h8")], Side::White)).unwrap()
        };
        assert_eq!(outcome(&[("K", "a1")]), Outcome::Draw);
        assert_eq!(outcome(&[("K", "a1"), ("N", "d4")]), Outcome::Draw);
        assert_eq!(outcome(&[("K", "a1"), ("B", "d4")]), Outcome::Draw);
        assert_eq!(outcome(&[("K", "a1"), ("B", "d4,d3")]), Outcome::Undetermined);
        assert_eq!(outcome(&[("K", "a1"), ("N", "d4,d3")]), Outcome::Undetermined);
        assert_eq!(outcome(&[("K", "a1"), ("N", "d4"), ("B", "d3")]), Outcome::Undetermined);
        assert_eq!(outcome(&[("K", "a1"), ("Q", "c7")]), Outcome::Undetermined);
        assert_eq!(outcome(&[("K", "a1"), ("P", "c2")]), Outcome::Undetermined);
    }

    #[test]
    fn test_threefold_repetition() {
        let game = game();
        let start = game.initial().unwrap();
        let pos = play(start, &["b1a3", "b8a6", "a3b1", "a6b8"]);
        assert_eq!(game.outcome(&pos).unwrap(), Outcome::Undetermined);
        let pos = play(pos, &["b1a3", "b8a6", "a3b1", "a6b8"]);
        assert_eq!(game.outcome(&pos).unwrap(), Outcome::Draw);
    }

    #[test]
    fn test_move_limit() {
        let game = game();
        let pos = Position::new(8, game.initial().unwrap().board().to_vec(), Side::White, LastMove::NONE, 200);
        assert_eq!(game.outcome(&pos).unwrap(), Outcome::Draw);
    }

    #[test]
    fn test_opening_move_count() {
        let game = game();
        let start = game.initial().unwrap();
        let children = game.successors(&start).unwrap();
        assert_eq!(children.len(), 20);
        let replies: usize = children.iter().map(|c| game.successors(c).unwrap().len()).sum();
        assert_eq!(replies, 400);
    }

    #[test]
    fn test_fen_round_trip() {
        let start = game().initial().unwrap();
        let fen = format_fen(&start);
        assert_eq!(fen, "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(parse_fen(&fen).unwrap().board(), start.board());

        let fen = "b2qk2r/5ppp/3bpn2/1pp2n2/8/2PP1N2/1P2BPPP/1NBQ1RK1 w k - 0 15";
        let pos = parse_fen(fen).unwrap();
        assert_eq!(pos.depth(), 28);
        assert_eq!(pos.mover(), Side::White);
        assert_eq!(pos.at(4, 7), -UKING);
        assert_eq!(pos.at(7, 7), -UROOK);
        assert_eq!(format_fen(&pos), fen);
    }

    #[test]
    fn test_fen_en_passant_square() {
        let pos = parse_fen("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1").unwrap();
        assert_eq!(pos.depth(), 1);
        assert!(moves(&pos).contains(&"d4e3".to_string()));
        assert_eq!(format_fen(&pos), "4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1");
    }

    #[test]
    fn test_bad_fen() {
        assert!(parse_fen("").is_err());
        assert!(parse_fen("8/8/8 w - - 0 1").is_err());
        assert!(parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w - - 0 1").is_err());
        assert!(parse_fen("8/8/8/8/8/8/8/8 x - - 0 1").is_err());
        // ranks must cover exactly eight files
        assert!(parse_fen("4k3/8/8/8/8/8/8/9 w - - 0 1").is_err());
        assert!(parse_fen("4k3/8/8/8/8/8/8/44K w - - 0 1").is_err());
        assert!(parse_fen("4k3/8/8/8/8/8/8/4K2 w - - 0 1").is_err());
    }

    #[test]
    fn test_fen_move_number_out_of_range() {
        let err = parse_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 40000").unwrap_err();
        assert!(err.to_string().contains("bad move number"));
        assert!(parse_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 4294967295").is_err());
        assert!(parse_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 -3").is_err());
        let pos = parse_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 32768").unwrap();
        assert_eq!(pos.depth(), 65535);
        assert_eq!(format_fen(&pos), "4k3/8/8/8/8/8/8/4K3 b - - 0 32768");
    }

    #[test]
    fn test_fen_castling_needs_king_and_rook() {
        let err = parse_fen("8/8/8/8/8/8/8/8 w KQkq - 0 1").unwrap_err();
        assert!(err.to_string().contains("castling rights"));
        // a queen on e1 is not a king
        assert!(parse_fen("4k3/8/8/8/8/8/8/R3Q2R w K - 0 1").is_err());
        // a black rook in white's corner does not count
        assert!(parse_fen("4k3/8/8/8/8/8/8/4K2r w K - 0 1").is_err());

        let pos = parse_fen("r3k3/8/8/8/8/8/8/4K2R w Kq - 0 1").unwrap();
        assert_eq!(format_fen(&pos), "r3k3/8/8/8/8/8/8/4K2R w Kq - 0 1");
        assert_eq!(pos.board().iter().filter(|&&p| p != 0).count(), 4);
    }

    #[test]
    fn test_fen_en_passant_without_pawn_is_dropped() {
        let pos = parse_fen("4k3/8/8/8/8/8/8/4K3 b - e3 0 1").unwrap();
        assert_eq!(pos.last_move(), LastMove::NONE);
        assert_eq!(format_fen(&pos), "4k3/8/8/8/8/8/8/4K3 b - - 0 1");
    }
}
