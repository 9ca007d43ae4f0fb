//! Board positions.
//!
//! A [`Position`] is a board snapshot plus the metadata move generation and
//! outcome evaluation need:
//! - the side to move and the move that produced the position
//! - the ply depth, which grows by exactly one per transition
//! - a ring of the last [`HISTORY_LEN`] board hashes for repetition checks
//!
//! Boards are flat arrays of signed piece codes indexed by `y * size + x`,
//! where the sign is the owner and `0` is an empty square. Squares are
//! written in algebraic form: `a1` is `(0, 0)`.

use std::fmt::Write;

use crate::constants::HISTORY_LEN;
use crate::error::RuleError;
use crate::rules::{RuleSpec, Side, Symmetry};

/// Coordinates of a square; off-board values denote virtual squares.
pub type Square = (i32, i32);

/// Origin used for pieces that materialize from off the board.
pub const OFF_BOARD: Square = (-1, -1);

/// The move that produced a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastMove {
    /// Signed code of the piece that moved.
    pub piece: i8,
    pub from: Square,
    pub to: Square,
}

impl LastMove {
    /// Marker for a position that no move produced.
    pub const NONE: LastMove = LastMove {
        piece: 0,
        from: OFF_BOARD,
        to: OFF_BOARD,
    };
}

/// A board snapshot. Immutable once built; successors are new positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    board: Vec<i8>,
    size: usize,
    mover: Side,
    last: LastMove,
    depth: u16,
    history: [u64; HISTORY_LEN],
}

impl Position {
    /// Build a position from raw parts with a fresh history ring.
    pub fn new(size: usize, board: Vec<i8>, mover: Side, last: LastMove, depth: u16) -> Self {
        debug_assert_eq!(board.len(), size * size);
        let mut pos = Position {
            board,
            size,
            mover,
            last,
            depth,
            history: [0; HISTORY_LEN],
        };
        pos.history[pos.slot()] = board_hash(&pos.board);
        pos
    }

    /// The starting position of a rule set.
    ///
    /// White's pieces go on their placement squares. Black's are mirrored
    /// across the middle row, and also across the middle column when the
    /// board is rotationally symmetric.
    pub fn initial(rules: &RuleSpec) -> Result<Self, RuleError> {
        let size = rules.board_size;
        let n = size as i32;
        let mut board = vec![0i8; size * size];
        for (i, piece) in rules.pieces.iter().enumerate() {
            let code = (i + 1) as i8;
            for &(x, y) in &piece.placements {
                let ox = if rules.symmetry == Symmetry::Rotate {
                    n - 1 - x
                } else {
                    x
                };
                let oy = n - 1 - y;
                place(&mut board, size, (x, y), code)?;
                place(&mut board, size, (ox, oy), -code)?;
            }
        }
        Ok(Position::new(size, board, Side::White, LastMove::NONE, 0))
    }

    /// Build an ad-hoc position from piece names and square lists.
    ///
    /// ```
    /// use tabula::games;
    /// use tabula::position::Position;
    /// use tabula::rules::Side;
    ///
    /// let rules = games::chess().unwrap();
    /// let pos = Position::setup(&rules, &[("P", "a2,b2")], &[("K", "e8")], Side::White, 0).unwrap();
    /// assert_eq!(pos.at(0, 1), 1);
    /// assert_eq!(pos.at(4, 7), -6);
    /// ```
    pub fn setup(
        rules: &RuleSpec,
        white: &[(&str, &str)],
        black: &[(&str, &str)],
        mover: Side,
        depth: u16,
    ) -> Result<Self, RuleError> {
        let size = rules.board_size;
        let mut board = vec![0i8; size * size];
        for (pieces, sign) in [(white, 1i8), (black, -1i8)] {
            for (name, squares) in pieces {
                let code = rules
                    .piece_code(name)
                    .ok_or_else(|| RuleError::UnknownPiece(name.to_string()))?;
                for sq in squares.split(',').filter(|s| !s.is_empty()) {
                    let xy = parse_square(sq.trim()).ok_or(RuleError::Placement {
                        x: -1,
                        y: -1,
                        reason: "unreadable square",
                    })?;
                    place(&mut board, size, xy, code * sign)?;
                }
            }
        }
        Ok(Position::new(size, board, mover, LastMove::NONE, depth))
    }

    /// The position reached by one move from this one.
    pub fn successor(&self, board: Vec<i8>, mover: Side, last: LastMove) -> Position {
        let mut next = Position {
            board,
            size: self.size,
            mover,
            last,
            depth: self.depth.saturating_add(1),
            history: self.history,
        };
        next.history[next.slot()] = board_hash(&next.board);
        next
    }

    #[inline]
    fn slot(&self) -> usize {
        self.depth as usize % HISTORY_LEN
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn board(&self) -> &[i8] {
        &self.board
    }

    #[inline]
    pub fn mover(&self) -> Side {
        self.mover
    }

    #[inline]
    pub fn last_move(&self) -> LastMove {
        self.last
    }

    #[inline]
    pub fn depth(&self) -> u16 {
        self.depth
    }

    #[inline]
    pub fn history(&self) -> &[u64; HISTORY_LEN] {
        &self.history
    }

    /// Hash of the current board.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.history[self.slot()]
    }

    /// How many entries of the history ring match the current board.
    pub fn repetitions(&self) -> usize {
        let current = self.hash();
        self.history.iter().filter(|&&h| h == current).count()
    }

    #[inline]
    pub fn on_board(&self, x: i32, y: i32) -> bool {
        let n = self.size as i32;
        x >= 0 && y >= 0 && x < n && y < n
    }

    /// Piece code at an on-board square.
    #[inline]
    pub fn at(&self, x: i32, y: i32) -> i8 {
        self.board[y as usize * self.size + x as usize]
    }

    /// Piece code at any square; off-board squares read as empty.
    #[inline]
    pub fn cell(&self, x: i32, y: i32) -> i8 {
        if self.on_board(x, y) { self.at(x, y) } else { 0 }
    }

    /// Per-type piece counts for white and black, indexed by code.
    pub fn piece_counts(&self, piece_types: usize) -> (Vec<usize>, Vec<usize>) {
        let mut white = vec![0; piece_types + 1];
        let mut black = vec![0; piece_types + 1];
        for &p in &self.board {
            let idx = p.unsigned_abs() as usize;
            if idx > piece_types {
                continue;
            }
            if p > 0 {
                white[idx] += 1;
            } else if p < 0 {
                black[idx] += 1;
            }
        }
        (white, black)
    }

    pub fn empty_cells(&self) -> usize {
        self.board.iter().filter(|&&p| p == 0).count()
    }

    /// Text diagram with rank 1 at the bottom. White pieces use the first
    /// letter of their name in upper case, black pieces in lower case.
    pub fn render(&self, rules: &RuleSpec) -> String {
        let mut out = String::new();
        for y in (0..self.size as i32).rev() {
            let _ = write!(out, "{:>2} ", y + 1);
            for x in 0..self.size as i32 {
                let p = self.at(x, y);
                let c = match rules.piece_def(p) {
                    Ok(def) => {
                        let c = def.name.chars().next().unwrap_or('?');
                        if p > 0 { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() }
                    }
                    Err(_) if p == 0 => '.',
                    Err(_) => '?',
                };
                out.push(' ');
                out.push(c);
            }
            out.push('\n');
        }
        out.push_str("   ");
        for x in 0..self.size {
            out.push(' ');
            out.push((b'a' + x as u8) as char);
        }
        let _ = write!(out, "  {} to move", self.mover);
        out
    }
}

fn place(board: &mut [i8], size: usize, (x, y): Square, code: i8) -> Result<(), RuleError> {
    let n = size as i32;
    if x < 0 || y < 0 || x >= n || y >= n {
        return Err(RuleError::Placement { x, y, reason: "off the board" });
    }
    let cell = &mut board[y as usize * size + x as usize];
    if *cell != 0 {
        return Err(RuleError::Placement { x, y, reason: "square already occupied" });
    }
    *cell = code;
    Ok(())
}

/// 64-bit FNV-1a over the board bytes.
pub fn board_hash(board: &[i8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    board.iter().fold(OFFSET, |h, &b| (h ^ b as u8 as u64).wrapping_mul(PRIME))
}

/// Parse an algebraic square such as `a1` or `h8`.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = chars.next()?.to_ascii_lowercase();
    if !file.is_ascii_lowercase() {
        return None;
    }
    let rank: i32 = chars.as_str().parse().ok()?;
    if rank < 1 {
        return None;
    }
    Some(((file as u8 - b'a') as i32, rank - 1))
}

/// Algebraic name of an on-board square.
pub fn square_name((x, y): Square) -> String {
    if x < 0 || y < 0 || x >= 26 {
        return "-".to_string();
    }
    format!("{}{}", (b'a' + x as u8) as char, y + 1)
}
