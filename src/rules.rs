//! Declarative rule sets.
//!
//! A [`RuleSpec`] describes a game completely: the board, the piece types and
//! how each of them moves, and the conditions that end the game. Rule sets are
//! built in code (see [`crate::games`]) and never mutated once a game starts.
//!
//! Move targets are described by [`Template`]s written in a compact token
//! form, e.g. `"+forward_1"`, `"=plus_0"`, `"-rank_8"` or `"+pass"`: the first
//! character is the set operation and the size `0` stands for the board size.

use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_BOARD_SIZE, MAX_PIECE_TYPES};
use crate::error::RuleError;
use crate::position::parse_square;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Sign of this side's piece codes on the board.
    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Side::White => 1,
            Side::Black => -1,
        }
    }

    #[inline]
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// The owner of a piece code, `None` for an empty square.
    pub fn of(code: i8) -> Option<Side> {
        match code.signum() {
            1 => Some(Side::White),
            -1 => Some(Side::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "white"),
            Side::Black => write!(f, "black"),
        }
    }
}

/// How black's frame of reference relates to white's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    /// Both sides share one frame: "forward" is +y for everyone.
    None,
    /// Black's frame is white's rotated by 180 degrees.
    Rotate,
    /// Black's frame is white's flipped top to bottom (columns are kept).
    Mirror,
}

impl Symmetry {
    /// Whether black's forward direction and back rank are flipped.
    pub fn flips_black(self) -> bool {
        !matches!(self, Symmetry::None)
    }
}

/// Where moving pieces come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    /// Every piece of the side to move on the board.
    PiecesOnBoard,
    /// Virtual pieces just off the bottom and top edges, one per column and type.
    Ends,
}

/// What happens to a square, or whether the move is allowed at all, given what
/// occupies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Disallowed,
    Allowed,
    Capture,
    Swap,
    Stay,
    Deploy,
    Impress,
}

/// Occupant class of a square, relative to the moving piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Empty,
    Own,
    Opponent,
}

impl Occupant {
    /// Classify `code` relative to the moving piece `mover`.
    pub fn classify(code: i8, mover: i8) -> Occupant {
        if code == 0 {
            Occupant::Empty
        } else if code.signum() == mover.signum() {
            Occupant::Own
        } else {
            Occupant::Opponent
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Occupant::Empty => "an empty",
            Occupant::Own => "its own",
            Occupant::Opponent => "an opponent",
        }
    }
}

/// One disposition per occupant class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub none: Disposition,
    pub own: Disposition,
    pub opponent: Disposition,
}

impl Policy {
    pub const fn new(none: Disposition, own: Disposition, opponent: Disposition) -> Self {
        Self { none, own, opponent }
    }

    /// The same disposition for every class.
    pub const fn uniform(d: Disposition) -> Self {
        Self::new(d, d, d)
    }

    #[inline]
    pub fn get(&self, occupant: Occupant) -> Disposition {
        match occupant {
            Occupant::Empty => self.none,
            Occupant::Own => self.own,
            Occupant::Opponent => self.opponent,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::uniform(Disposition::Disallowed)
    }
}

/// Geometric point generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Square,
    Plus,
    Cross,
    Forward,
    Backward,
    Rank,
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    Intersect,
    Subtract,
}

/// A pattern combined into the running target set with a set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub op: SetOp,
    pub pattern: Pattern,
    /// Pattern size; `0` means the board size.
    pub size: usize,
}

impl FromStr for Template {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || RuleError::Template(s.to_string());
        let mut chars = s.chars();
        let op = match chars.next() {
            Some('+') => SetOp::Union,
            Some('=') => SetOp::Intersect,
            Some('-') => SetOp::Subtract,
            _ => return Err(bad()),
        };
        let body = chars.as_str();
        let (name, size) = match body.split_once('_') {
            Some((name, size)) => (name, size.parse::<usize>().map_err(|_| bad())?),
            None => (body, 0),
        };
        let pattern = match name {
            "square" => Pattern::Square,
            "plus" => Pattern::Plus,
            "cross" => Pattern::Cross,
            "forward" => Pattern::Forward,
            "backward" => Pattern::Backward,
            "rank" => Pattern::Rank,
            "pass" => Pattern::Pass,
            _ => return Err(bad()),
        };
        Ok(Template { op, pattern, size })
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            SetOp::Union => '+',
            SetOp::Intersect => '=',
            SetOp::Subtract => '-',
        };
        let name = match self.pattern {
            Pattern::Square => "square",
            Pattern::Plus => "plus",
            Pattern::Cross => "cross",
            Pattern::Forward => "forward",
            Pattern::Backward => "backward",
            Pattern::Rank => "rank",
            Pattern::Pass => return write!(f, "{op}pass"),
        };
        write!(f, "{op}{name}_{}", self.size)
    }
}

/// One way a piece type may move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveDef {
    pub templates: Vec<Template>,
    pub land: Policy,
    pub jump: Policy,
    /// Piece the mover turns into after landing.
    pub exchange: Option<String>,
    /// The same side moves again afterwards.
    pub continues: bool,
    pub priority: i32,
}

impl MoveDef {
    /// Parse a move from template tokens. Landing and jumping start out
    /// disallowed everywhere.
    pub fn new(templates: &[&str]) -> Result<Self, RuleError> {
        let templates = templates
            .iter()
            .map(|t| t.parse())
            .collect::<Result<Vec<Template>, _>>()?;
        Ok(Self {
            templates,
            land: Policy::default(),
            jump: Policy::default(),
            exchange: None,
            continues: false,
            priority: 0,
        })
    }

    pub fn land(mut self, land: Policy) -> Self {
        self.land = land;
        self
    }

    pub fn jump(mut self, jump: Policy) -> Self {
        self.jump = jump;
        self
    }

    pub fn exchange(mut self, piece: &str) -> Self {
        self.exchange = Some(piece.to_string());
        self
    }

    pub fn continues(mut self) -> Self {
        self.continues = true;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A piece type.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceSpec {
    pub name: String,
    /// Fewer surviving pieces than this ends the game (see [`Condition::KeyPiecesCaptured`]).
    pub min: usize,
    /// White's starting squares; black's are mirrored.
    pub placements: Vec<(i32, i32)>,
    pub moves: Vec<MoveDef>,
}

impl PieceSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            min: 0,
            placements: Vec::new(),
            moves: Vec::new(),
        }
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Add starting squares in algebraic form (`"a1"`, `"d4"`).
    pub fn at(mut self, squares: &[&str]) -> Result<Self, RuleError> {
        for sq in squares {
            let xy = parse_square(sq).ok_or_else(|| RuleError::Placement {
                x: -1,
                y: -1,
                reason: "unreadable square",
            })?;
            self.placements.push(xy);
        }
        Ok(self)
    }

    pub fn moves(mut self, moves: Vec<MoveDef>) -> Self {
        self.moves = moves;
        self
    }
}

/// Game-ending conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    NoLegalMove,
    MoveLimit,
    BoardFull,
    KeyPiecesCaptured,
    NoPiecesOnBoard,
    NInARow,
    RepeatedPosition,
}

/// How a matched condition is scored, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Win,
    Loss,
    Draw,
    CountLivePieces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    pub condition: Condition,
    pub param: u32,
    pub decision: Decision,
}

impl Termination {
    pub const fn new(condition: Condition, param: u32, decision: Decision) -> Self {
        Self { condition, param, decision }
    }
}

/// A complete game description.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub name: String,
    pub board_size: usize,
    pub symmetry: Symmetry,
    pub move_source: MoveSource,
    /// Piece code `i + 1` refers to `pieces[i]`; `0` is an empty square.
    pub pieces: Vec<PieceSpec>,
    /// Checked in order; the first match decides the game.
    pub termination: Vec<Termination>,
}

impl RuleSpec {
    pub fn new(name: &str, board_size: usize, symmetry: Symmetry, move_source: MoveSource) -> Self {
        Self {
            name: name.to_string(),
            board_size,
            symmetry,
            move_source,
            pieces: Vec::new(),
            termination: Vec::new(),
        }
    }

    pub fn piece(mut self, piece: PieceSpec) -> Self {
        self.pieces.push(piece);
        self
    }

    pub fn ends_when(mut self, condition: Condition, param: u32, decision: Decision) -> Self {
        self.termination.push(Termination::new(condition, param, decision));
        self
    }

    /// Number of squares on the board.
    #[inline]
    pub fn area(&self) -> usize {
        self.board_size * self.board_size
    }

    /// The definition behind a (signed) piece code.
    pub fn piece_def(&self, code: i8) -> Result<&PieceSpec, RuleError> {
        let idx = code.unsigned_abs() as usize;
        idx.checked_sub(1)
            .and_then(|i| self.pieces.get(i))
            .ok_or(RuleError::UnknownCode(code))
    }

    /// Unsigned code of the piece called `name`.
    pub fn piece_code(&self, name: &str) -> Option<i8> {
        self.pieces
            .iter()
            .position(|p| p.name == name)
            .map(|i| (i + 1) as i8)
    }

    /// Check the rule set for structural errors.
    ///
    /// Only checks that do not depend on the position: the landing policy
    /// must say what happens to every occupant class a move can reach, and
    /// virtual pieces may not swap.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.board_size == 0 || self.board_size > MAX_BOARD_SIZE {
            return Err(RuleError::BoardSize(self.board_size));
        }
        if self.pieces.len() > MAX_PIECE_TYPES {
            return Err(RuleError::TooManyPieces(self.pieces.len()));
        }
        for (i, piece) in self.pieces.iter().enumerate() {
            if self.pieces[..i].iter().any(|p| p.name == piece.name) {
                return Err(RuleError::UnknownPiece(format!("{} (declared twice)", piece.name)));
            }
            for mv in &piece.moves {
                self.validate_move(piece, mv)?;
            }
        }
        Ok(())
    }

    fn validate_move(&self, piece: &PieceSpec, mv: &MoveDef) -> Result<(), RuleError> {
        use Disposition::*;

        if let Some(name) = &mv.exchange {
            if self.piece_code(name).is_none() {
                return Err(RuleError::UnknownPiece(name.clone()));
            }
        }
        if !matches!(mv.land.none, Disallowed | Allowed | Deploy) {
            return Err(RuleError::AmbiguousLanding {
                piece: piece.name.clone(),
                class: Occupant::Empty.label(),
            });
        }
        for occupant in [Occupant::Own, Occupant::Opponent] {
            let d = mv.land.get(occupant);
            if !matches!(d, Disallowed | Capture | Swap | Stay) {
                return Err(RuleError::AmbiguousLanding {
                    piece: piece.name.clone(),
                    class: occupant.label(),
                });
            }
            if d == Swap && self.move_source == MoveSource::Ends {
                return Err(RuleError::VirtualSwap(piece.name.clone()));
            }
        }
        Ok(())
    }
}
