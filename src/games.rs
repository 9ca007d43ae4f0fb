//! Built-in rule sets.
//!
//! - [`tictactoe`] - 3x3, pieces dropped anywhere, three in a row wins
//! - [`connect4`] - 7x7, pieces dropped from the bottom edge, four in a row wins
//! - [`othello`] - 8x8, outflanked pieces are impressed, most pieces wins
//! - [`chess`] - 8x8 chess expressed with templates; capturing the king wins
//! - [`chess_hand_coded`] - the piece set played by [`crate::chess::ChessEngine`]

use crate::error::RuleError;
use crate::rules::{
    Condition, Decision, Disposition, MoveDef, MoveSource, PieceSpec, Policy, RuleSpec, Symmetry,
};

use Disposition::{Allowed, Capture, Deploy, Disallowed, Impress, Stay};

/// Land on empty squares only.
const QUIET: Policy = Policy::new(Allowed, Disallowed, Disallowed);
/// Land on opponent pieces only, capturing them.
const TAKE: Policy = Policy::new(Disallowed, Disallowed, Capture);
/// Land on empty squares or capture.
const QUIET_OR_TAKE: Policy = Policy::new(Allowed, Disallowed, Capture);
/// Jump over empty squares only.
const SLIDE: Policy = Policy::new(Allowed, Disallowed, Disallowed);
/// Jump over anything.
const LEAP: Policy = Policy::uniform(Allowed);

pub fn tictactoe() -> Result<RuleSpec, RuleError> {
    let drop = MoveDef::new(&["+forward_0", "=plus_0"])?
        .land(Policy::new(Deploy, Disallowed, Disallowed))
        .jump(LEAP);
    Ok(RuleSpec::new("tictactoe", 3, Symmetry::None, MoveSource::Ends)
        .piece(PieceSpec::new("X").moves(vec![drop]))
        .ends_when(Condition::NInARow, 3, Decision::Win)
        .ends_when(Condition::BoardFull, 0, Decision::Draw))
}

pub fn connect4() -> Result<RuleSpec, RuleError> {
    let drop = MoveDef::new(&["+forward_0", "=plus_0"])?
        .land(Policy::new(Deploy, Disallowed, Disallowed))
        .jump(Policy::new(Disallowed, Allowed, Allowed));
    Ok(RuleSpec::new("connect4", 7, Symmetry::None, MoveSource::Ends)
        .piece(PieceSpec::new("O").moves(vec![drop]))
        .ends_when(Condition::NInARow, 4, Decision::Win)
        .ends_when(Condition::BoardFull, 0, Decision::Draw))
}

/// Othello with a helper piece.
///
/// A placement impresses the pieces it outflanks in one direction and leaves
/// a helper `P2` behind without passing the turn. The helper then impresses
/// every other outflanked line, one line per move, and finally turns back
/// into a plain `P1`, passing the turn.
pub fn othello() -> Result<RuleSpec, RuleError> {
    let lines = ["+plus_0", "+cross_0", "-square_1"];
    let impress = Policy::new(Disallowed, Disallowed, Impress);

    let place = MoveDef::new(&lines)?
        .land(Policy::new(Deploy, Disallowed, Disallowed))
        .jump(impress)
        .exchange("P2")
        .continues()
        .priority(1);
    let flip = MoveDef::new(&lines)?
        .land(Policy::new(Disallowed, Stay, Disallowed))
        .jump(impress)
        .continues()
        .priority(3);
    let settle = MoveDef::new(&["+pass"])?
        .land(Policy::new(Disallowed, Stay, Disallowed))
        .exchange("P1")
        .priority(2);

    Ok(RuleSpec::new("othello", 8, Symmetry::None, MoveSource::PiecesOnBoard)
        .piece(PieceSpec::new("P1").at(&["d4", "e5"])?.moves(vec![place]))
        .piece(PieceSpec::new("P2").moves(vec![flip, settle]))
        .ends_when(Condition::NoLegalMove, 0, Decision::CountLivePieces))
}

fn pawn_moves() -> Result<Vec<MoveDef>, RuleError> {
    Ok(vec![
        MoveDef::new(&["+forward_1", "=plus_1", "-rank_8"])?.land(QUIET),
        MoveDef::new(&["+forward_1", "=plus_1", "=rank_8"])?.land(QUIET).exchange("Q"),
        MoveDef::new(&["+forward_2", "=plus_2", "-square_1", "=rank_4"])?
            .land(QUIET)
            .jump(SLIDE),
        MoveDef::new(&["+forward_1", "=cross_1", "-rank_8"])?.land(TAKE),
        MoveDef::new(&["+forward_1", "=cross_1", "=rank_8"])?.land(TAKE).exchange("Q"),
    ])
}

fn knight_moves() -> Result<Vec<MoveDef>, RuleError> {
    Ok(vec![
        MoveDef::new(&["+square_2", "-plus_2", "-cross_2"])?
            .land(QUIET_OR_TAKE)
            .jump(LEAP),
    ])
}

fn slider(templates: &[&str]) -> Result<Vec<MoveDef>, RuleError> {
    Ok(vec![MoveDef::new(templates)?.land(QUIET_OR_TAKE).jump(SLIDE)])
}

/// Chess written with templates: no check, castling or en passant. The game
/// ends when a king is captured.
pub fn chess() -> Result<RuleSpec, RuleError> {
    Ok(RuleSpec::new("chess", 8, Symmetry::Mirror, MoveSource::PiecesOnBoard)
        .piece(
            PieceSpec::new("P")
                .at(&["a2", "b2", "c2", "d2", "e2", "f2", "g2", "h2"])?
                .moves(pawn_moves()?),
        )
        .piece(PieceSpec::new("N").at(&["b1", "g1"])?.moves(knight_moves()?))
        .piece(PieceSpec::new("B").at(&["c1", "f1"])?.moves(slider(&["+cross_0"])?))
        .piece(PieceSpec::new("R").at(&["a1", "h1"])?.moves(slider(&["+plus_0"])?))
        .piece(PieceSpec::new("Q").at(&["d1"])?.moves(slider(&["+plus_0", "+cross_0"])?))
        .piece(PieceSpec::new("K").min(1).at(&["e1"])?.moves(slider(&["+square_1"])?))
        .ends_when(Condition::KeyPiecesCaptured, 0, Decision::Win)
        .ends_when(Condition::RepeatedPosition, 3, Decision::Draw)
        .ends_when(Condition::MoveLimit, 200, Decision::Draw)
        .ends_when(Condition::NoLegalMove, 0, Decision::Draw))
}

/// Piece set for the hand-coded chess engine.
///
/// Codes 1 to 6 match [`chess`]; codes 7 and 8 are a rook and a king that
/// have not moved yet, which is how castling rights are tracked. Moves and
/// termination are implemented by the engine itself.
pub fn chess_hand_coded() -> Result<RuleSpec, RuleError> {
    Ok(RuleSpec::new("chess2", 8, Symmetry::Mirror, MoveSource::PiecesOnBoard)
        .piece(PieceSpec::new("P").at(&["a2", "b2", "c2", "d2", "e2", "f2", "g2", "h2"])?)
        .piece(PieceSpec::new("N").at(&["b1", "g1"])?)
        .piece(PieceSpec::new("B").at(&["c1", "f1"])?)
        .piece(PieceSpec::new("R"))
        .piece(PieceSpec::new("Q").at(&["d1"])?)
        .piece(PieceSpec::new("K"))
        .piece(PieceSpec::new("R'").at(&["a1", "h1"])?)
        .piece(PieceSpec::new("K'").at(&["e1"])?))
}
