//! Text command protocol.
//!
//! A line-oriented protocol in the manner of GTP, for driving the engine from
//! a terminal, a script or a GUI adapter. Each command may carry a numeric id;
//! replies are `=id result` on success and `?id message` on failure, each
//! followed by a blank line.
//!
//! ## Supported Commands
//!
//! - `name` - Return engine name
//! - `version` - Return engine version
//! - `list_commands` - List all supported commands
//! - `known_command <cmd>` - Check if a command is supported
//! - `quit` - Exit the loop
//! - `game [id]` - Show the current game, or switch to another registered one
//! - `newgame` - Restart the current game
//! - `moves` - List the legal moves
//! - `play <move>` - Play a move given by name, `from:to` or a bare target square
//! - `position [startpos | fen <fen>] [moves] <move>...` - Set up a position
//! - `genmove` - Search, play and print a move
//! - `outcome` - Show the game result so far
//! - `board` - Print the board
//! - `fen` - Print the position description, when the game has one
//!
//! `position` is meant to be sent with the whole game so far. When the
//! requested line continues the session's own line only the new moves are
//! played; otherwise the session resynchronises from the requested base
//! position and replays every move.

use std::io::{self, BufRead, Write};

use log::{info, warn};

use crate::error::{EngineError, Result};
use crate::outcome::Outcome;
use crate::position::{Position, parse_square};
use crate::registry::GameRegistry;
use crate::rules::Side;
use crate::search::SearchAlgo;
use crate::tree::{GameTree, NodeId};

/// The list of known commands.
const KNOWN_COMMANDS: &[&str] = &[
    "board",
    "fen",
    "game",
    "genmove",
    "known_command",
    "list_commands",
    "moves",
    "name",
    "newgame",
    "outcome",
    "play",
    "position",
    "quit",
    "version",
];

/// Protocol session state.
pub struct Session {
    registry: GameRegistry,
    algo: Box<dyn SearchAlgo>,
    tree: GameTree,
    /// Position the current line starts from.
    base: Position,
    /// Move names played from `base`.
    line: Vec<String>,
    current: NodeId,
}

impl Session {
    /// A session playing `game` with `algo`.
    pub fn new(registry: GameRegistry, game: &str, algo: Box<dyn SearchAlgo>) -> Result<Self> {
        let tree = GameTree::new(registry.create(game)?)?;
        let current = tree.start();
        let base = tree.position(current)?.clone();
        Ok(Self {
            registry,
            algo,
            tree,
            base,
            line: Vec::new(),
            current,
        })
    }

    /// The position the session is at.
    pub fn position(&self) -> Result<&Position> {
        self.tree.position(self.current)
    }

    /// Move names played since the base position.
    pub fn line(&self) -> &[String] {
        &self.line
    }

    /// Run the command loop until `quit` or the end of `input`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((command, args)) = parts.split_first() else {
                continue;
            };
            let command = command.to_lowercase();

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(output, "{prefix}{id_str} {message}\n")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        if end > 0 {
            if let Ok(id) = trimmed[..end].parse::<u32>() {
                return (Some(id), trimmed[end..].trim());
            }
        }
        (None, trimmed)
    }

    /// Execute a command and return (success, response).
    pub fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match self.dispatch(command, args) {
            Ok(response) => (true, response),
            Err(e) => (false, e.to_string()),
        }
    }

    fn dispatch(&mut self, command: &str, args: &[&str]) -> Result<String> {
        match command {
            "name" => Ok(env!("CARGO_PKG_NAME").to_string()),

            "version" => Ok(env!("CARGO_PKG_VERSION").to_string()),

            "list_commands" => Ok(KNOWN_COMMANDS.join("\n")),

            "known_command" => {
                let cmd = args.first().ok_or_else(|| missing("command"))?;
                let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                Ok(known.to_string())
            }

            "quit" => Ok(String::new()),

            "game" => match args.first() {
                None => Ok(self.tree.game().name().to_string()),
                Some(id) => {
                    let game = self.registry.create(id)?;
                    let tree = GameTree::new(game)?;
                    let start = tree.position(tree.start())?.clone();
                    self.tree = tree;
                    self.reset_to(start);
                    info!("switched to game `{id}`");
                    Ok(String::new())
                }
            },

            "newgame" => {
                let start = self.tree.game().initial()?;
                self.reset_to(start);
                Ok(String::new())
            }

            "moves" => {
                let moves = self.tree.legal_moves(self.current)?;
                let mut names = Vec::with_capacity(moves.len());
                for &child in moves.iter() {
                    names.push(self.tree.move_name(self.current, child)?);
                }
                Ok(names.join(" "))
            }

            "play" => {
                let mv = args.first().ok_or_else(|| missing("move"))?;
                self.play(mv)?;
                Ok(String::new())
            }

            "position" => {
                self.set_position(args)?;
                Ok(String::new())
            }

            "genmove" => {
                if self.tree.outcome(self.current)?.is_terminal() {
                    return Err(EngineError::GameOver);
                }
                let (next, _) = self.algo.next(&mut self.tree, self.current)?;
                let name = self.tree.move_name(self.current, next)?;
                self.advance(next, name.clone())?;
                Ok(name)
            }

            "outcome" => {
                let outcome = self.tree.outcome(self.current)?;
                let mover = self.position()?.mover();
                Ok(match (outcome, outcome.winner(mover)) {
                    (Outcome::Undetermined, _) => "undetermined".to_string(),
                    (_, Some(Side::White)) => "white wins".to_string(),
                    (_, Some(Side::Black)) => "black wins".to_string(),
                    (_, None) => "draw".to_string(),
                })
            }

            "board" => {
                let rules = self.tree.game().rules();
                Ok(format!("\n{}", self.position()?.render(rules)))
            }

            "fen" => {
                let game = self.tree.game();
                game.engine()
                    .format_position(game.rules(), self.position()?)
                    .ok_or_else(|| EngineError::Parse(format!("{} has no position format", game.name())))
            }

            _ => Err(EngineError::Parse(format!("unknown command: {command}"))),
        }
    }

    /// Start a fresh line at `base`. Search statistics refer to the old tree
    /// and are dropped.
    fn reset_to(&mut self, base: Position) {
        let game = self.tree.game().clone();
        self.tree = GameTree::from_position(game, base.clone());
        self.current = self.tree.start();
        self.base = base;
        self.line.clear();
        self.algo.game_over();
    }

    fn advance(&mut self, next: NodeId, name: String) -> Result<()> {
        self.line.push(name);
        self.current = next;
        self.tree.retain_from(self.tree.depth(next)?);
        Ok(())
    }

    /// The successor named by `mv`: an engine move name, `from:to`, or a bare
    /// target square for drops.
    fn find(&mut self, mv: &str) -> Result<Option<NodeId>> {
        if let Some(child) = self.tree.find_named(self.current, mv)? {
            return Ok(Some(child));
        }
        let (from, to) = match mv.split_once(':') {
            Some((from, to)) => (Some(from), to),
            None => (None, mv),
        };
        let Some(to) = parse_square(to) else {
            return Ok(None);
        };
        let from = match from {
            Some(from) => match parse_square(from) {
                Some(sq) => Some(sq),
                None => return Ok(None),
            },
            None => None,
        };
        self.tree.find_move(self.current, from, to)
    }

    fn play(&mut self, mv: &str) -> Result<()> {
        if self.tree.outcome(self.current)?.is_terminal() {
            return Err(EngineError::GameOver);
        }
        let next = self
            .find(mv)?
            .ok_or_else(|| EngineError::IllegalMove(mv.to_string()))?;
        let name = self.tree.move_name(self.current, next)?;
        self.advance(next, name)
    }

    fn replay(&mut self, moves: &[String]) -> Result<()> {
        for mv in moves {
            self.play(mv)?;
        }
        Ok(())
    }

    /// Handle `position`, resynchronising when the requested line does not
    /// continue the current one.
    fn set_position(&mut self, args: &[&str]) -> Result<()> {
        let (base, moves) = self.parse_position_args(args)?;

        if base == self.base && moves.starts_with(&self.line) {
            let fresh = moves[self.line.len()..].to_vec();
            match self.replay(&fresh) {
                Ok(()) => return Ok(()),
                Err(e @ (EngineError::IllegalMove(_) | EngineError::GameOver)) => {
                    warn!("cannot continue the current line ({e}); resynchronising");
                }
                Err(e) => return Err(e),
            }
        } else {
            warn!("requested position is not on the current line; resynchronising");
        }

        self.reset_to(base.clone());
        if let Err(e) = self.replay(&moves) {
            self.reset_to(base);
            return Err(e);
        }
        Ok(())
    }

    /// Split `position` arguments into the base position and the moves.
    fn parse_position_args(&self, args: &[&str]) -> Result<(Position, Vec<String>)> {
        let game = self.tree.game();
        let mut rest = args;
        let base = match rest.first() {
            Some(&"fen") => {
                let end = rest.iter().position(|&t| t == "moves").unwrap_or(rest.len());
                let fen = rest[1..end].join(" ");
                rest = &rest[end..];
                game.engine().parse_position(game.rules(), &fen)?
            }
            Some(&"startpos") => {
                rest = &rest[1..];
                game.initial()?
            }
            _ => game.initial()?,
        };
        if rest.first() == Some(&"moves") {
            rest = &rest[1..];
        }
        Ok((base, rest.iter().map(|m| m.to_string()).collect()))
    }
}

fn missing(what: &str) -> EngineError {
    EngineError::Parse(format!("missing argument: {what}"))
}
