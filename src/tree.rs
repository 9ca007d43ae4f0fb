//! Game tree arena.
//!
//! Every position of a game lives in one slot of a [`GameTree`] and is
//! referred to by its [`NodeId`]. Successor lists and outcomes are computed on
//! first use and memoized in the slot. A per-depth index lets callers drop a
//! whole ply with [`GameTree::evict_depth`] once it can no longer be reached;
//! freed slots are recycled by later insertions.

use std::collections::BTreeMap;
use std::rc::Rc;

use log::trace;

use crate::engine::Game;
use crate::error::{EngineError, Result};
use crate::outcome::Outcome;
use crate::position::{Position, Square};

/// Index of a position in a [`GameTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Node {
    position: Position,
    successors: Option<Rc<[NodeId]>>,
    outcome: Option<Outcome>,
}

/// Arena of positions with memoized successors and outcomes.
#[derive(Debug)]
pub struct GameTree {
    game: Game,
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    by_depth: BTreeMap<u16, Vec<NodeId>>,
    start: NodeId,
}

impl GameTree {
    /// A tree holding the starting position of `game`.
    pub fn new(game: Game) -> Result<Self> {
        let initial = game.initial()?;
        Ok(Self::from_position(game, initial))
    }

    /// A tree rooted at an arbitrary position of `game`, such as one read
    /// from a position description.
    pub fn from_position(game: Game, initial: Position) -> Self {
        let mut tree = Self {
            game,
            nodes: Vec::new(),
            free: Vec::new(),
            by_depth: BTreeMap::new(),
            start: NodeId(0),
        };
        tree.start = tree.insert(initial);
        tree
    }

    #[inline]
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// The starting position. It is never evicted.
    #[inline]
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// Number of live positions.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a position with nothing memoized yet.
    pub fn insert(&mut self, position: Position) -> NodeId {
        let depth = position.depth();
        let node = Node {
            position,
            successors: None,
            outcome: None,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId((self.nodes.len() - 1) as u32)
            }
        };
        self.by_depth.entry(depth).or_default().push(id);
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| EngineError::Invariant(format!("node {} was evicted", id.0)))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| EngineError::Invariant(format!("node {} was evicted", id.0)))
    }

    pub fn position(&self, id: NodeId) -> Result<&Position> {
        Ok(&self.node(id)?.position)
    }

    pub fn depth(&self, id: NodeId) -> Result<u16> {
        Ok(self.node(id)?.position.depth())
    }

    /// `1` if both positions have the same side to move, `-1` otherwise.
    pub fn sign(&self, a: NodeId, b: NodeId) -> Result<i32> {
        let same = self.node(a)?.position.mover() == self.node(b)?.position.mover();
        Ok(if same { 1 } else { -1 })
    }

    /// Legal successors, generated once and then memoized.
    pub fn legal_moves(&mut self, id: NodeId) -> Result<Rc<[NodeId]>> {
        if let Some(moves) = &self.node(id)?.successors {
            return Ok(Rc::clone(moves));
        }
        let children = self.game.successors(&self.node(id)?.position)?;
        let ids: Rc<[NodeId]> = children.into_iter().map(|c| self.insert(c)).collect();
        self.node_mut(id)?.successors = Some(Rc::clone(&ids));
        Ok(ids)
    }

    /// Outcome for the side to move, computed once and then memoized.
    pub fn outcome(&mut self, id: NodeId) -> Result<Outcome> {
        if let Some(outcome) = self.node(id)?.outcome {
            return Ok(outcome);
        }
        let game = self.game.clone();
        let position = self.node(id)?.position.clone();
        let mut no_moves = || self.legal_moves(id).map(|m| m.is_empty());
        let outcome = game.engine().outcome(game.rules(), &position, &mut no_moves)?;
        self.node_mut(id)?.outcome = Some(outcome);
        Ok(outcome)
    }

    /// Whether moving to `child` wins the game on the spot for `parent`'s side.
    pub fn win_for(&mut self, child: NodeId, parent: NodeId) -> Result<bool> {
        let outcome = self.outcome(child)?;
        Ok(if self.sign(child, parent)? > 0 {
            outcome == Outcome::Win
        } else {
            outcome == Outcome::Lose
        })
    }

    /// Whether moving to `child` loses the game on the spot for `parent`'s side.
    pub fn loss_for(&mut self, child: NodeId, parent: NodeId) -> Result<bool> {
        let outcome = self.outcome(child)?;
        Ok(if self.sign(child, parent)? > 0 {
            outcome == Outcome::Lose
        } else {
            outcome == Outcome::Win
        })
    }

    /// The successor reached by moving from `from` to `to`. A `None` origin
    /// matches any origin, which is how drops are looked up.
    pub fn find_move(&mut self, id: NodeId, from: Option<Square>, to: Square) -> Result<Option<NodeId>> {
        let moves = self.legal_moves(id)?;
        for &child in moves.iter() {
            let m = self.position(child)?.last_move();
            if m.to == to && from.is_none_or(|f| f == m.from) {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// The successor whose move name (see [`Game::move_name`]) is `name`.
    pub fn find_named(&mut self, id: NodeId, name: &str) -> Result<Option<NodeId>> {
        let moves = self.legal_moves(id)?;
        let parent = self.position(id)?;
        for &child in moves.iter() {
            if self.game.move_name(parent, self.position(child)?) == name {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Text name of the move from `parent` to `child`.
    pub fn move_name(&self, parent: NodeId, child: NodeId) -> Result<String> {
        Ok(self.game.move_name(self.position(parent)?, self.position(child)?))
    }

    /// Drop every position at `depth`, except the start position. Successor
    /// lists one ply up referred to them and are forgotten too.
    pub fn evict_depth(&mut self, depth: u16) {
        let Some(ids) = self.by_depth.remove(&depth) else {
            return;
        };
        let mut evicted = 0;
        for id in ids {
            if id == self.start {
                self.by_depth.entry(depth).or_default().push(id);
                continue;
            }
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                if slot.take().is_some() {
                    self.free.push(id);
                    evicted += 1;
                }
            }
        }
        if let Some(parents) = depth.checked_sub(1).and_then(|d| self.by_depth.get(&d)) {
            for id in parents {
                if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
                    node.successors = None;
                }
            }
        }
        trace!("evicted {evicted} positions at depth {depth}");
    }

    /// Drop every position shallower than `depth`.
    pub fn retain_from(&mut self, depth: u16) {
        let shallower: Vec<u16> = self.by_depth.range(..depth).map(|(&d, _)| d).collect();
        for d in shallower {
            self.evict_depth(d);
        }
    }
}
