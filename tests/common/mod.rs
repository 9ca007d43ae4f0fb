use tabula::registry::GameRegistry;
use tabula::tree::{GameTree, NodeId};

pub fn setup() {
    let _ = env_logger::try_init();
}

/// A fresh tree for the built-in game `id`.
pub fn tree(id: &str) -> GameTree {
    setup();
    let game = GameRegistry::builtin().create(id).unwrap();
    GameTree::new(game).unwrap()
}

/// Follow `moves` by name from the start of `tree`.
pub fn play_line(tree: &mut GameTree, moves: &[&str]) -> NodeId {
    let mut node = tree.start();
    for mv in moves {
        node = tree
            .find_named(node, mv)
            .unwrap()
            .unwrap_or_else(|| panic!("`{mv}` is not legal here"));
    }
    node
}
