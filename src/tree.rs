//! Reflection trees: statement → two synthesized sub-questions, layer by layer.
//!
//! Trees are keyed by statement text. A statement seen again in a later layer
//! overwrites its earlier entry, so the stored mapping can point back at its
//! own ancestors. Walks over a tree are therefore always bounded by a layer
//! count, never by the shape of the data.

use indexmap::IndexMap;

/// Statement → ordered children. Insertion order is kept on disk and on screen.
pub type ReflectionTree = IndexMap<String, Vec<String>>;

/// Layers grown for ingested documents and learned chat turns.
pub const DEFAULT_LAYERS: usize = 2;

fn children(statement: &str) -> [String; 2] {
    [
        format!("Why is '{statement}' significant?"),
        format!("What could challenge '{statement}'?"),
    ]
}

/// Expand `seed` for `layers` rounds. Last write wins on repeated statements.
pub fn grow<S: AsRef<str>>(seed: &[S], layers: usize) -> ReflectionTree {
    let mut tree = ReflectionTree::new();
    let mut active: Vec<String> = seed.iter().map(|s| s.as_ref().to_string()).collect();

    for _ in 0..layers {
        let mut next = Vec::with_capacity(active.len() * 2);
        for statement in active {
            let kids = children(&statement);
            next.extend(kids.iter().cloned());
            tree.insert(statement, kids.to_vec());
        }
        active = next;
    }

    tree
}

/// Indented outline of `tree` starting at `roots`, at most `layers` levels of
/// children below each root.
pub fn render<S: AsRef<str>>(tree: &ReflectionTree, roots: &[S], layers: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for root in roots {
        walk(tree, root.as_ref(), 1, layers, &mut lines);
    }
    lines
}

fn walk(tree: &ReflectionTree, node: &str, indent: usize, remaining: usize, out: &mut Vec<String>) {
    out.push(format!("{}- {node}", "  ".repeat(indent)));
    if remaining == 0 {
        return;
    }
    if let Some(kids) = tree.get(node) {
        for kid in kids {
            walk(tree, kid, indent + 1, remaining - 1, out);
        }
    }
}
