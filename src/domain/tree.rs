//! A named tree with its frozen twist-apply list.

use generational_arena::Index;
use tracing::instrument;

use crate::domain::arena::{TopologyArena, Topology, Twist};

/// One rotation per entry of a tree's twist-apply list.
pub type TwistVector = Vec<Twist>;

/// A named topology plus the addressing scheme for its twist vectors.
///
/// The twist-apply list is captured once, at construction, by walking the
/// internal nodes in presentation order under the rotations present at that
/// moment. It is never rebuilt: its order is what a [`TwistVector`] position
/// refers to, including in checkpoints.
#[derive(Debug)]
pub struct Tree {
    name: String,
    topology: TopologyArena,
    twist_apply_list: Vec<Index>,
}

impl Tree {
    pub fn new(name: impl Into<String>, topology: &Topology) -> Self {
        Self::from_arena(name, TopologyArena::from_topology(topology))
    }

    /// Wrap an existing arena. Its current rotations decide the order of the
    /// twist-apply list.
    pub fn from_arena(name: impl Into<String>, topology: TopologyArena) -> Self {
        let twist_apply_list = topology.non_leaves();
        Self {
            name: name.into(),
            topology,
            twist_apply_list,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> &TopologyArena {
        &self.topology
    }

    /// Leaf labels in presentation order under the live rotations.
    pub fn leaves(&self) -> Vec<&str> {
        self.topology.leaves()
    }

    /// Internal nodes in presentation order under the live rotations.
    ///
    /// Unlike [`Tree::twist_apply_list`], this reflects rotations applied since
    /// construction.
    pub fn non_leaves_in_traversal_order(&self) -> Vec<Index> {
        self.topology.non_leaves()
    }

    pub fn twist_apply_list(&self) -> &[Index] {
        &self.twist_apply_list
    }

    /// Number of entries a twist vector addresses.
    pub fn twist_len(&self) -> usize {
        self.twist_apply_list.len()
    }

    pub fn rotation(&self, node: Index) -> Option<Twist> {
        self.topology.rotation(node)
    }

    pub fn set_rotation(&mut self, node: Index, value: Twist) -> bool {
        self.topology.set_rotation(node, value)
    }

    /// Write `twists` into the live rotations, position by position.
    ///
    /// Only the common prefix of the apply list and `twists` is used; extra
    /// entries on either side are ignored.
    #[instrument(level = "trace", skip(self), fields(tree = %self.name))]
    pub fn apply_twists(&mut self, twists: &[Twist]) {
        for (&node, &twist) in self.twist_apply_list.iter().zip(twists) {
            self.topology.set_rotation(node, twist);
        }
    }

    /// Live rotations read off the apply list, in list order.
    pub fn twists(&self) -> TwistVector {
        self.twist_apply_list
            .iter()
            .map(|&node| self.topology.rotation(node).unwrap_or(0))
            .collect()
    }

    /// Parenthesized topology honoring live rotations, e.g. `(A,(B,C))`.
    pub fn writable(&self) -> String {
        self.topology
            .root()
            .map(|root| self.topology.writable(root))
            .unwrap_or_default()
    }

    /// Checkpoint record: `tree <name> = [&U] <topology>;`
    pub fn render_text(&self) -> String {
        format!("tree {} = [&U] {};", self.name, self.writable())
    }

    /// Indented structure for terminal display.
    pub fn display_tree(&self) -> termtree::Tree<String> {
        match self.topology.root() {
            Some(root) => {
                let mut tree = self.topology.display_tree(root);
                tree.root = self.name.clone();
                tree
            }
            None => termtree::Tree::new(self.name.clone()),
        }
    }
}
