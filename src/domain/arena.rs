use generational_arena::{Arena, Index};
use std::fmt;
use tracing::instrument;

/// Rotation offset of an internal node. Applied modulo the child count.
pub type Twist = usize;

/// Parsed tree shape, independent of any rotation state.
///
/// This is what input readers produce; [`TopologyArena::from_topology`] turns it
/// into the arena form the optimizer mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    Leaf(String),
    Group(Vec<Topology>),
}

impl Topology {
    pub fn leaf(label: impl Into<String>) -> Self {
        Topology::Leaf(label.into())
    }

    pub fn group(children: impl IntoIterator<Item = Topology>) -> Self {
        Topology::Group(children.into_iter().collect())
    }
}

/// Payload of a topology node.
///
/// Children are stored in their physical (as-parsed) order and never reordered.
/// The presentation order is derived from `rotation` on every traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Leaf { label: String },
    Internal { children: Vec<Index>, rotation: Twist },
}

/// Tree node in the arena-based topology.
#[derive(Debug)]
pub struct TopologyNode {
    pub kind: NodeKind,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
}

impl TopologyNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { label } => Some(label),
            NodeKind::Internal { .. } => None,
        }
    }

    pub fn rotation(&self) -> Option<Twist> {
        match self.kind {
            NodeKind::Internal { rotation, .. } => Some(rotation),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Children in presentation order: the physical order rotated right by
    /// `rotation mod len`, so rotation 1 moves the last child to the front.
    pub fn rotated_children(&self) -> Vec<Index> {
        match &self.kind {
            NodeKind::Leaf { .. } => Vec::new(),
            NodeKind::Internal { children, rotation } => {
                let n = children.len();
                if n == 0 {
                    return Vec::new();
                }
                let shift = rotation % n;
                children.iter().cycle().skip(n - shift).take(n).copied().collect()
            }
        }
    }
}

impl fmt::Display for TopologyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Leaf { label } => write!(f, "{label}"),
            NodeKind::Internal { children, rotation } => {
                write!(f, "[{} children, twist {}]", children.len(), rotation)
            }
        }
    }
}

/// Arena-based storage for one tree's topology.
///
/// Uses generational arena so node identity stays stable regardless of how
/// rotations change the apparent child order.
#[derive(Debug)]
pub struct TopologyArena {
    arena: Arena<TopologyNode>,
    root: Option<Index>,
}

impl Default for TopologyArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Build an arena from a parsed topology; all rotations start at zero.
    pub fn from_topology(topology: &Topology) -> Self {
        let mut arena = Self::new();
        arena.insert_topology(topology, None);
        arena
    }

    fn insert_topology(&mut self, topology: &Topology, parent: Option<Index>) {
        match topology {
            Topology::Leaf(label) => {
                self.insert_node(
                    NodeKind::Leaf {
                        label: label.clone(),
                    },
                    parent,
                );
            }
            Topology::Group(children) => {
                let idx = self.insert_node(
                    NodeKind::Internal {
                        children: Vec::with_capacity(children.len()),
                        rotation: 0,
                    },
                    parent,
                );
                for child in children {
                    self.insert_topology(child, Some(idx));
                }
            }
        }
    }

    /// Insert a node under `parent` (appended as its last physical child),
    /// or as the root when `parent` is None.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, kind: NodeKind, parent: Option<Index>) -> Index {
        let node_idx = self.arena.insert(TopologyNode { kind, parent });

        match parent {
            Some(parent_idx) => {
                if let Some(TopologyNode {
                    kind: NodeKind::Internal { children, .. },
                    ..
                }) = self.arena.get_mut(parent_idx)
                {
                    children.push(node_idx);
                }
            }
            None => self.root = Some(node_idx),
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&TopologyNode> {
        self.arena.get(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn rotation(&self, idx: Index) -> Option<Twist> {
        self.get_node(idx).and_then(TopologyNode::rotation)
    }

    /// Set the rotation of an internal node. Returns false for leaves and
    /// unknown indices.
    pub fn set_rotation(&mut self, idx: Index, value: Twist) -> bool {
        match self.arena.get_mut(idx) {
            Some(TopologyNode {
                kind: NodeKind::Internal { rotation, .. },
                ..
            }) => {
                *rotation = value;
                true
            }
            _ => false,
        }
    }

    /// Pre-order traversal honoring the current rotations.
    pub fn iter(&self) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self)
    }

    /// Leaf labels in presentation order.
    pub fn leaves(&self) -> Vec<&str> {
        self.iter().filter_map(|(_, node)| node.label()).collect()
    }

    /// Internal nodes in presentation order under the current rotations.
    pub fn non_leaves(&self) -> Vec<Index> {
        self.iter()
            .filter(|(_, node)| !node.is_leaf())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Parenthesized notation of the subtree at `idx`, honoring rotations.
    pub fn writable(&self, idx: Index) -> String {
        let mut out = String::new();
        self.write_node(idx, &mut out);
        out
    }

    fn write_node(&self, idx: Index, out: &mut String) {
        let Some(node) = self.get_node(idx) else {
            return;
        };
        match &node.kind {
            NodeKind::Leaf { label } => out.push_str(label),
            NodeKind::Internal { .. } => {
                out.push('(');
                for (i, child) in node.rotated_children().into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_node(child, out);
                }
                out.push(')');
            }
        }
    }

    /// Indented display of the subtree at `idx`, honoring rotations.
    pub fn display_tree(&self, idx: Index) -> termtree::Tree<String> {
        let label = match self.get_node(idx) {
            Some(node) => node.to_string(),
            None => String::new(),
        };
        let leaves = self
            .get_node(idx)
            .map(TopologyNode::rotated_children)
            .unwrap_or_default()
            .into_iter()
            .map(|child| self.display_tree(child));
        termtree::Tree::new(label).with_leaves(leaves)
    }
}

pub struct PreOrderIterator<'a> {
    arena: &'a TopologyArena,
    stack: Vec<Index>,
}

impl<'a> PreOrderIterator<'a> {
    fn new(arena: &'a TopologyArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = (Index, &'a TopologyNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for child in node.rotated_children().into_iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn abc() -> TopologyArena {
        TopologyArena::from_topology(&Topology::group([
            Topology::leaf("A"),
            Topology::leaf("B"),
            Topology::leaf("C"),
        ]))
    }

    #[rstest]
    #[case(0, vec!["A", "B", "C"])]
    #[case(1, vec!["C", "A", "B"])]
    #[case(2, vec!["B", "C", "A"])]
    #[case(3, vec!["A", "B", "C"])]
    #[case(7, vec!["C", "A", "B"])]
    fn test_rotation_is_applied_modulo_child_count(
        #[case] rotation: Twist,
        #[case] expected: Vec<&str>,
    ) {
        let mut arena = abc();
        let root = arena.root().unwrap();
        assert!(arena.set_rotation(root, rotation));
        assert_eq!(arena.leaves(), expected);
        assert_eq!(arena.rotation(root), Some(rotation));
    }

    #[test]
    fn test_set_rotation_on_leaf_is_rejected() {
        let mut arena = abc();
        let root = arena.root().unwrap();
        let leaf = arena.get_node(root).unwrap().rotated_children()[0];
        assert!(!arena.set_rotation(leaf, 1));
        assert_eq!(arena.rotation(leaf), None);
    }

    #[test]
    fn test_writable_honors_rotation() {
        let mut arena = TopologyArena::from_topology(&Topology::group([
            Topology::leaf("A"),
            Topology::group([Topology::leaf("B"), Topology::leaf("C")]),
        ]));
        let root = arena.root().unwrap();
        assert_eq!(arena.writable(root), "(A,(B,C))");

        arena.set_rotation(root, 1);
        assert_eq!(arena.writable(root), "((B,C),A)");
    }

    #[test]
    fn test_non_leaves_in_pre_order() {
        let arena = TopologyArena::from_topology(&Topology::group([
            Topology::group([Topology::leaf("A"), Topology::leaf("B")]),
            Topology::group([Topology::leaf("C"), Topology::leaf("D")]),
        ]));
        let non_leaves = arena.non_leaves();
        assert_eq!(non_leaves.len(), 3);
        assert_eq!(non_leaves[0], arena.root().unwrap());
        assert_eq!(arena.len(), 7);
    }
}
