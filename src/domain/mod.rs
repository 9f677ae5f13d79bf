//! Domain layer: tree topology, rotations and tangle metrics
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod collection;
pub mod document;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod tree;

pub use arena::{NodeKind, Topology, TopologyArena, TopologyNode, Twist};
pub use collection::TreeCollection;
pub use document::render_document;
pub use error::{DomainError, DomainResult};
pub use metrics::{
    alpha_count, alpha_count_all, crossing_count, crossing_count_all, flatness_count,
    flatness_count_all, Objective, ScoreBreakdown, WeightedObjective,
};
pub use parser::{parse_topology, TreeReader, TreeRecord};
pub use tree::{Tree, TwistVector};
