//! Assignment tree model, builder, and persistence.
//!
//! This crate provides:
//! - [`tree`]: arena-backed [`AssignmentTree`] with [`NodeId`] handles
//! - [`builder`]: depth-bounded [`TreeBuilder`] over an [`AssignmentSource`](themis_shared::AssignmentSource)
//! - [`observer`]: construction events ([`BuildObserver`])
//! - [`persist`]: line-per-node save/load

pub mod builder;
pub mod observer;
pub mod persist;
pub mod tree;

pub use builder::{TreeBuilder, pull_and_build_tree};
pub use observer::{BuildObserver, SilentObserver, TracingObserver};
pub use persist::{
    JsonRecordEncoder, NodeRecord, RecordEncoder, load_tree_from_file, read_tree, save_tree,
    save_tree_to_file, save_tree_with, write_tree,
};
pub use tree::{AssignmentNode, AssignmentTree, NodeId, PreOrder};
