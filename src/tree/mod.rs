//! Tree model and tree sources.
//!
//! A tree is the static, read-only decision graph delivered by the tree
//! service: nodes keyed by id, each with labeled options that point at zero,
//! one or many successor nodes. Trees are fetched once per variant and never
//! mutated afterwards.

mod client;
mod types;


pub use client::{DirectoryTreeSource, StaticTreeSource, TreeClient, TreeSource};
pub use types::{
    DanglingRef, Hint, HintKind, LegacyHint, Node, NodeOption, NodeType, Tree, COMPLETION_LABEL,
};
