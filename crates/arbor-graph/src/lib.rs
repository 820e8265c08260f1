//! Relationship inference over the Arbor temporal graph.
//!
//! [`FamilyGraph`] derives extended family relations (ancestors, descendants,
//! siblings, aunts and uncles, cousins, nephews and nieces, step-parents,
//! in-laws) by bounded traversal of `family` and `relationship` edges through
//! any [`arbor_core::store::GraphStore`].
//!
//! Traversals are cycle-safe and depth-bounded, results are deduplicated by
//! span id, and dangling edges are skipped — reporting those is the
//! maintenance engine's job, not ours.

pub mod activity;
pub mod error;
pub mod graph;
pub mod labels;

pub use error::{Error, Result};
pub use graph::{FamilyGraph, Relative};
