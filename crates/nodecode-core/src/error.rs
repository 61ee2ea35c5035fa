//! Core error types for nodecode-core.
//!
//! Edit operations are permissive about graph completeness, so these only
//! cover addressing mistakes and broken link bookkeeping.

use crate::id::NodeId;
use thiserror::Error;

/// Core errors produced by the nodecode-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node id was not found in the table.
    #[error("node not found: NodeId({id})")]
    NodeNotFound { id: NodeId },

    /// A node was inserted under an id that is already taken.
    #[error("duplicate node id: NodeId({id})")]
    DuplicateNodeId { id: NodeId },

    /// An input slot and its back-reference disagree.
    #[error("graph inconsistency: {reason}")]
    GraphInconsistency { reason: String },
}
