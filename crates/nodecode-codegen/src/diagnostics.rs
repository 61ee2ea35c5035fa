//! Compile diagnostics.
//!
//! [`Diagnostic`] names every reason a function cannot be lowered. Each variant
//! carries the node ids (and slot, where relevant) an editor needs to
//! highlight the offending part of the board.

use nodecode_core::{NodeId, NodeType};
use serde::{Deserialize, Serialize};

/// A reason a function body could not be compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Diagnostic {
    /// A required input slot is empty.
    #[error("incomplete node: {kind} node {node} has no {} input (slot {slot})", slot_label(.kind, .slot))]
    IncompleteNode {
        node: NodeId,
        kind: NodeType,
        slot: usize,
    },

    /// An input slot names an id that is not in the table.
    #[error("dangling reference: node {node} slot {slot} points at missing node {target}")]
    DanglingReference {
        node: NodeId,
        slot: usize,
        target: NodeId,
    },

    /// A call's callee is neither a function declaration nor a function
    /// reference wired to one.
    #[error("unresolved callee: call {node} cannot call node {target}")]
    UnresolvedCallee { node: NodeId, target: NodeId },

    #[error("missing return: function {function} has no return statement")]
    MissingReturn { function: NodeId },

    #[error("multiple returns: function {function} has {} return statements", .returns.len())]
    MultipleReturns {
        function: NodeId,
        returns: Vec<NodeId>,
    },

    /// Bindings or expressions that depend on each other.
    #[error("unresolvable reference cycle in function {function} through nodes {}", display_ids(.nodes))]
    UnresolvableReferenceCycle {
        function: NodeId,
        nodes: Vec<NodeId>,
    },

    #[error("unknown operator {operator:?} on node {node}")]
    UnknownOperator { node: NodeId, operator: String },

    #[error("unknown type {type_name:?} on node {node}")]
    UnknownType { node: NodeId, type_name: String },

    /// An input slot is wired to a node that yields no value.
    #[error("invalid connection: node {node} slot {slot} reads from node {target}, which produces no value")]
    InvalidConnection {
        node: NodeId,
        slot: usize,
        target: NodeId,
    },

    /// An expression chain nests deeper than the compiler lowers.
    #[error("expression at node {node} in function {function} nests deeper than {limit} levels")]
    NestingTooDeep {
        function: NodeId,
        node: NodeId,
        limit: usize,
    },

    /// The node passed as a function is not a function declaration.
    #[error("node {node} is not a function declaration")]
    NotAFunction { node: NodeId },
}

impl Diagnostic {
    /// Every node id the diagnostic refers to, primary node first.
    pub fn node_ids(&self) -> Vec<NodeId> {
        match self {
            Diagnostic::IncompleteNode { node, .. }
            | Diagnostic::UnknownOperator { node, .. }
            | Diagnostic::UnknownType { node, .. }
            | Diagnostic::NotAFunction { node } => vec![*node],
            Diagnostic::DanglingReference { node, target, .. }
            | Diagnostic::UnresolvedCallee { node, target }
            | Diagnostic::InvalidConnection { node, target, .. } => vec![*node, *target],
            Diagnostic::MissingReturn { function } => vec![*function],
            Diagnostic::NestingTooDeep { function, node, .. } => vec![*node, *function],
            Diagnostic::MultipleReturns { function, returns } => {
                std::iter::once(*function).chain(returns.iter().copied()).collect()
            }
            Diagnostic::UnresolvableReferenceCycle { function, nodes } => {
                std::iter::once(*function).chain(nodes.iter().copied()).collect()
            }
        }
    }
}

fn slot_label(kind: &NodeType, slot: &usize) -> &'static str {
    kind.slot_name(*slot)
}

fn display_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
