//! NodeTable: the id-keyed arena holding every node on the board.
//!
//! [`NodeTable`] is the single entry point for mutating the board. Every edge
//! is stored twice (an input slot on the consumer and a back-reference on the
//! producer), so every structural edit here is written as a matched pair of
//! updates. After any public method returns, the link invariant holds:
//!
//! - a slot on `A` holding `B` implies `B.output == A` (single-output `B`) or
//!   `A ∈ B.outputs` (fan-out `B`, once per slot);
//! - every recorded consumer has a slot pointing back at its producer.
//!
//! Function declarations have no back-reference list. Slots pointing at them
//! are cleaned up by scanning the table when the declaration is removed.
//!
//! Edits are permissive: a disconnected slot is a valid intermediate state and
//! only compilation checks completeness.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::{Node, NodeKind, NodeType};
use crate::scope;

/// The board's node arena, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Node>", try_from = "Vec<Node>")]
pub struct NodeTable {
    nodes: IndexMap<NodeId, Node>,
    /// Next id handed out by [`NodeTable::add_node`].
    next_id: u32,
}

impl NodeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable access for field-by-field edits (names, values, operators,
    /// types). Replacing `kind` outright bypasses link maintenance; use the
    /// edit operations for anything structural.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterates nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // -----------------------------------------------------------------------
    // Node lifecycle
    // -----------------------------------------------------------------------

    /// Inserts a fully-formed node.
    ///
    /// Errors if the id is taken. The node's own edge fields are trusted; this
    /// is how a table is rebuilt from a stored board.
    pub fn insert(&mut self, node: Node) -> Result<NodeId, CoreError> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(CoreError::DuplicateNodeId { id });
        }
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Places a fresh node of `node_type` with kind defaults at `(x, y)`.
    pub fn add_node(&mut self, node_type: NodeType, x: f64, y: f64) -> NodeId {
        self.add(NodeKind::empty(node_type), x, y)
    }

    /// Places a node with the given payload at `(x, y)`. The payload's edges
    /// are always empty because edge fields cannot be set outside this crate.
    pub fn add(&mut self, kind: NodeKind, x: f64, y: f64) -> NodeId {
        let id = self.fresh_id();
        self.nodes.insert(id, Node::new(id, x, y, kind));
        id
    }

    /// Moves a node. Scope membership follows automatically.
    pub fn move_node(&mut self, id: NodeId, x: f64, y: f64) -> Result<(), CoreError> {
        let node = self.node_mut(id)?;
        node.x = x;
        node.y = y;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Edit operations
    // -----------------------------------------------------------------------

    /// Returns `true` if [`connect`](Self::connect) would wire `producer`
    /// into `slot` of `consumer`.
    pub fn can_connect(&self, consumer: NodeId, slot: usize, producer: NodeId) -> bool {
        match (self.get(consumer), self.get(producer)) {
            (Some(c), Some(p)) => consumer != producer && c.kind.accepts_input(slot, &p.kind),
            _ => false,
        }
    }

    /// Wires `producer` into `slot` of `consumer`.
    ///
    /// Call expressions fill `slot` when it exists and is empty, and append a
    /// new slot otherwise. Other kinds overwrite `slot`, unlinking the previous
    /// producer first. A single-output producer already feeding a different
    /// consumer is detached from it, since it can only have one.
    ///
    /// Returns `Ok(false)` and leaves the table untouched when the kinds are
    /// incompatible (see [`NodeKind::accepts_input`]).
    pub fn connect(
        &mut self,
        consumer: NodeId,
        slot: usize,
        producer: NodeId,
    ) -> Result<bool, CoreError> {
        let consumer_kind = &self.node(consumer)?.kind;
        let producer_kind = &self.node(producer)?.kind;
        if consumer == producer || !consumer_kind.accepts_input(slot, producer_kind) {
            return Ok(false);
        }

        // `None` means the consumer grows a new slot.
        let target = match consumer_kind {
            NodeKind::CallExpression(_) => match consumer_kind.inputs().get(slot) {
                Some(None) => Some(slot),
                _ => None,
            },
            _ => Some(slot),
        };

        if let Some(index) = target {
            self.disconnect_input(consumer, index)?;
        }
        if let Some(previous) = self.node(producer)?.kind.output() {
            if previous != consumer {
                if let Some(stale) = self.nodes.get_mut(&previous) {
                    stale.kind.clear_inputs_from(producer);
                }
            }
        }

        let kind = &mut self.node_mut(consumer)?.kind;
        match target {
            Some(index) => kind.inputs_mut()[index] = Some(producer),
            None => {
                kind.push_input(producer);
            }
        }
        self.node_mut(producer)?.kind.add_consumer(consumer);
        Ok(true)
    }

    /// Clears `slot` of `consumer` and the matching back-reference on the
    /// former producer. Returns the former producer, if the slot was wired.
    ///
    /// A fan-out producer loses exactly one matching entry. A single-output
    /// producer keeps its `output` while the consumer still reads it through
    /// another slot.
    pub fn disconnect_input(
        &mut self,
        consumer: NodeId,
        slot: usize,
    ) -> Result<Option<NodeId>, CoreError> {
        let kind = &mut self.node_mut(consumer)?.kind;
        let Some(previous) = kind.inputs_mut().get_mut(slot).and_then(Option::take) else {
            return Ok(None);
        };
        let still_linked = kind.inputs().contains(&Some(previous));

        if let Some(producer) = self.nodes.get_mut(&previous) {
            if producer.kind.is_fan_out() {
                producer.kind.release_consumer(consumer, Some(1));
            } else if !still_linked {
                producer.kind.release_consumer(consumer, None);
            }
        }
        Ok(Some(previous))
    }

    /// Removes the edge feeding `slot` of `consumer`.
    ///
    /// Same outcome as [`disconnect_input`](Self::disconnect_input); this is
    /// the entry point for picking an edge rather than a node.
    pub fn remove_connection(
        &mut self,
        consumer: NodeId,
        slot: usize,
    ) -> Result<Option<NodeId>, CoreError> {
        self.disconnect_input(consumer, slot)
    }

    /// Removes a node and every edge touching it. Returns the removed nodes.
    ///
    /// Removing a function declaration first removes every node scoped to it
    /// (computed now, before anything moves), one by one through this same
    /// procedure, so nodes outside the container that referenced something
    /// inside it are cleaned up too.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<Node>, CoreError> {
        let node = self.node(id)?;
        let scoped: Vec<NodeId> = scope::nodes_in_function(self, node)
            .iter()
            .map(|member| member.id)
            .collect();

        let mut removed = Vec::new();
        for member in scoped {
            if self.contains(member) {
                removed.extend(self.remove_node(member)?);
            }
        }

        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(CoreError::NodeNotFound { id })?;

        for producer in node.kind.inputs().iter().flatten() {
            if let Some(producer) = self.nodes.get_mut(producer) {
                producer.kind.release_consumer(id, None);
            }
        }
        for consumer in node.kind.consumers() {
            if let Some(consumer) = self.nodes.get_mut(&consumer) {
                consumer.kind.clear_inputs_from(id);
            }
        }
        if node.kind.is_function() {
            for other in self.nodes.values_mut() {
                other.kind.clear_inputs_from(id);
            }
        }

        removed.push(node);
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Consistency
    // -----------------------------------------------------------------------

    /// Checks the link invariant across the whole table.
    ///
    /// Slots pointing at missing nodes are not reported here; they are a
    /// compile-time `DanglingReference`.
    pub fn validate_links(&self) -> Result<(), CoreError> {
        for node in self.nodes.values() {
            for (slot, producer) in node.kind.inputs().iter().enumerate() {
                let Some(producer) = producer.and_then(|id| self.get(id)) else {
                    continue;
                };
                let linked = if producer.kind.is_fan_out() {
                    let slots = count(node.kind.inputs(), |s| *s == Some(producer.id));
                    let entries = count(producer.kind.outputs(), |c| *c == node.id);
                    slots == entries
                } else if producer.kind.is_single_output() {
                    producer.kind.output() == Some(node.id)
                } else {
                    producer.kind.is_function()
                };
                if !linked {
                    return Err(CoreError::GraphInconsistency {
                        reason: format!(
                            "slot {} of node {} holds {} without a matching back-reference",
                            slot, node.id, producer.id
                        ),
                    });
                }
            }

            for consumer in node.kind.consumers() {
                let points_back = self
                    .get(consumer)
                    .is_some_and(|c| c.kind.inputs().contains(&Some(node.id)));
                if !points_back {
                    return Err(CoreError::GraphInconsistency {
                        reason: format!(
                            "node {} records consumer {} which has no slot pointing back",
                            node.id, consumer
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Hands out `next_id`, or the first free id after it (wrapping) once
    /// `next_id` is taken. Only happens after loading a board that uses
    /// `u32::MAX`. A table cannot hold 2^32 nodes, so a free id exists.
    fn fresh_id(&mut self) -> NodeId {
        let mut candidate = self.next_id;
        while self.nodes.contains_key(&NodeId(candidate)) {
            candidate = candidate.wrapping_add(1);
        }
        self.next_id = candidate.saturating_add(1);
        NodeId(candidate)
    }

    fn node(&self, id: NodeId) -> Result<&Node, CoreError> {
        self.nodes.get(&id).ok_or(CoreError::NodeNotFound { id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, CoreError> {
        self.nodes.get_mut(&id).ok_or(CoreError::NodeNotFound { id })
    }
}

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> usize {
    items.iter().filter(|item| pred(item)).count()
}

// Serialized as a plain node list; ids must be unique.

impl From<NodeTable> for Vec<Node> {
    fn from(table: NodeTable) -> Self {
        table.nodes.into_values().collect()
    }
}

impl TryFrom<Vec<Node>> for NodeTable {
    type Error = CoreError;

    fn try_from(nodes: Vec<Node>) -> Result<Self, Self::Error> {
        let mut table = NodeTable::new();
        for node in nodes {
            table.insert(node)?;
        }
        Ok(table)
    }
}
