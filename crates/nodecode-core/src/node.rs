//! Node variants placed on the board.
//!
//! Every [`Node`] carries an id, a 2D position and a [`NodeKind`]. The kind is
//! a tagged union whose variants use one of three structurally distinct edge
//! shapes:
//!
//! - **Fan-out** nodes (`Parameter`, `Identifier`, `VariableStatement`) keep a
//!   list of consumers in `outputs`; the same value may feed many nodes.
//! - **Single-output** nodes (literals, operators, calls, member access,
//!   `FunctionReference`) keep at most one consumer in `output`.
//! - **Calculated** nodes have positional `inputs`. Fixed-arity kinds own a
//!   fixed array of slots; `CallExpression` owns an append-only list
//!   (`[callee, ...args]`).
//!
//! Edge fields are crate-private. They are only written through
//! [`NodeTable`](crate::table::NodeTable) operations, which always update both
//! ends of an edge together.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::NodeId;

/// One input slot: the id of the producer wired into it, if any.
pub type Slot = Option<NodeId>;

/// Consumer list of a fan-out node. May contain the same id twice when one
/// consumer reads the value through two slots.
pub type Outputs = SmallVec<[NodeId; 4]>;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A node on the board.
///
/// Position is only used for editor layout and for deriving function scope
/// (see [`crate::scope`]). It has no other effect on compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Creates a node with the given kind at `(x, y)`.
    pub fn new(id: NodeId, x: f64, y: f64, kind: NodeKind) -> Self {
        Node { id, x, y, kind }
    }

    /// Creates a node of `node_type` with every field set to its kind default
    /// and no edges.
    pub fn empty(node_type: NodeType, id: NodeId, x: f64, y: f64) -> Self {
        Node::new(id, x, y, NodeKind::empty(node_type))
    }

    /// Returns the discriminant of this node's kind.
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }
}

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

/// The kind-specific payload of a node, tagged by `kind` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    /// Container. Owns no edges; its rectangle defines a function scope.
    FunctionDeclaration(FunctionDeclaration),
    /// Function parameter. Fan-out, no inputs.
    Parameter(Parameter),
    /// Named binding of a value. One input, fan-out.
    Identifier(Binding),
    /// Explicit local variable declaration. One input, fan-out.
    VariableStatement(Binding),
    /// Reference to a function declaration, usable as a callee or as a value.
    FunctionReference(FunctionReference),
    NumericLiteral(NumericLiteral),
    StringLiteral(StringLiteral),
    /// `left <operator> right`.
    BinaryExpression(BinaryExpression),
    /// `condition ? whenTrue : whenFalse`.
    ConditionalExpression(ConditionalExpression),
    /// `callee(args...)`.
    CallExpression(CallExpression),
    /// `object[key]`, or `object.key` when the key is a string literal.
    ElementAccessExpression(MemberAccess),
    /// Same shape and lowering as `ElementAccessExpression`.
    PropertyAccessExpression(MemberAccess),
    /// Terminal node of a function. One input, no output.
    ReturnStatement(ReturnStatement),
}

/// Function container payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub width: f64,
    pub height: f64,
}

/// Function parameter payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    /// Type token: `number`, `string`, `boolean` or `infer`.
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub(crate) outputs: Outputs,
}

/// Payload shared by `Identifier` and `VariableStatement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub(crate) inputs: [Slot; 1],
    #[serde(default)]
    pub(crate) outputs: Outputs,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionReference {
    #[serde(default)]
    pub(crate) inputs: [Slot; 1],
    #[serde(default)]
    pub(crate) output: Slot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericLiteral {
    pub value: f64,
    #[serde(default)]
    pub(crate) output: Slot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringLiteral {
    pub value: String,
    #[serde(default)]
    pub(crate) output: Slot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    /// Operator token as written in the target language, e.g. `+` or `===`.
    pub operator: String,
    #[serde(default)]
    pub(crate) inputs: [Slot; 2],
    #[serde(default)]
    pub(crate) output: Slot,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalExpression {
    #[serde(default)]
    pub(crate) inputs: [Slot; 3],
    #[serde(default)]
    pub(crate) output: Slot,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallExpression {
    #[serde(default)]
    pub(crate) inputs: SmallVec<[Slot; 4]>,
    #[serde(default)]
    pub(crate) output: Slot,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemberAccess {
    #[serde(default)]
    pub(crate) inputs: [Slot; 2],
    #[serde(default)]
    pub(crate) output: Slot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStatement {
    /// Return type token, `infer` for no annotation.
    #[serde(rename = "type", default = "infer_type")]
    pub value_type: String,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub(crate) inputs: [Slot; 1],
}

fn infer_type() -> String {
    "infer".to_string()
}

// ---------------------------------------------------------------------------
// Discriminant
// ---------------------------------------------------------------------------

/// Field-less discriminant of [`NodeKind`], used by the empty-node factory and
/// in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    FunctionDeclaration,
    Parameter,
    Identifier,
    VariableStatement,
    FunctionReference,
    NumericLiteral,
    StringLiteral,
    BinaryExpression,
    ConditionalExpression,
    CallExpression,
    ElementAccessExpression,
    PropertyAccessExpression,
    ReturnStatement,
}

impl NodeType {
    /// Every node type, in palette order.
    pub const ALL: [NodeType; 13] = [
        NodeType::FunctionDeclaration,
        NodeType::Parameter,
        NodeType::Identifier,
        NodeType::VariableStatement,
        NodeType::FunctionReference,
        NodeType::NumericLiteral,
        NodeType::StringLiteral,
        NodeType::BinaryExpression,
        NodeType::ConditionalExpression,
        NodeType::CallExpression,
        NodeType::ElementAccessExpression,
        NodeType::PropertyAccessExpression,
        NodeType::ReturnStatement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::FunctionDeclaration => "FunctionDeclaration",
            NodeType::Parameter => "Parameter",
            NodeType::Identifier => "Identifier",
            NodeType::VariableStatement => "VariableStatement",
            NodeType::FunctionReference => "FunctionReference",
            NodeType::NumericLiteral => "NumericLiteral",
            NodeType::StringLiteral => "StringLiteral",
            NodeType::BinaryExpression => "BinaryExpression",
            NodeType::ConditionalExpression => "ConditionalExpression",
            NodeType::CallExpression => "CallExpression",
            NodeType::ElementAccessExpression => "ElementAccessExpression",
            NodeType::PropertyAccessExpression => "PropertyAccessExpression",
            NodeType::ReturnStatement => "ReturnStatement",
        }
    }

    /// Human-readable name of an input slot, for diagnostics.
    pub fn slot_name(self, slot: usize) -> &'static str {
        match (self, slot) {
            (NodeType::BinaryExpression, 0) => "left",
            (NodeType::BinaryExpression, 1) => "right",
            (NodeType::ConditionalExpression, 0) => "condition",
            (NodeType::ConditionalExpression, 1) => "whenTrue",
            (NodeType::ConditionalExpression, 2) => "whenFalse",
            (NodeType::CallExpression, 0) => "callee",
            (NodeType::CallExpression, _) => "argument",
            (NodeType::ElementAccessExpression | NodeType::PropertyAccessExpression, 0) => {
                "object"
            }
            (NodeType::ElementAccessExpression | NodeType::PropertyAccessExpression, 1) => "key",
            (NodeType::FunctionReference, 0) => "function",
            (NodeType::Identifier | NodeType::VariableStatement | NodeType::ReturnStatement, 0) => {
                "value"
            }
            _ => "input",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Factory and builders
// ---------------------------------------------------------------------------

impl NodeKind {
    /// Returns a fully-defaulted payload for `node_type` with no edges.
    pub fn empty(node_type: NodeType) -> Self {
        match node_type {
            NodeType::FunctionDeclaration => NodeKind::function("f1", 16.0, 8.0),
            NodeType::Parameter => NodeKind::parameter("p1", "number"),
            NodeType::Identifier => NodeKind::identifier("i1", "infer"),
            NodeType::VariableStatement => NodeKind::variable("v1", "number"),
            NodeType::FunctionReference => {
                NodeKind::FunctionReference(FunctionReference::default())
            }
            NodeType::NumericLiteral => NodeKind::number(1.0),
            NodeType::StringLiteral => NodeKind::string(""),
            NodeType::BinaryExpression => NodeKind::binary("+"),
            NodeType::ConditionalExpression => {
                NodeKind::ConditionalExpression(ConditionalExpression::default())
            }
            NodeType::CallExpression => NodeKind::CallExpression(CallExpression {
                inputs: SmallVec::from_elem(None, 1),
                output: None,
            }),
            NodeType::ElementAccessExpression => {
                NodeKind::ElementAccessExpression(MemberAccess::default())
            }
            NodeType::PropertyAccessExpression => {
                NodeKind::PropertyAccessExpression(MemberAccess::default())
            }
            NodeType::ReturnStatement => NodeKind::return_statement("infer"),
        }
    }

    pub fn function(name: impl Into<String>, width: f64, height: f64) -> Self {
        NodeKind::FunctionDeclaration(FunctionDeclaration {
            name: name.into(),
            width,
            height,
        })
    }

    pub fn parameter(name: impl Into<String>, value_type: impl Into<String>) -> Self {
        NodeKind::Parameter(Parameter {
            name: name.into(),
            value_type: value_type.into(),
            array: false,
            outputs: Outputs::new(),
        })
    }

    pub fn identifier(name: impl Into<String>, value_type: impl Into<String>) -> Self {
        NodeKind::Identifier(Binding::new(name.into(), value_type.into()))
    }

    pub fn variable(name: impl Into<String>, value_type: impl Into<String>) -> Self {
        NodeKind::VariableStatement(Binding::new(name.into(), value_type.into()))
    }

    pub fn number(value: f64) -> Self {
        NodeKind::NumericLiteral(NumericLiteral {
            value,
            output: None,
        })
    }

    pub fn string(value: impl Into<String>) -> Self {
        NodeKind::StringLiteral(StringLiteral {
            value: value.into(),
            output: None,
        })
    }

    pub fn binary(operator: impl Into<String>) -> Self {
        NodeKind::BinaryExpression(BinaryExpression {
            operator: operator.into(),
            inputs: [None; 2],
            output: None,
        })
    }

    pub fn return_statement(value_type: impl Into<String>) -> Self {
        NodeKind::ReturnStatement(ReturnStatement {
            value_type: value_type.into(),
            array: false,
            inputs: [None],
        })
    }

    /// Sets the `array` flag on kinds that carry a type; no-op elsewhere.
    pub fn with_array(mut self, array: bool) -> Self {
        match &mut self {
            NodeKind::Parameter(p) => p.array = array,
            NodeKind::Identifier(b) | NodeKind::VariableStatement(b) => b.array = array,
            NodeKind::ReturnStatement(r) => r.array = array,
            _ => {}
        }
        self
    }
}

impl Binding {
    fn new(name: String, value_type: String) -> Self {
        Binding {
            name,
            value_type,
            array: false,
            inputs: [None],
            outputs: Outputs::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::FunctionDeclaration(_) => NodeType::FunctionDeclaration,
            NodeKind::Parameter(_) => NodeType::Parameter,
            NodeKind::Identifier(_) => NodeType::Identifier,
            NodeKind::VariableStatement(_) => NodeType::VariableStatement,
            NodeKind::FunctionReference(_) => NodeType::FunctionReference,
            NodeKind::NumericLiteral(_) => NodeType::NumericLiteral,
            NodeKind::StringLiteral(_) => NodeType::StringLiteral,
            NodeKind::BinaryExpression(_) => NodeType::BinaryExpression,
            NodeKind::ConditionalExpression(_) => NodeType::ConditionalExpression,
            NodeKind::CallExpression(_) => NodeType::CallExpression,
            NodeKind::ElementAccessExpression(_) => NodeType::ElementAccessExpression,
            NodeKind::PropertyAccessExpression(_) => NodeType::PropertyAccessExpression,
            NodeKind::ReturnStatement(_) => NodeType::ReturnStatement,
        }
    }

    /// Returns `true` for function containers.
    pub fn is_function(&self) -> bool {
        matches!(self, NodeKind::FunctionDeclaration(_))
    }

    /// Returns `true` for nodes whose value may feed many consumers.
    pub fn is_fan_out(&self) -> bool {
        matches!(
            self,
            NodeKind::Parameter(_) | NodeKind::Identifier(_) | NodeKind::VariableStatement(_)
        )
    }

    /// Returns `true` for nodes that feed at most one consumer.
    pub fn is_single_output(&self) -> bool {
        matches!(
            self,
            NodeKind::FunctionReference(_)
                | NodeKind::NumericLiteral(_)
                | NodeKind::StringLiteral(_)
                | NodeKind::BinaryExpression(_)
                | NodeKind::ConditionalExpression(_)
                | NodeKind::CallExpression(_)
                | NodeKind::ElementAccessExpression(_)
                | NodeKind::PropertyAccessExpression(_)
        )
    }

    /// Returns `true` for "calculated" nodes, i.e. nodes with input slots.
    pub fn has_inputs(&self) -> bool {
        !matches!(
            self,
            NodeKind::FunctionDeclaration(_)
                | NodeKind::Parameter(_)
                | NodeKind::NumericLiteral(_)
                | NodeKind::StringLiteral(_)
        )
    }

    /// Returns `true` for named bindings that the compiler may hoist into a
    /// local declaration (`Identifier` and `VariableStatement`).
    pub fn is_binding(&self) -> bool {
        matches!(self, NodeKind::Identifier(_) | NodeKind::VariableStatement(_))
    }

    /// Returns `true` if this node produces a value another node can consume.
    pub fn produces_value(&self) -> bool {
        self.is_fan_out() || self.is_single_output()
    }

    /// Returns `true` if `producer` may be wired into `slot` of this node.
    ///
    /// Function declarations may only feed a `FunctionReference` or the empty
    /// callee slot of a `CallExpression`. `FunctionReference` accepts nothing
    /// else. Other calculated nodes accept any value producer in an existing
    /// slot; `CallExpression` accepts any slot index because it appends.
    pub fn accepts_input(&self, slot: usize, producer: &NodeKind) -> bool {
        match self {
            NodeKind::FunctionReference(_) => slot == 0 && producer.is_function(),
            NodeKind::CallExpression(call) if producer.is_function() => {
                slot == 0 && call.inputs.first().map_or(true, Option::is_none)
            }
            NodeKind::CallExpression(_) => producer.produces_value(),
            _ if self.has_inputs() => slot < self.inputs().len() && producer.produces_value(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Edge views
// ---------------------------------------------------------------------------

impl NodeKind {
    /// Input slots in positional order. Empty for nodes without inputs.
    pub fn inputs(&self) -> &[Slot] {
        match self {
            NodeKind::Identifier(b) | NodeKind::VariableStatement(b) => &b.inputs,
            NodeKind::FunctionReference(r) => &r.inputs,
            NodeKind::BinaryExpression(b) => &b.inputs,
            NodeKind::ConditionalExpression(c) => &c.inputs,
            NodeKind::CallExpression(c) => &c.inputs,
            NodeKind::ElementAccessExpression(a) | NodeKind::PropertyAccessExpression(a) => {
                &a.inputs
            }
            NodeKind::ReturnStatement(r) => &r.inputs,
            NodeKind::FunctionDeclaration(_)
            | NodeKind::Parameter(_)
            | NodeKind::NumericLiteral(_)
            | NodeKind::StringLiteral(_) => &[],
        }
    }

    /// Returns the producer wired into `slot`, if any.
    pub fn input(&self, slot: usize) -> Slot {
        self.inputs().get(slot).copied().flatten()
    }

    /// The single consumer of a single-output node.
    pub fn output(&self) -> Slot {
        self.output_slot().copied().flatten()
    }

    /// The consumer list of a fan-out node. Empty for other kinds.
    pub fn outputs(&self) -> &[NodeId] {
        match self {
            NodeKind::Parameter(p) => &p.outputs,
            NodeKind::Identifier(b) | NodeKind::VariableStatement(b) => &b.outputs,
            _ => &[],
        }
    }

    /// Every consumer recorded on this node, regardless of edge shape.
    pub fn consumers(&self) -> Vec<NodeId> {
        let mut consumers: Vec<NodeId> = self.output().into_iter().collect();
        consumers.extend_from_slice(self.outputs());
        consumers
    }

    fn output_slot(&self) -> Option<&Slot> {
        match self {
            NodeKind::FunctionReference(r) => Some(&r.output),
            NodeKind::NumericLiteral(l) => Some(&l.output),
            NodeKind::StringLiteral(l) => Some(&l.output),
            NodeKind::BinaryExpression(b) => Some(&b.output),
            NodeKind::ConditionalExpression(c) => Some(&c.output),
            NodeKind::CallExpression(c) => Some(&c.output),
            NodeKind::ElementAccessExpression(a) | NodeKind::PropertyAccessExpression(a) => {
                Some(&a.output)
            }
            _ => None,
        }
    }

    // -- crate-private mutators, always used in matched pairs by NodeTable --

    pub(crate) fn inputs_mut(&mut self) -> &mut [Slot] {
        match self {
            NodeKind::Identifier(b) | NodeKind::VariableStatement(b) => &mut b.inputs,
            NodeKind::FunctionReference(r) => &mut r.inputs,
            NodeKind::BinaryExpression(b) => &mut b.inputs,
            NodeKind::ConditionalExpression(c) => &mut c.inputs,
            NodeKind::CallExpression(c) => &mut c.inputs,
            NodeKind::ElementAccessExpression(a) | NodeKind::PropertyAccessExpression(a) => {
                &mut a.inputs
            }
            NodeKind::ReturnStatement(r) => &mut r.inputs,
            NodeKind::FunctionDeclaration(_)
            | NodeKind::Parameter(_)
            | NodeKind::NumericLiteral(_)
            | NodeKind::StringLiteral(_) => &mut [],
        }
    }

    /// Appends a slot holding `producer`. Only call expressions grow; returns
    /// the new slot index for them and `None` for every other kind.
    pub(crate) fn push_input(&mut self, producer: NodeId) -> Option<usize> {
        match self {
            NodeKind::CallExpression(call) => {
                call.inputs.push(Some(producer));
                Some(call.inputs.len() - 1)
            }
            _ => None,
        }
    }

    /// Clears every slot holding `producer`, returning how many were cleared.
    pub(crate) fn clear_inputs_from(&mut self, producer: NodeId) -> usize {
        let mut cleared = 0;
        for slot in self.inputs_mut() {
            if *slot == Some(producer) {
                *slot = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Records `consumer` as a recipient of this node's value.
    pub(crate) fn add_consumer(&mut self, consumer: NodeId) {
        match self {
            NodeKind::Parameter(p) => p.outputs.push(consumer),
            NodeKind::Identifier(b) | NodeKind::VariableStatement(b) => b.outputs.push(consumer),
            _ => {
                if let Some(output) = self.output_slot_mut() {
                    *output = Some(consumer);
                }
            }
        }
    }

    /// Drops the back-reference to `consumer`.
    ///
    /// Single-output nodes clear `output` only when it equals `consumer`.
    /// Fan-out nodes remove at most `limit` matching entries (all of them when
    /// `limit` is `None`), so a producer feeding the same consumer through two
    /// slots loses exactly one entry per disconnected slot.
    pub(crate) fn release_consumer(&mut self, consumer: NodeId, limit: Option<usize>) {
        let outputs = match self {
            NodeKind::Parameter(p) => &mut p.outputs,
            NodeKind::Identifier(b) | NodeKind::VariableStatement(b) => &mut b.outputs,
            _ => {
                if let Some(output) = self.output_slot_mut() {
                    if *output == Some(consumer) {
                        *output = None;
                    }
                }
                return;
            }
        };
        let mut removed = 0;
        outputs.retain(|id| {
            if *id != consumer || limit.is_some_and(|max| removed >= max) {
                return true;
            }
            removed += 1;
            false
        });
    }

    fn output_slot_mut(&mut self) -> Option<&mut Slot> {
        match self {
            NodeKind::FunctionReference(r) => Some(&mut r.output),
            NodeKind::NumericLiteral(l) => Some(&mut l.output),
            NodeKind::StringLiteral(l) => Some(&mut l.output),
            NodeKind::BinaryExpression(b) => Some(&mut b.output),
            NodeKind::ConditionalExpression(c) => Some(&mut c.output),
            NodeKind::CallExpression(c) => Some(&mut c.output),
            NodeKind::ElementAccessExpression(a) | NodeKind::PropertyAccessExpression(a) => {
                Some(&mut a.output)
            }
            _ => None,
        }
    }
}
