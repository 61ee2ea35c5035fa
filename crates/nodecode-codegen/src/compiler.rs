//! Graph-to-AST compilation pipeline:
//! scoping -> return lookup -> reference counting -> cycle check
//! -> return expression -> binding hoisting.
//!
//! [`compile`] lowers every function on a board. [`compile_function`] lowers a
//! single function declaration and stops at the first diagnostic.
//!
//! Calculated nodes are inlined at their single use site. Bindings
//! (`Identifier`, `VariableStatement`) are never inlined: every use becomes an
//! identifier, and the binding itself is hoisted into a `const` declaration
//! once all of its live uses have been lowered. Declarations are collected
//! outermost first and reversed, so each one precedes its uses.

use std::collections::HashSet;

use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use nodecode_core::node::{FunctionDeclaration, NodeKind};
use nodecode_core::{scope, Node, NodeId, NodeTable};

use crate::ast::{is_identifier_name, BinaryOp, Expr, FunctionDecl, Param, Program, Stmt};
use crate::diagnostics::Diagnostic;
use crate::types;

/// Deepest chain of inlined expressions lowered for one function.
pub const MAX_NESTING: usize = 256;

/// Compile every function declaration in `table`, in table order.
///
/// Functions are compiled independently. If any of them fails, every
/// collected diagnostic is returned and no program is produced.
pub fn compile(table: &NodeTable) -> Result<Program, Vec<Diagnostic>> {
    let mut functions = Vec::new();
    let mut diagnostics = Vec::new();

    for function in scope::functions(table) {
        match compile_function(table, function) {
            Ok(decl) => functions.push(decl),
            Err(diagnostic) => {
                tracing::warn!("function {} failed to compile: {}", function.id, diagnostic);
                diagnostics.push(diagnostic);
            }
        }
    }

    if diagnostics.is_empty() {
        Ok(Program { functions })
    } else {
        Err(diagnostics)
    }
}

/// Compile the function declared by `function`.
///
/// 1. Collect the nodes scoped to the function and order its parameters
/// 2. Find the single return statement
/// 3. Count live references to every binding
/// 4. Reject expression cycles that would never terminate
/// 5. Lower the return value, then hoist bindings until none remain
pub fn compile_function(table: &NodeTable, function: &Node) -> Result<FunctionDecl, Diagnostic> {
    let NodeKind::FunctionDeclaration(decl) = &function.kind else {
        return Err(Diagnostic::NotAFunction { node: function.id });
    };
    tracing::debug!("compiling function {} ({})", decl.name, function.id);

    // 1. Scope and parameters
    let scoped = scope::nodes_in_function(table, function);
    let params = scope::parameters_of(&scoped)
        .into_iter()
        .filter_map(lower_param)
        .collect::<Result<Vec<_>, _>>()?;

    // 2. Exactly one return statement
    let returns: Vec<&Node> = scoped
        .iter()
        .copied()
        .filter(|node| matches!(node.kind, NodeKind::ReturnStatement(_)))
        .collect();
    let ret = match returns.as_slice() {
        [] => return Err(Diagnostic::MissingReturn { function: function.id }),
        [ret] => *ret,
        many => {
            return Err(Diagnostic::MultipleReturns {
                function: function.id,
                returns: many.iter().map(|node| node.id).collect(),
            })
        }
    };
    let return_type = match &ret.kind {
        NodeKind::ReturnStatement(r) => types::annotation(ret.id, &r.value_type, r.array)?,
        _ => None,
    };

    // 3-5. Body
    let mut compiler = FunctionCompiler::new(table, function.id);
    let body = compiler.lower_body(ret)?;

    Ok(FunctionDecl {
        name: decl.name.clone(),
        params,
        return_type,
        body,
    })
}

fn lower_param(node: &Node) -> Option<Result<Param, Diagnostic>> {
    let NodeKind::Parameter(p) = &node.kind else {
        return None;
    };
    let param = types::required_annotation(node.id, &p.value_type, p.array).map(|ty| Param {
        name: p.name.clone(),
        ty,
    });
    Some(param)
}

/// Lowering state for one function body.
struct FunctionCompiler<'a> {
    table: &'a NodeTable,
    function: NodeId,
    /// Outstanding live uses per binding, in discovery order.
    references: IndexMap<NodeId, usize>,
    /// `(consumer, slot)` edges whose binding use was already subtracted.
    consumed: HashSet<(NodeId, usize)>,
    /// Inlined expressions currently being lowered.
    depth: usize,
}

impl<'a> FunctionCompiler<'a> {
    fn new(table: &'a NodeTable, function: NodeId) -> Self {
        FunctionCompiler {
            table,
            function,
            references: IndexMap::new(),
            consumed: HashSet::new(),
            depth: 0,
        }
    }

    fn lower_body(&mut self, ret: &'a Node) -> Result<Vec<Stmt>, Diagnostic> {
        let dependencies = self.count_references(ret)?;
        self.check_expression_cycles(&dependencies)?;

        let value = self.input(ret, 0)?;

        let mut declarations = Vec::new();
        while !self.references.is_empty() {
            let Some(index) = self.references.values().position(|&count| count == 0) else {
                return Err(Diagnostic::UnresolvableReferenceCycle {
                    function: self.function,
                    nodes: self.references.keys().copied().collect(),
                });
            };
            let Some((id, _)) = self.references.shift_remove_index(index) else {
                break;
            };
            declarations.push(self.hoist(id)?);
        }

        declarations.reverse();
        declarations.push(Stmt::Return(value));
        Ok(declarations)
    }

    /// Walks input edges from the return statement, counting one use per
    /// `(consumer, slot)` edge into a binding.
    ///
    /// Returns the dependency graph of every live edge whose producer is not
    /// a binding. Bindings are lowered to identifiers at their use sites, so
    /// only these edges can recurse during lowering.
    fn count_references(&mut self, ret: &'a Node) -> Result<DiGraphMap<NodeId, usize>, Diagnostic> {
        let mut dependencies = DiGraphMap::new();
        let mut visited = HashSet::new();
        let mut stack = vec![ret];

        while let Some(node) = stack.pop() {
            if !visited.insert(node.id) {
                continue;
            }
            dependencies.add_node(node.id);

            for (slot, input) in node.kind.inputs().iter().enumerate() {
                let Some(target) = *input else {
                    continue;
                };
                let producer = self.table.get(target).ok_or(Diagnostic::DanglingReference {
                    node: node.id,
                    slot,
                    target,
                })?;
                if producer.kind.is_binding() {
                    *self.references.entry(target).or_insert(0) += 1;
                } else {
                    dependencies.add_edge(node.id, target, slot);
                }
                stack.push(producer);
            }
        }

        for (binding, count) in &self.references {
            tracing::trace!("binding {} has {} live reference(s)", binding, count);
        }
        Ok(dependencies)
    }

    fn check_expression_cycles(
        &self,
        dependencies: &DiGraphMap<NodeId, usize>,
    ) -> Result<(), Diagnostic> {
        for component in tarjan_scc(dependencies) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&id| dependencies.contains_edge(id, id));
            if cyclic {
                let mut nodes = component;
                nodes.sort();
                return Err(Diagnostic::UnresolvableReferenceCycle {
                    function: self.function,
                    nodes,
                });
            }
        }
        Ok(())
    }

    /// Lowers a binding whose uses have all been emitted into its declaration.
    fn hoist(&mut self, id: NodeId) -> Result<Stmt, Diagnostic> {
        let Some(node) = self.table.get(id) else {
            return Err(Diagnostic::DanglingReference {
                node: self.function,
                slot: 0,
                target: id,
            });
        };
        let (NodeKind::Identifier(binding) | NodeKind::VariableStatement(binding)) = &node.kind
        else {
            return Err(Diagnostic::InvalidConnection {
                node: id,
                slot: 0,
                target: id,
            });
        };

        let ty = types::annotation(id, &binding.value_type, binding.array)?;
        let init = self.input(node, 0)?;
        tracing::debug!("hoisted {} as const {}", id, binding.name);

        Ok(Stmt::Const {
            name: binding.name.clone(),
            ty,
            init,
        })
    }

    /// Resolves the producer wired into `slot` of `consumer`.
    fn producer(&self, consumer: &'a Node, slot: usize) -> Result<&'a Node, Diagnostic> {
        let target = consumer
            .kind
            .input(slot)
            .ok_or(Diagnostic::IncompleteNode {
                node: consumer.id,
                kind: consumer.node_type(),
                slot,
            })?;
        let producer = self.table.get(target).ok_or(Diagnostic::DanglingReference {
            node: consumer.id,
            slot,
            target,
        })?;
        if !producer.kind.produces_value() && !producer.kind.is_function() {
            return Err(Diagnostic::InvalidConnection {
                node: consumer.id,
                slot,
                target,
            });
        }
        Ok(producer)
    }

    /// Lowers the value flowing into `slot` of `consumer`.
    fn input(&mut self, consumer: &'a Node, slot: usize) -> Result<Expr, Diagnostic> {
        let producer = self.producer(consumer, slot)?;
        if producer.kind.is_binding() && self.consumed.insert((consumer.id, slot)) {
            if let Some(count) = self.references.get_mut(&producer.id) {
                *count = count.saturating_sub(1);
            }
        }
        self.expr(producer)
    }

    fn expr(&mut self, node: &'a Node) -> Result<Expr, Diagnostic> {
        if self.depth >= MAX_NESTING {
            return Err(Diagnostic::NestingTooDeep {
                function: self.function,
                node: node.id,
                limit: MAX_NESTING,
            });
        }
        self.depth += 1;
        let lowered = self.lower(node);
        self.depth -= 1;
        lowered
    }

    fn lower(&mut self, node: &'a Node) -> Result<Expr, Diagnostic> {
        match &node.kind {
            NodeKind::Parameter(p) => Ok(Expr::ident(&p.name)),
            NodeKind::Identifier(b) | NodeKind::VariableStatement(b) => Ok(Expr::ident(&b.name)),
            NodeKind::FunctionDeclaration(f) => Ok(Expr::ident(&f.name)),
            NodeKind::FunctionReference(_) => {
                Ok(Expr::ident(&self.referenced_function(node)?.name))
            }
            NodeKind::NumericLiteral(literal) => Ok(Expr::number(literal.value)),
            NodeKind::StringLiteral(literal) => Ok(Expr::string(&literal.value)),

            NodeKind::BinaryExpression(binary) => {
                let op = BinaryOp::from_token(&binary.operator).ok_or_else(|| {
                    Diagnostic::UnknownOperator {
                        node: node.id,
                        operator: binary.operator.clone(),
                    }
                })?;
                let left = self.input(node, 0)?;
                let right = self.input(node, 1)?;
                Ok(Expr::binary(left, op, right))
            }

            NodeKind::ConditionalExpression(_) => {
                let test = self.input(node, 0)?;
                let consequent = self.input(node, 1)?;
                let alternate = self.input(node, 2)?;
                Ok(Expr::conditional(test, consequent, alternate))
            }

            NodeKind::CallExpression(_) => {
                let callee = self.callee(node)?;
                let args = (1..node.kind.inputs().len())
                    .map(|slot| self.input(node, slot))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::call(callee, args))
            }

            NodeKind::ElementAccessExpression(_) | NodeKind::PropertyAccessExpression(_) => {
                let object = self.input(node, 0)?;
                let key = self.producer(node, 1)?;
                match &key.kind {
                    NodeKind::StringLiteral(literal) if is_identifier_name(&literal.value) => {
                        Ok(Expr::member(object, &literal.value))
                    }
                    _ => Ok(Expr::index(object, self.input(node, 1)?)),
                }
            }

            NodeKind::ReturnStatement(_) => self.input(node, 0),
        }
    }

    /// A callee is a function declaration wired in directly, or through one
    /// `FunctionReference`.
    fn callee(&mut self, call: &'a Node) -> Result<Expr, Diagnostic> {
        let target = self.producer(call, 0)?;
        match &target.kind {
            NodeKind::FunctionDeclaration(f) => Ok(Expr::ident(&f.name)),
            NodeKind::FunctionReference(_) => {
                Ok(Expr::ident(&self.referenced_function(target)?.name))
            }
            _ => Err(Diagnostic::UnresolvedCallee {
                node: call.id,
                target: target.id,
            }),
        }
    }

    fn referenced_function(&self, reference: &'a Node) -> Result<&'a FunctionDeclaration, Diagnostic> {
        let target = self.producer(reference, 0)?;
        match &target.kind {
            NodeKind::FunctionDeclaration(f) => Ok(f),
            _ => Err(Diagnostic::UnresolvedCallee {
                node: reference.id,
                target: target.id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecode_core::NodeType;

    /// A function `f` centered at the origin with a return statement.
    fn function_with_return(return_type: &str) -> (NodeTable, NodeId, NodeId) {
        let mut table = NodeTable::new();
        let f = table.add(NodeKind::function("f", 16.0, 8.0), 0.0, 0.0);
        let ret = table.add(NodeKind::return_statement(return_type), 6.0, 0.0);
        (table, f, ret)
    }

    fn compile_f(table: &NodeTable, f: NodeId) -> Result<FunctionDecl, Diagnostic> {
        compile_function(table, table.get(f).unwrap())
    }

    #[test]
    fn references_count_each_live_edge() {
        let (mut table, f, ret) = function_with_return("infer");
        let v = table.add(NodeKind::variable("v", "number"), 0.0, 1.0);
        let one = table.add(NodeKind::number(1.0), -2.0, 1.0);
        let sum = table.add(NodeKind::binary("+"), 2.0, 1.0);
        table.connect(v, 0, one).unwrap();
        table.connect(sum, 0, v).unwrap();
        table.connect(sum, 1, v).unwrap();
        table.connect(ret, 0, sum).unwrap();

        let mut compiler = FunctionCompiler::new(&table, f);
        compiler.count_references(table.get(ret).unwrap()).unwrap();
        assert_eq!(compiler.references.get(&v), Some(&2));
    }

    #[test]
    fn dead_consumers_are_not_counted() {
        let (mut table, f, ret) = function_with_return("infer");
        let v = table.add(NodeKind::variable("v", "number"), 0.0, 1.0);
        let dead = table.add(NodeKind::binary("*"), 2.0, 2.0);
        table.connect(ret, 0, v).unwrap();
        table.connect(dead, 0, v).unwrap();

        let mut compiler = FunctionCompiler::new(&table, f);
        compiler.count_references(table.get(ret).unwrap()).unwrap();
        assert_eq!(compiler.references.get(&v), Some(&1));
    }

    #[test]
    fn single_output_reused_by_one_consumer_is_inlined_twice() {
        let (mut table, f, ret) = function_with_return("infer");
        let v = table.add(NodeKind::variable("v", "number"), 0.0, 1.0);
        let seven = table.add(NodeKind::number(7.0), -1.0, 1.0);
        let two = table.add(NodeKind::number(2.0), -1.0, 2.0);
        let inner = table.add(NodeKind::binary("-"), 1.0, 1.0);
        let outer = table.add(NodeKind::binary("*"), 2.0, 1.0);
        table.connect(v, 0, seven).unwrap();
        table.connect(inner, 0, v).unwrap();
        table.connect(inner, 1, two).unwrap();
        table.connect(outer, 0, inner).unwrap();
        table.connect(outer, 1, inner).unwrap();
        table.connect(ret, 0, outer).unwrap();

        let decl = compile_f(&table, f).unwrap();
        assert_eq!(decl.body.len(), 2);
        match &decl.body[1] {
            Stmt::Return(Expr::Binary { left, right, .. }) => assert_eq!(left, right),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn not_a_function() {
        let (mut table, _, _) = function_with_return("infer");
        let lit = table.add_node(NodeType::NumericLiteral, 0.0, 0.0);
        let err = compile_function(&table, table.get(lit).unwrap()).unwrap_err();
        assert_eq!(err, Diagnostic::NotAFunction { node: lit });
    }

    #[test]
    fn return_wired_into_return_is_invalid() {
        let (mut table, f, ret) = function_with_return("infer");
        let other = table.add_node(NodeType::ReturnStatement, 50.0, 50.0);
        let json = serde_json::to_value(&table).unwrap();
        let mut nodes: Vec<serde_json::Value> = serde_json::from_value(json).unwrap();
        for node in &mut nodes {
            if node["id"] == ret.0 {
                node["inputs"] = serde_json::json!([other.0]);
            }
        }
        let table: NodeTable = serde_json::from_value(serde_json::Value::Array(nodes)).unwrap();

        let err = compile_f(&table, f).unwrap_err();
        assert_eq!(
            err,
            Diagnostic::InvalidConnection {
                node: ret,
                slot: 0,
                target: other,
            }
        );
    }

    #[test]
    fn function_reference_in_value_position_names_the_function() {
        let (mut table, f, ret) = function_with_return("infer");
        let g = table.add(NodeKind::function("helper", 4.0, 4.0), 40.0, 0.0);
        let reference = table.add_node(NodeType::FunctionReference, 1.0, 1.0);
        table.connect(reference, 0, g).unwrap();
        table.connect(ret, 0, reference).unwrap();

        let decl = compile_f(&table, f).unwrap();
        assert_eq!(decl.body, vec![Stmt::Return(Expr::ident("helper"))]);
    }
}
