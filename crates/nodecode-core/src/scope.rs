//! Function scoping by spatial containment.
//!
//! A function declaration "contains" every non-function node whose position
//! falls inside its rectangle (centered at the declaration, edges inclusive).
//! Membership is never stored: moving a node in or out of the rectangle is
//! enough to change which function it belongs to.

use crate::node::{FunctionDeclaration, Node, NodeKind};
use crate::table::NodeTable;

/// Returns `true` if `node` lies inside the rectangle of `function`.
///
/// Function declarations are never members of another function.
pub fn contains(function: &Node, decl: &FunctionDeclaration, node: &Node) -> bool {
    if node.kind.is_function() {
        return false;
    }
    let half_width = decl.width / 2.0;
    let half_height = decl.height / 2.0;
    node.x >= function.x - half_width
        && node.x <= function.x + half_width
        && node.y >= function.y - half_height
        && node.y <= function.y + half_height
}

/// Returns the nodes scoped to `function`, in table order.
///
/// Empty when `function` is not a function declaration.
pub fn nodes_in_function<'a>(table: &'a NodeTable, function: &Node) -> Vec<&'a Node> {
    let NodeKind::FunctionDeclaration(decl) = &function.kind else {
        return Vec::new();
    };
    table
        .iter()
        .filter(|node| contains(function, decl, node))
        .collect()
}

/// Returns the parameters among `scoped`, ordered left to right.
///
/// Horizontal placement is the parameter order; ties keep table order.
pub fn parameters_of<'a>(scoped: &[&'a Node]) -> Vec<&'a Node> {
    let mut params: Vec<&Node> = scoped
        .iter()
        .copied()
        .filter(|node| matches!(node.kind, NodeKind::Parameter(_)))
        .collect();
    params.sort_by(|a, b| a.x.total_cmp(&b.x));
    params
}

/// Returns every function declaration in the table, in table order.
pub fn functions(table: &NodeTable) -> Vec<&Node> {
    table.iter().filter(|node| node.kind.is_function()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::node::NodeType;

    fn board() -> (NodeTable, NodeId) {
        let mut table = NodeTable::new();
        let f = table.add(NodeKind::function("f", 16.0, 8.0), 0.0, 0.0);
        table.add(NodeKind::parameter("c", "number"), 5.0, 0.0);
        table.add(NodeKind::parameter("a", "number"), -8.0, 0.0);
        table.add(NodeKind::parameter("b", "number"), -2.0, 3.0);
        table.add_node(NodeType::ReturnStatement, 8.0, 4.0);
        // Outside on both axes.
        table.add(NodeKind::parameter("far", "number"), 8.5, 0.0);
        table.add(NodeKind::parameter("low", "number"), 0.0, -4.5);
        // Another function inside the rectangle.
        table.add(NodeKind::function("g", 2.0, 2.0), 1.0, 1.0);
        (table, f)
    }

    #[test]
    fn containment_is_inclusive_and_excludes_functions() {
        let (table, f) = board();
        let function = table.get(f).unwrap();
        let names: Vec<_> = nodes_in_function(&table, function)
            .into_iter()
            .map(|node| node.node_type())
            .collect();
        assert_eq!(
            names,
            vec![
                NodeType::Parameter,
                NodeType::Parameter,
                NodeType::Parameter,
                NodeType::ReturnStatement,
            ]
        );
    }

    #[test]
    fn parameters_are_ordered_by_x() {
        let (table, f) = board();
        let scoped = nodes_in_function(&table, table.get(f).unwrap());
        let names: Vec<&str> = parameters_of(&scoped)
            .into_iter()
            .map(|node| match &node.kind {
                NodeKind::Parameter(p) => p.name.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn moving_a_node_changes_membership() {
        let (mut table, f) = board();
        let far = table
            .iter()
            .find(|node| matches!(&node.kind, NodeKind::Parameter(p) if p.name == "far"))
            .map(|node| node.id)
            .unwrap();
        assert_eq!(nodes_in_function(&table, table.get(f).unwrap()).len(), 4);
        table.move_node(far, 7.9, 0.0).unwrap();
        assert_eq!(nodes_in_function(&table, table.get(f).unwrap()).len(), 5);
    }

    #[test]
    fn non_function_has_no_scope() {
        let (table, _) = board();
        let param = table.iter().find(|n| !n.kind.is_function()).unwrap();
        assert!(nodes_in_function(&table, param).is_empty());
    }

    #[test]
    fn lists_functions() {
        let (table, _) = board();
        assert_eq!(functions(&table).len(), 2);
    }
}
