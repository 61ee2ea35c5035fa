//! Property tests for the edit operations.
//!
//! Random sequences of connect / disconnect / remove / move edits are applied
//! to a board holding every node type, and the link invariant is checked after
//! each step. A second property checks that removing a function declaration
//! removes exactly its scoped nodes and leaves no slot pointing at them.

use std::collections::HashSet;

use proptest::prelude::*;

use nodecode_core::scope;
use nodecode_core::{NodeId, NodeKind, NodeTable, NodeType};

#[derive(Debug, Clone)]
enum Edit {
    Connect { consumer: usize, slot: usize, producer: usize },
    Disconnect { consumer: usize, slot: usize },
    Remove { node: usize },
    Move { node: usize, x: i8, y: i8 },
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        4 => (0..16usize, 0..4usize, 0..16usize)
            .prop_map(|(consumer, slot, producer)| Edit::Connect { consumer, slot, producer }),
        2 => (0..16usize, 0..4usize)
            .prop_map(|(consumer, slot)| Edit::Disconnect { consumer, slot }),
        1 => (0..16usize).prop_map(|node| Edit::Remove { node }),
        1 => (0..16usize, any::<i8>(), any::<i8>())
            .prop_map(|(node, x, y)| Edit::Move { node, x, y }),
    ]
}

/// One node of every type plus a few extra value producers, spread around a
/// function rectangle so that cascades hit some of them.
fn starter_board() -> (NodeTable, Vec<NodeId>) {
    let mut table = NodeTable::new();
    let mut ids: Vec<NodeId> = NodeType::ALL
        .iter()
        .enumerate()
        .map(|(i, node_type)| table.add_node(*node_type, (i as f64) * 3.0 - 12.0, 0.0))
        .collect();
    ids.push(table.add(NodeKind::parameter("y", "number"), 1.0, 1.0));
    ids.push(table.add(NodeKind::number(7.0), 30.0, 0.0));
    ids.push(table.add(NodeKind::variable("shared", "number"), -30.0, 0.0));
    (table, ids)
}

fn apply(table: &mut NodeTable, ids: &[NodeId], edit: &Edit) {
    // Edits addressing removed nodes report NodeNotFound; that is fine here.
    let _ = match *edit {
        Edit::Connect { consumer, slot, producer } => table
            .connect(ids[consumer], slot, ids[producer])
            .map(|_| ()),
        Edit::Disconnect { consumer, slot } => {
            table.disconnect_input(ids[consumer], slot).map(|_| ())
        }
        Edit::Remove { node } => table.remove_node(ids[node]).map(|_| ()),
        Edit::Move { node, x, y } => table.move_node(ids[node], x as f64, y as f64),
    };
}

proptest! {
    #[test]
    fn link_invariant_survives_any_edit_sequence(edits in prop::collection::vec(edit(), 0..60)) {
        let (mut table, ids) = starter_board();
        for edit in &edits {
            apply(&mut table, &ids, edit);
            prop_assert!(
                table.validate_links().is_ok(),
                "after {:?}: {:?}",
                edit,
                table.validate_links()
            );
        }
    }

    #[test]
    fn removing_a_function_removes_exactly_its_scope(
        edits in prop::collection::vec(edit(), 0..40)
    ) {
        let (mut table, ids) = starter_board();
        for edit in &edits {
            apply(&mut table, &ids, edit);
        }
        let Some(function) = scope::functions(&table).first().map(|node| node.id) else {
            return Ok(());
        };

        let expected: HashSet<NodeId> =
            scope::nodes_in_function(&table, table.get(function).unwrap())
                .iter()
                .map(|node| node.id)
                .chain(std::iter::once(function))
                .collect();
        let before: HashSet<NodeId> = table.ids().collect();

        let removed: HashSet<NodeId> = table
            .remove_node(function)
            .unwrap()
            .into_iter()
            .map(|node| node.id)
            .collect();

        prop_assert_eq!(&removed, &expected);
        let after: HashSet<NodeId> = table.ids().collect();
        prop_assert_eq!(after, &before - &expected);
        prop_assert!(table.validate_links().is_ok());
        for node in table.iter() {
            for producer in node.kind.inputs().iter().flatten() {
                prop_assert!(!removed.contains(producer));
            }
            for consumer in node.kind.consumers() {
                prop_assert!(!removed.contains(&consumer));
            }
        }
    }
}
