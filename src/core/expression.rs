// auto-mode expression derivation, shared by display and export
use std::collections::HashMap;

use crate::core::graph::{Edge, MappingGraph, Node};
use crate::core::types::{Calculation, NodeId};

pub const AUTO_JOIN: &str = " + ";

/// Join source labels the way auto mode does: empty labels are ignored,
/// nothing gives "", a single label is used verbatim, several are sorted and
/// joined with " + " so the result does not depend on the order connections
/// were drawn in.
pub fn join_auto<S: AsRef<str>>(labels: &[S]) -> String {
    let mut sorted: Vec<&str> = labels.iter().map(AsRef::as_ref).filter(|l| !l.is_empty()).collect();
    sorted.sort_unstable();
    sorted.join(AUTO_JOIN)
}

/// Labels of the sources feeding `target`, sorted. Edges whose source is
/// missing from `nodes` are dropped, and so are empty labels.
pub fn connected_source_labels(target: &NodeId, nodes: &[Node], edges: &[Edge]) -> Vec<String> {
    let by_id: HashMap<&NodeId, &Node> = nodes.iter().map(|n| (&n.id, n)).collect();
    let mut labels: Vec<String> = edges
        .iter()
        .filter(|e| &e.target == target)
        .filter_map(|e| by_id.get(&e.source))
        .map(|n| n.original_label.clone())
        .filter(|label| !label.is_empty())
        .collect();
    labels.sort_unstable();
    labels
}

/// What auto mode currently computes for `target`.
pub fn resolve_auto(target: &NodeId, nodes: &[Node], edges: &[Edge]) -> String {
    join_auto(&connected_source_labels(target, nodes, edges))
}

/// Manual expression in manual mode, otherwise the auto expression. Source
/// nodes have no calculation and resolve to "".
pub fn effective_calculation(node: &Node, nodes: &[Node], edges: &[Edge]) -> String {
    match node.calculation() {
        Some(Calculation::Manual(expr)) => expr.clone(),
        Some(Calculation::Auto) => resolve_auto(&node.id, nodes, edges),
        None => String::new(),
    }
}

/// `"<label> = <calculation>"`, or just the label when there is nothing to show.
pub fn display_label(node: &Node, nodes: &[Node], edges: &[Edge]) -> String {
    let calc = effective_calculation(node, nodes, edges);
    if calc.is_empty() {
        node.original_label.clone()
    } else {
        format!("{} = {}", node.original_label, calc)
    }
}

impl MappingGraph {
    pub fn auto_expression(&self, target: &NodeId) -> String {
        resolve_auto(target, self.nodes(), self.edges())
    }

    pub fn effective_calculation(&self, node: &Node) -> String {
        effective_calculation(node, self.nodes(), self.edges())
    }

    /// Display strings of every target node, in insertion order.
    pub fn target_display_labels(&self) -> Vec<(NodeId, String)> {
        self.target_nodes()
            .map(|n| (n.id.clone(), display_label(n, self.nodes(), self.edges())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::core::ids::IdGenerator;
    use crate::core::types::Provenance;

    fn mk_graph() -> MappingGraph {
        MappingGraph::new().with_id_generator(IdGenerator::with_epoch(0))
    }

    #[test]
    fn join_rule_zero_one_many() {
        assert_eq!(join_auto::<&str>(&[]), "");
        assert_eq!(join_auto(&["Base"]), "Base");
        assert_eq!(join_auto(&["B", "A", "C"]), "A + B + C");
    }

    #[test]
    fn auto_expression_is_sorted_regardless_of_connect_order() {
        let mut g = mk_graph();
        let b = g.add_source_field("B", Provenance::Manual);
        let a = g.add_source_field("A", Provenance::Manual);
        let x = g.add_target_field("X");

        g.connect(&b, &x).unwrap();
        g.connect(&a, &x).unwrap();

        assert_eq!(g.auto_expression(&x), "A + B");
    }

    #[test]
    fn single_and_zero_sources() {
        let mut g = mk_graph();
        let a = g.add_source_field("Base Pay", Provenance::Manual);
        let x = g.add_target_field("X");
        let y = g.add_target_field("Y");
        g.connect(&a, &x).unwrap();

        assert_eq!(g.auto_expression(&x), "Base Pay");
        assert_eq!(g.auto_expression(&y), "");
    }

    #[test]
    fn dangling_edges_are_dropped() {
        let x = Node::target(NodeId::new("tgt-x"), "X");
        let a = Node::source(NodeId::new("src-a"), "A", Provenance::Manual, None);
        let edges = vec![
            Edge::new(a.id.clone(), x.id.clone()),
            Edge::new(NodeId::new("src-gone"), x.id.clone()),
        ];

        assert_eq!(resolve_auto(&x.id, &[a, x.clone()], &edges), "A");
    }

    #[test]
    fn empty_labels_never_reach_the_join() {
        assert_eq!(join_auto(&["", "A"]), "A");
        assert_eq!(join_auto(&[""]), "");

        let x = Node::target(NodeId::new("tgt-x"), "X");
        let blank = Node::source(NodeId::new("src-blank"), "", Provenance::Imported, None);
        let a = Node::source(NodeId::new("src-a"), "A", Provenance::Imported, None);
        let edges = vec![
            Edge::new(blank.id.clone(), x.id.clone()),
            Edge::new(a.id.clone(), x.id.clone()),
        ];
        let nodes = [blank, a, x.clone()];

        assert_eq!(connected_source_labels(&x.id, &nodes, &edges), vec!["A"]);
        assert_eq!(resolve_auto(&x.id, &nodes, &edges), "A");
    }

    #[test]
    fn effective_calculation_prefers_manual_expression() {
        let mut g = mk_graph();
        let a = g.add_source_field("A", Provenance::Manual);
        let x = g.add_target_field("X");
        g.connect(&a, &x).unwrap();

        g.set_calculation(&x, Calculation::manual("A * 1.1")).unwrap();
        let node = g.node(&x).unwrap().clone();
        assert_eq!(g.effective_calculation(&node), "A * 1.1");

        g.set_calculation(&x, Calculation::Auto).unwrap();
        let node = g.node(&x).unwrap().clone();
        assert_eq!(g.effective_calculation(&node), "A");
    }

    #[test]
    fn display_label_shows_calculation_when_non_empty() {
        let mut g = mk_graph();
        let a = g.add_source_field("A", Provenance::Manual);
        let b = g.add_source_field("B", Provenance::Manual);
        let x = g.add_target_field("X");
        let y = g.add_target_field("Y");
        let z = g.add_target_field("Z");
        g.connect(&b, &x).unwrap();
        g.connect(&a, &x).unwrap();
        g.set_calculation(&z, Calculation::manual("")).unwrap();

        let labels = g.target_display_labels();
        assert_eq!(
            labels,
            vec![
                (x, "X = A + B".to_string()),
                (y, "Y".to_string()),
                (z, "Z".to_string()),
            ]
        );
    }

    proptest! {
        #[test]
        fn join_is_order_independent(labels in proptest::collection::vec("[A-Za-z]{1,6}", 0..6)) {
            let mut reversed = labels.clone();
            reversed.reverse();
            prop_assert_eq!(join_auto(&labels), join_auto(&reversed));
        }
    }
}
