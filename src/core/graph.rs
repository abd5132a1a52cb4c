// graph store: field nodes + connection edges, relayout on every structural change
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{EditorConfig, LayoutConfig, PaletteConfig};
use crate::core::ids::IdGenerator;
use crate::core::layout::{self, Layout};
use crate::core::types::{Calculation, EdgeId, FieldRole, NodeId, NodeKind, Position, Provenance, Size};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("node {0} cannot be connected to itself")]
    SelfLoop(NodeId),

    #[error("{from} and {to} are both {kind} fields")]
    SameKind { from: NodeId, to: NodeId, kind: NodeKind },

    #[error("connection must run from a source field to a target field, got {from} -> {to}")]
    WrongDirection { from: NodeId, to: NodeId },

    #[error("node {0} is not a target field")]
    NotATarget(NodeId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub original_label: String,
    pub role: FieldRole,
    /// Written by the layout engine only.
    pub position: Position,
    /// Authored size, if the canvas measured one.
    pub size: Option<Size>,
}

impl Node {
    pub fn source(id: NodeId, label: impl Into<String>, provenance: Provenance, color: Option<String>) -> Self {
        Self {
            id,
            original_label: label.into(),
            role: FieldRole::Source { provenance, color },
            position: Position::default(),
            size: None,
        }
    }

    pub fn target(id: NodeId, label: impl Into<String>) -> Self {
        Self {
            id,
            original_label: label.into(),
            role: FieldRole::Target {
                calculation: Calculation::Auto,
            },
            position: Position::default(),
            size: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.role.kind()
    }

    pub fn is_source(&self) -> bool {
        self.kind() == NodeKind::Source
    }

    pub fn is_target(&self) -> bool {
        self.kind() == NodeKind::Target
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match &self.role {
            FieldRole::Source { provenance, .. } => Some(provenance),
            FieldRole::Target { .. } => None,
        }
    }

    pub fn color(&self) -> Option<&str> {
        match &self.role {
            FieldRole::Source { color, .. } => color.as_deref(),
            FieldRole::Target { .. } => None,
        }
    }

    pub fn calculation(&self) -> Option<&Calculation> {
        match &self.role {
            FieldRole::Target { calculation } => Some(calculation),
            FieldRole::Source { .. } => None,
        }
    }
}

/// "source field feeds target field"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: EdgeId::between(&source, &target),
            source,
            target,
        }
    }
}

/// Result of a connect request. Connecting an already connected pair is not
/// an error, it just hands back the existing edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    Created(EdgeId),
    Existing(EdgeId),
}

impl Connection {
    pub fn edge_id(&self) -> &EdgeId {
        match self {
            Connection::Created(id) | Connection::Existing(id) => id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Connection::Created(_))
    }
}

#[derive(Debug, Clone)]
pub struct MappingGraph {
    nodes: Vec<Node>,
    node_index: HashMap<NodeId, usize>,
    source_labels: HashMap<String, NodeId>,
    target_labels: HashMap<String, NodeId>,
    edges: Vec<Edge>,
    edge_ids: HashSet<EdgeId>,
    ids: IdGenerator,
    layout_config: LayoutConfig,
    palette: PaletteConfig,
    last_layout: Layout,
}

impl Default for MappingGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingGraph {
    pub fn new() -> Self {
        Self::with_config(&EditorConfig::default())
    }

    pub fn with_config(config: &EditorConfig) -> Self {
        Self {
            nodes: Vec::new(),
            node_index: HashMap::new(),
            source_labels: HashMap::new(),
            target_labels: HashMap::new(),
            edges: Vec::new(),
            edge_ids: HashSet::new(),
            ids: IdGenerator::new(),
            layout_config: config.layout.clone(),
            palette: config.palette.clone(),
            last_layout: Layout::default(),
        }
    }

    /// Replace the identifier generator, e.g. with a fixed epoch in tests.
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    //snapshot accessors

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    pub fn source_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|n| n.is_source())
    }

    pub fn target_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|n| n.is_target())
    }

    pub fn find_source(&self, label: &str) -> Option<&NodeId> {
        self.source_labels.get(label)
    }

    pub fn find_target(&self, label: &str) -> Option<&NodeId> {
        self.target_labels.get(label)
    }

    /// Edges feeding `target`, in insertion order.
    pub fn incoming<'a>(&'a self, target: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.target == target)
    }

    pub fn is_connected(&self, source: &NodeId, target: &NodeId) -> bool {
        self.edge_ids.contains(&EdgeId::between(source, target))
    }

    pub fn last_layout(&self) -> &Layout {
        &self.last_layout
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    pub fn palette(&self) -> &PaletteConfig {
        &self.palette
    }

    /// Distinct originating files of source fields, in first-seen order.
    pub fn source_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for name in self.source_nodes().filter_map(|n| n.provenance().and_then(Provenance::file_name)) {
            if !files.contains(&name) {
                files.push(name);
            }
        }
        files
    }

    //public mutations, each one relayouts if it changed the structure

    /// Add a source field, or return the existing node with that label.
    pub fn add_source_field(&mut self, label: &str, provenance: Provenance) -> NodeId {
        let color = self.default_color(&provenance);
        let (id, created) = self.insert_source(label, provenance, color);
        if created {
            self.relayout();
        }
        id
    }

    /// Add a target field in auto mode, or return the existing node with that label.
    pub fn add_target_field(&mut self, label: &str) -> NodeId {
        let (id, created) = self.insert_target(label, None);
        if created {
            self.relayout();
        }
        id
    }

    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Result<Connection, GraphError> {
        let conn = self.insert_edge(source, target)?;
        if conn.is_new() {
            self.relayout();
        }
        Ok(conn)
    }

    /// Manual connection by label; missing fields are created on the way.
    pub fn connect_labels(&mut self, source_label: &str, target_label: &str) -> Result<Connection, GraphError> {
        let color = self.default_color(&Provenance::Manual);
        let (source, new_source) = self.insert_source(source_label, Provenance::Manual, color);
        let (target, new_target) = self.insert_target(target_label, Some("tgt-manual"));
        let conn = self.insert_edge(&source, &target)?;
        if new_source || new_target || conn.is_new() {
            self.relayout();
        }
        Ok(conn)
    }

    pub fn disconnect(&mut self, edge_id: &EdgeId) -> Result<Edge, GraphError> {
        let pos = self
            .edges
            .iter()
            .position(|e| &e.id == edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound(edge_id.clone()))?;
        let edge = self.edges.remove(pos);
        self.edge_ids.remove(&edge.id);
        self.relayout();
        Ok(edge)
    }

    /// Attribute-only: does not relayout.
    pub fn set_calculation(&mut self, target: &NodeId, calculation: Calculation) -> Result<(), GraphError> {
        let node = self.node_mut(target)?;
        match &mut node.role {
            FieldRole::Target { calculation: current } => {
                *current = calculation;
                Ok(())
            }
            FieldRole::Source { .. } => Err(GraphError::NotATarget(target.clone())),
        }
    }

    /// Record the size the canvas measured for a node (None falls back to the
    /// configured default) and relayout.
    pub fn set_node_size(&mut self, id: &NodeId, size: Option<Size>) -> Result<(), GraphError> {
        self.node_mut(id)?.size = size;
        self.relayout();
        Ok(())
    }

    /// Recompute every position from the full node/edge set.
    pub fn relayout(&mut self) {
        let layout = layout::layout(&self.nodes, &self.edges, &self.layout_config);
        for node in self.nodes.iter_mut() {
            node.position = layout.position(&node.id).unwrap_or_default();
        }
        self.last_layout = layout;
    }

    //batch building blocks: no relayout, callers relayout once when done

    pub(crate) fn insert_source(&mut self, label: &str, provenance: Provenance, color: Option<String>) -> (NodeId, bool) {
        if let Some(existing) = self.source_labels.get(label) {
            debug!(label, "source field already exists, skipping duplicate");
            return (existing.clone(), false);
        }
        let id = NodeId::new(self.ids.next(&provenance.id_prefix()));
        self.push_node(Node::source(id.clone(), label, provenance, color));
        self.source_labels.insert(label.to_string(), id.clone());
        (id, true)
    }

    //prefix defaults to "tgt"; imports use "tgt-imported"
    pub(crate) fn insert_target(&mut self, label: &str, prefix: Option<&str>) -> (NodeId, bool) {
        if let Some(existing) = self.target_labels.get(label) {
            debug!(label, "target field already exists, skipping duplicate");
            return (existing.clone(), false);
        }
        let id = NodeId::new(self.ids.next(prefix.unwrap_or("tgt")));
        self.push_node(Node::target(id.clone(), label));
        self.target_labels.insert(label.to_string(), id.clone());
        (id, true)
    }

    pub(crate) fn insert_edge(&mut self, source: &NodeId, target: &NodeId) -> Result<Connection, GraphError> {
        if source == target {
            return Err(GraphError::SelfLoop(source.clone()));
        }
        let source_kind = self.node(source).ok_or_else(|| GraphError::NodeNotFound(source.clone()))?.kind();
        let target_kind = self.node(target).ok_or_else(|| GraphError::NodeNotFound(target.clone()))?.kind();

        match (source_kind, target_kind) {
            (NodeKind::Source, NodeKind::Target) => {}
            (NodeKind::Target, NodeKind::Source) => {
                return Err(GraphError::WrongDirection {
                    from: source.clone(),
                    to: target.clone(),
                });
            }
            (kind, _) => {
                return Err(GraphError::SameKind {
                    from: source.clone(),
                    to: target.clone(),
                    kind,
                });
            }
        }

        let edge = Edge::new(source.clone(), target.clone());
        if self.edge_ids.contains(&edge.id) {
            debug!(edge = %edge.id, "already connected");
            return Ok(Connection::Existing(edge.id));
        }
        let id = edge.id.clone();
        self.edge_ids.insert(id.clone());
        self.edges.push(edge);
        Ok(Connection::Created(id))
    }

    pub(crate) fn neutral_color(&self) -> Option<String> {
        Some(self.palette.neutral_color.clone())
    }

    //file sources get the palette colour of their file, everything else the neutral one
    fn default_color(&self, provenance: &Provenance) -> Option<String> {
        match provenance {
            Provenance::File(name) => {
                let files = self.source_files();
                let index = files.iter().position(|f| *f == name.as_str()).unwrap_or(files.len());
                self.palette.color_for(index).map(str::to_string)
            }
            Provenance::Imported | Provenance::Manual => self.neutral_color(),
        }
    }

    fn push_node(&mut self, node: Node) {
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut Node, GraphError> {
        let i = *self.node_index.get(id).ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        Ok(&mut self.nodes[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CalculationMode;

    fn mk_graph() -> MappingGraph {
        MappingGraph::new().with_id_generator(IdGenerator::with_epoch(0))
    }

    #[test]
    fn add_fields_is_idempotent_per_label_and_kind() {
        let mut g = mk_graph();

        let a = g.add_source_field("Base", Provenance::file("pay.xlsx"));
        let again = g.add_source_field("Base", Provenance::file("other.xlsx"));
        let t = g.add_target_field("Base");

        assert_eq!(a, again);
        assert_ne!(a, t, "source and target label scopes are separate");
        assert_eq!(g.nodes().len(), 2);

        //first provenance wins
        assert_eq!(g.node(&a).unwrap().provenance(), Some(&Provenance::file("pay.xlsx")));
        assert_eq!(g.target_nodes().count(), 1);
        assert_eq!(g.find_target("Base"), Some(&t));
    }

    #[test]
    fn ids_carry_role_and_provenance_prefixes() {
        let mut g = mk_graph();

        let s = g.add_source_field("Base", Provenance::file("pay.xlsx"));
        let i = g.add_source_field("Bonus", Provenance::Imported);
        let t = g.add_target_field("Gross");

        assert_eq!(s.as_str(), "src-pay.xlsx-0-0");
        assert_eq!(i.as_str(), "src-imported-0-1");
        assert_eq!(t.as_str(), "tgt-0-2");
    }

    #[test]
    fn new_targets_start_in_auto_mode() {
        let mut g = mk_graph();
        let t = g.add_target_field("Gross");

        let calc = g.node(&t).unwrap().calculation().unwrap();
        assert_eq!(calc.mode(), CalculationMode::Auto);
    }

    #[test]
    fn connect_rejects_same_kind_self_loop_and_reverse() {
        let mut g = mk_graph();
        let a = g.add_source_field("A", Provenance::Manual);
        let b = g.add_source_field("B", Provenance::Manual);
        let x = g.add_target_field("X");
        let y = g.add_target_field("Y");

        assert!(matches!(g.connect(&a, &b), Err(GraphError::SameKind { kind: NodeKind::Source, .. })));
        assert!(matches!(g.connect(&x, &y), Err(GraphError::SameKind { kind: NodeKind::Target, .. })));
        assert_eq!(g.connect(&a, &a), Err(GraphError::SelfLoop(a.clone())));
        assert!(matches!(g.connect(&x, &a), Err(GraphError::WrongDirection { .. })));
        assert_eq!(
            g.connect(&a, &NodeId::new("tgt-nope")),
            Err(GraphError::NodeNotFound(NodeId::new("tgt-nope")))
        );
        assert!(g.edges().is_empty());
    }

    #[test]
    fn duplicate_connect_yields_one_edge() {
        let mut g = mk_graph();
        let a = g.add_source_field("A", Provenance::Manual);
        let x = g.add_target_field("X");

        let first = g.connect(&a, &x).unwrap();
        let second = g.connect(&a, &x).unwrap();

        assert!(first.is_new());
        assert_eq!(second, Connection::Existing(first.edge_id().clone()));
        assert_eq!(g.edges().len(), 1);
        assert!(g.is_connected(&a, &x));
    }

    #[test]
    fn structural_mutations_relayout() {
        let mut g = mk_graph();
        let b = g.add_source_field("B", Provenance::Manual);
        assert_eq!(g.node(&b).unwrap().position, Position::new(0.0, 0.0));

        //A sorts before B, so B moves down
        let a = g.add_source_field("A", Provenance::Manual);
        assert_eq!(g.node(&a).unwrap().position, Position::new(0.0, 0.0));
        assert_eq!(g.node(&b).unwrap().position, Position::new(0.0, 86.0));

        let x = g.add_target_field("X");
        assert_eq!(g.node(&x).unwrap().position.x, 272.0);
        assert_eq!(g.last_layout().rank_of(&x), Some(1));
    }

    #[test]
    fn set_calculation_switches_modes_and_rejects_sources() {
        let mut g = mk_graph();
        let a = g.add_source_field("A", Provenance::Manual);
        let x = g.add_target_field("X");

        g.set_calculation(&x, Calculation::manual("A * 2")).unwrap();
        assert_eq!(g.node(&x).unwrap().calculation(), Some(&Calculation::manual("A * 2")));

        g.set_calculation(&x, Calculation::Auto).unwrap();
        assert_eq!(g.node(&x).unwrap().calculation(), Some(&Calculation::Auto));

        assert_eq!(g.set_calculation(&a, Calculation::Auto), Err(GraphError::NotATarget(a)));
    }

    #[test]
    fn connect_labels_creates_missing_nodes() {
        let mut g = mk_graph();
        let existing = g.add_target_field("Gross");

        let conn = g.connect_labels("Base", "Gross").unwrap();

        assert!(conn.is_new());
        let source = g.find_source("Base").unwrap().clone();
        assert_eq!(g.node(&source).unwrap().provenance(), Some(&Provenance::Manual));
        assert_eq!(g.node(&source).unwrap().color(), Some("#f0f0f0"));
        assert!(g.is_connected(&source, &existing));
        assert_eq!(g.nodes().len(), 2);
    }

    #[test]
    fn disconnect_removes_edge_by_id() {
        let mut g = mk_graph();
        let a = g.add_source_field("A", Provenance::Manual);
        let x = g.add_target_field("X");
        let id = g.connect(&a, &x).unwrap().edge_id().clone();

        let removed = g.disconnect(&id).unwrap();

        assert_eq!(removed.source, a);
        assert!(g.edges().is_empty());
        assert!(!g.is_connected(&a, &x));
        assert_eq!(g.disconnect(&id), Err(GraphError::EdgeNotFound(id)));
    }

    #[test]
    fn file_sources_get_palette_color_per_file() {
        let mut g = mk_graph();
        let a = g.add_source_field("A", Provenance::file("one.xlsx"));
        let b = g.add_source_field("B", Provenance::file("two.xlsx"));
        let c = g.add_source_field("C", Provenance::file("one.xlsx"));

        let palette = PaletteConfig::default();
        assert_eq!(g.node(&a).unwrap().color(), palette.color_for(0));
        assert_eq!(g.node(&b).unwrap().color(), palette.color_for(1));
        assert_eq!(g.node(&c).unwrap().color(), palette.color_for(0));
        assert_eq!(g.source_files(), vec!["one.xlsx", "two.xlsx"]);
    }

    #[test]
    fn node_size_feeds_the_layout() {
        let mut g = mk_graph();
        let a = g.add_source_field("A", Provenance::Manual);
        let b = g.add_source_field("B", Provenance::Manual);

        g.set_node_size(&a, Some(Size::new(172.0, 100.0))).unwrap();

        assert_eq!(g.node(&b).unwrap().position, Position::new(0.0, 150.0));
    }
}
