// discrete events coming from the canvas
use tracing::debug;

use crate::core::graph::{Connection, GraphError, MappingGraph};
use crate::core::types::{Calculation, NodeId, NodeKind, Provenance};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A new field showed up. `provenance` is ignored for targets.
    FieldDiscovered {
        kind: NodeKind,
        label: String,
        provenance: Provenance,
    },
    /// Drag or click-to-connect from `from` to `to`.
    Connect { from: NodeId, to: NodeId },
    /// Expression editor closed; `None` means "switch back to auto".
    ExpressionEdited { node: NodeId, expression: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Node(NodeId),
    Connected(Connection),
    CalculationUpdated,
}

impl MappingGraph {
    /// Apply one event to completion.
    pub fn apply(&mut self, event: EditorEvent) -> Result<EventOutcome, GraphError> {
        match event {
            EditorEvent::FieldDiscovered { kind, label, provenance } => {
                let id = match kind {
                    NodeKind::Source => self.add_source_field(&label, provenance),
                    NodeKind::Target => self.add_target_field(&label),
                };
                Ok(EventOutcome::Node(id))
            }
            EditorEvent::Connect { from, to } => {
                let conn = self.connect(&from, &to)?;
                debug!(edge = %conn.edge_id(), new = conn.is_new(), "connect gesture");
                Ok(EventOutcome::Connected(conn))
            }
            EditorEvent::ExpressionEdited { node, expression } => {
                self.set_calculation(&node, Calculation::from_edit(expression))?;
                Ok(EventOutcome::CalculationUpdated)
            }
        }
    }
}
