/*
Export: graph snapshot -> mapping records.

    one record per target node, in the order targets were added

    source_fields: labels of connected sources, sorted

    calculation: manual expression, or the auto join of source_fields

An empty target set is a user error, not an empty document.
*/
use crate::core::expression::{connected_source_labels, effective_calculation};
use crate::core::graph::MappingGraph;
use crate::mapping::{MappingError, MappingRecord};

pub fn export_records(graph: &MappingGraph) -> Result<Vec<MappingRecord>, MappingError> {
    let (nodes, edges) = (graph.nodes(), graph.edges());
    let records: Vec<MappingRecord> = graph
        .target_nodes()
        .map(|target| MappingRecord {
            target: target.original_label.clone(),
            source_fields: connected_source_labels(&target.id, nodes, edges),
            calculation: effective_calculation(target, nodes, edges),
        })
        .collect();

    if records.is_empty() {
        return Err(MappingError::NoTargets);
    }
    Ok(records)
}

/// Pretty-printed JSON, two-space indent.
pub fn export_json(graph: &MappingGraph) -> Result<String, MappingError> {
    let records = export_records(graph)?;
    Ok(serde_json::to_string_pretty(&records)?)
}

/// The same records in TOON, a compact tabular encoding.
pub fn export_toon(graph: &MappingGraph) -> Result<String, MappingError> {
    let records = export_records(graph)?;
    toon_format::encode_default(&records).map_err(|e| MappingError::Encode(e.to_string()))
}

impl MappingGraph {
    pub fn export_mappings(&self) -> Result<Vec<MappingRecord>, MappingError> {
        export_records(self)
    }
}
