// merge imported mapping records into the graph
use serde_json::Value;
use tracing::info;

use crate::core::expression::join_auto;
use crate::core::graph::MappingGraph;
use crate::core::types::{Calculation, Provenance};
use crate::mapping::MappingError;
use crate::mapping::document::{self, ImportRecord, ParsedDocument};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub records: usize,
    pub skipped: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub manual_targets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatus {
    Applied(ImportSummary),
    /// The document had the right shape but no mapping entries at all.
    Empty,
}

/// Parse a mapping document and merge it into `graph`.
///
/// Shape and JSON errors are raised before anything is merged. Once merging
/// starts there is no rollback.
pub fn import_str(graph: &mut MappingGraph, text: &str) -> Result<ImportStatus, MappingError> {
    let doc: Value = serde_json::from_str(text)?;
    import_value(graph, &doc)
}

pub fn import_value(graph: &mut MappingGraph, doc: &Value) -> Result<ImportStatus, MappingError> {
    let parsed = document::parse_value(doc)?;
    import_parsed(graph, &parsed)
}

pub fn import_parsed(graph: &mut MappingGraph, parsed: &ParsedDocument) -> Result<ImportStatus, MappingError> {
    if parsed.records.is_empty() {
        if parsed.raw_count == 0 {
            info!("mapping document contains no mappings");
            return Ok(ImportStatus::Empty);
        }
        return Err(MappingError::NoUsableRecords { raw: parsed.raw_count });
    }

    let mut summary = merge_records(graph, &parsed.records)?;
    summary.skipped = parsed.skipped();
    info!(
        records = summary.records,
        skipped = summary.skipped,
        nodes = summary.nodes_created,
        edges = summary.edges_created,
        "imported mappings"
    );
    Ok(ImportStatus::Applied(summary))
}

/// Merge normalized records, then relayout once.
///
/// Manual vs auto is decided per record: the record's calculation is compared
/// with the auto join of *that record's* source labels only, not with every
/// edge the target ends up with.
pub fn merge_records(graph: &mut MappingGraph, records: &[ImportRecord]) -> Result<ImportSummary, MappingError> {
    let mut summary = ImportSummary::default();
    let color = graph.neutral_color();

    for record in records {
        let (target, created) = graph.insert_target(&record.target, Some("tgt-imported"));
        summary.nodes_created += usize::from(created);

        for label in &record.source_fields {
            let (source, created) = graph.insert_source(label, Provenance::Imported, color.clone());
            summary.nodes_created += usize::from(created);
            if graph.insert_edge(&source, &target)?.is_new() {
                summary.edges_created += 1;
            }
        }

        let auto = join_auto(&record.source_fields);
        let calculation = match &record.calculation {
            Some(calc) if *calc != auto || record.source_fields.is_empty() => Calculation::Manual(calc.clone()),
            _ => Calculation::Auto,
        };
        if let Calculation::Manual(_) = calculation {
            summary.manual_targets += 1;
        }
        graph.set_calculation(&target, calculation)?;
        summary.records += 1;
    }

    graph.relayout();
    Ok(summary)
}

impl MappingGraph {
    pub fn import_mappings(&mut self, text: &str) -> Result<ImportStatus, MappingError> {
        import_str(self, text)
    }
}
