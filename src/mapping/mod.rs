//! Portable mapping document: export, import and validation.
//!
//! A mapping record describes one target field: its label, the labels of the
//! source fields feeding it and its calculation string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::graph::GraphError;

pub mod coverage;
pub mod document;
pub mod generator;
pub mod import;

pub use coverage::{coverage, CoverageReport, UnresolvedSource};
pub use document::{DocumentShape, ImportRecord, ParsedDocument};
pub use generator::{export_json, export_records, export_toon};
pub use import::{import_str, import_value, ImportStatus, ImportSummary};

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("mapping document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "unrecognized mapping document: expected an array of mappings, or an object whose \
         'field_mappings' is a list of objects carrying a 'mappings' array"
    )]
    UnrecognizedShape,

    #[error(
        "mapping document parsed but none of its {raw} records is usable \
         (check target_field/target and source_field/source_fields)"
    )]
    NoUsableRecords { raw: usize },

    #[error("no target fields, nothing to export")]
    NoTargets,

    #[error("failed to encode mapping document: {0}")]
    Encode(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// One exported mapping. `source_fields` is always sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub target: String,
    pub source_fields: Vec<String>,
    pub calculation: String,
}

impl From<ImportRecord> for MappingRecord {
    fn from(record: ImportRecord) -> Self {
        let mut source_fields = record.source_fields;
        source_fields.sort_unstable();
        Self {
            target: record.target,
            source_fields,
            calculation: record.calculation.unwrap_or_default(),
        }
    }
}
