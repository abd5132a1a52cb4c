//! Mapping graph engine for visually defined field mappings.
//!
//! Source fields feed target fields through connection edges. The graph derives
//! calculation expressions from its topology, lays itself out deterministically
//! and converts to and from the portable JSON mapping document.

pub mod config;
pub mod core;
pub mod mapping;

pub use crate::config::{ConfigError, EditorConfig};
pub use crate::core::discovery::{DelimitedHeaderReader, DiscoveryReport, HeaderError, HeaderReader, SourceFile};
pub use crate::core::events::{EditorEvent, EventOutcome};
pub use crate::core::graph::{Connection, Edge, GraphError, MappingGraph, Node};
pub use crate::core::types::{Calculation, CalculationMode, EdgeId, FieldRole, NodeId, NodeKind, Provenance};
pub use crate::mapping::{CoverageReport, ImportStatus, ImportSummary, MappingError, MappingRecord};
