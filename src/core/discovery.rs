//! Field discovery from tabular files.
//!
//! Reading headers out of a workbook is the job of a [`HeaderReader`]; this
//! module turns the headers it returns into source and target nodes.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::core::graph::MappingGraph;
use crate::core::types::{NodeId, Provenance};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("header row {} is out of range, file has {} rows", .row + 1, .rows)]
    RowOutOfRange { row: usize, rows: usize },

    #[error("unreadable file: {0}")]
    Unreadable(String),
}

/// Extracts one header row from a tabular file.
///
/// Implementations return the row's cells trimmed, with empty cells removed,
/// and fail with [`HeaderError::RowOutOfRange`] when `row` does not exist.
pub trait HeaderReader {
    fn read_headers(&self, bytes: &[u8], row: usize) -> Result<Vec<String>, HeaderError>;
}

/// Header reader for delimited text tables (CSV, TSV, ...). Quoting follows
/// RFC 4180, blank lines are not counted as rows.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedHeaderReader {
    pub delimiter: u8,
}

impl DelimitedHeaderReader {
    pub fn csv() -> Self {
        Self { delimiter: b',' }
    }

    pub fn tsv() -> Self {
        Self { delimiter: b'\t' }
    }
}

impl HeaderReader for DelimitedHeaderReader {
    fn read_headers(&self, bytes: &[u8], row: usize) -> Result<Vec<String>, HeaderError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(self.delimiter)
            .from_reader(bytes);

        let mut rows = 0;
        for record in reader.records() {
            let record = record.map_err(|e| HeaderError::Unreadable(e.to_string()))?;
            if rows == row {
                return Ok(record
                    .iter()
                    .filter(|cell| !cell.is_empty())
                    .map(str::to_string)
                    .collect());
            }
            rows += 1;
        }
        Err(HeaderError::RowOutOfRange { row, rows })
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Loaded { file: String, headers: Vec<String>, created: usize },
    Failed { file: String, error: HeaderError },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscoveryReport {
    pub files: Vec<FileOutcome>,
    pub created: Vec<NodeId>,
}

impl DiscoveryReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &HeaderError)> + '_ {
        self.files.iter().filter_map(|f| match f {
            FileOutcome::Failed { file, error } => Some((file.as_str(), error)),
            FileOutcome::Loaded { .. } => None,
        })
    }
}

/// Read the header row of every file in order and add the fields as source
/// nodes. A bad file is reported and skipped, the rest of the batch goes on.
/// File N sees every node created by files 0..N.
pub fn discover_sources<R: HeaderReader + ?Sized>(
    graph: &mut MappingGraph,
    reader: &R,
    files: &[SourceFile],
    row: usize,
) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();
    //colour index continues after the files already on the canvas
    let base_index = graph.source_files().len();
    let mut file_colors: HashMap<String, Option<String>> = HashMap::new();

    for (file_index, file) in files.iter().enumerate() {
        let color = file_colors
            .entry(file.name.clone())
            .or_insert_with(|| graph.palette().color_for(base_index + file_index).map(str::to_string))
            .clone();

        let headers = match reader.read_headers(&file.bytes, row) {
            Ok(headers) => headers,
            Err(error) => {
                warn!(file = %file.name, %error, "skipping source file");
                report.files.push(FileOutcome::Failed {
                    file: file.name.clone(),
                    error,
                });
                continue;
            }
        };
        if headers.is_empty() {
            warn!(file = %file.name, row = row + 1, "no fields found in header row");
        }

        let mut created = 0;
        for label in &headers {
            let (id, is_new) = graph.insert_source(label, Provenance::file(&file.name), color.clone());
            if is_new {
                created += 1;
                report.created.push(id);
            }
        }
        report.files.push(FileOutcome::Loaded {
            file: file.name.clone(),
            headers,
            created,
        });
    }

    if !report.created.is_empty() {
        graph.relayout();
    }
    info!(files = files.len(), created = report.created.len(), "source discovery finished");
    report
}

/// Read the target file's header row and add the fields as target nodes.
/// Returns the ids of the nodes that were actually created.
pub fn discover_target<R: HeaderReader + ?Sized>(
    graph: &mut MappingGraph,
    reader: &R,
    file: &SourceFile,
    row: usize,
) -> Result<Vec<NodeId>, HeaderError> {
    let headers = reader.read_headers(&file.bytes, row)?;
    if headers.is_empty() {
        warn!(file = %file.name, row = row + 1, "no target fields found in header row");
    }

    let created: Vec<NodeId> = headers
        .iter()
        .filter_map(|label| match graph.insert_target(label, None) {
            (id, true) => Some(id),
            (_, false) => None,
        })
        .collect();

    if !created.is_empty() {
        graph.relayout();
    }
    info!(file = %file.name, created = created.len(), "target discovery finished");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeaderConfig, PaletteConfig};
    use crate::core::ids::IdGenerator;
    use crate::core::types::Position;

    fn mk_graph() -> MappingGraph {
        MappingGraph::new().with_id_generator(IdGenerator::with_epoch(0))
    }

    fn csv(name: &str, text: &str) -> SourceFile {
        SourceFile::new(name, text.as_bytes().to_vec())
    }

    #[test]
    fn delimited_reader_trims_and_drops_empty_cells() {
        let reader = DelimitedHeaderReader::csv();
        let bytes = b"title,,\nsubtitle\n Base ,\"Bonus\",,Tax \n1,2,3";

        assert_eq!(reader.read_headers(bytes, 2).unwrap(), vec!["Base", "Bonus", "Tax"]);
        assert_eq!(
            reader.read_headers(bytes, 4),
            Err(HeaderError::RowOutOfRange { row: 4, rows: 4 })
        );
    }

    #[test]
    fn quoted_headers_keep_delimiters_and_escapes() {
        let reader = DelimitedHeaderReader::csv();

        assert_eq!(reader.read_headers(b"\"Base, Pay\",Tax", 0).unwrap(), vec!["Base, Pay", "Tax"]);
        assert_eq!(
            reader.read_headers(b"\"Say \"\"hi\"\"\",X", 0).unwrap(),
            vec!["Say \"hi\"", "X"]
        );
    }

    #[test]
    fn invalid_utf8_is_unreadable() {
        let err = DelimitedHeaderReader::csv().read_headers(b"A,\xff\xfe", 0).unwrap_err();
        assert!(matches!(err, HeaderError::Unreadable(_)));
    }

    #[test]
    fn row_out_of_range_message_is_one_based() {
        let err = HeaderError::RowOutOfRange { row: 2, rows: 1 };
        assert_eq!(err.to_string(), "header row 3 is out of range, file has 1 rows");
    }

    #[test]
    fn sources_from_several_files_dedupe_and_keep_going_after_a_bad_file() {
        let mut g = mk_graph();
        let files = vec![
            csv("a.csv", "Base,Bonus"),
            csv("short.csv", ""),
            csv("b.csv", "Bonus,Tax"),
        ];

        let report = discover_sources(&mut g, &DelimitedHeaderReader::csv(), &files, 0);

        assert_eq!(report.created.len(), 3);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.failures().next().unwrap().0, "short.csv");
        assert_eq!(
            report.files[2],
            FileOutcome::Loaded {
                file: "b.csv".to_string(),
                headers: vec!["Bonus".to_string(), "Tax".to_string()],
                created: 1,
            }
        );

        //Bonus keeps the provenance of the first file that had it
        let bonus = g.find_source("Bonus").unwrap().clone();
        assert_eq!(g.node(&bonus).unwrap().provenance(), Some(&Provenance::file("a.csv")));
    }

    #[test]
    fn colors_follow_the_running_file_index() {
        let mut g = mk_graph();
        let palette = PaletteConfig::default();
        discover_sources(&mut g, &DelimitedHeaderReader::csv(), &[csv("a.csv", "A")], 0);
        discover_sources(
            &mut g,
            &DelimitedHeaderReader::csv(),
            &[csv("b.csv", "B"), csv("c.csv", "C")],
            0,
        );

        let color = |label: &str| {
            let id = g.find_source(label).unwrap();
            g.node(id).unwrap().color().map(str::to_string)
        };
        assert_eq!(color("A").as_deref(), palette.color_for(0));
        assert_eq!(color("B").as_deref(), palette.color_for(1));
        assert_eq!(color("C").as_deref(), palette.color_for(2));
    }

    #[test]
    fn discovered_nodes_are_laid_out() {
        let mut g = mk_graph();
        discover_sources(&mut g, &DelimitedHeaderReader::csv(), &[csv("a.csv", "B,A")], 0);

        let b = g.find_source("B").unwrap().clone();
        assert_eq!(g.node(&b).unwrap().position, Position::new(0.0, 86.0));
    }

    #[test]
    fn target_discovery_skips_existing_labels_and_reports_bad_rows() {
        let mut g = mk_graph();
        g.add_target_field("Gross");
        let reader = DelimitedHeaderReader::tsv();
        let row = HeaderConfig::default().target_row;

        let created = discover_target(&mut g, &reader, &csv("t.tsv", "x\ny\nGross\tNet"), row).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(g.target_nodes().count(), 2);

        let err = discover_target(&mut g, &reader, &csv("t.tsv", "Gross"), row).unwrap_err();
        assert_eq!(err, HeaderError::RowOutOfRange { row: 2, rows: 1 });
    }
}
