// document shape detection + record normalization, nothing here touches the graph
use serde_json::Value;
use tracing::warn;

use crate::mapping::MappingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// `[ {mapping}, ... ]`
    Records,
    /// `{ "field_mappings": [ { "mappings": [ {mapping}, ... ] }, ... ] }`
    Categorized,
}

/// A mapping after normalization: `target_field`/`target` and
/// `source_field`/`source_fields` folded into one shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub target: String,
    pub source_fields: Vec<String>,
    pub calculation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub shape: DocumentShape,
    /// Raw mapping entries found, valid or not.
    pub raw_count: usize,
    pub records: Vec<ImportRecord>,
}

impl ParsedDocument {
    pub fn skipped(&self) -> usize {
        self.raw_count - self.records.len()
    }
}

/// Pick the raw mapping entries out of a document. Categories without a
/// `mappings` array are skipped with a warning.
pub fn detect_shape(doc: &Value) -> Result<(DocumentShape, Vec<&Value>), MappingError> {
    if let Value::Array(items) = doc {
        return Ok((DocumentShape::Records, items.iter().collect()));
    }

    let Some(Value::Array(categories)) = doc.as_object().and_then(|o| o.get("field_mappings")) else {
        return Err(MappingError::UnrecognizedShape);
    };

    let mut raw = Vec::new();
    for (index, category) in categories.iter().enumerate() {
        match category.get("mappings") {
            Some(Value::Array(mappings)) if category.is_object() => raw.extend(mappings.iter()),
            _ => warn!(index, "skipping category without a valid 'mappings' array"),
        }
    }
    Ok((DocumentShape::Categorized, raw))
}

//JSON truthiness: null, false, 0 and "" do not count as a value
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Normalize one raw entry; `None` (with a warning) when it is unusable.
pub fn normalize_record(index: usize, raw: &Value) -> Option<ImportRecord> {
    let Some(obj) = raw.as_object() else {
        warn!(index, "skipping mapping entry: not an object");
        return None;
    };

    let target = match obj.get("target_field") {
        Some(v) if truthy(v) => Some(v),
        _ => obj.get("target"),
    };
    let target = match target {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            warn!(index, "skipping mapping entry: missing or invalid target");
            return None;
        }
    };

    let source_fields = match (obj.get("source_fields"), obj.get("source_field")) {
        (Some(Value::Array(items)), _) => {
            let labels: Option<Vec<String>> = items.iter().map(|v| v.as_str().map(str::to_string)).collect();
            match labels {
                Some(labels) => labels,
                None => {
                    warn!(index, %target, "skipping mapping entry: non-string value in source_fields");
                    return None;
                }
            }
        }
        (_, Some(Value::String(single))) => vec![single.clone()],
        _ => Vec::new(),
    };

    let calculation = match obj.get("calculation") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            warn!(index, %target, "ignoring calculation that is not a string");
            None
        }
    };

    Some(ImportRecord {
        target,
        source_fields,
        calculation,
    })
}

pub fn normalize_records(raw: &[&Value]) -> Vec<ImportRecord> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, value)| normalize_record(index, value))
        .collect()
}

pub fn parse_value(doc: &Value) -> Result<ParsedDocument, MappingError> {
    let (shape, raw) = detect_shape(doc)?;
    Ok(ParsedDocument {
        shape,
        raw_count: raw.len(),
        records: normalize_records(&raw),
    })
}

pub fn parse_str(text: &str) -> Result<ParsedDocument, MappingError> {
    let doc: Value = serde_json::from_str(text)?;
    parse_value(&doc)
}
