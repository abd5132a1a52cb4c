use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a field node. Issued by [`crate::core::ids::IdGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a connection. A pure function of its endpoints so the same
/// (source, target) pair always yields the same edge id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn between(source: &NodeId, target: &NodeId) -> Self {
        Self(format!("edge-{}-{}", source, target))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Source,
    Target,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Source => f.write_str("source"),
            NodeKind::Target => f.write_str("target"),
        }
    }
}

/// Where a source field came from. The first occurrence of a label wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    File(String),
    Imported,
    Manual,
}

impl Provenance {
    pub fn file(name: impl Into<String>) -> Self {
        Provenance::File(name.into())
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            Provenance::File(name) => Some(name),
            _ => None,
        }
    }

    //id prefix, e.g. src-salary.xlsx / src-imported / src-manual
    pub(crate) fn id_prefix(&self) -> String {
        match self {
            Provenance::File(name) => format!("src-{}", name),
            Provenance::Imported => "src-imported".to_string(),
            Provenance::Manual => "src-manual".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    Auto,
    Manual,
}

/// How a target field is computed.
///
/// In `Auto` mode the expression is derived from the incoming connections on
/// every read; `Manual` carries a free-form expression that is never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "expression", rename_all = "snake_case")]
pub enum Calculation {
    #[default]
    Auto,
    Manual(String),
}

impl Calculation {
    pub fn manual(expression: impl Into<String>) -> Self {
        Calculation::Manual(expression.into())
    }

    /// `None` switches back to auto mode, the way the expression editor reports it.
    pub fn from_edit(expression: Option<String>) -> Self {
        match expression {
            Some(expr) => Calculation::Manual(expr),
            None => Calculation::Auto,
        }
    }

    pub fn mode(&self) -> CalculationMode {
        match self {
            Calculation::Auto => CalculationMode::Auto,
            Calculation::Manual(_) => CalculationMode::Manual,
        }
    }

    pub fn manual_expression(&self) -> Option<&str> {
        match self {
            Calculation::Auto => None,
            Calculation::Manual(expr) => Some(expr),
        }
    }
}

/// Role-specific attributes of a node. The variant is the node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRole {
    Source {
        provenance: Provenance,
        color: Option<String>,
    },
    Target {
        calculation: Calculation,
    },
}

impl FieldRole {
    pub fn kind(&self) -> NodeKind {
        match self {
            FieldRole::Source { .. } => NodeKind::Source,
            FieldRole::Target { .. } => NodeKind::Target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}
