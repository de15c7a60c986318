// src/schema/types.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Decimal places kept by inferred numeric columns.
pub const NUMERIC_SCALE: u32 = 2;
/// Total digits of inferred numeric columns.
pub const NUMERIC_PRECISION: u32 = 38;

/// What a column's values look like.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    /// Values the store has no mapping for (boolean literals).
    Unrecognized,
}

impl ColumnKind {
    /// Destination type, or `None` when there is no mapping.
    pub fn sql_type(self) -> Option<String> {
        match self {
            ColumnKind::Numeric => Some(format!("NUMERIC({NUMERIC_PRECISION}, {NUMERIC_SCALE})")),
            ColumnKind::Text => Some("TEXT".to_string()),
            ColumnKind::Unrecognized => None,
        }
    }
}

/// A destination column: SQL identifier plus inferred kind.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Everything needed to create and fill one relation. The first column is the
/// primary key.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct RelationPlan {
    pub relation: String,
    pub source: PathBuf,
    pub columns: Vec<Column>,
}
