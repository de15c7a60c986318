use csv::ReaderBuilder;
use std::{io::Cursor, path::Path};
use tracing::debug;

use super::{Column, ColumnKind, RelationPlan};
use crate::error::{EtlError, Result};
use crate::naming::{column_identifier, relation_name};

/// Kind of a single cell; `None` for an empty cell.
pub fn infer_cell(raw: &str) -> Option<ColumnKind> {
    let v = raw.trim();
    if v.is_empty() {
        return None;
    }
    if v.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
        return Some(ColumnKind::Numeric);
    }
    if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false") {
        return Some(ColumnKind::Unrecognized);
    }
    Some(ColumnKind::Text)
}

/// For each column, look at every row:
///  - empty cells are ignored
///  - only numbers (or nothing at all) ⇒ numeric
///  - only boolean literals ⇒ unrecognized
///  - anything else, including mixes ⇒ text
pub fn derive_kinds(file: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<Vec<Column>> {
    let mut cols = Vec::with_capacity(headers.len());

    for (idx, raw_name) in headers.iter().enumerate() {
        let name = column_identifier(raw_name);
        if name.is_empty() {
            return Err(EtlError::EmptyHeader {
                file: file.to_path_buf(),
                index: idx,
            });
        }

        let (mut numeric, mut text, mut boolean) = (false, false, false);
        for cell in rows.iter().filter_map(|r| r.get(idx)) {
            match infer_cell(cell) {
                Some(ColumnKind::Numeric) => numeric = true,
                Some(ColumnKind::Text) => text = true,
                Some(ColumnKind::Unrecognized) => boolean = true,
                None => {}
            }
            if text {
                break;
            }
        }

        let kind = if text || (boolean && numeric) {
            ColumnKind::Text
        } else if boolean {
            ColumnKind::Unrecognized
        } else {
            ColumnKind::Numeric
        };
        debug!(column = %name, ?kind, "derived column kind");
        cols.push(Column { name, kind });
    }

    Ok(cols)
}

/// Build the relation plan for a series file from its bytes. Any unmapped column
/// kind is an error naming the relation and column.
pub fn derive_plan(path: &Path, bytes: &[u8]) -> Result<RelationPlan> {
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();
    let relation = relation_name(&file_name);

    let mut rdr = ReaderBuilder::new().from_reader(Cursor::new(bytes));
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| EtlError::csv(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(EtlError::EmptyHeader {
            file: path.to_path_buf(),
            index: 0,
        });
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| EtlError::csv(path, e))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let columns = derive_kinds(path, &headers, &rows)?;
    if let Some(bad) = columns.iter().find(|c| c.kind.sql_type().is_none()) {
        return Err(EtlError::UnmappedColumnType {
            relation,
            column: bad.name.clone(),
        });
    }

    Ok(RelationPlan {
        relation,
        source: path.to_path_buf(),
        columns,
    })
}
