// src/process/mod.rs
pub mod lookup;
pub mod split;
pub mod utils;

pub use lookup::{ClassificationLookup, LookupEntry};
pub use split::{split_all, split_table, write_series, SeriesTable, SplitOptions, SplitReport};

use csv::ReaderBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::TableLayout;
use crate::error::{EtlError, Result};
use utils::{clean_header, normalize_year_header};

#[derive(Debug, Clone)]
pub struct ExtractedTable {
    /// File the table was read from, kept for error reporting.
    pub path: PathBuf,
    pub headers: Vec<String>,
    /// Data rows, each padded or cut to `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

/// Read an extracted CSV and drop its last `footer_rows` records.
///
/// Blank lines are not records. Rows shorter than the header are padded with
/// empty cells; longer rows are cut.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_extracted_table<P: AsRef<Path>>(path: P, footer_rows: usize) -> Result<ExtractedTable> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .flexible(true) // footer rows carry fewer fields
        .from_path(path)
        .map_err(|e| EtlError::csv(path, e))?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| EtlError::csv(path, e))?
        .iter()
        .map(clean_header)
        .collect();

    let mut rows = Vec::new();
    let mut ragged = 0usize;
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| EtlError::csv(path, e))?;
        if record.len() > headers.len() {
            ragged += 1;
            debug!(record = idx, cells = record.len(), "ragged record");
        }
        let mut row: Vec<String> = record.iter().take(headers.len()).map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }
    if ragged > 0 {
        warn!(ragged, "rows with more cells than headers were cut");
    }

    let keep = rows.len().saturating_sub(footer_rows);
    rows.truncate(keep);

    Ok(ExtractedTable {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

impl ExtractedTable {
    /// Reorder to entity code, entity label, series, then the remaining columns in
    /// source order; drop the metadata column and any column without a header,
    /// and normalize year headers.
    ///
    /// After this the series value is always column 2.
    pub fn reshape(self, layout: &TableLayout) -> Result<Self> {
        let position = |column: &str| {
            self.headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| EtlError::MissingColumn {
                    file: self.path.clone(),
                    column: column.to_string(),
                })
        };
        let category = position(&layout.category)?;
        let code = position(&layout.entity_code)?;
        let label = position(&layout.entity_label)?;
        let metadata = position(&layout.metadata)?;

        let mut order = vec![code, label, category];
        order.extend(
            (0..self.headers.len())
                .filter(|i| ![code, label, category, metadata].contains(i))
                .filter(|&i| !self.headers[i].is_empty()),
        );
        let unnamed = self.headers.iter().filter(|h| h.is_empty()).count();
        if unnamed > 0 {
            warn!(unnamed, path = %self.path.display(), "columns without a header dropped");
        }

        let headers: Vec<String> = order
            .iter()
            .enumerate()
            .map(|(pos, &i)| {
                if pos < 3 {
                    self.headers[i].clone()
                } else {
                    normalize_year_header(&self.headers[i])
                }
            })
            .collect();
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| order.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Self {
            path: self.path,
            headers,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    pub(crate) const SAMPLE: &str = "\u{feff}Country Name,Country Code,Series Name,Series Code,2000 [YR2000],2001 [YR2001]
United States,USA,GDP growth (annual %),NY.GDP.MKTP.KD.ZG,4.1,1.0
Tanzania,TZA,GDP growth (annual %),NY.GDP.MKTP.KD.ZG,4.9,6.0
United States,USA,Inflation (annual %),FP.CPI.TOTL.ZG,3.4,2.8
Tanzania,TZA,Inflation (annual %),FP.CPI.TOTL.ZG,5.9,5.1
Kosovo,XKX,Inflation (annual %),FP.CPI.TOTL.ZG,..,..
,,,,,


Data from database: World Development Indicators,,,,,
Last Updated: 05/30/2023,,,,,
,,,,,
,,,,,
";

    #[test]
    fn footer_rows_are_dropped() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("WDI.csv");
        fs::write(&path, SAMPLE)?;

        let table = load_extracted_table(&path, 5)?;
        assert_eq!(table.headers[0], "Country Name");
        assert_eq!(table.rows.len(), 5);
        assert_eq!(table.rows[4][1], "XKX");
        Ok(())
    }

    #[test]
    fn reshape_moves_entity_columns_and_renames_years() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("WDI.csv");
        fs::write(&path, SAMPLE)?;

        let table = load_extracted_table(&path, 5)?.reshape(&TableLayout::default())?;
        assert_eq!(
            table.headers,
            vec!["Country Code", "Country Name", "Series Name", "YR2000", "YR2001"]
        );
        assert_eq!(
            table.rows[0],
            vec!["USA", "United States", "GDP growth (annual %)", "4.1", "1.0"]
        );
        Ok(())
    }

    #[test]
    fn unnamed_trailing_column_is_dropped() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("Trailing.csv");
        fs::write(
            &path,
            "Country Name,Country Code,Series Name,Series Code,2000 [YR2000],\n\
             Tanzania,TZA,GDP growth (annual %),NY.GDP.MKTP.KD.ZG,4.9,\n",
        )?;

        let table = load_extracted_table(&path, 0)?.reshape(&TableLayout::default())?;
        assert_eq!(
            table.headers,
            vec!["Country Code", "Country Name", "Series Name", "YR2000"]
        );
        assert_eq!(table.rows[0].len(), 4);
        Ok(())
    }

    #[test]
    fn missing_metadata_column_names_file_and_column() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("NoCode.csv");
        fs::write(
            &path,
            "Country Name,Country Code,Series Name,2000 [YR2000]\nA,AAA,S,1\n",
        )?;

        let err = load_extracted_table(&path, 0)?
            .reshape(&TableLayout::default())
            .unwrap_err();
        match err {
            EtlError::MissingColumn { file, column } => {
                assert_eq!(file, path);
                assert_eq!(column, "Series Code");
            }
            other => panic!("expected MissingColumn, got {other}"),
        }
        Ok(())
    }
}
