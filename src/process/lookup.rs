// src/process/lookup.rs
use csv::ReaderBuilder;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use super::utils::clean_header;
use crate::config::LookupLayout;
use crate::error::{EtlError, Result};

/// Classification label plus the lookup's secondary attributes for one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    pub label: String,
    pub extra: Vec<String>,
}

/// Entity code → income classification, read once per split stage.
#[derive(Debug, Clone)]
pub struct ClassificationLookup {
    pub path: PathBuf,
    /// Header of the label column, e.g. `"Income Group"`.
    pub label_header: String,
    /// Headers of the secondary attributes, in file order.
    pub extra_headers: Vec<String>,
    entries: HashMap<String, LookupEntry>,
}

impl ClassificationLookup {
    /// Read the lookup CSV. The code, label and table-name columns must all be
    /// present; a code listed twice is rejected.
    #[tracing::instrument(level = "info", skip(path, layout), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P, layout: &LookupLayout) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| EtlError::csv(path, e))?;

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| EtlError::csv(path, e))?
            .iter()
            .map(clean_header)
            .collect();

        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| EtlError::MissingColumn {
                    file: path.to_path_buf(),
                    column: column.to_string(),
                })
        };
        let code_idx = position(&layout.code)?;
        let label_idx = position(&layout.label)?;
        let table_idx = position(&layout.table_name)?;

        let extra_idx: Vec<usize> = (0..headers.len())
            .filter(|i| ![code_idx, label_idx, table_idx].contains(i))
            .filter(|&i| !headers[i].is_empty())
            .collect();
        let unnamed = headers.iter().filter(|h| h.is_empty()).count();
        if unnamed > 0 {
            warn!(unnamed, "lookup columns without a header ignored");
        }

        let mut entries = HashMap::new();
        for result in rdr.records() {
            let record = result.map_err(|e| EtlError::csv(path, e))?;
            let cell = |i: usize| record.get(i).unwrap_or("").to_string();

            let code = cell(code_idx).trim().to_string();
            if code.is_empty() {
                debug!("skipping lookup row without a code");
                continue;
            }
            let entry = LookupEntry {
                label: cell(label_idx),
                extra: extra_idx.iter().map(|&i| cell(i)).collect(),
            };
            if entries.insert(code.clone(), entry).is_some() {
                return Err(EtlError::DuplicateLookupCode {
                    file: path.to_path_buf(),
                    code,
                });
            }
        }

        info!(codes = entries.len(), "loaded classification lookup");
        Ok(Self {
            path: path.to_path_buf(),
            label_header: headers[label_idx].clone(),
            extra_headers: extra_idx.iter().map(|&i| headers[i].clone()).collect(),
            entries,
        })
    }

    pub fn get(&self, code: &str) -> Option<&LookupEntry> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
