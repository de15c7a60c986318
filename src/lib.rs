//! Batch ETL for World Bank DataBank exports.
//!
//! Stages, each reading the previous stage's output directory:
//! `extract` (zip member → csv), `process` (wide table → one csv per series,
//! joined with the income classification) and `load` (schema inference,
//! `CREATE TABLE`, `COPY`).

pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod naming;
pub mod pipeline;
pub mod process;
pub mod schema;
pub mod store;

use glob::{glob, Pattern};
use std::path::{Path, PathBuf};

use error::{EtlError, Result};

/// Regular files directly inside `dir` with extension `ext`, sorted by name.
/// A missing directory yields an empty list.
pub fn list_files(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!("{}/*.{}", Pattern::escape(&dir.to_string_lossy()), ext);
    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            EtlError::io(path, e.into())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
