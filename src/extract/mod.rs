// src/extract/mod.rs
use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};
use zip::ZipArchive;

use crate::error::{EtlError, Result};

/// Outcome of one extract stage.
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Files written into the target directory.
    pub written: Vec<PathBuf>,
    /// Archives that had no member with the configured suffix.
    pub skipped: Vec<PathBuf>,
}

/// Pull the first member of `archive_path` whose name ends with `suffix` and write
/// it, byte for byte, to `<target_dir>/<archive stem>.csv`.
///
/// Returns `Ok(None)` when no member matches. A file that is not a readable zip
/// container is fatal.
#[instrument(level = "info", skip(archive_path, target_dir), fields(archive = %archive_path.as_ref().display()))]
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    target_dir: Q,
    suffix: &str,
) -> Result<Option<PathBuf>> {
    let archive_path = archive_path.as_ref();
    let target_dir = target_dir.as_ref();

    let file = File::open(archive_path).map_err(|e| EtlError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|source| EtlError::CorruptArchive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|source| EtlError::CorruptArchive {
                path: archive_path.to_path_buf(),
                source,
            })?;
        if !entry.is_file() || !entry.name().ends_with(suffix) {
            continue;
        }

        let member = entry.name().to_string();
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .map_err(|e| EtlError::io(archive_path, e))?;

        fs::create_dir_all(target_dir).map_err(|e| EtlError::io(target_dir, e))?;
        let stem = archive_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive".to_string());
        let out_path = target_dir.join(format!("{stem}.csv"));
        fs::write(&out_path, &buf).map_err(|e| EtlError::io(&out_path, e))?;

        info!(member = %member, out = %out_path.display(), bytes = buf.len(), "extracted");
        return Ok(Some(out_path));
    }

    debug!(suffix, "no matching member; skipping");
    Ok(None)
}

/// Run [`extract_archive`] over every `*.zip` directly inside `source_dir`, in
/// filename order. The first corrupt archive halts the stage.
#[instrument(level = "info", skip(source_dir, target_dir), fields(source = %source_dir.as_ref().display()))]
pub fn extract_all<P: AsRef<Path>, Q: AsRef<Path>>(
    source_dir: P,
    target_dir: Q,
    suffix: &str,
) -> Result<ExtractReport> {
    let source_dir = source_dir.as_ref();
    let target_dir = target_dir.as_ref();
    fs::create_dir_all(target_dir).map_err(|e| EtlError::io(target_dir, e))?;

    let mut report = ExtractReport::default();
    for archive in crate::list_files(source_dir, "zip")? {
        match extract_archive(&archive, target_dir, suffix)? {
            Some(out) => report.written.push(out),
            None => report.skipped.push(archive),
        }
    }

    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        "extract stage complete"
    );
    Ok(report)
}
