use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use super::RelationPlan;
use crate::error::{EtlError, Result};

/// Write `plan` to `<dir>/<relation>_columns.json`, replacing any earlier copy.
///
/// Written to a temporary file first, then renamed over the target.
pub fn write_plan<P: AsRef<Path>>(dir: P, plan: &RelationPlan) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| EtlError::io(dir, e))?;

    let path = dir.join(format!("{}_columns.json", plan.relation));
    let tmp_path = dir.join(format!(".{}_columns.json.tmp", plan.relation));

    let mut tmp = fs::File::create(&tmp_path).map_err(|e| EtlError::io(&tmp_path, e))?;
    // pretty-print with a trailing newline
    serde_json::to_writer_pretty(&mut tmp, plan)?;
    tmp.write_all(b"\n").map_err(|e| EtlError::io(&tmp_path, e))?;
    drop(tmp);

    fs::rename(&tmp_path, &path).map_err(|e| EtlError::io(&path, e))?;
    Ok(path)
}

/// Read a plan written by [`write_plan`].
pub fn read_plan<P: AsRef<Path>>(path: P) -> Result<RelationPlan> {
    let path = path.as_ref();
    let f = fs::File::open(path).map_err(|e| EtlError::io(path, e))?;
    Ok(serde_json::from_reader(f)?)
}
