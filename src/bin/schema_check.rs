//! Print the relation plans the loader would use for a directory of series
//! files, without touching a database.
//!
//! Usage: `schema_check <SEPARATED_DIR> [OUT_YAML]` (default `schemas.yaml`).

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use wdi_etl::schema::{derive_plan, Column};

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let dir = match args.next() {
        Some(d) => PathBuf::from(d),
        None => bail!("Usage: schema_check <SEPARATED_DIR> [OUT_YAML]"),
    };
    let out = PathBuf::from(args.next().unwrap_or_else(|| "schemas.yaml".into()));
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    // relation → columns, sorted by relation name
    let mut plans: BTreeMap<String, Vec<Column>> = BTreeMap::new();
    for path in wdi_etl::list_files(&dir, "csv")? {
        let plan = plan_for(&path)?;
        if let Some(prev) = plans.insert(plan.relation.clone(), plan.columns) {
            bail!(
                "{} maps to relation `{}` already taken ({} columns)",
                path.display(),
                plan.relation,
                prev.len()
            );
        }
    }

    let yaml = serde_yaml::to_string(&plans)?;
    fs::write(&out, yaml).with_context(|| format!("writing {}", out.display()))?;
    println!("→ wrote {} ({} relations)", out.display(), plans.len());
    Ok(())
}

fn plan_for(path: &Path) -> Result<wdi_etl::schema::RelationPlan> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(derive_plan(path, &bytes)?)
}
