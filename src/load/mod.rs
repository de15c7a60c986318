// src/load/mod.rs
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::error::{EtlError, Result};
use crate::schema::{derive_plan, write_plan, RelationPlan};
use crate::store::RelationStore;

/// One relation created and filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRelation {
    pub relation: String,
    pub source: PathBuf,
    pub columns: usize,
    pub rows: u64,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub relations: Vec<LoadedRelation>,
}

impl LoadReport {
    pub fn total_rows(&self) -> u64 {
        self.relations.iter().map(|r| r.rows).sum()
    }
}

fn store_error(plan: &RelationPlan) -> impl Fn(sqlx::Error) -> EtlError + '_ {
    move |source| EtlError::Store {
        relation: plan.relation.clone(),
        file: plan.source.clone(),
        source,
    }
}

/// Create the relation for one series file and `COPY` its rows in.
///
/// The `CREATE TABLE` carries only the primary-key column; every other column is
/// added by its own `ALTER TABLE`. A relation that already exists, a duplicate
/// key or any other store error fails the file.
#[instrument(level = "info", skip(store, path, schema_dir), fields(path = %path.display()))]
pub async fn load_file<S: RelationStore + ?Sized>(
    store: &mut S,
    path: &Path,
    schema_dir: Option<&Path>,
) -> Result<LoadedRelation> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| EtlError::io(path, e))?;
    let plan = derive_plan(path, &bytes)?;
    let err = store_error(&plan);

    store.execute(&plan.create_statement()?).await.map_err(&err)?;
    for statement in plan.alter_statements()? {
        store.execute(&statement).await.map_err(&err)?;
    }
    let rows = store
        .copy_in(&plan.copy_statement(), &bytes)
        .await
        .map_err(&err)?;

    if let Some(dir) = schema_dir {
        write_plan(dir, &plan)?;
    }

    info!(relation = %plan.relation, columns = plan.columns.len(), rows, "relation loaded");
    Ok(LoadedRelation {
        relation: plan.relation.clone(),
        source: path.to_path_buf(),
        columns: plan.columns.len(),
        rows,
    })
}

/// The load stage: every `*.csv` in `source_dir`, in name order, one at a time.
/// The first failure halts the stage; relations already loaded stay.
#[instrument(level = "info", skip_all, fields(source = %source_dir.display()))]
pub async fn load_all<S: RelationStore + ?Sized>(
    store: &mut S,
    source_dir: &Path,
    schema_dir: Option<&Path>,
) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    for path in crate::list_files(source_dir, "csv")? {
        report
            .relations
            .push(load_file(store, &path, schema_dir).await?);
    }
    info!(
        relations = report.relations.len(),
        rows = report.total_rows(),
        "load stage complete"
    );
    Ok(report)
}
