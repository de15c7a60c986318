// src/pipeline.rs
use tracing::info;

use crate::config::{DbConfig, PipelineConfig};
use crate::error::Result;
use crate::extract::{extract_all, ExtractReport};
use crate::load::{load_all, LoadReport};
use crate::process::{split_all, SplitOptions, SplitReport};
use crate::store::{PgStore, RelationStore};

/// `source/*.zip` → `source/extracted/*.csv`.
pub fn extract_stage(cfg: &PipelineConfig) -> Result<ExtractReport> {
    extract_all(&cfg.source_dir, cfg.extracted_dir(), &cfg.member_suffix)
}

/// `source/extracted/*.csv` → `source/extracted/separated/<series>.csv`.
pub fn split_stage(cfg: &PipelineConfig) -> Result<SplitReport> {
    split_all(
        cfg.extracted_dir(),
        cfg.separated_dir(),
        cfg.lookup_path(),
        &SplitOptions::from(cfg),
    )
}

/// `source/extracted/separated/*.csv` → one relation each, through `store`.
pub async fn load_stage_with<S: RelationStore + ?Sized>(
    store: &mut S,
    cfg: &PipelineConfig,
) -> Result<LoadReport> {
    load_all(store, &cfg.separated_dir(), cfg.schema_dir.as_deref()).await
}

/// Connect, run the load stage and close the connection, on failure too.
pub async fn load_stage(cfg: &PipelineConfig, db: &DbConfig) -> Result<LoadReport> {
    let mut store = PgStore::connect(db).await?;
    let result = load_stage_with(&mut store, cfg).await;
    let closed = store.close().await;
    let report = result?;
    closed?;
    info!(relations = report.relations.len(), "database connection closed");
    Ok(report)
}
