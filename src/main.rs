use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use wdi_etl::{
    config::{DbConfig, PipelineConfig},
    pipeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    /// Pull `*_Data.csv` out of every archive
    Extract,
    /// Split extracted tables into one classified file per series
    Split,
    /// Create one relation per series file and load it
    Load,
    /// All three, in order
    All,
}

#[derive(Parser, Debug)]
#[command(name = "wdi-etl", version, about = "World Bank archive → Postgres ETL")]
struct Cli {
    /// Stage to run
    #[arg(value_enum, default_value_t = Stage::All)]
    stage: Stage,

    /// YAML pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the archives and the lookup file (overrides the config)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Persist inferred relation schemas as JSON here (overrides the config)
    #[arg(long)]
    schema_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "could not read .env");
        }
    }

    // ─── 2) configuration ────────────────────────────────────────────
    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(source) = cli.source {
        cfg.source_dir = source;
    }
    if cli.schema_dir.is_some() {
        cfg.schema_dir = cli.schema_dir;
    }
    info!(stage = ?cli.stage, source = %cfg.source_dir.display(), "startup");

    // credentials are checked before any stage touches the filesystem
    let db = match cli.stage {
        Stage::Load | Stage::All => {
            Some(DbConfig::from_env().context("reading database configuration")?)
        }
        Stage::Extract | Stage::Split => None,
    };

    // ─── 3) extract ──────────────────────────────────────────────────
    if matches!(cli.stage, Stage::Extract | Stage::All) {
        let stage_cfg = cfg.clone();
        let report = tokio::task::spawn_blocking(move || pipeline::extract_stage(&stage_cfg))
            .await?
            .context("extract stage")?;
        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            "extract done"
        );
    }

    // ─── 4) split ────────────────────────────────────────────────────
    if matches!(cli.stage, Stage::Split | Stage::All) {
        let stage_cfg = cfg.clone();
        let report = tokio::task::spawn_blocking(move || pipeline::split_stage(&stage_cfg))
            .await?
            .context("split stage")?;
        for (name, dropped) in report.unmatched.iter().filter(|(_, n)| **n > 0) {
            info!(series = %name, dropped, "rows without classification");
        }
        info!(series = report.written.len(), "split done");
    }

    // ─── 5) load ─────────────────────────────────────────────────────
    if let Some(db) = db {
        let report = pipeline::load_stage(&cfg, &db)
            .await
            .context("load stage")?;
        info!(
            relations = report.relations.len(),
            rows = report.total_rows(),
            "load done"
        );
    }

    info!("all done");
    Ok(())
}
