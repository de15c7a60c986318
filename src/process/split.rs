// src/process/split.rs
use csv::WriterBuilder;
use sha2::{Digest, Sha256};
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

use super::lookup::ClassificationLookup;
use super::utils::{clean_entity_label, clean_series_value};
use super::{load_extracted_table, ExtractedTable};
use crate::config::{CollisionPolicy, LookupLayout, PipelineConfig, TableLayout};
use crate::error::{EtlError, Result};
use crate::naming::{relation_name, series_file_stem, AcronymRegistry};

/// Knobs for one split stage.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub footer_rows: usize,
    pub layout: TableLayout,
    pub collision_policy: CollisionPolicy,
    pub acronym_prefix: bool,
    pub lookup: LookupLayout,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for SplitOptions {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            footer_rows: cfg.footer_rows,
            layout: cfg.layout.clone(),
            collision_policy: cfg.collision_policy,
            acronym_prefix: cfg.acronym_prefix,
            lookup: cfg.lookup.clone(),
        }
    }
}

/// One series of one extracted table, joined with the classification lookup and
/// ready to be written as `<name>.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    pub source: PathBuf,
    /// Series value as it appeared in the source, before cleaning.
    pub series: String,
    /// Output file stem.
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Source rows dropped because their entity code had no classification.
    pub unmatched: usize,
}

#[derive(Debug, Default)]
pub struct SplitReport {
    /// Extracted table → acronym issued for it.
    pub acronyms: BTreeMap<String, String>,
    pub written: Vec<PathBuf>,
    /// Output name → rows lost to the inner join.
    pub unmatched: BTreeMap<String, usize>,
}

/// Break one extracted table into its series. Nothing is written.
///
/// `prefix`, when given, is prepended to every derived name as `<prefix>_`.
#[instrument(level = "info", skip(path, lookup, options), fields(path = %path.as_ref().display()))]
pub fn split_table<P: AsRef<Path>>(
    path: P,
    lookup: &ClassificationLookup,
    options: &SplitOptions,
    prefix: Option<&str>,
) -> Result<Vec<SeriesTable>> {
    let table = load_extracted_table(path, options.footer_rows)?.reshape(&options.layout)?;
    Ok(group_and_join(&table, lookup, prefix))
}

fn group_and_join(
    table: &ExtractedTable,
    lookup: &ClassificationLookup,
    prefix: Option<&str>,
) -> Vec<SeriesTable> {
    // column order after reshape: code, label, series, years...
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Vec<String>>> = HashMap::new();
    let mut blank = 0usize;
    for row in &table.rows {
        let series = row[2].as_str();
        if series.is_empty() {
            blank += 1;
            continue;
        }
        groups
            .entry(series)
            .or_insert_with(|| {
                order.push(series);
                Vec::new()
            })
            .push(row);
    }
    if blank > 0 {
        debug!(blank, "rows without a series value ignored");
    }

    let mut headers = Vec::with_capacity(table.headers.len() + 1 + lookup.extra_headers.len());
    headers.push(table.headers[0].clone());
    headers.push(lookup.label_header.clone());
    headers.extend(table.headers[1..].iter().cloned());
    headers.extend(lookup.extra_headers.iter().cloned());

    order
        .into_iter()
        .map(|series| {
            let mut rows = Vec::new();
            let mut unmatched = 0usize;
            for row in &groups[series] {
                let Some(entry) = lookup.get(&row[0]) else {
                    unmatched += 1;
                    continue;
                };
                let mut out = Vec::with_capacity(headers.len());
                out.push(row[0].clone());
                out.push(entry.label.clone());
                out.push(clean_entity_label(&row[1]));
                out.push(clean_series_value(&row[2]));
                out.extend(row[3..].iter().cloned());
                out.extend(entry.extra.iter().cloned());
                rows.push(out);
            }

            let stem = series_file_stem(series);
            let name = match prefix {
                Some(p) => format!("{p}_{stem}"),
                None => stem,
            };
            if unmatched > 0 {
                warn!(series, name = %name, unmatched, "rows without classification dropped");
            }

            SeriesTable {
                source: table.path.clone(),
                series: series.to_string(),
                name,
                headers: headers.clone(),
                rows,
                unmatched,
            }
        })
        .collect()
}

/// Make output names unique across a whole stage, before anything is written.
///
/// Names are compared by the relation each file will load into, so two stems
/// that differ only in characters the loader strips (`rate_2.5`, `rate_25`)
/// clash here rather than at load time.
///
/// Under [`CollisionPolicy::Fail`] the first clash is an error. Under
/// [`CollisionPolicy::Disambiguate`] a clashing name gets `_<hash>` where the
/// hash covers the series value (and, if that still clashes, the source file).
pub fn resolve_names(tables: &mut [SeriesTable], policy: CollisionPolicy) -> Result<()> {
    let mut taken: HashMap<String, usize> = HashMap::new();
    for idx in 0..tables.len() {
        let name = tables[idx].name.clone();
        let key = relation_key(&name);
        let prev = match taken.get(&key).copied() {
            Some(prev) => prev,
            None => {
                taken.insert(key, idx);
                continue;
            }
        };

        if policy == CollisionPolicy::Fail {
            return Err(EtlError::SeriesNameCollision {
                name: key,
                series: tables[idx].series.clone(),
                file: tables[idx].source.clone(),
                previous: tables[prev].series.clone(),
                previous_file: tables[prev].source.clone(),
            });
        }

        let by_series = format!("{}_{}", name, short_hash(&tables[idx].series));
        let by_source = format!(
            "{}_{}",
            name,
            short_hash(&format!(
                "{}/{}",
                tables[idx].source.display(),
                tables[idx].series
            ))
        );
        let resolved = [by_series, by_source]
            .into_iter()
            .find(|candidate| !taken.contains_key(&relation_key(candidate)))
            .ok_or_else(|| EtlError::SeriesNameCollision {
                name: key.clone(),
                series: tables[idx].series.clone(),
                file: tables[idx].source.clone(),
                previous: tables[prev].series.clone(),
                previous_file: tables[prev].source.clone(),
            })?;

        warn!(
            series = %tables[idx].series,
            from = %name,
            to = %resolved,
            "output name collision disambiguated"
        );
        taken.insert(relation_key(&resolved), idx);
        tables[idx].name = resolved;
    }
    Ok(())
}

/// Relation the loader will derive from `<name>.csv`.
fn relation_key(name: &str) -> String {
    relation_name(&format!("{name}.csv"))
}

fn short_hash(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Write `<target_dir>/<name>.csv`, replacing any existing file.
pub fn write_series<P: AsRef<Path>>(target_dir: P, table: &SeriesTable) -> Result<PathBuf> {
    let target_dir = target_dir.as_ref();
    fs::create_dir_all(target_dir).map_err(|e| EtlError::io(target_dir, e))?;
    let path = target_dir.join(format!("{}.csv", table.name));

    let mut wtr = WriterBuilder::new()
        .from_path(&path)
        .map_err(|e| EtlError::csv(&path, e))?;
    wtr.write_record(&table.headers)
        .map_err(|e| EtlError::csv(&path, e))?;
    for row in &table.rows {
        wtr.write_record(row).map_err(|e| EtlError::csv(&path, e))?;
    }
    wtr.flush().map_err(|e| EtlError::io(&path, e))?;

    debug!(path = %path.display(), rows = table.rows.len(), "wrote series");
    Ok(path)
}

/// The split stage: every `*.csv` in `source_dir`, in name order, joined against
/// the lookup at `lookup_path`, written to `target_dir`.
///
/// All tables are split and all names resolved before the first write, so a
/// failure leaves the target directory untouched.
#[instrument(level = "info", skip_all, fields(source = %source_dir.as_ref().display()))]
pub fn split_all<P: AsRef<Path>, Q: AsRef<Path>, L: AsRef<Path>>(
    source_dir: P,
    target_dir: Q,
    lookup_path: L,
    options: &SplitOptions,
) -> Result<SplitReport> {
    let source_dir = source_dir.as_ref();
    let target_dir = target_dir.as_ref();
    let lookup = ClassificationLookup::load(lookup_path, &options.lookup)?;
    split_all_with(source_dir, target_dir, &lookup, options)
}

/// [`split_all`] with an already loaded lookup.
pub fn split_all_with(
    source_dir: &Path,
    target_dir: &Path,
    lookup: &ClassificationLookup,
    options: &SplitOptions,
) -> Result<SplitReport> {
    let mut registry = AcronymRegistry::new();
    let mut report = SplitReport::default();
    let mut tables = Vec::new();

    for path in crate::list_files(source_dir, "csv")? {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let acronym = registry.register(&stem);

        let prefix = options.acronym_prefix.then(|| acronym.to_lowercase());
        let series = split_table(&path, lookup, options, prefix.as_deref())?;
        info!(path = %path.display(), acronym = %acronym, series = series.len(), "split table");
        tables.extend(series);
    }

    resolve_names(&mut tables, options.collision_policy)?;
    report.acronyms = registry
        .into_inner()
        .into_iter()
        .map(|(acronym, stem)| (stem, acronym))
        .collect();

    for table in &tables {
        report.written.push(write_series(target_dir, table)?);
        report.unmatched.insert(table.name.clone(), table.unmatched);
    }

    info!(
        tables = report.acronyms.len(),
        series = report.written.len(),
        dropped = report.unmatched.values().sum::<usize>(),
        "split stage complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::tests::SAMPLE;
    use tempfile::{tempdir, TempDir};

    const LOOKUP: &str = "Code,Region,Income Group,Table Name
USA,North America,High income,United States
TZA,Sub-Saharan Africa,Lower middle income,Tanzania
";

    fn fixture() -> (TempDir, PathBuf, ClassificationLookup) {
        let dir = tempdir().unwrap();
        let extracted = dir.path().join("extracted");
        fs::create_dir_all(&extracted).unwrap();
        fs::write(extracted.join("GDP_Growth.csv"), SAMPLE).unwrap();
        let lookup_path = dir.path().join("income_groups.csv");
        fs::write(&lookup_path, LOOKUP).unwrap();
        let lookup = ClassificationLookup::load(&lookup_path, &LookupLayout::default()).unwrap();
        (dir, extracted, lookup)
    }

    #[test]
    fn one_table_per_series_with_classification() -> anyhow::Result<()> {
        let (dir, extracted, lookup) = fixture();
        let target = dir.path().join("separated");

        let report = split_all_with(&extracted, &target, &lookup, &SplitOptions::default())?;
        assert_eq!(
            report.written,
            vec![target.join("gdp_growth.csv"), target.join("inflation.csv")]
        );
        assert_eq!(report.acronyms.get("GDP_Growth").map(String::as_str), Some("GDPG"));

        let gdp = fs::read_to_string(target.join("gdp_growth.csv"))?;
        assert_eq!(
            gdp,
            "Country Code,Income Group,Country Name,Series Name,YR2000,YR2001,Region\n\
             USA,High income,United States,GDP growth (annual %),4.1,1.0,North America\n\
             TZA,Lower middle income,Tanzania,GDP growth (annual %),4.9,6.0,Sub-Saharan Africa\n"
        );
        Ok(())
    }

    #[test]
    fn inner_join_loss_is_counted() -> anyhow::Result<()> {
        let (dir, extracted, lookup) = fixture();
        let report = split_all_with(
            &extracted,
            &dir.path().join("separated"),
            &lookup,
            &SplitOptions::default(),
        )?;
        // XKX has no classification
        assert_eq!(report.unmatched.get("inflation"), Some(&1));
        assert_eq!(report.unmatched.get("gdp_growth"), Some(&0));

        let inflation = fs::read_to_string(dir.path().join("separated/inflation.csv"))?;
        assert_eq!(inflation.lines().count(), 3);
        assert!(!inflation.contains("XKX"));
        Ok(())
    }

    #[test]
    fn rerun_is_byte_identical() -> anyhow::Result<()> {
        let (dir, extracted, lookup) = fixture();
        let target = dir.path().join("separated");

        split_all_with(&extracted, &target, &lookup, &SplitOptions::default())?;
        let first = fs::read(target.join("inflation.csv"))?;
        split_all_with(&extracted, &target, &lookup, &SplitOptions::default())?;
        assert_eq!(fs::read(target.join("inflation.csv"))?, first);
        Ok(())
    }

    #[test]
    fn commas_removed_from_labels_and_series() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("Pop.csv");
        fs::write(
            &path,
            "Country Name,Country Code,Series Name,Series Code,2000 [YR2000]\n\
             \"Korea, Rep.\",KOR,\"Population, total\",SP.POP.TOTL,47008111\n",
        )?;
        let lookup_path = dir.path().join("income_groups.csv");
        fs::write(&lookup_path, "Code,Income Group,Table Name\nKOR,High income,\"Korea, Rep.\"\n")?;
        let lookup = ClassificationLookup::load(&lookup_path, &LookupLayout::default())?;

        let options = SplitOptions {
            footer_rows: 0,
            ..SplitOptions::default()
        };
        let tables = split_table(&path, &lookup, &options, None)?;
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "population_total");
        assert_eq!(tables[0].series, "Population, total");
        assert_eq!(
            tables[0].rows[0],
            vec!["KOR", "High income", "Korea Rep.", "Population total", "47008111"]
        );
        Ok(())
    }

    #[test]
    fn colliding_names_fail_before_writing() -> anyhow::Result<()> {
        let (dir, extracted, lookup) = fixture();
        // same series in a second archive maps to the same names
        fs::write(extracted.join("GDP_Growth_Copy.csv"), SAMPLE)?;
        let target = dir.path().join("separated");

        let err = split_all_with(&extracted, &target, &lookup, &SplitOptions::default())
            .expect_err("collision must fail");
        assert!(matches!(err, EtlError::SeriesNameCollision { ref name, .. } if name == "gdp_growth"));
        assert!(!target.exists());
        Ok(())
    }

    #[test]
    fn disambiguation_is_deterministic() -> anyhow::Result<()> {
        let source = PathBuf::from("a.csv");
        let table = |series: &str| SeriesTable {
            source: source.clone(),
            series: series.to_string(),
            name: series_file_stem(series),
            headers: vec![],
            rows: vec![],
            unmatched: 0,
        };
        let mut tables = vec![
            table("Inflation (annual %)"),
            table("Inflation (consumer prices)"),
        ];
        resolve_names(&mut tables, CollisionPolicy::Disambiguate)?;

        assert_eq!(tables[0].name, "inflation");
        assert!(tables[1].name.starts_with("inflation_"));
        assert_eq!(tables[1].name.len(), "inflation_".len() + 8);

        let mut again = vec![
            table("Inflation (annual %)"),
            table("Inflation (consumer prices)"),
        ];
        resolve_names(&mut again, CollisionPolicy::Disambiguate)?;
        assert_eq!(again, tables);
        Ok(())
    }

    #[test]
    fn acronym_prefix_is_applied() -> anyhow::Result<()> {
        let (dir, extracted, lookup) = fixture();
        let target = dir.path().join("separated");
        let options = SplitOptions {
            acronym_prefix: true,
            ..SplitOptions::default()
        };

        let report = split_all_with(&extracted, &target, &lookup, &options)?;
        assert!(report.written.contains(&target.join("gdpg_gdp_growth.csv")));
        Ok(())
    }

    fn series(source: &str, value: &str) -> SeriesTable {
        SeriesTable {
            source: PathBuf::from(source),
            series: value.to_string(),
            name: series_file_stem(value),
            headers: vec![],
            rows: vec![],
            unmatched: 0,
        }
    }

    #[test]
    fn stems_loading_into_one_relation_collide() {
        let mut tables = vec![series("a.csv", "Rate 2.5"), series("a.csv", "Rate 25")];
        assert_eq!(tables[0].name, "rate_2.5");
        assert_eq!(tables[1].name, "rate_25");

        let err = resolve_names(&mut tables, CollisionPolicy::Fail).unwrap_err();
        match err {
            EtlError::SeriesNameCollision { name, series, previous, .. } => {
                assert_eq!(name, "rate_25");
                assert_eq!(series, "Rate 25");
                assert_eq!(previous, "Rate 2.5");
            }
            other => panic!("expected SeriesNameCollision, got {other}"),
        }
    }

    #[test]
    fn disambiguated_stems_load_into_distinct_relations() -> anyhow::Result<()> {
        let mut tables = vec![series("a.csv", "Rate 2.5"), series("a.csv", "Rate 25")];
        resolve_names(&mut tables, CollisionPolicy::Disambiguate)?;

        let first = relation_name(&format!("{}.csv", tables[0].name));
        let second = relation_name(&format!("{}.csv", tables[1].name));
        assert_eq!(first, "rate_25");
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn split_output_loads_despite_unnamed_lookup_column() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let extracted = dir.path().join("extracted");
        fs::create_dir_all(&extracted)?;
        fs::write(extracted.join("GDP.csv"), SAMPLE)?;
        let lookup_path = dir.path().join("income_groups.csv");
        fs::write(
            &lookup_path,
            "Code,Income Group,Table Name,\n\
             USA,High income,United States,\n\
             TZA,Lower middle income,Tanzania,\n",
        )?;
        let lookup = ClassificationLookup::load(&lookup_path, &LookupLayout::default())?;
        let target = dir.path().join("separated");

        split_all_with(&extracted, &target, &lookup, &SplitOptions::default())?;

        let path = target.join("gdp_growth.csv");
        let bytes = fs::read(&path)?;
        let plan = crate::schema::derive_plan(&path, &bytes)?;
        let names: Vec<_> = plan.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["country_code", "income_group", "country_name", "series_name", "yr2000", "yr2001"]
        );
        Ok(())
    }
}
