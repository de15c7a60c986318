// src/config.rs
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::error::{EtlError, Result};

/// What to do when two series derive the same output filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Abort the split stage before any file is written.
    #[default]
    Fail,
    /// Suffix every later colliding name with a short hash of its series value.
    Disambiguate,
}

/// Column names the splitter expects in every extracted table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    pub category: String,
    pub entity_code: String,
    pub entity_label: String,
    pub metadata: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            category: "Series Name".into(),
            entity_code: "Country Code".into(),
            entity_label: "Country Name".into(),
            metadata: "Series Code".into(),
        }
    }
}

/// Column names of the classification lookup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupLayout {
    pub code: String,
    pub label: String,
    pub table_name: String,
}

impl Default for LookupLayout {
    fn default() -> Self {
        Self {
            code: "Code".into(),
            label: "Income Group".into(),
            table_name: "Table Name".into(),
        }
    }
}

/// Everything the extract and split stages need. Every field has a default so a
/// partial YAML file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the archives and the lookup file.
    pub source_dir: PathBuf,
    /// Archive member suffix to extract.
    pub member_suffix: String,
    /// Lookup file name, relative to `source_dir`.
    pub lookup_file: String,
    /// Non-data records at the bottom of every extracted table.
    pub footer_rows: usize,
    pub collision_policy: CollisionPolicy,
    /// Prefix series filenames with the acronym of their source table.
    pub acronym_prefix: bool,
    pub layout: TableLayout,
    pub lookup: LookupLayout,
    /// Where to persist inferred relation schemas, if anywhere.
    pub schema_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source"),
            member_suffix: "_Data.csv".into(),
            lookup_file: "income_groups.csv".into(),
            footer_rows: 5,
            collision_policy: CollisionPolicy::Fail,
            acronym_prefix: false,
            layout: TableLayout::default(),
            lookup: LookupLayout::default(),
            schema_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load a YAML config; missing keys fall back to defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| EtlError::io(path, e))?;
        serde_yaml::from_str(&text)
            .map_err(|e| EtlError::Config(format!("parsing {}: {}", path.display(), e)))
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.source_dir.join("extracted")
    }

    pub fn separated_dir(&self) -> PathBuf {
        self.extracted_dir().join("separated")
    }

    pub fn lookup_path(&self) -> PathBuf {
        self.source_dir.join(&self.lookup_file)
    }
}

/// Destination store credentials, read from the process environment.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl DbConfig {
    pub const DATABASE_VAR: &'static str = "DBNM";
    pub const USER_VAR: &'static str = "DBUS";
    pub const PASSWORD_VAR: &'static str = "DBPS";
    pub const HOST_VAR: &'static str = "DBHS";
    pub const PORT_VAR: &'static str = "DBPT";

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value source. All five keys are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| EtlError::Config(format!("environment variable {key} is not set")))
        };

        let port_raw = required(Self::PORT_VAR)?;
        let port = port_raw.trim().parse::<u16>().map_err(|_| {
            EtlError::Config(format!("{} `{}` is not a valid port", Self::PORT_VAR, port_raw))
        })?;

        Ok(Self {
            database: required(Self::DATABASE_VAR)?,
            user: required(Self::USER_VAR)?,
            password: required(Self::PASSWORD_VAR)?,
            host: required(Self::HOST_VAR)?,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn db_config_reads_all_five_values() {
        let env = vars(&[
            ("DBNM", "wdi"),
            ("DBUS", "etl"),
            ("DBPS", "secret"),
            ("DBHS", "localhost"),
            ("DBPT", "5432"),
        ]);
        let cfg = DbConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(cfg.database, "wdi");
        assert_eq!(cfg.port, 5432);
        assert!(!format!("{cfg:?}").contains("secret"));
    }

    #[test]
    fn db_config_missing_value_is_fatal() {
        let env = vars(&[
            ("DBNM", "wdi"),
            ("DBUS", "etl"),
            ("DBHS", "localhost"),
            ("DBPT", "5432"),
        ]);
        let err = DbConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("DBPS"), "{err}");
    }

    #[test]
    fn db_config_rejects_bad_port() {
        let env = vars(&[
            ("DBNM", "wdi"),
            ("DBUS", "etl"),
            ("DBPS", "x"),
            ("DBHS", "localhost"),
            ("DBPT", "postgres"),
        ]);
        assert!(matches!(
            DbConfig::from_lookup(|k| env.get(k).cloned()),
            Err(EtlError::Config(_))
        ));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "source_dir: data\nfooter_rows: 3\ncollision_policy: disambiguate").unwrap();
        let cfg = PipelineConfig::from_yaml_file(tmp.path()).unwrap();
        assert_eq!(cfg.source_dir, PathBuf::from("data"));
        assert_eq!(cfg.footer_rows, 3);
        assert_eq!(cfg.collision_policy, CollisionPolicy::Disambiguate);
        assert_eq!(cfg.member_suffix, "_Data.csv");
        assert_eq!(cfg.layout.category, "Series Name");
        assert_eq!(cfg.separated_dir(), PathBuf::from("data/extracted/separated"));
    }
}
