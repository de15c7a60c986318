// src/naming/ident.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

// A space-preceded parenthetical, with at least one character before it.
static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.) \(.+\)").expect("parenthetical regex should be valid"));

/// Filesystem- and SQL-safe stem for a series value:
/// `"Inflation, consumer prices (annual %)"` → `"inflation_consumer_prices"`.
pub fn series_file_stem(series: &str) -> String {
    let stripped = PARENTHETICAL.replace_all(series, "${1}");
    stripped
        .replace(',', "")
        .replace([' ', '/', '\\'], "_")
        .to_lowercase()
}

/// Relation name for a series file: extension dropped, `.`, `$` and `%`
/// removed, lower-cased.
pub fn relation_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.chars()
        .filter(|c| !matches!(c, '.' | '$' | '%'))
        .collect::<String>()
        .to_lowercase()
}

/// Column identifier for a header: spaces to underscores, lower-cased.
pub fn column_identifier(header: &str) -> String {
    header.trim().replace(' ', "_").to_lowercase()
}

/// Double-quoted SQL identifier.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
