/// Trim whitespace and a leading byte-order mark from a header cell.
pub fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// Year headers look like `"2001 [YR2001]"`; keep characters 6..12 (`"YR2001"`).
/// Headers that do not start with a digit, or are too short to slice, come
/// back unchanged.
pub fn normalize_year_header(header: &str) -> String {
    let chars: Vec<char> = header.chars().collect();
    match chars.first() {
        Some(c) if c.is_numeric() && chars.len() >= 12 => chars[6..12].iter().collect(),
        _ => header.to_string(),
    }
}

/// Series values are display text; `", "` becomes a space and stray commas go.
pub fn clean_series_value(raw: &str) -> String {
    raw.replace(", ", " ").replace(',', "")
}

/// Entity labels lose their commas (`"Korea, Rep."` → `"Korea Rep."`).
pub fn clean_entity_label(raw: &str) -> String {
    raw.replace(',', "")
}
