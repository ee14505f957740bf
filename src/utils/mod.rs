use chrono::{DateTime, Local};
use std::time::{Duration, SystemTime};

/// Date stamp used in output and backup names, e.g. `2024-09-26`.
pub fn date_stamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Format a stage or run duration as seconds with two decimals.
pub fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// Sheet name for a stat page: `df_` plus the last path segment with `-` → `_`,
/// cut to 31 chars.
pub fn sheet_name_from_url(url: &str) -> String {
    let identifier = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    format!("df_{}", identifier.replace('-', "_")).chars().take(31).collect()
}

/// Collapse runs of whitespace (including the newlines scraped pages put inside
/// cells) into single spaces.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when `modified` falls before `now - retention_days`.
pub fn is_older_than(modified: SystemTime, now: SystemTime, retention_days: u64) -> bool {
    let window = Duration::from_secs(retention_days.saturating_mul(86_400));
    match now.duration_since(modified) {
        Ok(age) => age > window,
        Err(_) => false, // modified in the future
    }
}

/// Format an optional rank average for tabular output.
pub fn format_average(avg: Option<f64>) -> String {
    match avg {
        Some(value) => {
            let rounded = format!("{:.2}", value);
            rounded.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        None => String::new(),
    }
}
