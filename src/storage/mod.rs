use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::models::{StatBundle, Table};

/// Write a table as CSV, overwriting the file. Missing cells become empty fields.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a CSV table. Empty fields load as missing cells.
pub fn read_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = Table::new(columns);

    for record in reader.records() {
        let record = record?;
        table.push_row(
            record
                .iter()
                .map(|field| if field.is_empty() { None } else { Some(field.to_string()) })
                .collect(),
        );
    }

    Ok(table)
}

/// Save every sheet of the bundle as `NN_<sheet>.csv` under `dir`. Previous
/// sheet files in `dir` are removed first so the directory mirrors the bundle.
pub fn save_bundle(dir: &Path, bundle: &StatBundle) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    for stale in sheet_files(dir)? {
        fs::remove_file(stale)?;
    }

    let mut written = Vec::with_capacity(bundle.len());
    for (idx, sheet) in bundle.iter().enumerate() {
        let path = dir.join(format!("{:02}_{}.csv", idx + 1, sheet.name));
        write_table(&path, &sheet.table)?;
        written.push(path);
    }

    tracing::info!("Saved {} stat sheets to {}", written.len(), dir.display());
    Ok(written)
}

/// Load a bundle saved by [`save_bundle`], in its original sheet order.
pub fn load_bundle(dir: &Path) -> Result<StatBundle> {
    if !dir.is_dir() {
        return Err(PipelineError::MissingInput(dir.to_path_buf()));
    }

    let mut bundle = StatBundle::new();
    for path in sheet_files(dir)? {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        let name = match stem.split_once('_') {
            Some((prefix, rest)) if prefix.chars().all(|c| c.is_ascii_digit()) => rest,
            _ => stem,
        };
        bundle.insert(name, read_table(&path)?);
    }

    tracing::info!("Loaded {} stat sheets from {}", bundle.len(), dir.display());
    Ok(bundle)
}

/// CSV files directly under `dir`, sorted by file name.
pub fn sheet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn stat_table(rows: &[(&str, &str)]) -> Table {
        let mut table = Table::new(vec!["Rank".into(), "Team".into()]);
        for (rank, team) in rows {
            table.push_row(vec![Some(rank.to_string()), Some(team.to_string())]);
        }
        table
    }

    #[test]
    fn test_empty_fields_load_as_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schedule.csv");
        fs::write(&path, "Teams,Time,Location\nBills @ Jets,,MetLife Stadium\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.columns, vec!["Teams", "Time", "Location"]);
        assert_eq!(table.rows[0][1], None);
        assert!(table.has_missing_values());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let err = read_table(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }

    #[test]
    fn test_bundle_order_survives_save_and_load() {
        let dir = tempdir().unwrap();
        let stats_dir = dir.path().join("nfl_stats");

        let mut bundle = StatBundle::new();
        bundle.insert("turnover_margin_per_game", stat_table(&[("1", "Buffalo")]));
        bundle.insert("points_per_game", stat_table(&[("1", "Detroit"), ("2", "Baltimore")]));
        bundle.insert("sacks_per_game", stat_table(&[("1", "Denver")]));

        let written = save_bundle(&stats_dir, &bundle).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written[0].ends_with("01_turnover_margin_per_game.csv"));

        let loaded = load_bundle(&stats_dir).unwrap();
        assert_eq!(loaded, bundle);
    }

    #[test]
    fn test_save_bundle_replaces_stale_sheets() {
        let dir = tempdir().unwrap();
        let mut first = StatBundle::new();
        first.insert("a", stat_table(&[("1", "Buffalo")]));
        first.insert("b", stat_table(&[("1", "Buffalo")]));
        save_bundle(dir.path(), &first).unwrap();

        let mut second = StatBundle::new();
        second.insert("c", stat_table(&[("1", "Buffalo")]));
        save_bundle(dir.path(), &second).unwrap();

        assert_eq!(load_bundle(dir.path()).unwrap().sheet_names(), vec!["c"]);
    }
}
