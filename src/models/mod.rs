use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A scraped or loaded table: ordered column names plus rows of optional cells.
/// `None` marks a missing value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Append a row, padding short rows with missing cells and dropping extra ones.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn has_missing_values(&self) -> bool {
        self.rows.iter().flatten().any(Option::is_none)
    }

    /// Cell value by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }
}

/// One named stat sheet (e.g. `third_down_conversion_pct`) with `Team` and `Rank` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StatTable {
    pub name: String,
    pub table: Table,
}

/// Ordered collection of stat sheets from one scrape. Iteration order is the
/// order the sheets were added in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatBundle {
    sheets: Vec<StatTable>,
}

impl StatBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet. A sheet with an existing name replaces the earlier one in place.
    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        match self.sheets.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.table = table,
            None => self.sheets.push(StatTable { name, table }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatTable> {
        self.sheets.iter()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// One raw row of the weekly schedule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub teams: String,
    pub time: String,
    pub location: String,
}

/// A scheduled game with both team names split out of the `Teams` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub team_a: String,
    pub team_b: String,
    pub kickoff: Option<String>,
    pub location: Option<String>,
}

/// Per-team output row of the matchup join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRankRow {
    pub match_id: String,
    pub team: String,
    pub ranks: Vec<Option<u32>>,
    pub rank_sum: u64,
    pub rank_avg: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "Success"),
            RunStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// One row of the append-only run log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLogEntry {
    pub pipeline_name: String,
    pub run_date: DateTime<Local>,
    pub status: RunStatus,
    pub duration: Duration,
    pub error_message: Option<String>,
}

impl RunLogEntry {
    /// Header of the run-log worksheet, in `to_row` order.
    pub const HEADER: [&'static str; 5] =
        ["Pipeline Name", "Run Date", "Run Status", "Duration", "Error Message"];

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.pipeline_name.clone(),
            self.run_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.status.to_string(),
            crate::utils::format_duration(self.duration),
            self.error_message.clone().unwrap_or_default(),
        ]
    }
}

/// Result of a call to a remote collaborator (sheet mirror, run log, email).
/// Remote failures never fail the local run; they are reported through this.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    Mirrored,
    Skipped(String),
    Failed(String),
}

impl fmt::Display for RemoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOutcome::Mirrored => write!(f, "ok"),
            RemoteOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            RemoteOutcome::Failed(err) => write!(f, "failed ({})", err),
        }
    }
}
