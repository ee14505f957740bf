use askama::Template;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::config::SheetTarget;
use crate::error::Result;
use crate::models::RunLogEntry;
use crate::services::sheets::SheetsClient;

/// Most recent run of one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub name: String,
    pub status: String,
    pub run_date: String,
    pub duration: String,
}

impl PipelineSummary {
    pub fn status_class(&self) -> &'static str {
        status_class(&self.status)
    }
}

/// One run-log row as shown in the history table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow {
    pub run_date: String,
    pub pipeline_name: String,
    pub status: String,
    pub duration: String,
    pub error_message: String,
}

impl LogRow {
    pub fn status_class(&self) -> &'static str {
        status_class(&self.status)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    /// One entry per pipeline, in order of first appearance in the log.
    pub pipelines: Vec<PipelineSummary>,
    /// Every run, in log order.
    pub logs: Vec<LogRow>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    pipelines: &'a [PipelineSummary],
    logs: &'a [LogRow],
    generated_at: String,
}

fn status_class(status: &str) -> &'static str {
    match status {
        "Success" => "success",
        "Failed" => "failed",
        _ => "unknown",
    }
}

/// Column positions of the run-log fields. Taken from the header row when the
/// sheet has one, otherwise the order `RunLogEntry::to_row` writes.
struct Columns([usize; 5]);

impl Columns {
    fn from_header(header: &[String]) -> Option<Self> {
        let mut positions = [0; 5];
        for (slot, name) in positions.iter_mut().zip(RunLogEntry::HEADER) {
            *slot = header.iter().position(|h| h.trim() == name)?;
        }
        Some(Self(positions))
    }

    fn field(&self, row: &[String], idx: usize) -> String {
        row.get(self.0[idx]).map(|c| c.trim().to_string()).unwrap_or_default()
    }
}

/// Aggregate raw run-log rows into the latest status per pipeline plus the
/// full history. A later row replaces a pipeline's summary only when its run
/// date sorts after the current one.
pub fn prepare_dashboard(rows: &[Vec<String>]) -> Dashboard {
    let (columns, records) = match rows.split_first() {
        Some((header, rest)) => match Columns::from_header(header) {
            Some(columns) => (columns, rest),
            None => (Columns([0, 1, 2, 3, 4]), rows),
        },
        None => return Dashboard::default(),
    };

    let mut dashboard = Dashboard::default();
    for row in records {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let log = LogRow {
            pipeline_name: columns.field(row, 0),
            run_date: columns.field(row, 1),
            status: columns.field(row, 2),
            duration: columns.field(row, 3),
            error_message: columns.field(row, 4),
        };

        let summary = PipelineSummary {
            name: log.pipeline_name.clone(),
            status: log.status.clone(),
            run_date: log.run_date.clone(),
            duration: log.duration.clone(),
        };
        match dashboard.pipelines.iter_mut().find(|p| p.name == summary.name) {
            Some(existing) if existing.run_date < summary.run_date => *existing = summary,
            Some(_) => {}
            None => dashboard.pipelines.push(summary),
        }

        dashboard.logs.push(log);
    }
    dashboard
}

pub fn render_dashboard(dashboard: &Dashboard, generated_at: DateTime<Local>) -> Result<String> {
    let template = DashboardTemplate {
        pipelines: &dashboard.pipelines,
        logs: &dashboard.logs,
        generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    Ok(template.render()?)
}

/// Read the run-log worksheet and render it to `output`.
pub async fn build_dashboard(
    sheets: &dyn SheetsClient,
    target: &SheetTarget,
    output: &Path,
) -> Result<Dashboard> {
    sheets.open_worksheet(&target.spreadsheet_id, &target.worksheet).await?;
    let rows = sheets.read_rows(&target.spreadsheet_id, &target.worksheet).await?;
    tracing::info!("Fetched {} rows from '{}'", rows.len(), target.worksheet);

    let dashboard = prepare_dashboard(&rows);
    let html = render_dashboard(&dashboard, Local::now())?;
    fs::write(output, html)?;

    tracing::info!(
        "Dashboard written to {}: {} pipelines, {} runs",
        output.display(),
        dashboard.pipelines.len(),
        dashboard.logs.len()
    );
    Ok(dashboard)
}
