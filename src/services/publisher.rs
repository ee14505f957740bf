use std::path::PathBuf;

use crate::config::{PipelineConfig, SheetTarget};
use crate::error::{RemoteError, Result};
use crate::models::{RemoteOutcome, RunLogEntry, Table};
use crate::services::backup::{BackupKind, BackupManager};
use crate::services::notifier::Notifier;
use crate::services::sheets::SheetsClient;
use crate::storage::{read_table, write_table};

/// Writes the local outputs and mirrors them to the remote collaborators.
/// The local files are authoritative; remote failures come back as
/// `RemoteOutcome` and never as errors.
pub struct Publisher {
    config: PipelineConfig,
    sheets: Option<Box<dyn SheetsClient>>,
    notifier: Option<Box<dyn Notifier>>,
}

impl Publisher {
    pub fn new(
        config: PipelineConfig,
        sheets: Option<Box<dyn SheetsClient>>,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Self {
        Self { config, sheets, notifier }
    }

    /// Write the dated and canonical output files.
    pub fn write_outputs(&self, table: &Table, date: &str) -> Result<(PathBuf, PathBuf)> {
        let dated = self.config.dated_output(date);
        let canonical = self.config.canonical_output();
        write_table(&dated, table)?;
        write_table(&canonical, table)?;
        tracing::info!("Files saved: '{}' and '{}'", dated.display(), canonical.display());
        Ok((dated, canonical))
    }

    /// Replace the output worksheet with the canonical file's contents.
    pub async fn mirror_to_sheet(&self) -> RemoteOutcome {
        let Some(target) = self.config.output_sheet.as_ref() else {
            return skipped("SPREADSHEET_ID not set");
        };
        let Some(sheets) = self.sheets.as_deref() else {
            return skipped("no Sheets client");
        };

        let table = match read_table(&self.config.canonical_output()) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!("Failed to upload data to Google Sheets: {}", e);
                return RemoteOutcome::Failed(e.to_string());
            }
        };
        tracing::info!(
            "Loaded data from {} with {} rows.",
            self.config.canonical_output().display(),
            table.rows.len()
        );

        match replace_worksheet(sheets, target, &sheet_rows(&table)).await {
            Ok(()) => {
                tracing::info!("Data successfully written to Google Sheets sheet '{}'.", target.worksheet);
                RemoteOutcome::Mirrored
            }
            Err(e) => {
                tracing::error!("Failed to upload data to Google Sheets: {}", e);
                RemoteOutcome::Failed(e.to_string())
            }
        }
    }

    /// Copy this run's inputs, outputs and log into the dated backup folders,
    /// then apply the retention window. Returns how many files were copied.
    pub fn backup_files(&self, date: &str) -> usize {
        let manager = BackupManager::new(self.config.backup_dir());
        let plan = [
            (self.config.stats_dir(), BackupKind::RawData),
            (self.config.schedule_file(), BackupKind::RawData),
            (self.config.canonical_output(), BackupKind::ProcessedData),
            (self.config.dated_output(date), BackupKind::FinalOutput),
            (self.config.log_file(), BackupKind::Logs),
        ];

        let copied: usize = plan
            .iter()
            .map(|(source, kind)| manager.backup(source, *kind, date).len())
            .sum();
        manager.clean_old_backups(self.config.retention_days);
        copied
    }

    /// Append one row to the remote run log.
    pub async fn record_run(&self, entry: &RunLogEntry) -> RemoteOutcome {
        let Some(target) = self.config.log_sheet.as_ref() else {
            return skipped("SPREADSHEET_ID_LOG not set");
        };
        let Some(sheets) = self.sheets.as_deref() else {
            return skipped("no Sheets client");
        };

        let result = async {
            sheets.open_worksheet(&target.spreadsheet_id, &target.worksheet).await?;
            sheets
                .append_row(&target.spreadsheet_id, &target.worksheet, &entry.to_row())
                .await
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!("Run logged: {} {}", entry.pipeline_name, entry.status);
                RemoteOutcome::Mirrored
            }
            Err(e) => {
                tracing::error!("Failed to append run log row: {}", e);
                RemoteOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn notify(&self, subject: &str, body: &str) -> RemoteOutcome {
        let Some(notifier) = self.notifier.as_deref() else {
            return skipped("email not configured");
        };
        match notifier.send(subject, body).await {
            Ok(()) => RemoteOutcome::Mirrored,
            Err(e) => {
                tracing::error!("Failed to send email '{}': {}", subject, e);
                RemoteOutcome::Failed(e.to_string())
            }
        }
    }
}

fn skipped(reason: &str) -> RemoteOutcome {
    tracing::warn!("{}, skipping", reason);
    RemoteOutcome::Skipped(reason.to_string())
}

async fn replace_worksheet(
    sheets: &dyn SheetsClient,
    target: &SheetTarget,
    rows: &[Vec<String>],
) -> std::result::Result<(), RemoteError> {
    sheets.open_worksheet(&target.spreadsheet_id, &target.worksheet).await?;
    sheets.clear(&target.spreadsheet_id, &target.worksheet).await?;
    sheets.write_rows(&target.spreadsheet_id, &target.worksheet, rows).await
}

/// Header plus rows, with missing cells sent as `0`.
pub fn sheet_rows(table: &Table) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(table.rows.len() + 1);
    rows.push(table.columns.clone());
    for row in &table.rows {
        rows.push(
            row.iter()
                .map(|cell| cell.clone().unwrap_or_else(|| "0".to_string()))
                .collect(),
        );
    }
    rows
}
