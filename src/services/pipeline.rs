use async_trait::async_trait;
use chrono::Local;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{PipelineConfig, PIPELINE_NAME};
use crate::error::{PipelineError, Result};
use crate::models::{RemoteOutcome, RunLogEntry, RunStatus};
use crate::services::matchup::{build_matchup_stats, matchup_table};
use crate::services::notifier::{failure_body, success_body, FAILURE_SUBJECT, SUCCESS_SUBJECT};
use crate::services::publisher::Publisher;
use crate::services::schedule::build_schedule;
use crate::services::scraper::PageScraper;
use crate::services::stats::build_stat_bundle;
use crate::storage::{load_bundle, read_table, save_bundle, write_table};
use crate::utils::format_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Schedule,
    Stats,
    Matchup,
    Publish,
    Backup,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Schedule,
        Stage::Stats,
        Stage::Matchup,
        Stage::Publish,
        Stage::Backup,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Schedule => "schedule",
            Stage::Stats => "stats",
            Stage::Matchup => "matchup",
            Stage::Publish => "publish",
            Stage::Backup => "backup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with the remaining stages after one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Abort,
    Continue,
}

/// Executes one stage. Stages talk to each other only through files.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Returns a one-line summary of what the stage produced.
    async fn run_stage(&self, stage: Stage) -> Result<String>;
}

/// The production stages: scrape, join and publish NFL data.
pub struct NflStages<'a> {
    config: PipelineConfig,
    scraper: PageScraper,
    publisher: &'a Publisher,
    date: String,
}

impl<'a> NflStages<'a> {
    pub fn new(config: PipelineConfig, publisher: &'a Publisher, date: String) -> Self {
        let scraper = PageScraper::new(config.request_delay);
        Self { config, scraper, publisher, date }
    }

    async fn schedule(&self) -> Result<String> {
        let url = &self.config.schedule_url;
        let table = build_schedule(&self.scraper, url)
            .await
            .ok_or_else(|| PipelineError::ScheduleUnavailable { url: url.clone() })?;

        write_table(&self.config.schedule_file(), &table)?;
        Ok(format!("{} games", table.rows.len()))
    }

    async fn stats(&self) -> Result<String> {
        let bundle = build_stat_bundle(&self.scraper, &self.config.stat_urls).await;
        if bundle.is_empty() {
            return Err(PipelineError::NoStats);
        }
        save_bundle(&self.config.stats_dir(), &bundle)?;
        Ok(format!("{} of {} stat sheets", bundle.len(), self.config.stat_urls.len()))
    }

    fn matchup(&self) -> Result<String> {
        let schedule = read_table(&self.config.schedule_file())?;
        let bundle = load_bundle(&self.config.stats_dir())?;

        let rows = build_matchup_stats(&schedule, &bundle);
        if rows.is_empty() {
            return Err(PipelineError::EmptyOutput);
        }

        let table = matchup_table(&rows, &bundle.sheet_names());
        self.publisher.write_outputs(&table, &self.date)?;
        Ok(format!("{} team rows", rows.len()))
    }

    async fn publish(&self) -> Result<String> {
        let canonical = self.config.canonical_output();
        if !canonical.exists() {
            return Err(PipelineError::MissingInput(canonical));
        }
        let outcome = self.publisher.mirror_to_sheet().await;
        Ok(format!("sheet mirror {}", outcome))
    }

    fn backup(&self) -> Result<String> {
        let copied = self.publisher.backup_files(&self.date);
        Ok(format!("{} files backed up", copied))
    }
}

#[async_trait]
impl<'a> StageRunner for NflStages<'a> {
    async fn run_stage(&self, stage: Stage) -> Result<String> {
        match stage {
            Stage::Schedule => self.schedule().await,
            Stage::Stats => self.stats().await,
            Stage::Matchup => self.matchup(),
            Stage::Publish => self.publish().await,
            Stage::Backup => self.backup(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub duration: Duration,
    pub outcome: std::result::Result<String, String>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub duration: Duration,
    pub stages: Vec<StageReport>,
    pub run_log: RemoteOutcome,
    pub email: RemoteOutcome,
}

impl RunReport {
    pub fn error_message(&self) -> Option<String> {
        let errors: Vec<String> = self
            .stages
            .iter()
            .filter_map(|s| s.outcome.as_ref().err().map(|e| format!("{}: {}", s.stage, e)))
            .collect();
        if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        }
    }
}

/// Runs stages in order, then records the run remotely and emails the outcome.
pub struct Orchestrator<'a> {
    publisher: &'a Publisher,
    policy: FailurePolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(publisher: &'a Publisher, policy: FailurePolicy) -> Self {
        Self { publisher, policy }
    }

    pub async fn run(&self, runner: &dyn StageRunner, stages: &[Stage]) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.run_inner(run_id, runner, stages).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, runner: &dyn StageRunner, stages: &[Stage]) -> RunReport {
        tracing::info!("{} started", PIPELINE_NAME);
        let started = Instant::now();
        let mut reports = Vec::with_capacity(stages.len());

        for &stage in stages {
            let stage_started = Instant::now();
            let result = runner.run_stage(stage).await;
            let duration = stage_started.elapsed();

            let failed = result.is_err();
            match &result {
                Ok(summary) => {
                    tracing::info!("Stage {} completed in {}: {}", stage, format_duration(duration), summary)
                }
                Err(e) => {
                    tracing::error!("Stage {} failed after {}: {}", stage, format_duration(duration), e)
                }
            }
            reports.push(StageReport {
                stage,
                duration,
                outcome: result.map_err(|e| e.to_string()),
            });

            if failed && self.policy == FailurePolicy::Abort {
                tracing::error!("Aborting remaining stages");
                break;
            }
        }

        let duration = started.elapsed();
        let mut report = RunReport {
            run_id,
            status: RunStatus::Success,
            duration,
            stages: reports,
            run_log: RemoteOutcome::Skipped("not attempted".into()),
            email: RemoteOutcome::Skipped("not attempted".into()),
        };

        let error_message = report.error_message();
        if error_message.is_some() {
            report.status = RunStatus::Failed;
        }

        let entry = RunLogEntry {
            pipeline_name: PIPELINE_NAME.to_string(),
            run_date: Local::now(),
            status: report.status,
            duration,
            error_message: error_message.clone(),
        };
        report.run_log = self.publisher.record_run(&entry).await;

        let summary = summarize(&report);
        report.email = match &error_message {
            None => self.publisher.notify(SUCCESS_SUBJECT, &success_body(&summary)).await,
            Some(err) => {
                self.publisher
                    .notify(FAILURE_SUBJECT, &failure_body(err, &summary))
                    .await
            }
        };

        match report.status {
            RunStatus::Success => {
                tracing::info!("{} completed successfully in {}", PIPELINE_NAME, format_duration(duration))
            }
            RunStatus::Failed => {
                tracing::error!("{} failed after {}", PIPELINE_NAME, format_duration(duration))
            }
        }
        report
    }
}

/// Plain-text run summary used in the notification email.
pub fn summarize(report: &RunReport) -> String {
    let mut lines = vec![
        format!("Run: {}", report.run_id),
        format!("Status: {}", report.status),
        format!("Duration: {}", format_duration(report.duration)),
        String::new(),
    ];
    for stage in &report.stages {
        let detail = match &stage.outcome {
            Ok(summary) => format!("ok, {}", summary),
            Err(e) => format!("FAILED, {}", e),
        };
        lines.push(format!("{:<9} {:>8}  {}", stage.stage, format_duration(stage.duration), detail));
    }
    lines.join("\n")
}
