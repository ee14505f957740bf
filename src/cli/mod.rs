use anyhow::Result;
use chrono::Local;

use crate::config::PipelineConfig;
use crate::models::{RemoteOutcome, RunStatus};
use crate::services::dashboard::build_dashboard;
use crate::services::pipeline::{summarize, RunReport};
use crate::services::{
    FailurePolicy, GoogleSheetsClient, NflStages, Notifier, Orchestrator, Publisher, SheetsClient,
    SmtpNotifier, Stage, StageRunner,
};
use crate::utils::{date_stamp, format_duration};

/// Sheets and email collaborators for whatever the environment configures.
/// A service-account key that cannot be loaded disables Sheets for the run.
fn build_publisher(config: &PipelineConfig) -> Publisher {
    let sheets: Option<Box<dyn SheetsClient>> =
        if config.output_sheet.is_some() || config.log_sheet.is_some() {
            match GoogleSheetsClient::from_key_file(&config.credentials_path) {
                Ok(client) => Some(Box::new(client)),
                Err(e) => {
                    tracing::error!("Google Sheets disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

    let notifier: Option<Box<dyn Notifier>> = config
        .email
        .clone()
        .map(|settings| Box::new(SmtpNotifier::new(settings)) as Box<dyn Notifier>);

    Publisher::new(config.clone(), sheets, notifier)
}

/// Run a single stage outside the orchestrator. No run-log row or email.
pub async fn run_stage(config: PipelineConfig, stage: Stage) -> Result<()> {
    let publisher = build_publisher(&config);
    let stages = NflStages::new(config, &publisher, date_stamp(Local::now()));

    println!("{} Running {} stage...", stage_icon(stage), stage);

    let started = std::time::Instant::now();
    match stages.run_stage(stage).await {
        Ok(summary) => {
            println!("✅ {} finished in {}: {}", stage, format_duration(started.elapsed()), summary);
            Ok(())
        }
        Err(e) => {
            println!("❌ {} failed after {}: {}", stage, format_duration(started.elapsed()), e);
            Err(e.into())
        }
    }
}

/// Run every stage in order, then record the run and send the notification.
pub async fn run_pipeline(config: PipelineConfig, policy: FailurePolicy) -> Result<()> {
    let publisher = build_publisher(&config);
    let stages = NflStages::new(config, &publisher, date_stamp(Local::now()));

    println!("🏈 Running NFL matchup pipeline ({:?} on failure)...", policy);

    let report = Orchestrator::new(&publisher, policy)
        .run(&stages, &Stage::ALL)
        .await;

    print_report(&report);

    match report.status {
        RunStatus::Success => Ok(()),
        RunStatus::Failed => anyhow::bail!(
            "pipeline failed: {}",
            report.error_message().unwrap_or_default()
        ),
    }
}

/// Render the run-log worksheet into `dashboard.html`.
pub async fn generate_dashboard(config: PipelineConfig) -> Result<()> {
    let Some(target) = config.log_sheet.as_ref() else {
        println!("❌ SPREADSHEET_ID_LOG is not set; there is no run log to read.");
        anyhow::bail!("run-log spreadsheet not configured");
    };
    let sheets = GoogleSheetsClient::from_key_file(&config.credentials_path)?;

    println!("📊 Building dashboard from '{}'...", target.worksheet);
    let output = config.dashboard_file();
    let dashboard = build_dashboard(&sheets, target, &output).await?;

    if dashboard.pipelines.is_empty() {
        println!("📭 The run log is empty.");
    }
    for pipeline in &dashboard.pipelines {
        println!(
            "   • {}: {} at {} ({})",
            pipeline.name, pipeline.status, pipeline.run_date, pipeline.duration
        );
    }
    println!("✅ Dashboard written to {} ({} runs)", output.display(), dashboard.logs.len());
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("\n📋 Run summary:");
    for line in summarize(report).lines() {
        println!("   {}", line);
    }
    println!("\n📝 Run log: {}", outcome_label(&report.run_log));
    println!("📧 Email: {}", outcome_label(&report.email));

    match report.status {
        RunStatus::Success => println!("\n✅ Pipeline completed successfully!"),
        RunStatus::Failed => println!("\n❌ Pipeline failed."),
    }
}

fn outcome_label(outcome: &RemoteOutcome) -> String {
    match outcome {
        RemoteOutcome::Mirrored => "sent".to_string(),
        RemoteOutcome::Skipped(reason) => format!("skipped ({})", reason),
        RemoteOutcome::Failed(e) => format!("failed ({})", e),
    }
}

fn stage_icon(stage: Stage) -> &'static str {
    match stage {
        Stage::Schedule => "📅",
        Stage::Stats => "📥",
        Stage::Matchup => "🔗",
        Stage::Publish => "📤",
        Stage::Backup => "💾",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_label() {
        assert_eq!(outcome_label(&RemoteOutcome::Mirrored), "sent");
        assert_eq!(
            outcome_label(&RemoteOutcome::Skipped("email not configured".into())),
            "skipped (email not configured)"
        );
    }

    #[test]
    fn test_unconfigured_environment_builds_local_only_publisher() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(dir.path());
        // No spreadsheet ids means the missing key file is never read.
        let publisher = build_publisher(&config);
        let table = crate::models::Table::new(vec!["Match ID".into()]);
        assert!(publisher.write_outputs(&table, "2024-09-26").is_ok());
    }
}
