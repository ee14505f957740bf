use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PIPELINE_NAME: &str = "NFL Matchup Pipeline";

pub const SCHEDULE_URL: &str = "https://www.teamrankings.com/nfl/schedules/season/";

pub const STAT_URLS: &[&str] = &[
    "https://www.teamrankings.com/nfl/stat/points-per-game",
    "https://www.teamrankings.com/nfl/stat/opponent-points-per-game",
    "https://www.teamrankings.com/nfl/stat/sacks-per-game",
    "https://www.teamrankings.com/nfl/stat/third-down-conversion-pct",
    "https://www.teamrankings.com/nfl/stat/qb-sacked-per-game",
    "https://www.teamrankings.com/nfl/stat/opponent-third-down-conversion-pct",
    "https://www.teamrankings.com/nfl/stat/turnover-margin-per-game",
    "https://www.teamrankings.com/nfl/stat/penalty-yards-per-game",
    "https://www.teamrankings.com/nfl/stat/red-zone-scoring-pct",
    "https://www.teamrankings.com/nfl/stat/opponent-red-zone-scores-per-game",
];

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Google Sheets destination for the canonical output.
#[derive(Debug, Clone)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub worksheet: String,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub sender: String,
    pub receiver: String,
    pub password: String,
}

/// Every path, URL and credential the pipeline uses. Built once in `main` and
/// handed to each component.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub work_dir: PathBuf,
    pub schedule_url: String,
    pub stat_urls: Vec<String>,
    pub request_delay: Duration,
    pub retention_days: u64,
    pub credentials_path: PathBuf,
    pub output_sheet: Option<SheetTarget>,
    pub log_sheet: Option<SheetTarget>,
    pub email: Option<EmailSettings>,
}

impl PipelineConfig {
    /// Defaults rooted at `work_dir`, with no remote collaborators configured.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            schedule_url: SCHEDULE_URL.to_string(),
            stat_urls: STAT_URLS.iter().map(|u| u.to_string()).collect(),
            request_delay: Duration::from_secs(5),
            retention_days: 30,
            credentials_path: PathBuf::from("credentials.json"),
            output_sheet: None,
            log_sheet: None,
            email: None,
        }
    }

    pub fn from_env(work_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(work_dir);

        if let Ok(path) = env::var("GOOGLE_CREDENTIALS_PATH") {
            config.credentials_path = PathBuf::from(path);
        }

        config.output_sheet = non_empty_var("SPREADSHEET_ID").map(|id| SheetTarget {
            spreadsheet_id: id,
            worksheet: "Sheet1".to_string(),
        });
        config.log_sheet = non_empty_var("SPREADSHEET_ID_LOG").map(|id| SheetTarget {
            spreadsheet_id: id,
            worksheet: "Run_Log".to_string(),
        });

        config.email = match (
            non_empty_var("EMAIL_SENDER"),
            non_empty_var("EMAIL_RECEIVER"),
            non_empty_var("EMAIL_PASSWORD"),
        ) {
            (Some(sender), Some(receiver), Some(password)) => Some(EmailSettings {
                smtp_host: "smtp.gmail.com".to_string(),
                sender,
                receiver,
                password,
            }),
            _ => None,
        };

        config
    }

    pub fn stats_dir(&self) -> PathBuf {
        self.work_dir.join("nfl_stats")
    }

    pub fn schedule_file(&self) -> PathBuf {
        self.work_dir.join("nfl_current_week_schedule.csv")
    }

    pub fn canonical_output(&self) -> PathBuf {
        self.work_dir.join("nfl_output.csv")
    }

    pub fn dated_output(&self, date: &str) -> PathBuf {
        self.work_dir.join(format!("nfl_output_{}.csv", date))
    }

    pub fn log_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn log_file(&self) -> PathBuf {
        self.work_dir.join(crate::logging::LOG_FILE_NAME)
    }

    pub fn dashboard_file(&self) -> PathBuf {
        self.work_dir.join("dashboard.html")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.work_dir.join("backups")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
