use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("schedule could not be scraped from {url}")]
    ScheduleUnavailable { url: String },

    #[error("no stat pages scraped")]
    NoStats,

    #[error("no data to save; matchup output is empty")]
    EmptyOutput,

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

/// Errors from the remote collaborators (Sheets API, SMTP). These are logged and
/// swallowed by the publisher; they never abort a run.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("credentials error: {0}")]
    Credentials(String),

    #[error("token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("worksheet '{0}' not found")]
    WorksheetNotFound(String),

    #[error("mail error: {0}")]
    Mail(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
