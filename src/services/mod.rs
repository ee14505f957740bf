pub mod backup;
pub mod dashboard;
pub mod matchup;
pub mod notifier;
pub mod pipeline;
pub mod publisher;
pub mod schedule;
pub mod scraper;
pub mod sheets;
pub mod stats;
pub mod validator;

pub use notifier::{Notifier, SmtpNotifier};
pub use pipeline::{FailurePolicy, NflStages, Orchestrator, Stage, StageRunner};
pub use publisher::Publisher;
pub use sheets::{GoogleSheetsClient, SheetsClient};
