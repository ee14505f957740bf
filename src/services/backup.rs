use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::utils::is_older_than;

/// Backup categories, each a folder under the backup root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    RawData,
    ProcessedData,
    FinalOutput,
    Logs,
}

impl BackupKind {
    pub const ALL: [BackupKind; 4] = [
        BackupKind::RawData,
        BackupKind::ProcessedData,
        BackupKind::FinalOutput,
        BackupKind::Logs,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            BackupKind::RawData => "raw_data",
            BackupKind::ProcessedData => "processed_data",
            BackupKind::FinalOutput => "final_output",
            BackupKind::Logs => "logs",
        }
    }
}

pub struct BackupManager {
    root: PathBuf,
}

impl BackupManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<kind>/<date>`
    pub fn dated_dir(&self, kind: BackupKind, date: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(date)
    }

    /// Copy `source` into the dated folder for `kind`. A directory source has
    /// each of its files copied. Missing sources are logged and skipped; copy
    /// errors are logged and never propagated.
    pub fn backup(&self, source: &Path, kind: BackupKind, date: &str) -> Vec<PathBuf> {
        if !source.exists() {
            tracing::warn!("File not found, skipping backup: {}", source.display());
            return Vec::new();
        }

        let target_dir = self.dated_dir(kind, date);
        if let Err(e) = fs::create_dir_all(&target_dir) {
            tracing::error!("Failed to create backup folder {}: {}", target_dir.display(), e);
            return Vec::new();
        }

        let sources = if source.is_dir() {
            match fs::read_dir(source) {
                Ok(entries) => entries
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|p| p.is_file())
                    .collect(),
                Err(e) => {
                    tracing::error!("Failed to read {}: {}", source.display(), e);
                    return Vec::new();
                }
            }
        } else {
            vec![source.to_path_buf()]
        };

        let mut copied = Vec::new();
        for file in sources {
            let Some(name) = file.file_name() else { continue };
            let dest = target_dir.join(name);
            match fs::copy(&file, &dest) {
                Ok(_) => {
                    tracing::info!("Backed up {} to {}", file.display(), dest.display());
                    copied.push(dest);
                }
                Err(e) => tracing::error!("Failed to back up {}: {}", file.display(), e),
            }
        }
        copied
    }

    /// Remove backup files older than `retention_days` (by mtime) from every
    /// backup category, then drop date folders left empty. Returns the removed files.
    pub fn clean_old_backups(&self, retention_days: u64) -> Vec<PathBuf> {
        let now = SystemTime::now();
        let mut removed = Vec::new();
        for kind in BackupKind::ALL {
            removed.extend(clean_dir(&self.root.join(kind.dir_name()), retention_days, now));
        }
        if !removed.is_empty() {
            tracing::info!("Removed {} backups older than {} days", removed.len(), retention_days);
        }
        removed
    }
}

/// Retention pass over one directory tree.
pub fn clean_dir(dir: &Path, retention_days: u64, now: SystemTime) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return removed;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            removed.extend(clean_dir(&path, retention_days, now));
            let is_empty = fs::read_dir(&path).map(|mut d| d.next().is_none()).unwrap_or(false);
            if is_empty {
                let _ = fs::remove_dir(&path);
            }
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!("Cannot read mtime of {}: {}", path.display(), e);
                continue;
            }
        };

        if is_older_than(modified, now, retention_days) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!("Removed old backup: {}", path.display());
                    removed.push(path);
                }
                Err(e) => tracing::error!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::tempdir;

    fn age_file(path: &Path, days: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(days * 86_400))
            .unwrap();
    }

    #[test]
    fn test_backup_copies_into_dated_folder() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("nfl_output.csv");
        fs::write(&source, "Match ID,Team\n").unwrap();

        let manager = BackupManager::new(dir.path().join("backups"));
        let copied = manager.backup(&source, BackupKind::ProcessedData, "2024-09-26");

        let expected = dir.path().join("backups/processed_data/2024-09-26/nfl_output.csv");
        assert_eq!(copied, vec![expected.clone()]);
        assert_eq!(fs::read_to_string(expected).unwrap(), "Match ID,Team\n");
    }

    #[test]
    fn test_backup_directory_source() {
        let dir = tempdir().unwrap();
        let stats = dir.path().join("nfl_stats");
        fs::create_dir_all(&stats).unwrap();
        fs::write(stats.join("01_points_per_game.csv"), "Rank,Team\n").unwrap();
        fs::write(stats.join("02_sacks_per_game.csv"), "Rank,Team\n").unwrap();

        let manager = BackupManager::new(dir.path().join("backups"));
        let copied = manager.backup(&stats, BackupKind::RawData, "2024-09-26");
        assert_eq!(copied.len(), 2);
    }

    #[test]
    fn test_missing_source_is_skipped() {
        let dir = tempdir().unwrap();
        let manager = BackupManager::new(dir.path().join("backups"));
        assert!(manager
            .backup(&dir.path().join("missing.csv"), BackupKind::Logs, "2024-09-26")
            .is_empty());
    }

    #[test]
    fn test_retention_removes_only_old_files() {
        let dir = tempdir().unwrap();
        let manager = BackupManager::new(dir.path());

        let old_dir = manager.dated_dir(BackupKind::FinalOutput, "2024-08-01");
        let new_dir = manager.dated_dir(BackupKind::FinalOutput, "2024-09-26");
        fs::create_dir_all(&old_dir).unwrap();
        fs::create_dir_all(&new_dir).unwrap();

        let old_file = old_dir.join("nfl_output_2024-08-01.csv");
        let new_file = new_dir.join("nfl_output_2024-09-26.csv");
        fs::write(&old_file, "old").unwrap();
        fs::write(&new_file, "new").unwrap();
        age_file(&old_file, 45);
        age_file(&new_file, 3);

        let removed = manager.clean_old_backups(30);

        assert_eq!(removed, vec![old_file.clone()]);
        assert!(!old_file.exists());
        assert!(!old_dir.exists());
        assert!(new_file.exists());
    }
}
