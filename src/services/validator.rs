use crate::models::Table;

/// Fails (and logs an error) when the table has no rows or no columns.
pub fn validate_not_empty(table: &Table, name: &str) -> bool {
    if table.is_empty() {
        tracing::error!("{} is empty.", name);
        return false;
    }
    true
}

/// Fails (and logs a warning) when any cell is missing.
pub fn validate_no_missing(table: &Table, name: &str) -> bool {
    if table.has_missing_values() {
        tracing::warn!("{} contains missing values.", name);
        return false;
    }
    true
}

/// Fails (and logs an error listing them) when any required column is absent.
pub fn validate_columns(table: &Table, name: &str, required_columns: &[&str]) -> bool {
    let missing: Vec<&str> = required_columns
        .iter()
        .copied()
        .filter(|col| !table.has_column(col))
        .collect();

    if !missing.is_empty() {
        tracing::error!("{} is missing columns: {:?}", name, missing);
        return false;
    }
    true
}

/// Runs every check (each one logs on its own) and passes only if all pass.
/// Never panics or returns an error; callers decide what a failed gate means.
pub fn run_validations(table: &Table, name: &str, required_columns: Option<&[&str]>) -> bool {
    let checks = [
        validate_not_empty(table, name),
        validate_no_missing(table, name),
        required_columns.map_or(true, |cols| validate_columns(table, name, cols)),
    ];
    checks.iter().all(|passed| *passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::capture::{capture_logs, matching};

    fn table(columns: &[&str], rows: &[&[Option<&str>]]) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row.iter().map(|c| c.map(str::to_string)).collect());
        }
        t
    }

    #[test]
    fn test_valid_table_passes() {
        let t = table(&["Team", "Rank"], &[&[Some("Bills"), Some("1")]]);
        assert!(run_validations(&t, "points", Some(&["Team", "Rank"])));
        assert!(run_validations(&t, "points", None));
    }

    #[test]
    fn test_empty_table_fails() {
        let t = table(&["Team", "Rank"], &[]);
        assert!(!validate_not_empty(&t, "points"));
        assert!(!run_validations(&t, "points", Some(&["Team", "Rank"])));
    }

    #[test]
    fn test_missing_cell_fails() {
        let t = table(&["Team", "Rank"], &[&[Some("Bills"), None]]);
        assert!(!validate_no_missing(&t, "points"));
        assert!(!run_validations(&t, "points", None));
    }

    #[test]
    fn test_missing_column_fails() {
        let t = table(&["Team", "2024"], &[&[Some("Bills"), Some("30.1")]]);
        assert!(!validate_columns(&t, "points", &["Team", "Rank"]));
        assert!(!run_validations(&t, "points", Some(&["Team", "Rank"])));
        // Without required columns the same table is fine.
        assert!(run_validations(&t, "points", None));
    }

    #[test]
    fn test_each_failing_check_logs() {
        let (_, logs) = capture_logs(|| validate_not_empty(&table(&["Team"], &[]), "points"));
        assert_eq!(matching(&logs, &["ERROR", "points is empty."]).len(), 1);

        let (_, logs) = capture_logs(|| {
            validate_no_missing(&table(&["Team", "Rank"], &[&[Some("Bills"), None]]), "points")
        });
        assert_eq!(matching(&logs, &["WARN", "points contains missing values."]).len(), 1);

        let (_, logs) = capture_logs(|| {
            validate_columns(&table(&["Team"], &[&[Some("Bills")]]), "points", &["Team", "Rank"])
        });
        let missing = matching(&logs, &["ERROR", "points is missing columns"]);
        assert_eq!(missing.len(), 1);
        assert!(missing[0].contains("\"Rank\""));
    }

    #[test]
    fn test_run_validations_logs_every_failing_check() {
        let t = table(&["Team", "2024"], &[&[Some("Bills"), None]]);
        let (passed, logs) = capture_logs(|| run_validations(&t, "sacks", Some(&["Team", "Rank"])));

        assert!(!passed);
        assert_eq!(logs.len(), 2);
        assert_eq!(matching(&logs, &["WARN", "missing values"]).len(), 1);
        assert_eq!(matching(&logs, &["ERROR", "missing columns"]).len(), 1);
    }

    #[test]
    fn test_passing_table_logs_nothing() {
        let t = table(&["Team", "Rank"], &[&[Some("Bills"), Some("1")]]);
        let (passed, logs) = capture_logs(|| run_validations(&t, "points", Some(&["Team", "Rank"])));
        assert!(passed);
        assert!(logs.is_empty());
    }
}
