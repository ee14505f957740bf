use scraper::{Html, Selector};

use crate::models::{ScheduleEntry, Table};
use crate::services::scraper::{row_cells, PageScraper};
use crate::services::validator::run_validations;

pub const SCHEDULE_COLUMNS: [&str; 3] = ["Teams", "Time", "Location"];

/// Scrape the weekly schedule into a `Teams` / `Time` / `Location` table.
/// Returns `None` when the page or its schedule table is unavailable, or when
/// the result fails validation.
pub async fn build_schedule(scraper: &PageScraper, url: &str) -> Option<Table> {
    let html = scraper.fetch_html(url).await?;

    let Some(entries) = parse_schedule(&html) else {
        tracing::error!("No schedule table found on the page: {}", url);
        return None;
    };

    let table = schedule_table(&entries);
    if !run_validations(&table, "Schedule Data", Some(&SCHEDULE_COLUMNS)) {
        tracing::error!("Validation failed for schedule table from {}", url);
        return None;
    }

    tracing::info!("Schedule data scraped and validated: {} games", entries.len());
    Some(table)
}

/// Rows of the `table.tr-table` schedule with exactly three cells. The header
/// row is skipped; any other row shape is logged and skipped.
pub fn parse_schedule(html: &str) -> Option<Vec<ScheduleEntry>> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table.tr-table").ok()?;
    let row_selector = Selector::parse("tr").ok()?;

    let table = document.select(&table_selector).next()?;
    let mut entries = Vec::new();

    for (idx, row) in table.select(&row_selector).enumerate().skip(1) {
        let mut cells = row_cells(row);
        if cells.len() != 3 {
            tracing::warn!(
                "Skipping schedule row {}: expected 3 cells, found {}",
                idx,
                cells.len()
            );
            continue;
        }
        let location = cells.pop().unwrap_or_default();
        let time = cells.pop().unwrap_or_default();
        let teams = cells.pop().unwrap_or_default();
        entries.push(ScheduleEntry { teams, time, location });
    }

    Some(entries)
}

pub fn schedule_table(entries: &[ScheduleEntry]) -> Table {
    let mut table = Table::new(SCHEDULE_COLUMNS.iter().map(|c| c.to_string()).collect());
    for entry in entries {
        table.push_row(vec![
            Some(entry.teams.clone()),
            Some(entry.time.clone()),
            Some(entry.location.clone()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scraper::test_server;
    use std::time::Duration;

    const SCHEDULE_PAGE: &str = r#"
        <html><body>
          <table class="tr-table">
            <tr><th>Thu Sep 26</th><th>Time</th><th>Location</th></tr>
            <tr><td>Dallas @ NY Giants</td><td>8:15 pm</td><td>MetLife Stadium</td></tr>
            <tr><td colspan="3">Sun Sep 29</td></tr>
            <tr><td>New Orleans @ Atlanta</td><td>1:00 pm</td><td>Mercedes-Benz Stadium</td></tr>
            <tr><td>Jacksonville @ Houston</td><td>1:00 pm</td><td>NRG Stadium</td><td>extra</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_schedule_keeps_three_cell_rows() {
        let entries = parse_schedule(SCHEDULE_PAGE).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            ScheduleEntry {
                teams: "Dallas @ NY Giants".into(),
                time: "8:15 pm".into(),
                location: "MetLife Stadium".into(),
            }
        );
        assert_eq!(entries[1].teams, "New Orleans @ Atlanta");
    }

    #[test]
    fn test_schedule_requires_tr_table() {
        let html = "<table><tr><th>Teams</th></tr><tr><td>a</td><td>b</td><td>c</td></tr></table>";
        assert!(parse_schedule(html).is_none());
    }

    #[test]
    fn test_schedule_table_validates() {
        let entries = parse_schedule(SCHEDULE_PAGE).unwrap();
        let table = schedule_table(&entries);
        assert_eq!(table.columns, vec!["Teams", "Time", "Location"]);
        assert!(run_validations(&table, "Schedule Data", Some(&SCHEDULE_COLUMNS)));
    }

    #[tokio::test]
    async fn test_build_schedule_from_served_page() {
        let base = test_server::serve(vec![("/nfl/schedules/season/", 200, SCHEDULE_PAGE)]).await;
        let scraper = PageScraper::new(Duration::ZERO);

        let table = build_schedule(&scraper, &format!("{}/nfl/schedules/season/", base))
            .await
            .unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(1, "Location"), Some("Mercedes-Benz Stadium"));
    }

    #[tokio::test]
    async fn test_build_schedule_unavailable() {
        let base = test_server::serve(vec![
            ("/error", 503, SCHEDULE_PAGE),
            ("/no-table", 200, "<html><body><p>No games this week</p></body></html>"),
            ("/empty", 200, "<table class=\"tr-table\"><tr><th>Teams</th></tr></table>"),
        ])
        .await;
        let scraper = PageScraper::new(Duration::ZERO);

        for path in ["/error", "/no-table", "/empty"] {
            assert!(
                build_schedule(&scraper, &format!("{}{}", base, path)).await.is_none(),
                "{} should yield no schedule",
                path
            );
        }
    }
}
