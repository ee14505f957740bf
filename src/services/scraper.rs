use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::config::USER_AGENT;
use crate::models::Table;
use crate::utils::clean_text;

/// Fetches stat and schedule pages. One attempt per URL, then a fixed pause
/// before the next request.
pub struct PageScraper {
    client: Client,
    delay: Duration,
}

impl PageScraper {
    pub fn new(delay: Duration) -> Self {
        Self {
            client: Client::new(),
            delay,
        }
    }

    /// Fetch a page body. Non-200 responses and transport errors are logged and
    /// yield `None`.
    pub async fn fetch_html(&self, url: &str) -> Option<String> {
        let result = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await;

        let body = match result {
            Ok(response) => {
                let status = response.status();
                tracing::info!("Request to {} returned status code: {}", url, status.as_u16());
                if status != StatusCode::OK {
                    tracing::error!("Failed to retrieve {}. Status code: {}", url, status.as_u16());
                    None
                } else {
                    match response.text().await {
                        Ok(text) => Some(text),
                        Err(e) => {
                            tracing::error!("Failed to read body of {}: {}", url, e);
                            None
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to retrieve {}: {}", url, e);
                None
            }
        };

        tokio::time::sleep(self.delay).await;
        body
    }

    /// Scrape the first `<table>` of the page at `url`.
    pub async fn scrape(&self, url: &str) -> Option<Table> {
        let html = self.fetch_html(url).await?;
        let table = parse_first_table(&html);
        if table.is_none() {
            tracing::error!("No table found on the page: {}", url);
        }
        table
    }
}

/// Parse the first `<table>` of a document. Column names come from the `<th>`
/// cells of the first row; every later row with `<td>` cells becomes a row of
/// trimmed strings.
pub fn parse_first_table(html: &str) -> Option<Table> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table").ok()?;
    let table = document.select(&table_selector).next()?;
    Some(parse_table_element(table))
}

pub(crate) fn parse_table_element(table: ElementRef<'_>) -> Table {
    let row_selector = Selector::parse("tr").expect("valid selector");
    let header_selector = Selector::parse("th").expect("valid selector");

    let mut rows = table.select(&row_selector);
    let columns: Vec<String> = rows
        .next()
        .map(|header| {
            header
                .select(&header_selector)
                .map(|th| clean_text(&th.text().collect::<String>()))
                .collect()
        })
        .unwrap_or_default();

    let mut parsed = Table::new(columns);
    for row in rows {
        let cells = row_cells(row);
        if cells.is_empty() {
            continue;
        }
        if cells.len() > parsed.columns.len() {
            tracing::warn!(
                "Row has {} cells but table has {} columns; extra cells dropped",
                cells.len(),
                parsed.columns.len()
            );
        }
        parsed.push_row(cells.into_iter().map(Some).collect());
    }
    parsed
}

/// Trimmed text of every `<td>` in a row.
pub(crate) fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    let cell_selector = Selector::parse("td").expect("valid selector");
    row.select(&cell_selector)
        .map(|td| clean_text(&td.text().collect::<String>()))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    const STAT_PAGE: &str = r#"
        <html><body>
          <div class="nav"><ul><li>Stats</li></ul></div>
          <table class="tr-table datatable scrollable">
            <thead>
              <tr><th>Rank</th><th>Team</th><th>2024</th><th>Last 3</th></tr>
            </thead>
            <tbody>
              <tr><td>1</td><td><a href="/nfl/team/detroit-lions">Detroit</a></td><td>33.2</td><td>35.0</td></tr>
              <tr><td>2</td><td>Baltimore</td><td>30.5</td><td>28.7</td></tr>
              <tr><td>3</td><td> Buffalo </td><td>30.1</td></tr>
            </tbody>
          </table>
          <table><tr><th>Other</th></tr><tr><td>ignored</td></tr></table>
        </body></html>
    "#;

    #[test]
    fn test_parse_first_table() {
        let table = parse_first_table(STAT_PAGE).unwrap();
        assert_eq!(table.columns, vec!["Rank", "Team", "2024", "Last 3"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.cell(0, "Team"), Some("Detroit"));
        assert_eq!(table.cell(2, "Team"), Some("Buffalo"));
        // Cells stay strings; nothing is coerced.
        assert_eq!(table.cell(1, "2024"), Some("30.5"));
    }

    #[test]
    fn test_short_rows_are_padded_with_missing_cells() {
        let table = parse_first_table(STAT_PAGE).unwrap();
        assert_eq!(table.cell(2, "Last 3"), None);
        assert!(table.has_missing_values());
    }

    #[test]
    fn test_page_without_table() {
        assert!(parse_first_table("<html><body><p>Maintenance</p></body></html>").is_none());
    }

    #[tokio::test]
    async fn test_scrape_served_page() {
        let base = test_server::serve(vec![("/nfl/stat/points-per-game", 200, STAT_PAGE)]).await;
        let scraper = PageScraper::new(Duration::ZERO);

        let table = scraper
            .scrape(&format!("{}/nfl/stat/points-per-game", base))
            .await
            .unwrap();
        assert_eq!(table.columns, vec!["Rank", "Team", "2024", "Last 3"]);
        assert_eq!(table.cell(1, "Team"), Some("Baltimore"));
    }

    #[tokio::test]
    async fn test_non_200_response_is_none() {
        let base = test_server::serve(vec![("/down", 500, STAT_PAGE)]).await;
        let scraper = PageScraper::new(Duration::ZERO);

        assert!(scraper.fetch_html(&format!("{}/down", base)).await.is_none());
        assert!(scraper.scrape(&format!("{}/down", base)).await.is_none());
        assert!(scraper.scrape(&format!("{}/missing", base)).await.is_none());
    }

    #[tokio::test]
    async fn test_page_without_table_is_none() {
        let base = test_server::serve(vec![("/maintenance", 200, "<html><body><p>Back soon</p></body></html>")]).await;
        let scraper = PageScraper::new(Duration::ZERO);

        let url = format!("{}/maintenance", base);
        assert!(scraper.fetch_html(&url).await.is_some());
        assert!(scraper.scrape(&url).await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_none() {
        // Bind then drop a listener so the port is very likely closed.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let scraper = PageScraper::new(Duration::ZERO);
        assert!(scraper.scrape(&format!("http://{}/stat", addr)).await.is_none());
    }
}
