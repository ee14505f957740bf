use crate::models::StatBundle;
use crate::services::scraper::PageScraper;
use crate::services::validator::run_validations;
use crate::utils::sheet_name_from_url;

/// Scrape every stat page into one bundle, in URL order. Pages that fail to
/// load or fail validation against their own header are logged and left out.
pub async fn build_stat_bundle(scraper: &PageScraper, urls: &[String]) -> StatBundle {
    let mut bundle = StatBundle::new();

    for url in urls {
        let Some(table) = scraper.scrape(url).await else {
            continue;
        };

        let name = sheet_name_from_url(url);
        let headers: Vec<&str> = table.columns.iter().map(String::as_str).collect();
        if !run_validations(&table, &name, Some(&headers)) {
            tracing::error!("Validation failed for {}", name);
            continue;
        }

        tracing::info!("Scraped {} ({} rows)", name, table.rows.len());
        bundle.insert(name, table);
    }

    tracing::info!("Stat bundle built: {} of {} pages", bundle.len(), urls.len());
    bundle
}
