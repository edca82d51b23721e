//! Doctify sitemap scraper: sitemap listing, page extraction and upsert into
//! `scraped_leads`.

mod categories;
mod extract;
mod sitemap;

use extract::extract_practice;
use sitemap::{extract_sitemap_urls, select_urls};

use crate::domain::error::{AppError, Result};
use crate::domain::scraped::{PageType, ScrapedPractice};
use crate::infrastructure::api_clients::PageFetcher;
use crate::infrastructure::config::ScraperConfig;
use crate::infrastructure::db::ScrapedLeadStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeOptions {
    pub page_type: PageType,
    pub limit: Option<usize>,
    pub category: Option<String>,
    pub dry_run: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            page_type: PageType::Practices,
            limit: None,
            category: None,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeSummary {
    pub scraped: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSettings {
    pub delay: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl From<&ScraperConfig> for ScrapeSettings {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.delay_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_retries: config.max_retries,
        }
    }
}

pub struct SitemapScraperUseCase {
    fetcher: Arc<dyn PageFetcher>,
    store: Option<Arc<dyn ScrapedLeadStore>>,
    settings: ScrapeSettings,
}

impl SitemapScraperUseCase {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Option<Arc<dyn ScrapedLeadStore>>,
        settings: ScrapeSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            settings,
        }
    }

    /// Listing URLs the run would visit, after category filter and limit.
    pub async fn plan(&self, options: &ScrapeOptions) -> Result<Vec<String>> {
        let sitemap_url = options.page_type.sitemap_url();
        info!(page_type = %options.page_type, url = %sitemap_url, "Fetching sitemap");

        let body = self.fetcher.fetch(&sitemap_url).await?;
        let found = extract_sitemap_urls(&body, options.page_type);
        info!(count = found.len(), "Sitemap URLs found");

        Ok(select_urls(found, options.category.as_deref(), options.limit))
    }

    pub async fn run(&self, options: &ScrapeOptions) -> Result<ScrapeSummary> {
        let urls = self.plan(options).await?;
        let mut summary = ScrapeSummary {
            total: urls.len(),
            ..Default::default()
        };

        if options.dry_run {
            for url in &urls {
                info!(url = %url, "Dry run");
            }
            return Ok(summary);
        }

        let store = self.store.as_ref().ok_or_else(|| {
            AppError::ConfigError(
                "DATABASE_URL is required to store scraped leads (use --dry-run to preview)"
                    .to_string(),
            )
        })?;

        for (index, url) in urls.iter().enumerate() {
            if index > 0 && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }

            let practice = match self.scrape_with_retries(url).await {
                Some(practice) => practice,
                None => {
                    summary.failed += 1;
                    continue;
                }
            };

            match store.upsert(&practice).await {
                Ok(()) => {
                    summary.scraped += 1;
                    info!(
                        progress = %format!("{}/{}", index + 1, urls.len()),
                        name = %practice.name,
                        categories = %practice.categories.join(","),
                        "Scraped"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(url = %url, error = %e, "Failed to store scraped lead");
                }
            }
        }

        info!(
            scraped = summary.scraped,
            failed = summary.failed,
            total = summary.total,
            "Scrape finished"
        );
        Ok(summary)
    }

    /// A failed fetch and a page without a practice name are both retried.
    async fn scrape_with_retries(&self, url: &str) -> Option<ScrapedPractice> {
        let attempts = self.settings.max_retries + 1;

        for attempt in 1..=attempts {
            match self.fetcher.fetch(url).await {
                Ok(html) => match extract_practice(url, &html) {
                    Some(practice) => return Some(practice),
                    None => warn!(url = %url, attempt, attempts, "No practice name on page"),
                },
                Err(e) => warn!(url = %url, attempt, attempts, error = %e, "Fetch failed"),
            }

            if attempt < attempts && !self.settings.retry_delay.is_zero() {
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }
        None
    }
}
