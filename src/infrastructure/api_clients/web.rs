use super::{build_client, PageFetcher};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::ScraperConfig;
use async_trait::async_trait;
use reqwest::Client;

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs, Some(&config.user_agent))?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("Accept-Language", "en-GB,en;q=0.9")
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch URL: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::upstream(
                "Page fetch",
                response.status().as_u16(),
                url.to_string(),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read response body: {}", e)))
    }
}
