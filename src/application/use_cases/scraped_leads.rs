use crate::domain::error::Result;
use crate::domain::lead::{page_number, total_pages, LeadPage};
use crate::domain::scraped::ScrapedLeadFilter;
use crate::infrastructure::db::ScrapedLeadStore;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScrapedLeadRequest {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 500))]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl Default for ScrapedLeadRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            source: None,
            category: None,
            search: None,
        }
    }
}

/// `"all"` and blank values mean no filter.
fn selector(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
        .map(str::to_string)
}

impl ScrapedLeadRequest {
    pub fn filter(&self) -> ScrapedLeadFilter {
        ScrapedLeadFilter {
            source: selector(&self.source).map(|s| s.to_lowercase()),
            category: selector(&self.category).map(|c| c.to_lowercase()),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

pub struct ScrapedLeadsUseCase {
    store: Arc<dyn ScrapedLeadStore>,
}

impl ScrapedLeadsUseCase {
    pub fn new(store: Arc<dyn ScrapedLeadStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, request: &ScrapedLeadRequest) -> Result<LeadPage> {
        request.validate()?;
        let (rows, total) = self.store.list(&request.filter()).await?;

        let limit = u64::from(request.limit);
        let offset = u64::from(request.offset);
        Ok(LeadPage {
            leads: rows.iter().map(|row| row.to_lead()).collect(),
            total,
            page: Some(page_number(offset, limit)),
            total_pages: Some(total_pages(total, limit)),
            has_more: offset + limit < total,
        })
    }
}
