pub mod postgres;
pub mod saved_leads;
pub mod scraped_leads;

use crate::domain::error::Result;
use crate::domain::saved_lead::SavedLead;
use crate::domain::scraped::{ScrapedLead, ScrapedLeadFilter, ScrapedPractice};
use async_trait::async_trait;

/// Per-user saved leads. Every call is scoped to one user id.
#[async_trait]
pub trait SavedLeadStore: Send + Sync {
    async fn list(&self, user_id: &str) -> Result<Vec<SavedLead>>;
    async fn find(&self, user_id: &str, ods_code: &str) -> Result<Option<SavedLead>>;
    async fn upsert(&self, user_id: &str, lead: &SavedLead) -> Result<()>;
    /// Returns false when nothing was stored under `ods_code`.
    async fn remove(&self, user_id: &str, ods_code: &str) -> Result<bool>;
}

/// The `scraped_leads` table.
#[async_trait]
pub trait ScrapedLeadStore: Send + Sync {
    /// One page of rows plus the exact count of rows matching the filter.
    async fn list(&self, filter: &ScrapedLeadFilter) -> Result<(Vec<ScrapedLead>, u64)>;
    async fn upsert(&self, practice: &ScrapedPractice) -> Result<()>;
}
