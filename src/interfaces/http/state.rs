use crate::application::{
    EnrichmentUseCase, LeadSearchUseCase, PrivateClinicsUseCase, SavedLeadsUseCase,
    ScrapedLeadsUseCase,
};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::api_clients::IdentityProvider;
use std::sync::Arc;

/// Everything the HTTP handlers need, built once at startup.
pub struct AppState {
    pub lead_search: LeadSearchUseCase,
    pub private_clinics: PrivateClinicsUseCase,
    /// `None` when no database is configured.
    pub scraped_leads: Option<ScrapedLeadsUseCase>,
    pub enrichment: EnrichmentUseCase,
    pub saved_leads: SavedLeadsUseCase,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn scraped_leads(&self) -> Result<&ScrapedLeadsUseCase> {
        self.scraped_leads.as_ref().ok_or_else(|| {
            AppError::ConfigError("Scraped leads need DATABASE_URL to be configured".to_string())
        })
    }
}
