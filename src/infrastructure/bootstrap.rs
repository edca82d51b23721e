use std::sync::{Arc, Mutex};

use sqlx::PgPool;
use tracing::{info, warn};

use crate::application::use_cases::sitemap_scraper::ScrapeSettings;
use crate::application::{
    EnrichmentUseCase, LeadSearchUseCase, OdsExportUseCase, PrivateClinicsUseCase,
    SavedLeadsUseCase, ScrapedLeadsUseCase, SitemapScraperUseCase,
};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::api_clients::cqc::CqcClient;
use crate::infrastructure::api_clients::identity::{LocalIdentity, SupabaseIdentity};
use crate::infrastructure::api_clients::ods::OdsClient;
use crate::infrastructure::api_clients::places::GooglePlacesClient;
use crate::infrastructure::api_clients::web::HttpPageFetcher;
use crate::infrastructure::api_clients::{IdentityProvider, OdsDirectory};
use crate::infrastructure::config::{AppConfig, AuthMode, SavedBackend};
use crate::infrastructure::db::postgres;
use crate::infrastructure::db::saved_leads::PgSavedLeadStore;
use crate::infrastructure::db::scraped_leads::PgScrapedLeadRepository;
use crate::infrastructure::db::{SavedLeadStore, ScrapedLeadStore};
use crate::infrastructure::storage::JsonFileSavedLeadStore;
use crate::interfaces::http::{add_log, AppState, LogEntry};

/// Connects when `database.url` is set.
pub async fn connect_database(config: &AppConfig) -> Result<Option<PgPool>> {
    if config.database.url.is_none() {
        return Ok(None);
    }
    postgres::connect(&config.database).await.map(Some)
}

pub fn scraped_store(pool: Option<&PgPool>) -> Option<Arc<dyn ScrapedLeadStore>> {
    pool.map(|pool| Arc::new(PgScrapedLeadRepository::new(pool.clone())) as Arc<dyn ScrapedLeadStore>)
}

pub fn ods_export(config: &AppConfig) -> Result<OdsExportUseCase> {
    Ok(OdsExportUseCase::new(Arc::new(OdsClient::new(&config.ods)?)))
}

pub fn sitemap_scraper(
    config: &AppConfig,
    store: Option<Arc<dyn ScrapedLeadStore>>,
) -> Result<SitemapScraperUseCase> {
    Ok(SitemapScraperUseCase::new(
        Arc::new(HttpPageFetcher::new(&config.scraper)?),
        store,
        ScrapeSettings::from(&config.scraper),
    ))
}

fn saved_store(config: &AppConfig, pool: Option<&PgPool>) -> Result<Arc<dyn SavedLeadStore>> {
    match config.saved.backend {
        SavedBackend::File => Ok(Arc::new(JsonFileSavedLeadStore::new(
            config.saved.file_path.clone(),
            config.auth.local_user_id.clone(),
        ))),
        SavedBackend::Postgres => {
            let pool = pool.ok_or_else(|| {
                AppError::ConfigError("Postgres saved-lead store needs a database".to_string())
            })?;
            Ok(Arc::new(PgSavedLeadStore::new(pool.clone())))
        }
    }
}

fn identity_provider(config: &AppConfig) -> Result<Arc<dyn IdentityProvider>> {
    match config.auth.mode {
        AuthMode::Supabase => Ok(Arc::new(SupabaseIdentity::new(&config.supabase)?)),
        AuthMode::Disabled => Ok(Arc::new(LocalIdentity::new(
            config.auth.local_user_id.clone(),
        ))),
    }
}

/// Wires upstream clients, stores and identity into the HTTP state.
pub async fn build_state(config: &AppConfig, logs: &Arc<Mutex<Vec<LogEntry>>>) -> Result<AppState> {
    config.validate()?;

    let pool = match connect_database(config).await {
        Ok(pool) => pool,
        Err(e) if config.saved.backend == SavedBackend::File => {
            warn!(error = %e, "Database unavailable, scraped leads disabled");
            add_log(logs, "WARN", "Bootstrap", &format!("Database unavailable: {}", e));
            None
        }
        Err(e) => return Err(e),
    };

    let ods: Arc<dyn OdsDirectory> = Arc::new(OdsClient::new(&config.ods)?);
    let cqc = Arc::new(CqcClient::new(&config.cqc)?);
    let places = Arc::new(GooglePlacesClient::new(&config.places)?);
    let saved = saved_store(config, pool.as_ref())?;

    if config.cqc.api_key.is_none() {
        add_log(logs, "WARN", "Bootstrap", "CQC_API_KEY not set, private clinics disabled");
    }
    if config.places.api_key.is_none() {
        add_log(logs, "WARN", "Bootstrap", "GOOGLE_PLACES_API_KEY not set, Places enrichment disabled");
    }

    info!(
        saved_backend = ?config.saved.backend,
        auth_mode = ?config.auth.mode,
        database = pool.is_some(),
        "Application state ready"
    );
    add_log(
        logs,
        "INFO",
        "Bootstrap",
        &format!(
            "Saved leads: {:?}, auth: {:?}",
            config.saved.backend, config.auth.mode
        ),
    );

    Ok(AppState {
        lead_search: LeadSearchUseCase::new(ods.clone()),
        private_clinics: PrivateClinicsUseCase::new(cqc),
        scraped_leads: scraped_store(pool.as_ref()).map(ScrapedLeadsUseCase::new),
        enrichment: EnrichmentUseCase::new(ods.clone(), places),
        saved_leads: SavedLeadsUseCase::new(saved, ods),
        identity: identity_provider(config)?,
    })
}
