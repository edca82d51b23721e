use crate::application::use_cases::lead_search::organisation_to_lead;
use crate::domain::error::{AppError, Result};
use crate::domain::lead::{Lead, DEFAULT_ODS_ROLE};
use crate::infrastructure::api_clients::ods::OdsQuery;
use crate::infrastructure::api_clients::OdsDirectory;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_PAGE_PAUSE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdsExportRequest {
    pub role: String,
    pub page_size: u32,
}

impl Default for OdsExportRequest {
    fn default() -> Self {
        Self {
            role: DEFAULT_ODS_ROLE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pages through every ODS organisation of one role.
pub struct OdsExportUseCase {
    ods: Arc<dyn OdsDirectory>,
    page_pause: Duration,
}

impl OdsExportUseCase {
    pub fn new(ods: Arc<dyn OdsDirectory>) -> Self {
        Self {
            ods,
            page_pause: DEFAULT_PAGE_PAUSE,
        }
    }

    pub fn with_page_pause(mut self, pause: Duration) -> Self {
        self.page_pause = pause;
        self
    }

    /// Stops on a short or empty page. A failure after the first page
    /// keeps what was already collected.
    pub async fn execute(&self, request: &OdsExportRequest) -> Result<Vec<Lead>> {
        if request.page_size == 0 {
            return Err(AppError::ValidationError(
                "Page size must be at least 1".to_string(),
            ));
        }

        let mut leads = Vec::new();
        let mut offset = 0u32;

        loop {
            let query = OdsQuery {
                primary_role_id: request.role.clone(),
                limit: request.page_size,
                offset: (offset != 0).then_some(offset),
                name: None,
                post_code: None,
            };

            let page = match self.ods.search(&query).await {
                Ok(page) => page,
                Err(e) if !leads.is_empty() => {
                    warn!(offset, error = %e, "ODS page failed, keeping partial export");
                    break;
                }
                Err(e) => return Err(e),
            };

            let received = page.organisations.len();
            leads.extend(page.organisations.iter().map(|org| {
                let mut lead = organisation_to_lead(org);
                if let Some(country) = org
                    .location()
                    .and_then(|l| l.country.as_deref())
                    .filter(|c| !c.trim().is_empty())
                {
                    lead.country = country.to_string();
                }
                lead
            }));
            info!(role = %request.role, offset, received, total = leads.len(), "ODS page fetched");

            if received < request.page_size as usize {
                break;
            }
            offset += request.page_size;

            if !self.page_pause.is_zero() {
                tokio::time::sleep(self.page_pause).await;
            }
        }

        Ok(leads)
    }
}
