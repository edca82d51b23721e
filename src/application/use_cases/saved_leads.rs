use crate::application::use_cases::enrichment::extract_ods_enrichment;
use crate::domain::error::{AppError, Result};
use crate::domain::lead::Lead;
use crate::domain::saved_lead::{EnrichAllReport, SavedLead};
use crate::infrastructure::api_clients::OdsDirectory;
use crate::infrastructure::csv::{export_file_name, LeadCsvWriter};
use crate::infrastructure::db::SavedLeadStore;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_ENRICH_PAUSE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveOutcome {
    Saved,
    Updated,
}

impl SaveOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SaveOutcome::Saved => "Lead saved",
            SaveOutcome::Updated => "Lead updated",
        }
    }
}

pub struct CsvExport {
    pub file_name: String,
    pub body: String,
}

fn invalid_lead() -> AppError {
    AppError::ValidationError("Invalid lead data".to_string())
}

/// The client's lead object, checked to carry an `ODS_Code`.
fn lead_payload(payload: &Value) -> Result<(&Map<String, Value>, String)> {
    let map = payload.as_object().ok_or_else(invalid_lead)?;
    let code = map
        .get("ODS_Code")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(invalid_lead)?;
    Ok((map, code.to_string()))
}

pub struct SavedLeadsUseCase {
    store: Arc<dyn SavedLeadStore>,
    ods: Arc<dyn OdsDirectory>,
    enrich_pause: Duration,
}

impl SavedLeadsUseCase {
    pub fn new(store: Arc<dyn SavedLeadStore>, ods: Arc<dyn OdsDirectory>) -> Self {
        Self {
            store,
            ods,
            enrich_pause: DEFAULT_ENRICH_PAUSE,
        }
    }

    pub fn with_enrich_pause(mut self, pause: Duration) -> Self {
        self.enrich_pause = pause;
        self
    }

    /// Newest first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<SavedLead>> {
        let mut leads = self.store.list(user_id).await?;
        leads.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(leads)
    }

    pub async fn save(&self, user_id: &str, payload: &Value) -> Result<(SaveOutcome, SavedLead)> {
        let (map, code) = lead_payload(payload)?;

        if let Some(mut existing) = self.store.find(user_id, &code).await? {
            existing.merge(map)?;
            self.store.upsert(user_id, &existing).await?;
            info!(user_id, ods_code = %code, "Saved lead updated");
            return Ok((SaveOutcome::Updated, existing));
        }

        let mut fields = map.clone();
        fields.remove("SavedAt");
        fields.remove("Notes");
        let lead: Lead = serde_json::from_value(Value::Object(fields)).map_err(|_| invalid_lead())?;

        let saved = SavedLead::new(lead);
        self.store.upsert(user_id, &saved).await?;
        info!(user_id, ods_code = %code, "Lead saved");
        Ok((SaveOutcome::Saved, saved))
    }

    pub async fn remove(&self, user_id: &str, ods_code: Option<&str>) -> Result<()> {
        let ods_code = ods_code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AppError::ValidationError("ODS Code required".to_string()))?;

        if !self.store.remove(user_id, ods_code).await? {
            info!(user_id, ods_code, "Remove requested for a lead that was not saved");
        }
        Ok(())
    }

    pub async fn annotate(
        &self,
        user_id: &str,
        ods_code: &str,
        notes: Option<String>,
    ) -> Result<SavedLead> {
        let mut saved = self
            .store
            .find(user_id, ods_code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Saved lead not found: {}", ods_code)))?;

        saved.notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.store.upsert(user_id, &saved).await?;
        Ok(saved)
    }

    /// ODS-enriches every saved lead that has no phone number yet.
    pub async fn enrich_all(&self, user_id: &str) -> Result<EnrichAllReport> {
        let leads = self.list(user_id).await?;
        let mut report = EnrichAllReport::default();
        let mut first_call = true;

        for mut saved in leads {
            if saved.lead.has_phone() {
                report.skipped += 1;
                continue;
            }

            if !first_call && !self.enrich_pause.is_zero() {
                tokio::time::sleep(self.enrich_pause).await;
            }
            first_call = false;

            match self.ods.organisation(saved.code()).await {
                Ok(org) => {
                    saved.lead.apply_ods_enrichment(&extract_ods_enrichment(&org));
                    self.store.upsert(user_id, &saved).await?;
                    report.enriched += 1;
                }
                Err(e) => {
                    warn!(user_id, ods_code = %saved.code(), error = %e, "Enrichment failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            user_id,
            enriched = report.enriched,
            failed = report.failed,
            skipped = report.skipped,
            "Enrich all finished"
        );
        Ok(report)
    }

    pub async fn export_csv(&self, user_id: &str) -> Result<CsvExport> {
        let leads = self.list(user_id).await?;
        Ok(CsvExport {
            file_name: export_file_name(Utc::now().date_naive()),
            body: LeadCsvWriter::new().saved_to_string(&leads)?,
        })
    }
}
