use super::{build_client, endpoint, upstream_failure, CqcDirectory};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::CqcConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const SERVICE: &str = "CQC API";
pub const MISSING_KEY: &str = "CQC API Key missing. Add CQC_API_KEY to .env";

/// Structured filter applied to a location listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CqcFilter {
    pub service_type: Option<&'static str>,
    pub directorate: Option<&'static str>,
}

impl CqcFilter {
    pub fn service_type(name: &'static str) -> Self {
        Self {
            service_type: Some(name),
            directorate: None,
        }
    }

    pub fn directorate(name: &'static str) -> Self {
        Self {
            service_type: None,
            directorate: Some(name),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcLocationRef {
    pub location_id: String,
    pub location_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcLocationPage {
    pub locations: Vec<CqcLocationRef>,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcNamed {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcPerson {
    pub person_title: Option<String>,
    pub person_given_name: Option<String>,
    pub person_family_name: Option<String>,
    pub person_roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcRegulatedActivity {
    pub name: String,
    pub contacts: Vec<CqcPerson>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcKeyQuestionRating {
    pub name: String,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcOverallRating {
    pub rating: Option<String>,
    pub report_date: Option<String>,
    pub key_question_ratings: Vec<CqcKeyQuestionRating>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcCurrentRatings {
    pub overall: Option<CqcOverallRating>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CqcInspection {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcLastReport {
    pub publication_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcReport {
    pub report_date: Option<String>,
    pub report_uri: Option<String>,
}

/// Detail record of one registered location.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CqcLocation {
    pub location_id: String,
    pub provider_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
    pub registration_status: Option<String>,
    pub registration_date: Option<String>,
    pub postal_address_line1: Option<String>,
    pub postal_address_line2: Option<String>,
    pub postal_address_town_city: Option<String>,
    pub postal_code: Option<String>,
    pub main_phone_number: Option<String>,
    pub website: Option<String>,
    pub region: Option<String>,
    pub onspd_latitude: Option<f64>,
    pub onspd_longitude: Option<f64>,
    pub local_authority: Option<String>,
    pub constituency: Option<String>,
    pub inspection_directorate: Option<String>,
    pub care_home: Option<String>,
    pub number_of_beds: Option<u32>,
    pub current_ratings: Option<CqcCurrentRatings>,
    pub regulated_activities: Vec<CqcRegulatedActivity>,
    pub gac_service_types: Vec<CqcNamed>,
    pub specialisms: Vec<CqcNamed>,
    pub inspection_categories: Vec<CqcNamed>,
    pub last_inspection: Option<CqcInspection>,
    pub last_report: Option<CqcLastReport>,
    pub reports: Vec<CqcReport>,
    pub onspd_icb_name: Option<String>,
    pub onspd_ccg_name: Option<String>,
}

impl CqcLocation {
    pub fn overall_rating(&self) -> Option<&CqcOverallRating> {
        self.current_ratings.as_ref().and_then(|r| r.overall.as_ref())
    }
}

pub struct CqcClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CqcClient {
    pub fn new(config: &CqcConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs, None)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::ConfigError(MISSING_KEY.to_string()))
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let api_key = self.api_key()?;
        self.client
            .get(url)
            .query(query)
            .header("Ocp-Apim-Subscription-Key", api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("CQC API request failed: {}", e)))
    }
}

#[async_trait]
impl CqcDirectory for CqcClient {
    async fn list_locations(
        &self,
        filter: &CqcFilter,
        page: u64,
        per_page: u64,
    ) -> Result<CqcLocationPage> {
        let mut query = vec![("perPage", per_page.to_string()), ("page", page.to_string())];
        if let Some(service_type) = filter.service_type {
            query.push(("gacServiceTypeDescription", service_type.to_string()));
        }
        if let Some(directorate) = filter.directorate {
            query.push(("inspectionDirectorate", directorate.to_string()));
        }

        let response = self
            .get(&endpoint(&self.base_url, "locations"), &query)
            .await?;
        if !response.status().is_success() {
            return Err(upstream_failure(SERVICE, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse CQC location list: {}", e)))
    }

    async fn location(&self, location_id: &str) -> Result<CqcLocation> {
        let url = endpoint(&self.base_url, &format!("locations/{}", location_id));
        let response = self.get(&url, &[]).await?;
        if !response.status().is_success() {
            return Err(upstream_failure(SERVICE, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse CQC location: {}", e)))
    }
}
