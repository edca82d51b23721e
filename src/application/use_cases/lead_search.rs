use crate::domain::error::Result;
use crate::domain::lead::{Lead, LeadPage, LeadType, DEFAULT_ODS_ROLE};
use crate::infrastructure::api_clients::ods::{OdsOrganisationSummary, OdsQuery};
use crate::infrastructure::api_clients::OdsDirectory;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

static POSTCODE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,2}[0-9]").unwrap());

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LeadSearchRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
}

impl Default for LeadSearchRequest {
    fn default() -> Self {
        Self {
            role: None,
            limit: default_limit(),
            offset: 0,
            search: None,
            town: None,
            postcode: None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Builds the upstream query. The second value is a lower-cased city that
/// results must mention when `town` was a place name rather than a postcode.
pub fn build_ods_query(request: &LeadSearchRequest) -> (OdsQuery, Option<String>) {
    let search = non_empty(&request.search);
    let mut query = OdsQuery {
        primary_role_id: non_empty(&request.role).unwrap_or_else(|| DEFAULT_ODS_ROLE.to_string()),
        limit: request.limit,
        offset: (request.offset != 0).then_some(request.offset),
        name: search.clone(),
        post_code: None,
    };

    let mut city = None;
    if let Some(town) = non_empty(&request.town) {
        if POSTCODE_PREFIX.is_match(&town) {
            query.post_code = Some(town);
        } else {
            city = Some(town.to_lowercase());
            if search.is_none() {
                query.name = Some(town);
            }
        }
    }

    if let Some(postcode) = non_empty(&request.postcode) {
        query.post_code = Some(postcode);
    }

    (query, city)
}

pub fn matches_city(org: &OdsOrganisationSummary, city: &str) -> bool {
    let location = org.location();
    let contains = |value: Option<&str>| {
        value
            .map(|v| v.to_lowercase().contains(city))
            .unwrap_or(false)
    };

    contains(location.and_then(|l| l.addr_ln1.as_deref()))
        || contains(location.and_then(|l| l.town.as_deref()))
        || contains(org.name.as_deref())
}

pub fn organisation_to_lead(org: &OdsOrganisationSummary) -> Lead {
    let location = org.location();
    let present = |value: Option<&String>| value.filter(|v| !v.trim().is_empty()).cloned();

    let mut lead = Lead::new(
        org.name.clone().unwrap_or_default(),
        org.org_id.clone(),
        LeadType::from_ods_role(org.primary_role_id.as_deref().unwrap_or_default()),
    );
    if let Some(status) = present(org.status.as_ref()) {
        lead.status = status;
    }
    lead.address = present(location.and_then(|l| l.addr_ln1.as_ref()));
    lead.city = present(location.and_then(|l| l.town.as_ref()));
    lead.postcode = present(org.post_code.as_ref());
    lead.role = present(org.primary_role_description.as_ref());
    lead
}

pub struct LeadSearchUseCase {
    ods: Arc<dyn OdsDirectory>,
}

impl LeadSearchUseCase {
    pub fn new(ods: Arc<dyn OdsDirectory>) -> Self {
        Self { ods }
    }

    pub async fn execute(&self, request: &LeadSearchRequest) -> Result<LeadPage> {
        request.validate()?;
        let (query, city) = build_ods_query(request);
        debug!(?query, ?city, "Searching ODS");

        let page = self.ods.search(&query).await?;
        let leads: Vec<Lead> = page
            .organisations
            .iter()
            .filter(|org| city.as_deref().map_or(true, |c| matches_city(org, c)))
            .map(organisation_to_lead)
            .collect();

        let has_more = leads.len() == request.limit as usize;
        Ok(LeadPage {
            leads,
            total: page.total_count,
            page: None,
            total_pages: None,
            has_more,
        })
    }
}
