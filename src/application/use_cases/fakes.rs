//! In-memory stand-ins for the upstream directories and stores.

use crate::domain::error::{AppError, Result};
use crate::domain::saved_lead::SavedLead;
use crate::domain::scraped::{ScrapedLead, ScrapedLeadFilter, ScrapedPractice};
use crate::infrastructure::api_clients::cqc::{
    CqcFilter, CqcLocation, CqcLocationPage, CqcLocationRef, SERVICE as CQC_SERVICE,
};
use crate::infrastructure::api_clients::ods::{
    OdsContact, OdsContacts, OdsGeoLoc, OdsLocation, OdsOrganisation, OdsOrganisationSummary,
    OdsQuery, OdsSearchPage,
};
use crate::infrastructure::api_clients::places::{
    FindPlaceResponse, PlaceCandidate, PlaceDetails, PlaceDetailsResponse,
};
use crate::infrastructure::api_clients::{CqcDirectory, OdsDirectory, PageFetcher, PlacesLookup};
use crate::infrastructure::db::{SavedLeadStore, ScrapedLeadStore};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn ods_summary(code: &str, name: &str, role: &str, town: &str) -> OdsOrganisationSummary {
    OdsOrganisationSummary {
        name: Some(name.to_string()),
        org_id: code.to_string(),
        status: Some("Active".to_string()),
        post_code: Some("LS1 1AA".to_string()),
        primary_role_id: Some(role.to_string()),
        primary_role_description: Some("PHARMACY".to_string()),
        geo_loc: Some(OdsGeoLoc {
            location: Some(OdsLocation {
                addr_ln1: Some("1 HIGH ST".to_string()),
                town: Some(town.to_string()),
                post_code: Some("LS1 1AA".to_string()),
                ..Default::default()
            }),
        }),
    }
}

pub fn ods_organisation(code: &str) -> OdsOrganisation {
    let contact = |kind: &str, value: &str| OdsContact {
        contact_type: kind.to_string(),
        value: value.to_string(),
    };
    OdsOrganisation {
        name: Some(format!("Organisation {}", code)),
        last_change_date: Some("2024-03-01".to_string()),
        geo_loc: Some(OdsGeoLoc {
            location: Some(OdsLocation {
                addr_ln1: Some("1 HIGH ST".to_string()),
                town: Some("LEEDS".to_string()),
                county: Some("WEST YORKSHIRE".to_string()),
                post_code: Some("LS1 1AA".to_string()),
                country: Some("ENGLAND".to_string()),
                uprn: Some(json!(10001)),
                ..Default::default()
            }),
        }),
        contacts: Some(OdsContacts {
            contact: vec![
                contact("tel", "0113 496 0000"),
                contact("email", "info@boots.example"),
                contact("http", "http://boots.example"),
            ],
        }),
    }
}

/// Serves `pages` in call order, then empty pages (or errors once
/// `failing_after_pages` is set).
#[derive(Clone, Default)]
pub struct FakeOds {
    pages: Arc<Vec<OdsSearchPage>>,
    fail_when_exhausted: bool,
    queries: Arc<Mutex<Vec<OdsQuery>>>,
}

impl FakeOds {
    pub fn with_page(organisations: Vec<OdsOrganisationSummary>, total_count: u64) -> Self {
        Self {
            pages: Arc::new(vec![OdsSearchPage {
                organisations,
                total_count,
            }]),
            ..Default::default()
        }
    }

    pub fn with_pages(pages: Vec<Vec<OdsOrganisationSummary>>) -> Self {
        let total_count = pages.iter().map(|p| p.len() as u64).sum();
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|organisations| OdsSearchPage {
                        organisations,
                        total_count,
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn failing_after_pages(mut self) -> Self {
        self.fail_when_exhausted = true;
        self
    }

    pub fn last_query(&self) -> Option<OdsQuery> {
        self.queries.lock().unwrap().last().cloned()
    }

    pub fn search_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl OdsDirectory for FakeOds {
    async fn search(&self, query: &OdsQuery) -> Result<OdsSearchPage> {
        let call = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.clone());
            queries.len() - 1
        };
        match self.pages.get(call) {
            Some(page) => Ok(page.clone()),
            None if self.fail_when_exhausted => {
                Err(AppError::upstream("NHS API", 503, "Service Unavailable"))
            }
            None => Ok(OdsSearchPage::default()),
        }
    }

    async fn organisation(&self, ods_code: &str) -> Result<OdsOrganisation> {
        if ods_code == "MISSING" {
            return Err(AppError::upstream("NHS API", 404, "Organisation not found"));
        }
        Ok(ods_organisation(ods_code))
    }
}

pub fn cqc_location(id: &str, location_type: &str) -> CqcLocation {
    CqcLocation {
        location_id: id.to_string(),
        name: Some(format!("Clinic {}", id)),
        location_type: Some(location_type.to_string()),
        registration_status: Some("Registered".to_string()),
        postal_address_line1: Some("1 Harley St".to_string()),
        postal_address_town_city: Some("London".to_string()),
        postal_code: Some("W1G 9QD".to_string()),
        main_phone_number: Some("020 7000 0000".to_string()),
        ..Default::default()
    }
}

#[derive(Clone, Default)]
pub struct FakeCqc {
    details: Arc<HashMap<String, CqcLocation>>,
    listed: Arc<Vec<String>>,
    total: u64,
    total_pages: u64,
    missing_key: bool,
    list_status: Option<u16>,
    filters: Arc<Mutex<Vec<CqcFilter>>>,
}

impl FakeCqc {
    /// Listed ids without a matching location fail their detail fetch.
    pub fn new(locations: Vec<CqcLocation>, listed: &[&str], total: u64, total_pages: u64) -> Self {
        Self {
            details: Arc::new(
                locations
                    .into_iter()
                    .map(|l| (l.location_id.clone(), l))
                    .collect(),
            ),
            listed: Arc::new(listed.iter().map(|id| id.to_string()).collect()),
            total,
            total_pages,
            ..Default::default()
        }
    }

    pub fn missing_key() -> Self {
        Self {
            missing_key: true,
            ..Default::default()
        }
    }

    /// Listing answers `status` with an upstream body.
    pub fn failing_list(status: u16) -> Self {
        Self {
            list_status: Some(status),
            ..Default::default()
        }
    }

    pub fn last_filter(&self) -> Option<CqcFilter> {
        self.filters.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl CqcDirectory for FakeCqc {
    async fn list_locations(
        &self,
        filter: &CqcFilter,
        _page: u64,
        _per_page: u64,
    ) -> Result<CqcLocationPage> {
        if self.missing_key {
            return Err(AppError::ConfigError(
                "CQC API Key missing. Add CQC_API_KEY to .env".to_string(),
            ));
        }
        if let Some(status) = self.list_status {
            return Err(AppError::upstream(CQC_SERVICE, status, "{\"message\":\"upstream down\"}"));
        }
        self.filters.lock().unwrap().push(*filter);
        Ok(CqcLocationPage {
            locations: self
                .listed
                .iter()
                .map(|id| CqcLocationRef {
                    location_id: id.clone(),
                    location_name: None,
                })
                .collect(),
            total: self.total,
            total_pages: self.total_pages,
        })
    }

    async fn location(&self, location_id: &str) -> Result<CqcLocation> {
        self.details
            .get(location_id)
            .cloned()
            .ok_or_else(|| AppError::upstream("CQC API", 404, "Location not found"))
    }
}

#[derive(Clone)]
pub struct FakePlaces {
    find_status: &'static str,
    details_status: &'static str,
    inputs: Arc<Mutex<Vec<String>>>,
}

impl Default for FakePlaces {
    fn default() -> Self {
        Self {
            find_status: "OK",
            details_status: "OK",
            inputs: Arc::default(),
        }
    }
}

impl FakePlaces {
    pub fn no_match() -> Self {
        Self {
            find_status: "ZERO_RESULTS",
            ..Default::default()
        }
    }

    pub fn details_status(status: &'static str) -> Self {
        Self {
            details_status: status,
            ..Default::default()
        }
    }

    pub fn last_input(&self) -> Option<String> {
        self.inputs.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PlacesLookup for FakePlaces {
    async fn find_place(&self, input: &str) -> Result<FindPlaceResponse> {
        self.inputs.lock().unwrap().push(input.to_string());
        let candidates = if self.find_status == "OK" {
            vec![PlaceCandidate {
                place_id: "place-1".to_string(),
                name: Some("Clinic".to_string()),
                formatted_address: Some("1 Harley St, London".to_string()),
            }]
        } else {
            Vec::new()
        };
        Ok(FindPlaceResponse {
            status: self.find_status.to_string(),
            candidates,
        })
    }

    async fn place_details(&self, _place_id: &str) -> Result<PlaceDetailsResponse> {
        let result = (self.details_status == "OK").then(|| PlaceDetails {
            name: Some("Clinic".to_string()),
            formatted_phone_number: Some("020 7000 0000".to_string()),
            rating: Some(4.6),
            user_ratings_total: Some(88),
            ..Default::default()
        });
        Ok(PlaceDetailsResponse {
            status: self.details_status.to_string(),
            result,
        })
    }

    fn photo_url(&self, photo_reference: &str) -> Option<String> {
        Some(format!("https://photos.example/{}", photo_reference))
    }
}

/// Clones share the same rows.
#[derive(Clone, Default)]
pub struct InMemorySavedLeads {
    rows: Arc<Mutex<HashMap<String, Vec<SavedLead>>>>,
}

impl InMemorySavedLeads {
    pub fn insert(&self, user_id: &str, lead: SavedLead) {
        self.rows
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(lead);
    }

    pub fn count(&self, user_id: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .get(user_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn get(&self, user_id: &str, ods_code: &str) -> Option<SavedLead> {
        self.rows
            .lock()
            .unwrap()
            .get(user_id)?
            .iter()
            .find(|saved| saved.code() == ods_code)
            .cloned()
    }
}

#[async_trait]
impl SavedLeadStore for InMemorySavedLeads {
    async fn list(&self, user_id: &str) -> Result<Vec<SavedLead>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find(&self, user_id: &str, ods_code: &str) -> Result<Option<SavedLead>> {
        Ok(self.get(user_id, ods_code))
    }

    async fn upsert(&self, user_id: &str, lead: &SavedLead) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let leads = rows.entry(user_id.to_string()).or_default();
        match leads.iter_mut().find(|saved| saved.code() == lead.code()) {
            Some(existing) => *existing = lead.clone(),
            None => leads.push(lead.clone()),
        }
        Ok(())
    }

    async fn remove(&self, user_id: &str, ods_code: &str) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let Some(leads) = rows.get_mut(user_id) else {
            return Ok(false);
        };
        let before = leads.len();
        leads.retain(|saved| saved.code() != ods_code);
        Ok(leads.len() != before)
    }
}

pub fn scraped_row(name: &str, source: &str, categories: &[&str]) -> ScrapedLead {
    let slug = name.to_lowercase().replace(' ', "-");
    ScrapedLead {
        id: Uuid::new_v4(),
        source: source.to_string(),
        name: name.to_string(),
        url: format!("https://www.doctify.com/uk/practice/{}", slug),
        address: Some("1 Harley St".to_string()),
        postcode: Some("W1G 9QD".to_string()),
        city: Some("London".to_string()),
        phone: None,
        email: None,
        website: None,
        specialties: Vec::new(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        rating: None,
        review_count: 0,
        description: None,
        image_url: None,
        raw_data: json!({ "slug": slug }),
        scraped_at: Utc::now(),
    }
}

fn practice_row(practice: &ScrapedPractice) -> ScrapedLead {
    ScrapedLead {
        id: Uuid::new_v4(),
        source: practice.source.clone(),
        name: practice.name.clone(),
        url: practice.url.clone(),
        address: practice.address.clone(),
        postcode: practice.postcode.clone(),
        city: practice.city.clone(),
        phone: practice.phone.clone(),
        email: practice.email.clone(),
        website: practice.website.clone(),
        specialties: practice.specialties.clone(),
        categories: practice.categories.clone(),
        rating: practice.rating,
        review_count: practice.review_count,
        description: practice.description.clone(),
        image_url: practice.image_url.clone(),
        raw_data: serde_json::to_value(&practice.raw_data).unwrap_or_default(),
        scraped_at: Utc::now(),
    }
}

/// Rows keyed by URL, like the `scraped_leads` unique constraint.
#[derive(Clone, Default)]
pub struct InMemoryScrapedLeads {
    rows: Arc<Mutex<Vec<ScrapedLead>>>,
}

impl InMemoryScrapedLeads {
    pub fn with_rows(rows: Vec<ScrapedLead>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ScrapedLeadStore for InMemoryScrapedLeads {
    async fn list(&self, filter: &ScrapedLeadFilter) -> Result<(Vec<ScrapedLead>, u64)> {
        let rows = self.rows.lock().unwrap();
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        let matching: Vec<&ScrapedLead> = rows
            .iter()
            .filter(|row| filter.source.as_ref().map_or(true, |s| &row.source == s))
            .filter(|row| {
                filter
                    .category
                    .as_ref()
                    .map_or(true, |c| row.categories.contains(c))
            })
            .filter(|row| {
                search
                    .as_ref()
                    .map_or(true, |s| row.name.to_lowercase().contains(s))
            })
            .collect();

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn upsert(&self, practice: &ScrapedPractice) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let fresh = practice_row(practice);
        match rows.iter_mut().find(|row| row.url == practice.url) {
            Some(existing) => {
                *existing = ScrapedLead {
                    id: existing.id,
                    ..fresh
                }
            }
            None => rows.push(fresh),
        }
        Ok(())
    }
}

/// Serves fixed bodies by URL; unknown URLs fail with 404.
#[derive(Clone, Default)]
pub struct FakePages {
    pages: HashMap<String, String>,
    fetches: Arc<Mutex<Vec<String>>>,
}

impl FakePages {
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|fetched| fetched.as_str() == url)
            .count()
    }
}

#[async_trait]
impl PageFetcher for FakePages {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.fetches.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::upstream("Page fetch", 404, url.to_string()))
    }
}
