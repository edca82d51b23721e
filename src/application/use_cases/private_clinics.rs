use crate::domain::error::{AppError, Result};
use crate::domain::lead::{page_number, Contact, Lead, LeadPage, LeadType};
use crate::infrastructure::api_clients::cqc::{CqcFilter, CqcLocation, CqcLocationRef};
use crate::infrastructure::api_clients::CqcDirectory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

const REPORT_BASE_URL: &str = "https://www.cqc.org.uk";
const INDEPENDENT_TYPES: [&str; 2] = ["Independent Healthcare Org", "Independent Hospital"];

/// Service families offered in the private-clinic search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCategory {
    All,
    Gp,
    Dental,
    Pharmacy,
    MentalHealth,
    Surgery,
    Diagnostics,
    Homecare,
    Nursing,
    Hospice,
    Rehabilitation,
    UrgentCare,
    Ambulance,
}

impl ServiceCategory {
    /// Unknown slugs fall back to `All`.
    pub fn from_slug(slug: &str) -> Self {
        match slug.trim().to_lowercase().as_str() {
            "gp" => ServiceCategory::Gp,
            "dental" => ServiceCategory::Dental,
            "pharmacy" => ServiceCategory::Pharmacy,
            "mental-health" => ServiceCategory::MentalHealth,
            "surgery" => ServiceCategory::Surgery,
            "diagnostics" => ServiceCategory::Diagnostics,
            "homecare" => ServiceCategory::Homecare,
            "nursing" => ServiceCategory::Nursing,
            "hospice" => ServiceCategory::Hospice,
            "rehabilitation" => ServiceCategory::Rehabilitation,
            "urgent-care" => ServiceCategory::UrgentCare,
            "ambulance" => ServiceCategory::Ambulance,
            _ => ServiceCategory::All,
        }
    }

    pub fn filter(&self) -> CqcFilter {
        match self {
            ServiceCategory::All | ServiceCategory::Gp => {
                CqcFilter::service_type("Doctors consultation service")
            }
            ServiceCategory::Dental => CqcFilter::service_type("Dental service"),
            ServiceCategory::Pharmacy | ServiceCategory::UrgentCare | ServiceCategory::Ambulance => {
                CqcFilter::directorate("Primary medical services")
            }
            ServiceCategory::MentalHealth
            | ServiceCategory::Surgery
            | ServiceCategory::Diagnostics
            | ServiceCategory::Rehabilitation => CqcFilter::directorate("Hospitals"),
            ServiceCategory::Homecare | ServiceCategory::Nursing | ServiceCategory::Hospice => {
                CqcFilter::directorate("Adult social care")
            }
        }
    }

    /// Broad searches keep independent providers only.
    pub fn independent_only(&self) -> bool {
        matches!(self, ServiceCategory::All | ServiceCategory::Gp)
    }
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PrivateClinicRequest {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 500))]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub service: Option<String>,
}

impl Default for PrivateClinicRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            service: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct DetailedRating<'a> {
    category: &'a str,
    rating: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct InspectionReport {
    date: Option<String>,
    uri: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CqcAttributes<'a> {
    local_authority: Option<&'a str>,
    constituency: Option<&'a str>,
    provider_id: Option<&'a str>,
    registration_date: Option<&'a str>,
    inspection_directorate: Option<&'a str>,
    care_home: bool,
    number_of_beds: Option<u32>,
    rating_date: Option<&'a str>,
    detailed_ratings: Vec<DetailedRating<'a>>,
    regulated_activities: Vec<&'a str>,
    specialisms: Vec<&'a str>,
    inspection_categories: Vec<&'a str>,
    last_inspection_date: Option<&'a str>,
    last_report_date: Option<&'a str>,
    reports: Vec<InspectionReport>,
    icb_name: Option<&'a str>,
    ccg_name: Option<&'a str>,
}

pub fn normalize_website(website: &str) -> String {
    if website.starts_with("http") {
        website.to_string()
    } else {
        format!("https://{}", website)
    }
}

fn join_present(parts: &[Option<&str>], separator: &str) -> Option<String> {
    let joined = parts
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator);
    (!joined.is_empty()).then_some(joined)
}

/// Named people of every regulated activity, first occurrence of a name wins.
fn unique_contacts(location: &CqcLocation) -> Vec<Contact> {
    let mut contacts: Vec<Contact> = Vec::new();
    for person in location
        .regulated_activities
        .iter()
        .flat_map(|activity| activity.contacts.iter())
    {
        let Some(name) = join_present(
            &[
                person.person_title.as_deref(),
                person.person_given_name.as_deref(),
                person.person_family_name.as_deref(),
            ],
            " ",
        ) else {
            continue;
        };
        if contacts.iter().any(|c| c.name == name) {
            continue;
        }
        contacts.push(Contact {
            name,
            roles: person.person_roles.clone(),
        });
    }
    contacts
}

pub fn keep_location(location: &CqcLocation, category: ServiceCategory) -> bool {
    if location.registration_status.as_deref() != Some("Registered") {
        return false;
    }
    if category.independent_only() {
        return location
            .location_type
            .as_deref()
            .map_or(false, |t| INDEPENDENT_TYPES.contains(&t));
    }
    true
}

pub fn location_to_lead(location: &CqcLocation) -> Lead {
    let overall = location.overall_rating();

    let mut lead = Lead::new(
        location.name.clone().unwrap_or_default(),
        location.location_id.clone(),
        LeadType::PrivateClinic,
    );
    lead.address = join_present(
        &[
            location.postal_address_line1.as_deref(),
            location.postal_address_line2.as_deref(),
        ],
        ", ",
    );
    lead.city = location.postal_address_town_city.clone();
    lead.postcode = location.postal_code.clone();
    lead.role = location.location_type.clone();
    lead.phone_number = location
        .main_phone_number
        .clone()
        .filter(|p| !p.trim().is_empty());
    lead.website = location
        .website
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(normalize_website);
    lead.region = location.region.clone();
    lead.latitude = location.onspd_latitude;
    lead.longitude = location.onspd_longitude;
    lead.overall_rating = overall.and_then(|o| o.rating.clone());
    lead.service_types = location
        .gac_service_types
        .iter()
        .map(|s| s.name.clone())
        .collect();
    lead.contacts = unique_contacts(location);

    lead.with_attributes(&CqcAttributes {
        local_authority: location.local_authority.as_deref(),
        constituency: location.constituency.as_deref(),
        provider_id: location.provider_id.as_deref(),
        registration_date: location.registration_date.as_deref(),
        inspection_directorate: location.inspection_directorate.as_deref(),
        care_home: location.care_home.as_deref() == Some("Y"),
        number_of_beds: location.number_of_beds,
        rating_date: overall.and_then(|o| o.report_date.as_deref()),
        detailed_ratings: overall
            .map(|o| {
                o.key_question_ratings
                    .iter()
                    .map(|r| DetailedRating {
                        category: &r.name,
                        rating: r.rating.as_deref(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        regulated_activities: location
            .regulated_activities
            .iter()
            .map(|a| a.name.as_str())
            .collect(),
        specialisms: location.specialisms.iter().map(|s| s.name.as_str()).collect(),
        inspection_categories: location
            .inspection_categories
            .iter()
            .map(|c| c.name.as_str())
            .collect(),
        last_inspection_date: location
            .last_inspection
            .as_ref()
            .and_then(|i| i.date.as_deref()),
        last_report_date: location
            .last_report
            .as_ref()
            .and_then(|r| r.publication_date.as_deref()),
        reports: location
            .reports
            .iter()
            .map(|r| InspectionReport {
                date: r.report_date.clone(),
                uri: r
                    .report_uri
                    .as_deref()
                    .map(|uri| format!("{}{}", REPORT_BASE_URL, uri)),
            })
            .collect(),
        icb_name: location.onspd_icb_name.as_deref(),
        ccg_name: location.onspd_ccg_name.as_deref(),
    })
}

pub struct PrivateClinicsUseCase {
    cqc: Arc<dyn CqcDirectory>,
}

impl PrivateClinicsUseCase {
    pub fn new(cqc: Arc<dyn CqcDirectory>) -> Self {
        Self { cqc }
    }

    /// Fetches every detail record concurrently; failed lookups are dropped.
    async fn fetch_details(&self, refs: &[CqcLocationRef]) -> Vec<CqcLocation> {
        let handles: Vec<_> = refs
            .iter()
            .map(|location| {
                let cqc = Arc::clone(&self.cqc);
                let location_id = location.location_id.clone();
                tokio::spawn(async move {
                    let result = cqc.location(&location_id).await;
                    (location_id, result)
                })
            })
            .collect();

        let mut details = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((_, Ok(location))) => details.push(location),
                Ok((location_id, Err(e))) => {
                    warn!(location_id = %location_id, error = %e, "CQC detail lookup failed")
                }
                Err(e) => warn!(error = %e, "CQC detail task panicked"),
            }
        }
        details
    }

    pub async fn execute(&self, request: &PrivateClinicRequest) -> Result<LeadPage> {
        request.validate()?;
        let category = ServiceCategory::from_slug(request.service.as_deref().unwrap_or("all"));
        let limit = u64::from(request.limit);
        let page = page_number(u64::from(request.offset), limit);

        let listing = self
            .cqc
            .list_locations(&category.filter(), page, limit)
            .await
            .map_err(|e| match e {
                AppError::UpstreamError {
                    service,
                    status,
                    details,
                } => {
                    warn!(status, details = %details, "CQC location listing failed");
                    AppError::upstream(&service, status, String::new())
                }
                other => other,
            })?;
        let details = self.fetch_details(&listing.locations).await;

        let leads: Vec<Lead> = details
            .iter()
            .filter(|location| keep_location(location, category))
            .map(location_to_lead)
            .collect();

        info!(
            ?category,
            page,
            listed = listing.locations.len(),
            kept = leads.len(),
            "Private clinic page assembled"
        );

        Ok(LeadPage {
            leads,
            total: listing.total,
            page: Some(page),
            total_pages: Some(listing.total_pages),
            has_more: page < listing.total_pages,
        })
    }
}
