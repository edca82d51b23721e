use crate::domain::enrichment::{OdsEnrichment, PlaceProfile, PlaceReview, PlacesEnrichment};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::api_clients::ods::OdsOrganisation;
use crate::infrastructure::api_clients::places::PlaceDetails;
use crate::infrastructure::api_clients::{OdsDirectory, PlacesLookup};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

const MAX_REVIEWS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdsEnrichRequest {
    #[serde(default)]
    pub ods_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacesEnrichRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Picks the tel/email/http contacts and the full postal address. A later
/// contact of the same type replaces an earlier one.
pub fn extract_ods_enrichment(org: &OdsOrganisation) -> OdsEnrichment {
    let mut enrichment = OdsEnrichment {
        last_updated: org.last_change_date.clone(),
        ..Default::default()
    };

    for contact in org.contacts() {
        let value = contact.value.clone();
        match contact.contact_type.to_lowercase().as_str() {
            "tel" => enrichment.phone_number = value,
            "email" => enrichment.email = value,
            "http" => enrichment.website = value,
            _ => {}
        }
    }

    if let Some(location) = org.location() {
        enrichment.full_address = [
            &location.addr_ln1,
            &location.addr_ln2,
            &location.addr_ln3,
            &location.town,
            &location.county,
        ]
        .into_iter()
        .flatten()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
        enrichment.uprn = location.uprn.clone().filter(|u| !u.is_null());
    }

    enrichment
}

/// Free-text input for the Places text search.
pub fn places_query(name: &str, address: Option<&str>, postcode: Option<&str>) -> String {
    [Some(name), address, postcode, Some("UK")]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn place_profile(
    place_id: &str,
    details: PlaceDetails,
    photo_url: impl Fn(&str) -> Option<String>,
) -> PlaceProfile {
    let opening_hours = details.opening_hours.unwrap_or_default();
    PlaceProfile {
        place_id: place_id.to_string(),
        name: details.name,
        formatted_address: details.formatted_address,
        phone: details
            .formatted_phone_number
            .or(details.international_phone_number),
        website: details.website,
        google_maps_url: details.url,
        rating: details.rating,
        total_reviews: details.user_ratings_total,
        business_status: details.business_status,
        price_level: details.price_level,
        open_now: opening_hours.open_now,
        weekday_hours: opening_hours.weekday_text,
        reviews: details
            .reviews
            .into_iter()
            .take(MAX_REVIEWS)
            .map(|review| PlaceReview {
                author: review.author_name,
                rating: review.rating,
                text: review.text,
                time: review.relative_time_description,
                profile_photo: review.profile_photo_url,
            })
            .collect(),
        photo_url: details
            .photos
            .first()
            .and_then(|photo| photo_url(&photo.photo_reference)),
        types: details.types,
    }
}

pub struct EnrichmentUseCase {
    ods: Arc<dyn OdsDirectory>,
    places: Arc<dyn PlacesLookup>,
}

impl EnrichmentUseCase {
    pub fn new(ods: Arc<dyn OdsDirectory>, places: Arc<dyn PlacesLookup>) -> Self {
        Self { ods, places }
    }

    pub async fn ods_contact_details(&self, request: &OdsEnrichRequest) -> Result<OdsEnrichment> {
        let ods_code = request
            .ods_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AppError::ValidationError("ODS Code is required".to_string()))?;

        let org = self.ods.organisation(ods_code).await?;
        Ok(extract_ods_enrichment(&org))
    }

    pub async fn places_profile(&self, request: &PlacesEnrichRequest) -> Result<PlacesEnrichment> {
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::ValidationError("Name is required".to_string()))?;

        let input = places_query(name, request.address.as_deref(), request.postcode.as_deref());
        let found = self.places.find_place(&input).await?;
        let Some(candidate) = found
            .candidates
            .into_iter()
            .next()
            .filter(|_| found.status == "OK")
        else {
            info!(query = %input, status = %found.status, "No Places candidate");
            return Ok(PlacesEnrichment::missing(format!(
                "No Google Places match found for \"{}\"",
                name
            )));
        };

        let details = self.places.place_details(&candidate.place_id).await?;
        match details.result {
            Some(result) if details.status == "OK" => Ok(PlacesEnrichment::found(place_profile(
                &candidate.place_id,
                result,
                |reference| self.places.photo_url(reference),
            ))),
            _ => Ok(PlacesEnrichment::missing(format!(
                "Google Places details failed: {}",
                details.status
            ))),
        }
    }
}
