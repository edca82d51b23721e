use super::{build_client, endpoint, upstream_failure, PlacesLookup};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::PlacesConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const SERVICE: &str = "Google Places";
pub const MISSING_KEY: &str = "Google Places API key not configured";

const DETAIL_FIELDS: &str = "name,formatted_address,formatted_phone_number,international_phone_number,website,url,rating,user_ratings_total,opening_hours,business_status,price_level,reviews,types,photos";
const PHOTO_MAX_WIDTH: u32 = 600;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FindPlaceResponse {
    pub status: String,
    pub candidates: Vec<PlaceCandidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpeningHours {
    pub open_now: Option<bool>,
    pub weekday_text: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoogleReview {
    pub author_name: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub relative_time_description: Option<String>,
    pub profile_photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlacePhoto {
    pub photo_reference: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub formatted_phone_number: Option<String>,
    pub international_phone_number: Option<String>,
    pub website: Option<String>,
    pub url: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u64>,
    pub business_status: Option<String>,
    pub price_level: Option<u8>,
    pub opening_hours: Option<OpeningHours>,
    pub reviews: Vec<GoogleReview>,
    pub types: Vec<String>,
    pub photos: Vec<PlacePhoto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaceDetailsResponse {
    pub status: String,
    pub result: Option<PlaceDetails>,
}

pub struct GooglePlacesClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GooglePlacesClient {
    pub fn new(config: &PlacesConfig) -> Result<Self> {
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
}

#[async_trait]
impl PlacesLookup for GooglePlacesClient {
    async fn find_place(&self, input: &str) -> Result<FindPlaceResponse> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .get(endpoint(&self.base_url, "findplacefromtext/json"))
            .query(&[
                ("input", input),
                ("inputtype", "textquery"),
                ("fields", "place_id,name,formatted_address"),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Google Places request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream_failure(SERVICE, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse find place response: {}", e)))
    }

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetailsResponse> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .get(endpoint(&self.base_url, "details/json"))
            .query(&[
                ("place_id", place_id),
                ("fields", DETAIL_FIELDS),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Google Places request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream_failure(SERVICE, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse place details: {}", e)))
    }

    fn photo_url(&self, photo_reference: &str) -> Option<String> {
        let api_key = self.api_key.as_deref()?;
        let mut url = url::Url::parse(&endpoint(&self.base_url, "photo")).ok()?;
        url.query_pairs_mut()
            .append_pair("maxwidth", &PHOTO_MAX_WIDTH.to_string())
            .append_pair("photo_reference", photo_reference)
            .append_pair("key", api_key);
        Some(url.to_string())
    }
}
