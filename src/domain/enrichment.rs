use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contact details pulled from an ODS organisation record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdsEnrichment {
    pub phone_number: String,
    pub email: String,
    pub website: String,
    pub full_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uprn: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceReview {
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub time: Option<String>,
    pub profile_photo: Option<String>,
}

/// Google Places profile for a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceProfile {
    pub place_id: String,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub google_maps_url: Option<String>,
    pub rating: Option<f64>,
    pub total_reviews: Option<u64>,
    pub business_status: Option<String>,
    pub price_level: Option<u8>,
    pub open_now: Option<bool>,
    pub weekday_hours: Vec<String>,
    pub reviews: Vec<PlaceReview>,
    pub photo_url: Option<String>,
    pub types: Vec<String>,
}

/// Outcome of a Places lookup. A miss is not an error: `places` is null and
/// `message` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacesEnrichment {
    pub places: Option<PlaceProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PlacesEnrichment {
    pub fn found(profile: PlaceProfile) -> Self {
        Self {
            places: Some(profile),
            message: None,
        }
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            places: None,
            message: Some(message.into()),
        }
    }
}
