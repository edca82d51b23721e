use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::lead::{coordinate, Contact, Lead, LeadType};

pub const DOCTIFY_SOURCE: &str = "doctify";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Listing data that has no dedicated column in `scraped_leads`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeRawData {
    pub slug: String,
    pub geo: Option<GeoPoint>,
    pub opening_hours: Option<Value>,
    #[serde(default)]
    pub employees: Vec<String>,
}

/// A practice extracted from a partner listing page, ready for upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPractice {
    pub source: String,
    pub name: String,
    pub url: String,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub specialties: Vec<String>,
    pub categories: Vec<String>,
    pub rating: Option<f64>,
    pub review_count: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub raw_data: PracticeRawData,
}

/// A stored row of `scraped_leads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedLead {
    pub id: Uuid,
    pub source: String,
    pub name: String,
    pub url: String,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub specialties: Vec<String>,
    pub categories: Vec<String>,
    pub rating: Option<f64>,
    pub review_count: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub raw_data: Value,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ScrapedAttributes<'a> {
    source: &'a str,
    source_url: &'a str,
    categories: &'a [String],
    specialties: &'a [String],
    rating: Option<f64>,
    review_count: i32,
    description: Option<&'a str>,
    image_url: Option<&'a str>,
    scraped_at: DateTime<Utc>,
}

impl ScrapedLead {
    pub fn role_label(&self) -> &'static str {
        if self.source == DOCTIFY_SOURCE {
            "Doctify Practice"
        } else {
            "GoPrivate Listing"
        }
    }

    /// Shapes the row like any other lead so the grid can render it.
    pub fn to_lead(&self) -> Lead {
        let geo = self.raw_data.get("geo");
        let contacts = self
            .raw_data
            .get("employees")
            .and_then(Value::as_array)
            .map(|employees| {
                employees
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|name| Contact {
                        name: name.to_string(),
                        roles: vec!["Medical Professional".to_string()],
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut lead = Lead::new(self.name.clone(), self.id.to_string(), LeadType::ScrapedLead);
        lead.address = self.address.clone();
        lead.city = self.city.clone();
        lead.postcode = self.postcode.clone();
        lead.role = Some(self.role_label().to_string());
        lead.phone_number = self.phone.clone();
        lead.website = self.website.clone().or_else(|| Some(self.url.clone()));
        lead.email = self.email.clone();
        lead.latitude = geo.and_then(|g| g.get("lat")).and_then(coordinate);
        lead.longitude = geo.and_then(|g| g.get("lng")).and_then(coordinate);
        lead.service_types = self.specialties.clone();
        lead.overall_rating = self.rating.map(|rating| rating.to_string());
        lead.contacts = contacts;

        lead.with_attributes(&ScrapedAttributes {
            source: &self.source,
            source_url: &self.url,
            categories: &self.categories,
            specialties: &self.specialties,
            rating: self.rating,
            review_count: self.review_count,
            description: self.description.as_deref(),
            image_url: self.image_url.as_deref(),
            scraped_at: self.scraped_at,
        })
    }
}

/// Filters accepted by the scraped-leads listing. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedLeadFilter {
    pub source: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// Listing families of the Doctify UK sitemaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Practices,
    Specialists,
    Hospitals,
    Pharmacies,
    CareHomes,
}

impl PageType {
    pub const ALL: [PageType; 5] = [
        PageType::Practices,
        PageType::Specialists,
        PageType::Hospitals,
        PageType::Pharmacies,
        PageType::CareHomes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Practices => "practices",
            PageType::Specialists => "specialists",
            PageType::Hospitals => "hospitals",
            PageType::Pharmacies => "pharmacies",
            PageType::CareHomes => "carehomes",
        }
    }

    pub fn sitemap_url(&self) -> String {
        format!("https://www.doctify.com/sitemap.uk.{}.xml", self.as_str())
    }

    /// Path segment after `/uk/` on listing URLs of this type.
    pub fn path_segment(&self) -> &'static str {
        match self {
            PageType::Practices => "practice",
            PageType::Specialists => "specialist",
            PageType::Hospitals => "hospital",
            PageType::Pharmacies => "pharmacy",
            PageType::CareHomes => "care-home",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PageType::ALL
            .into_iter()
            .find(|page_type| page_type.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = PageType::ALL.iter().map(|t| t.as_str()).collect();
                format!("Unknown type \"{}\". Valid types: {}", s, valid.join(", "))
            })
    }
}
