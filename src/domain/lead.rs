use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::enrichment::OdsEnrichment;

pub const DEFAULT_ODS_ROLE: &str = "RO172";
pub const DEFAULT_COUNTRY: &str = "UK";

/// Display category of a lead. Unknown values read back as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LeadType {
    Pharmacy,
    Clinic,
    Hospital,
    #[serde(rename = "Private Clinic")]
    PrivateClinic,
    #[serde(rename = "Scraped Lead")]
    ScrapedLead,
    #[default]
    #[serde(other)]
    Other,
}

impl LeadType {
    /// Maps an ODS primary role id to the lead category shown in the grid.
    pub fn from_ods_role(role_id: &str) -> Self {
        match role_id {
            "RO182" => LeadType::Pharmacy,
            "RO172" => LeadType::Clinic,
            "RO197" => LeadType::Hospital,
            _ => LeadType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadType::Pharmacy => "Pharmacy",
            LeadType::Clinic => "Clinic",
            LeadType::Hospital => "Hospital",
            LeadType::PrivateClinic => "Private Clinic",
            LeadType::ScrapedLead => "Scraped Lead",
            LeadType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
}

/// The normalized record shared by every source.
///
/// Wire names are the PascalCase keys the dashboard grid reads. Attributes
/// only one source knows about (CQC inspection data, scraped listing data)
/// live in `extra` and are flattened into the same JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Lead {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "ODS_Code", default, deserialize_with = "null_as_default")]
    pub ods_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default = "default_country", deserialize_with = "country_or_default")]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "Type", default, deserialize_with = "null_as_default")]
    pub lead_type: LeadType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub latitude: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub longitude: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_rating: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub service_types: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub contacts: Vec<Contact>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

/// Reads a coordinate sent as a number or as numeric text.
pub fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn country_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|country| !country.trim().is_empty())
        .unwrap_or_else(default_country))
}

fn lenient_coordinate<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(coordinate))
}

/// Ratings arrive as text from CQC and as numbers from listing sites.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

impl Lead {
    pub fn new(name: impl Into<String>, ods_code: impl Into<String>, lead_type: LeadType) -> Self {
        Self {
            name: name.into(),
            ods_code: ods_code.into(),
            status: "Active".to_string(),
            country: default_country(),
            lead_type,
            ..Default::default()
        }
    }

    /// Folds a source-specific attribute struct into `extra`.
    pub fn with_attributes<T: Serialize>(mut self, attributes: &T) -> Self {
        if let Ok(Value::Object(map)) = serde_json::to_value(attributes) {
            for (key, value) in map {
                if !value.is_null() {
                    self.extra.insert(key, value);
                }
            }
        }
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn has_phone(&self) -> bool {
        self.phone_number
            .as_deref()
            .map(|phone| !phone.trim().is_empty())
            .unwrap_or(false)
    }

    /// Copies the contact fields of an ODS lookup onto the lead. Empty values
    /// never clear what the lead already has.
    pub fn apply_ods_enrichment(&mut self, enrichment: &OdsEnrichment) {
        fn non_empty(value: &str) -> Option<String> {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        if let Some(phone) = non_empty(&enrichment.phone_number) {
            self.phone_number = Some(phone);
        }
        if let Some(email) = non_empty(&enrichment.email) {
            self.email = Some(email);
        }
        if let Some(website) = non_empty(&enrichment.website) {
            self.website = Some(website);
        }
        if let Some(full_address) = non_empty(&enrichment.full_address) {
            self.full_address = Some(full_address);
        }
        if let Some(last_updated) = enrichment.last_updated.as_deref().and_then(non_empty) {
            self.last_updated = Some(last_updated);
        }
    }
}

/// One page of search results as returned by every lead listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    pub has_more: bool,
}

/// 1-based page number for an offset/limit window.
pub fn page_number(offset: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 1;
    }
    offset / limit + 1
}

pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lead_type_from_ods_role() {
        assert_eq!(LeadType::from_ods_role("RO182"), LeadType::Pharmacy);
        assert_eq!(LeadType::from_ods_role("RO172"), LeadType::Clinic);
        assert_eq!(LeadType::from_ods_role("RO197"), LeadType::Hospital);
        assert_eq!(LeadType::from_ods_role("RO76"), LeadType::Other);
    }

    #[test]
    fn test_lead_serializes_dashboard_keys() {
        let mut lead = Lead::new("Boots", "FA123", LeadType::Pharmacy);
        lead.postcode = Some("M1 1AA".to_string());

        let value = serde_json::to_value(&lead).unwrap();
        assert_eq!(value["Name"], "Boots");
        assert_eq!(value["ODS_Code"], "FA123");
        assert_eq!(value["Type"], "Pharmacy");
        assert_eq!(value["Country"], "UK");
        assert_eq!(value["Postcode"], "M1 1AA");
        assert!(value.get("PhoneNumber").is_none());
    }

    #[test]
    fn test_lead_keeps_unknown_keys() {
        let input = json!({
            "Name": "Harley Clinic",
            "ODS_Code": "1-234",
            "Status": "Active",
            "Type": "Private Clinic",
            "ProviderId": "1-999",
            "CareHome": false
        });

        let lead: Lead = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(lead.lead_type, LeadType::PrivateClinic);
        assert_eq!(lead.attribute("ProviderId"), Some(&json!("1-999")));

        let back = serde_json::to_value(&lead).unwrap();
        assert_eq!(back["ProviderId"], "1-999");
        assert_eq!(back["CareHome"], false);
    }

    #[test]
    fn test_unknown_lead_type_reads_as_other() {
        let lead: Lead =
            serde_json::from_value(json!({"Name": "X", "ODS_Code": "X1", "Type": "Vet"})).unwrap();
        assert_eq!(lead.lead_type, LeadType::Other);
    }

    #[test]
    fn test_with_attributes_skips_nulls() {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Attrs {
            provider_id: Option<String>,
            number_of_beds: Option<u32>,
        }

        let lead = Lead::new("A", "B", LeadType::Clinic).with_attributes(&Attrs {
            provider_id: Some("P1".to_string()),
            number_of_beds: None,
        });
        assert_eq!(lead.attribute("ProviderId"), Some(&json!("P1")));
        assert!(lead.attribute("NumberOfBeds").is_none());
    }

    #[test]
    fn test_apply_ods_enrichment_keeps_existing_on_empty() {
        let mut lead = Lead::new("A", "B", LeadType::Clinic);
        lead.email = Some("old@example.com".to_string());

        lead.apply_ods_enrichment(&OdsEnrichment {
            phone_number: "0161 000 0000".to_string(),
            email: String::new(),
            website: "http://a.example".to_string(),
            full_address: "1 High St, Leeds".to_string(),
            uprn: None,
            last_updated: Some("2024-01-01".to_string()),
        });

        assert!(lead.has_phone());
        assert_eq!(lead.email.as_deref(), Some("old@example.com"));
        assert_eq!(lead.website.as_deref(), Some("http://a.example"));
        assert_eq!(lead.last_updated.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_pagination_helpers() {
        assert_eq!(page_number(0, 20), 1);
        assert_eq!(page_number(40, 20), 3);
        assert_eq!(total_pages(41, 20), 3);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(0, 20), 0);
    }

    #[test]
    fn test_lead_accepts_loose_client_values() {
        let lead: Lead = serde_json::from_value(json!({
            "Name": "Skin Clinic",
            "ODS_Code": "x1",
            "Status": null,
            "Country": null,
            "Latitude": "51.52",
            "Longitude": -0.14,
            "OverallRating": 4.5,
            "ServiceTypes": null,
            "Contacts": null
        }))
        .unwrap();

        assert_eq!(lead.status, "");
        assert_eq!(lead.country, "UK");
        assert_eq!(lead.latitude, Some(51.52));
        assert_eq!(lead.longitude, Some(-0.14));
        assert_eq!(lead.overall_rating.as_deref(), Some("4.5"));
        assert!(lead.service_types.is_empty());
        assert!(lead.contacts.is_empty());
    }

    #[test]
    fn test_unparseable_coordinate_reads_as_none() {
        let lead: Lead =
            serde_json::from_value(json!({"ODS_Code": "x1", "Latitude": "north"})).unwrap();
        assert_eq!(lead.latitude, None);
    }
}
