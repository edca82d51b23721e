use super::{build_client, endpoint, upstream_failure, OdsDirectory};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::OdsConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

pub const SERVICE: &str = "NHS API";

/// Query string of an ODS organisation search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OdsQuery {
    pub primary_role_id: String,
    pub limit: u32,
    pub offset: Option<u32>,
    pub name: Option<String>,
    pub post_code: Option<String>,
}

impl OdsQuery {
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("PrimaryRoleId", self.primary_role_id.clone()),
            ("Limit", self.limit.to_string()),
            ("Status", "Active".to_string()),
        ];
        if let Some(offset) = self.offset {
            pairs.push(("Offset", offset.to_string()));
        }
        if let Some(name) = &self.name {
            pairs.push(("Name", name.clone()));
        }
        if let Some(post_code) = &self.post_code {
            pairs.push(("PostCode", post_code.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OdsLocation {
    pub addr_ln1: Option<String>,
    pub addr_ln2: Option<String>,
    pub addr_ln3: Option<String>,
    pub town: Option<String>,
    pub county: Option<String>,
    pub post_code: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "UPRN")]
    pub uprn: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OdsGeoLoc {
    pub location: Option<OdsLocation>,
}

/// One row of an ODS search result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OdsOrganisationSummary {
    pub name: Option<String>,
    pub org_id: String,
    pub status: Option<String>,
    pub post_code: Option<String>,
    pub primary_role_id: Option<String>,
    pub primary_role_description: Option<String>,
    pub geo_loc: Option<OdsGeoLoc>,
}

impl OdsOrganisationSummary {
    pub fn location(&self) -> Option<&OdsLocation> {
        self.geo_loc.as_ref().and_then(|g| g.location.as_ref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct OdsSearchPage {
    pub organisations: Vec<OdsOrganisationSummary>,
    /// Value of the `X-Total-Count` response header, 0 when absent.
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct OdsSearchBody {
    #[serde(rename = "Organisations")]
    organisations: Vec<OdsOrganisationSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OdsContact {
    #[serde(rename = "type")]
    pub contact_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OdsContacts {
    #[serde(rename = "Contact")]
    pub contact: Vec<OdsContact>,
}

/// Full organisation record from `GET organisations/{code}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OdsOrganisation {
    pub name: Option<String>,
    pub last_change_date: Option<String>,
    pub geo_loc: Option<OdsGeoLoc>,
    pub contacts: Option<OdsContacts>,
}

impl OdsOrganisation {
    pub fn location(&self) -> Option<&OdsLocation> {
        self.geo_loc.as_ref().and_then(|g| g.location.as_ref())
    }

    pub fn contacts(&self) -> &[OdsContact] {
        self.contacts
            .as_ref()
            .map(|c| c.contact.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct OdsOrganisationBody {
    #[serde(rename = "Organisation")]
    organisation: OdsOrganisation,
}

pub struct OdsClient {
    client: Client,
    base_url: String,
}

impl OdsClient {
    pub fn new(config: &OdsConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs, None)?,
            base_url: config.base_url.clone(),
        })
    }
}

fn total_count(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get("X-Total-Count")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl OdsDirectory for OdsClient {
    async fn search(&self, query: &OdsQuery) -> Result<OdsSearchPage> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&query.pairs())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("NHS API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream_failure(SERVICE, response).await);
        }

        let total_count = total_count(response.headers());
        let body: OdsSearchBody = response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse NHS API response: {}", e)))?;

        Ok(OdsSearchPage {
            organisations: body.organisations,
            total_count,
        })
    }

    async fn organisation(&self, ods_code: &str) -> Result<OdsOrganisation> {
        let url = endpoint(&self.base_url, ods_code);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("NHS API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream_failure(SERVICE, response).await);
        }

        let body: OdsOrganisationBody = response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse NHS API response: {}", e)))?;

        Ok(body.organisation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs_skip_empty_parts() {
        let query = OdsQuery {
            primary_role_id: "RO182".to_string(),
            limit: 50,
            ..Default::default()
        };
        assert_eq!(
            query.pairs(),
            vec![
                ("PrimaryRoleId", "RO182".to_string()),
                ("Limit", "50".to_string()),
                ("Status", "Active".to_string()),
            ]
        );
    }

    #[test]
    fn test_organisation_body_parses_contacts_and_location() {
        let body: OdsOrganisationBody = serde_json::from_value(json!({
            "Organisation": {
                "Name": "BOOTS",
                "LastChangeDate": "2024-03-01",
                "OrgId": {"extension": "FA123"},
                "GeoLoc": {"Location": {"AddrLn1": "1 HIGH ST", "Town": "LEEDS", "UPRN": 1234}},
                "Contacts": {"Contact": [{"type": "tel", "value": "0113 000"}]}
            }
        }))
        .unwrap();

        let org = body.organisation;
        assert_eq!(org.contacts().len(), 1);
        assert_eq!(org.location().and_then(|l| l.town.as_deref()), Some("LEEDS"));
        assert_eq!(org.location().and_then(|l| l.uprn.clone()), Some(json!(1234)));
    }

    #[test]
    fn test_total_count_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(total_count(&headers), 0);
        headers.insert("X-Total-Count", "742".parse().unwrap());
        assert_eq!(total_count(&headers), 742);
    }
}
