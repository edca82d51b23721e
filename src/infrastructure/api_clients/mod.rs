pub mod cqc;
pub mod identity;
pub mod ods;
pub mod places;
pub mod web;

use crate::domain::error::{AppError, Result};
use crate::domain::user::UserIdentity;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use cqc::{CqcFilter, CqcLocation, CqcLocationPage};
use ods::{OdsOrganisation, OdsQuery, OdsSearchPage};
use places::{FindPlaceResponse, PlaceDetailsResponse};

/// NHS Organisation Data Service.
#[async_trait]
pub trait OdsDirectory: Send + Sync {
    async fn search(&self, query: &OdsQuery) -> Result<OdsSearchPage>;
    async fn organisation(&self, ods_code: &str) -> Result<OdsOrganisation>;
}

/// Care Quality Commission public API.
#[async_trait]
pub trait CqcDirectory: Send + Sync {
    async fn list_locations(
        &self,
        filter: &CqcFilter,
        page: u64,
        per_page: u64,
    ) -> Result<CqcLocationPage>;
    async fn location(&self, location_id: &str) -> Result<CqcLocation>;
}

/// Google Places text search and details.
#[async_trait]
pub trait PlacesLookup: Send + Sync {
    async fn find_place(&self, input: &str) -> Result<FindPlaceResponse>;
    async fn place_details(&self, place_id: &str) -> Result<PlaceDetailsResponse>;
    fn photo_url(&self, photo_reference: &str) -> Option<String>;
}

/// Resolves a bearer token to the signed-in user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn user_for_token(&self, access_token: Option<&str>) -> Result<UserIdentity>;
}

/// Plain GET of a public page, body as text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub(crate) fn build_client(timeout_secs: u64, user_agent: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().timeout(Duration::from_secs(timeout_secs));
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent);
    }
    builder
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    if base_url.ends_with('/') {
        format!("{}{}", base_url, path)
    } else {
        format!("{}/{}", base_url, path)
    }
}

/// Reads a non-2xx body into an upstream error for `service`.
pub(crate) async fn upstream_failure(service: &str, response: reqwest::Response) -> AppError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    AppError::upstream(service, status, text)
}
