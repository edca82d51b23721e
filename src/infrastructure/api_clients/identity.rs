use super::{build_client, endpoint, IdentityProvider};
use crate::domain::error::{AppError, Result};
use crate::domain::user::UserIdentity;
use crate::infrastructure::config::SupabaseConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;

const AUTH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SupabaseUserMetadata {
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: SupabaseUserMetadata,
}

impl From<SupabaseUser> for UserIdentity {
    fn from(user: SupabaseUser) -> Self {
        let meta = user.user_metadata;
        UserIdentity {
            id: user.id,
            email: user.email,
            display_name: meta.full_name.or(meta.name),
            avatar_url: meta.avatar_url.or(meta.picture),
        }
    }
}

/// Verifies access tokens against Supabase Auth. Nothing is cached.
pub struct SupabaseIdentity {
    client: Client,
    url: String,
    anon_key: String,
}

impl SupabaseIdentity {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| AppError::ConfigError("SUPABASE_URL is not set".to_string()))?;
        let anon_key = config
            .anon_key
            .clone()
            .ok_or_else(|| AppError::ConfigError("SUPABASE_ANON_KEY is not set".to_string()))?;

        Ok(Self {
            client: build_client(AUTH_TIMEOUT_SECS, None)?,
            url,
            anon_key,
        })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn user_for_token(&self, access_token: Option<&str>) -> Result<UserIdentity> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let response = self
            .client
            .get(endpoint(&self.url, "auth/v1/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Auth request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => {
                let user: SupabaseUser = response.json().await.map_err(|e| {
                    AppError::ParseError(format!("Failed to parse auth user: {}", e))
                })?;
                Ok(user.into())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AppError::Unauthorized("Invalid or expired session".to_string()))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), "Supabase auth returned an unexpected status");
                Err(AppError::upstream("Supabase Auth", status.as_u16(), text))
            }
        }
    }
}

/// Single-user mode: every request is the configured local user.
pub struct LocalIdentity {
    user_id: String,
}

impl LocalIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn user_for_token(&self, _access_token: Option<&str>) -> Result<UserIdentity> {
        Ok(UserIdentity::local(self.user_id.clone()))
    }
}
