use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::error::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "medleads.toml";

/// Raw environment names that predate the `MEDLEADS_` prefix.
const ENV_ALIASES: &[(&str, &str)] = &[
    ("CQC_API_KEY", "cqc.api_key"),
    ("GOOGLE_PLACES_API_KEY", "places.api_key"),
    ("SUPABASE_URL", "supabase.url"),
    ("NEXT_PUBLIC_SUPABASE_URL", "supabase.url"),
    ("SUPABASE_ANON_KEY", "supabase.anon_key"),
    ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "supabase.anon_key"),
    ("DATABASE_URL", "database.url"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OdsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OdsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://directory.spineservices.nhs.uk/ORD/2-0-0/organisations".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CqcConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CqcConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.service.cqc.org.uk/public/v1".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/place".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedBackend {
    File,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedStoreConfig {
    pub backend: SavedBackend,
    pub file_path: PathBuf,
}

impl Default for SavedStoreConfig {
    fn default() -> Self {
        Self {
            backend: SavedBackend::File,
            file_path: PathBuf::from("saved_leads.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Supabase,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// User every request maps to when `mode = "disabled"`.
    pub local_user_id: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Disabled,
            local_user_id: "local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub delay_ms: u64,
    pub retry_delay_ms: u64,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            delay_ms: 3000,
            retry_delay_ms: 2000,
            max_retries: 2,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ods: OdsConfig,
    pub cqc: CqcConfig,
    pub places: PlacesConfig,
    pub supabase: SupabaseConfig,
    pub database: DatabaseConfig,
    pub saved: SavedStoreConfig,
    pub auth: AuthConfig,
    pub scraper: ScraperConfig,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ods: OdsConfig::default(),
            cqc: CqcConfig::default(),
            places: PlacesConfig::default(),
            supabase: SupabaseConfig::default(),
            database: DatabaseConfig::default(),
            saved: SavedStoreConfig::default(),
            auth: AuthConfig::default(),
            scraper: ScraperConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, then layers defaults, the TOML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("MEDLEADS_").split("__"));

        for (name, key) in ENV_ALIASES {
            figment = figment.merge(Env::raw().only(&[*name]).map(move |_| (*key).into()));
        }

        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }

    /// Checks the combinations a running server depends on.
    pub fn validate(&self) -> Result<()> {
        if self.saved.backend == SavedBackend::Postgres && self.database.url.is_none() {
            return Err(AppError::ConfigError(
                "saved.backend = \"postgres\" requires database.url (or DATABASE_URL)".to_string(),
            ));
        }
        if self.auth.mode == AuthMode::Supabase
            && (self.supabase.url.is_none() || self.supabase.anon_key.is_none())
        {
            return Err(AppError::ConfigError(
                "auth.mode = \"supabase\" requires SUPABASE_URL and SUPABASE_ANON_KEY".to_string(),
            ));
        }
        Ok(())
    }
}
