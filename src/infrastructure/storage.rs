use crate::domain::error::{AppError, Result};
use crate::domain::saved_lead::SavedLead;
use crate::infrastructure::db::SavedLeadStore;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

/// Entries stay raw JSON so a record this build cannot decode is still
/// written back untouched.
type EntriesByUser = BTreeMap<String, Vec<Value>>;

/// On-disk shape. Older files hold a bare array with no owner.
#[derive(Deserialize)]
#[serde(untagged)]
enum SavedLeadFile {
    PerUser(EntriesByUser),
    Legacy(Vec<Value>),
}

/// What was found on disk.
enum FileState {
    Missing,
    Loaded(EntriesByUser),
    Unreadable(String),
}

fn entry_code(entry: &Value) -> Option<&str> {
    entry.get("ODS_Code").and_then(Value::as_str)
}

/// Saved leads in one local JSON file, keyed by user id.
pub struct JsonFileSavedLeadStore {
    path: PathBuf,
    legacy_owner: String,
    lock: Mutex<()>,
}

impl JsonFileSavedLeadStore {
    /// `legacy_owner` receives the rows of a bare-array file.
    pub fn new(path: impl Into<PathBuf>, legacy_owner: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            legacy_owner: legacy_owner.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> FileState {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return FileState::Missing,
            Err(e) => return FileState::Unreadable(e.to_string()),
        };

        if raw.trim().is_empty() {
            return FileState::Missing;
        }

        match serde_json::from_str::<SavedLeadFile>(&raw) {
            Ok(SavedLeadFile::PerUser(map)) => FileState::Loaded(map),
            Ok(SavedLeadFile::Legacy(entries)) => {
                let mut map = EntriesByUser::new();
                map.insert(self.legacy_owner.clone(), entries);
                FileState::Loaded(map)
            }
            Err(e) => FileState::Unreadable(e.to_string()),
        }
    }

    /// Read path: an unreadable file reads as empty.
    async fn read_entries(&self) -> EntriesByUser {
        match self.load().await {
            FileState::Loaded(map) => map,
            FileState::Missing => EntriesByUser::new(),
            FileState::Unreadable(error) => {
                warn!(path = %self.path.display(), error = %error, "Saved leads file is unreadable");
                EntriesByUser::new()
            }
        }
    }

    /// Write path: an unreadable file is moved aside before a fresh one
    /// replaces it, never overwritten in place.
    async fn entries_for_write(&self) -> Result<EntriesByUser> {
        match self.load().await {
            FileState::Loaded(map) => Ok(map),
            FileState::Missing => Ok(EntriesByUser::new()),
            FileState::Unreadable(error) => {
                let backup = self.path.with_extension(format!(
                    "json.corrupt-{}",
                    Utc::now().format("%Y%m%d%H%M%S")
                ));
                tokio::fs::rename(&self.path, &backup).await.map_err(|e| {
                    AppError::IoError(format!(
                        "Saved leads file is unreadable ({}) and could not be moved aside: {}",
                        error, e
                    ))
                })?;
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %error,
                    "Moved unreadable saved leads file aside"
                );
                Ok(EntriesByUser::new())
            }
        }
    }

    /// Decodes one user's entries, skipping the ones that do not parse.
    async fn decoded(&self, user_id: &str) -> Vec<SavedLead> {
        let mut data = self.read_entries().await;
        data.remove(user_id)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<SavedLead>(entry) {
                Ok(lead) => Some(lead),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping undecodable saved lead");
                    None
                }
            })
            .collect()
    }

    async fn write_all(&self, data: &EntriesByUser) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| AppError::Internal(format!("Failed to encode saved leads: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SavedLeadStore for JsonFileSavedLeadStore {
    async fn list(&self, user_id: &str) -> Result<Vec<SavedLead>> {
        let _guard = self.lock.lock().await;
        Ok(self.decoded(user_id).await)
    }

    async fn find(&self, user_id: &str, ods_code: &str) -> Result<Option<SavedLead>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .decoded(user_id)
            .await
            .into_iter()
            .find(|l| l.code() == ods_code))
    }

    async fn upsert(&self, user_id: &str, lead: &SavedLead) -> Result<()> {
        let _guard = self.lock.lock().await;
        let entry = serde_json::to_value(lead)
            .map_err(|e| AppError::Internal(format!("Failed to encode saved lead: {}", e)))?;

        let mut data = self.entries_for_write().await?;
        let entries = data.entry(user_id.to_string()).or_default();
        match entries
            .iter_mut()
            .find(|existing| entry_code(existing) == Some(lead.code()))
        {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        self.write_all(&data).await
    }

    async fn remove(&self, user_id: &str, ods_code: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut data = self.entries_for_write().await?;
        let Some(entries) = data.get_mut(user_id) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|entry| entry_code(entry) != Some(ods_code));
        let removed = entries.len() != before;
        if removed {
            self.write_all(&data).await?;
        }
        Ok(removed)
    }
}
