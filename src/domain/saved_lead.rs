use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::{AppError, Result};
use crate::domain::lead::Lead;

/// A lead in a user's personal list, with the time it was first saved and
/// the user's own notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SavedLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SavedLead {
    pub fn new(lead: Lead) -> Self {
        Self {
            lead,
            saved_at: Utc::now(),
            notes: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.lead.ods_code
    }

    /// Overlays every key the client sent onto the stored lead. Keys the
    /// client left out keep their stored value; `SavedAt` and `Notes` are
    /// never taken from the payload.
    pub fn merge(&mut self, incoming: &Map<String, Value>) -> Result<()> {
        let mut base = serde_json::to_value(&self.lead)
            .map_err(|e| AppError::ParseError(format!("Failed to encode saved lead: {}", e)))?;

        if let Value::Object(base_map) = &mut base {
            for (key, value) in incoming {
                if key == "SavedAt" || key == "Notes" {
                    continue;
                }
                base_map.insert(key.clone(), value.clone());
            }
        }

        self.lead = serde_json::from_value(base)
            .map_err(|e| AppError::ParseError(format!("Failed to decode merged lead: {}", e)))?;
        Ok(())
    }
}

/// Result of `enrich all` over a user's saved list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichAllReport {
    pub enriched: usize,
    pub failed: usize,
    pub skipped: usize,
}
