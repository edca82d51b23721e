use super::SavedLeadStore;
use crate::domain::error::{AppError, Result};
use crate::domain::lead::Lead;
use crate::domain::saved_lead::SavedLead;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::types::Json;

pub struct PgSavedLeadStore {
    pool: PgPool,
}

impl PgSavedLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SavedLeadStore for PgSavedLeadStore {
    async fn list(&self, user_id: &str) -> Result<Vec<SavedLead>> {
        sqlx::query_as::<_, SavedLeadEntity>(
            "SELECT lead, notes, saved_at FROM saved_leads WHERE user_id = $1 ORDER BY saved_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch saved leads: {}", e)))
        .map(|entities| entities.into_iter().map(|e| e.into()).collect())
    }

    async fn find(&self, user_id: &str, ods_code: &str) -> Result<Option<SavedLead>> {
        let entity = sqlx::query_as::<_, SavedLeadEntity>(
            "SELECT lead, notes, saved_at FROM saved_leads WHERE user_id = $1 AND lead_id = $2",
        )
        .bind(user_id)
        .bind(ods_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch saved lead: {}", e)))?;

        Ok(entity.map(Into::into))
    }

    async fn upsert(&self, user_id: &str, lead: &SavedLead) -> Result<()> {
        sqlx::query(
            "INSERT INTO saved_leads (user_id, lead_id, lead, notes, saved_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, lead_id) DO UPDATE SET lead = EXCLUDED.lead, notes = EXCLUDED.notes",
        )
        .bind(user_id)
        .bind(lead.code())
        .bind(Json(&lead.lead))
        .bind(&lead.notes)
        .bind(lead.saved_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to save lead: {}", e)))?;

        Ok(())
    }

    async fn remove(&self, user_id: &str, ods_code: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_leads WHERE user_id = $1 AND lead_id = $2")
            .bind(user_id)
            .bind(ods_code)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to remove saved lead: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(sqlx::FromRow)]
struct SavedLeadEntity {
    lead: Json<Lead>,
    notes: Option<String>,
    saved_at: DateTime<Utc>,
}

impl From<SavedLeadEntity> for SavedLead {
    fn from(entity: SavedLeadEntity) -> Self {
        SavedLead {
            lead: entity.lead.0,
            saved_at: entity.saved_at,
            notes: entity.notes,
        }
    }
}
