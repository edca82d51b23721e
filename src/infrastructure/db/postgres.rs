use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS scraped_leads (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        source TEXT NOT NULL,
        name TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        address TEXT,
        postcode TEXT,
        city TEXT,
        phone TEXT,
        email TEXT,
        website TEXT,
        specialties TEXT[] NOT NULL DEFAULT '{}',
        categories TEXT[] NOT NULL DEFAULT '{}',
        rating DOUBLE PRECISION,
        review_count INTEGER NOT NULL DEFAULT 0,
        description TEXT,
        image_url TEXT,
        raw_data JSONB NOT NULL DEFAULT '{}'::jsonb,
        scraped_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS idx_scraped_leads_scraped_at ON scraped_leads (scraped_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_scraped_leads_categories ON scraped_leads USING GIN (categories)",
    "CREATE TABLE IF NOT EXISTS saved_leads (
        user_id TEXT NOT NULL,
        lead_id TEXT NOT NULL,
        lead JSONB NOT NULL,
        notes TEXT,
        saved_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (user_id, lead_id)
    )",
];

/// Connects the pool and creates any missing tables.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let url = config.url.as_deref().ok_or_else(|| {
        AppError::ConfigError("database.url (or DATABASE_URL) is not set".to_string())
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(url)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create schema: {}", e)))?;
    }

    info!(max_connections = config.max_connections, "Postgres pool ready");
    Ok(pool)
}
