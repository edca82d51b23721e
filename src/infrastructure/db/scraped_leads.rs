use super::ScrapedLeadStore;
use crate::domain::error::{AppError, Result};
use crate::domain::scraped::{ScrapedLead, ScrapedLeadFilter, ScrapedPractice};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

const COLUMNS: &str = "id, source, name, url, address, postcode, city, phone, email, website, \
     specialties, categories, rating, review_count, description, image_url, raw_data, scraped_at";

pub struct PgScrapedLeadRepository {
    pool: PgPool,
}

impl PgScrapedLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `%`, `_` and `\` in user input match literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ScrapedLeadFilter) {
    builder.push(" WHERE TRUE");
    if let Some(source) = &filter.source {
        builder.push(" AND source = ").push_bind(source.clone());
    }
    if let Some(category) = &filter.category {
        builder
            .push(" AND ")
            .push_bind(category.clone())
            .push(" = ANY(categories)");
    }
    if let Some(search) = &filter.search {
        builder
            .push(" AND name ILIKE ")
            .push_bind(like_pattern(search));
    }
}

fn count_query(filter: &ScrapedLeadFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM scraped_leads");
    push_filters(&mut builder, filter);
    builder
}

fn page_query(filter: &ScrapedLeadFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM scraped_leads", COLUMNS));
    push_filters(&mut builder, filter);
    builder
        .push(" ORDER BY scraped_at DESC LIMIT ")
        .push_bind(i64::from(filter.limit))
        .push(" OFFSET ")
        .push_bind(i64::from(filter.offset));
    builder
}

#[async_trait]
impl ScrapedLeadStore for PgScrapedLeadRepository {
    async fn list(&self, filter: &ScrapedLeadFilter) -> Result<(Vec<ScrapedLead>, u64)> {
        let total: i64 = count_query(filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count scraped leads: {}", e)))?;

        let rows = page_query(filter)
            .build_query_as::<ScrapedLeadEntity>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch scraped leads: {}", e)))?;

        Ok((
            rows.into_iter().map(Into::into).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }

    async fn upsert(&self, practice: &ScrapedPractice) -> Result<()> {
        sqlx::query(
            "INSERT INTO scraped_leads (source, name, url, address, postcode, city, phone, email, website,
                 specialties, categories, rating, review_count, description, image_url, raw_data, scraped_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, now())
             ON CONFLICT (url) DO UPDATE SET
                 source = EXCLUDED.source,
                 name = EXCLUDED.name,
                 address = EXCLUDED.address,
                 postcode = EXCLUDED.postcode,
                 city = EXCLUDED.city,
                 phone = EXCLUDED.phone,
                 email = EXCLUDED.email,
                 website = EXCLUDED.website,
                 specialties = EXCLUDED.specialties,
                 categories = EXCLUDED.categories,
                 rating = EXCLUDED.rating,
                 review_count = EXCLUDED.review_count,
                 description = EXCLUDED.description,
                 image_url = EXCLUDED.image_url,
                 raw_data = EXCLUDED.raw_data,
                 scraped_at = now()",
        )
        .bind(&practice.source)
        .bind(&practice.name)
        .bind(&practice.url)
        .bind(&practice.address)
        .bind(&practice.postcode)
        .bind(&practice.city)
        .bind(&practice.phone)
        .bind(&practice.email)
        .bind(&practice.website)
        .bind(&practice.specialties)
        .bind(&practice.categories)
        .bind(practice.rating)
        .bind(practice.review_count)
        .bind(&practice.description)
        .bind(&practice.image_url)
        .bind(Json(&practice.raw_data))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to upsert scraped lead: {}", e)))?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ScrapedLeadEntity {
    id: Uuid,
    source: String,
    name: String,
    url: String,
    address: Option<String>,
    postcode: Option<String>,
    city: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    specialties: Vec<String>,
    categories: Vec<String>,
    rating: Option<f64>,
    review_count: i32,
    description: Option<String>,
    image_url: Option<String>,
    raw_data: Value,
    scraped_at: DateTime<Utc>,
}

impl From<ScrapedLeadEntity> for ScrapedLead {
    fn from(entity: ScrapedLeadEntity) -> Self {
        ScrapedLead {
            id: entity.id,
            source: entity.source,
            name: entity.name,
            url: entity.url,
            address: entity.address,
            postcode: entity.postcode,
            city: entity.city,
            phone: entity.phone,
            email: entity.email,
            website: entity.website,
            specialties: entity.specialties,
            categories: entity.categories,
            rating: entity.rating,
            review_count: entity.review_count,
            description: entity.description,
            image_url: entity.image_url,
            raw_data: entity.raw_data,
            scraped_at: entity.scraped_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_without_filters() {
        let filter = ScrapedLeadFilter {
            limit: 20,
            ..Default::default()
        };
        let query = page_query(&filter);
        assert!(query
            .sql()
            .ends_with("FROM scraped_leads WHERE TRUE ORDER BY scraped_at DESC LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn test_filters_bind_in_order() {
        let filter = ScrapedLeadFilter {
            source: Some("doctify".to_string()),
            category: Some("hair-loss".to_string()),
            search: Some("clinic".to_string()),
            limit: 10,
            offset: 30,
        };

        let count = count_query(&filter);
        assert_eq!(
            count.sql(),
            "SELECT COUNT(*) FROM scraped_leads WHERE TRUE AND source = $1 AND $2 = ANY(categories) AND name ILIKE $3"
        );

        let page = page_query(&filter);
        assert!(page.sql().ends_with("LIMIT $4 OFFSET $5"));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("dr smith"), "%dr smith%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
