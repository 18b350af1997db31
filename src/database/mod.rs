use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::{debug, info};

use crate::models::{NormalizedListing, SearchRecord};

/// Where finished searches are written
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn save_search(&self, record: &SearchRecord) -> Result<()>;
}

/// Stable id of a listing across searches
pub fn listing_id(listing: &NormalizedListing) -> String {
    format!(
        "{:x}",
        md5::compute(format!("{}:{}", listing.vendor, listing.url))
    )
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Create database file if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database file");
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePool::connect(db_url).await?;

        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(Self { pool })
    }

    /// Upsert the record's listings and log its vendor reports in one
    /// transaction. Returns how many listings were not stored before.
    pub async fn save(&self, record: &SearchRecord) -> Result<usize> {
        let now = Utc::now();
        let mut new_listings = 0;

        let mut tx = self.pool.begin().await?;

        for listing in &record.listings {
            let id = listing_id(listing);
            let existing = sqlx::query("SELECT 1 FROM listings WHERE id = ?")
                .bind(&id)
                .fetch_optional(&mut *tx)
                .await?;
            if existing.is_none() {
                debug!("New listing found: {} - {}", listing.original_name, listing.price);
                new_listings += 1;
            }

            sqlx::query(
                r"
                INSERT INTO listings (
                    id, vendor, name, normalized_name, brand, price, currency,
                    url, availability, country, query, first_seen, last_seen
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    normalized_name = excluded.normalized_name,
                    brand = excluded.brand,
                    price = excluded.price,
                    currency = excluded.currency,
                    availability = excluded.availability,
                    last_seen = excluded.last_seen
                ",
            )
            .bind(&id)
            .bind(&listing.vendor)
            .bind(&listing.original_name)
            .bind(&listing.normalized_name)
            .bind(&listing.brand)
            .bind(listing.price)
            .bind(&listing.currency)
            .bind(&listing.url)
            .bind(listing.availability.as_str())
            .bind(&record.country)
            .bind(&record.query)
            .bind(record.searched_at)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for report in &record.reports {
            sqlx::query(
                r"
                INSERT INTO scraping_logs (
                    vendor, country, query, status, listings, elapsed_ms, error, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&report.vendor)
            .bind(&record.country)
            .bind(&record.query)
            .bind(report.status.as_str())
            .bind(i64::try_from(report.listings).unwrap_or(i64::MAX))
            .bind(i64::try_from(report.elapsed_ms).unwrap_or(i64::MAX))
            .bind(&report.error)
            .bind(record.searched_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        if new_listings > 0 {
            info!("Stored {} new listings", new_listings);
        } else {
            info!("No new listings to store");
        }

        Ok(new_listings)
    }
}

#[async_trait]
impl ListingStore for Database {
    async fn save_search(&self, record: &SearchRecord) -> Result<()> {
        self.save(record).await?;
        Ok(())
    }
}
