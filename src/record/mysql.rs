// src/record/mysql.rs
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use super::{AccessRecord, AccessStore};
use crate::error::PersistenceError;

/// `access` table in MySQL (see `sql/access.sql`).
#[derive(Clone)]
pub struct MySqlAccessStore {
    pool: MySqlPool,
}

impl MySqlAccessStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, PersistenceError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for MySqlAccessStore {
    async fn insert(&self, record: &AccessRecord) -> Result<(), PersistenceError> {
        // `id` is left to AUTO_INCREMENT.
        sqlx::query(
            "INSERT INTO access
                (account, tweet, predicted_sex, probability_sex, predicted_engineer, probability_engineer, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.account)
        .bind(&record.tweet)
        .bind(record.predicted_sex)
        .bind(record.probability_sex)
        .bind(record.predicted_engineer)
        .bind(record.probability_engineer)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mysql"
    }
}
