//! `PostgreSQL` implementation of the geographic reference data.

use sqlx::PgPool;

use gamehaven_core::{CountryCode, ProvinceCode};

use super::{ReferenceData, RepositoryError};
use crate::models::{Country, Province};

/// Country/Province lookup backed by `PostgreSQL`. Read-only.
#[derive(Clone)]
pub struct PgReferenceData {
    pool: PgPool,
}

impl PgReferenceData {
    /// Create a new lookup over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReferenceData for PgReferenceData {
    async fn countries(&self) -> Result<Vec<Country>, RepositoryError> {
        let countries = sqlx::query_as::<_, Country>(
            "SELECT code, name FROM storefront.country ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(countries)
    }

    async fn provinces(&self, country: &CountryCode) -> Result<Vec<Province>, RepositoryError> {
        let provinces = sqlx::query_as::<_, Province>(
            "SELECT code, country_code, name
             FROM storefront.province
             WHERE country_code = $1
             ORDER BY name",
        )
        .bind(country)
        .fetch_all(&self.pool)
        .await?;

        Ok(provinces)
    }

    async fn province_exists(
        &self,
        province: &ProvinceCode,
        country: &CountryCode,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                 SELECT 1 FROM storefront.province
                 WHERE code = $1 AND country_code = $2
             )",
        )
        .bind(province)
        .bind(country)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
