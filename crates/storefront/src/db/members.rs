//! `PostgreSQL` implementation of the member persistence boundary.
//!
//! Row types stay private to this module; queries are runtime-bound so the
//! crate builds without a live database, and write failures are routed
//! through the classification adapter in [`super`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gamehaven_core::{AddressId, Email, MemberId, WishlistVisibility};

use super::{MemberStore, RepositoryError, classify_write_error};
use crate::models::{MailingAddress, Member, ProfileChanges, StoredPaymentMethod};

/// Member repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgMemberStore {
    pool: PgPool,
}

impl PgMemberStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw member row; converted to the domain type with validation.
#[derive(sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    email_confirmed: bool,
    phone: Option<String>,
    wishlist_visibility: String,
    receive_promotional_emails: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for Member {
    type Error = RepositoryError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let wishlist_visibility: WishlistVisibility =
            row.wishlist_visibility.parse().map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid visibility in database: {e}"))
            })?;

        Ok(Self {
            id: MemberId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email,
            email_confirmed: row.email_confirmed,
            phone: row.phone,
            wishlist_visibility,
            receive_promotional_emails: row.receive_promotional_emails,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const MEMBER_COLUMNS: &str = "id, first_name, last_name, email, email_confirmed, phone, \
                              wishlist_visibility, receive_promotional_emails, \
                              created_at, updated_at";

#[async_trait::async_trait]
impl MemberStore for PgMemberStore {
    async fn find_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM storefront.member WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Member::try_from).transpose()
    }

    async fn update_profile(
        &self,
        id: MemberId,
        changes: &ProfileChanges,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.member
             SET first_name = $2, last_name = $3, phone = $4,
                 wishlist_visibility = $5, receive_promotional_emails = $6,
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.phone)
        .bind(changes.wishlist_visibility.to_string())
        .bind(changes.receive_promotional_emails)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn commit_email_change(
        &self,
        id: MemberId,
        new_email: &Email,
    ) -> Result<(), RepositoryError> {
        // Single statement: email and confirmation flag change together or
        // not at all.
        let result = sqlx::query(
            "UPDATE storefront.member
             SET email = $2, email_confirmed = FALSE, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(new_email.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn restore_email(
        &self,
        id: MemberId,
        email: &Email,
        confirmed: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.member
             SET email = $2, email_confirmed = $3, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(email.as_str())
        .bind(confirmed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn find_address(&self, id: AddressId) -> Result<Option<MailingAddress>, RepositoryError> {
        let address = sqlx::query_as::<_, MailingAddress>(
            "SELECT id, member_id, street_address, po_box, city, postal_code,
                    province_code, country_code
             FROM storefront.mailing_address
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    async fn list_addresses(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<MailingAddress>, RepositoryError> {
        let addresses = sqlx::query_as::<_, MailingAddress>(
            "SELECT id, member_id, street_address, po_box, city, postal_code,
                    province_code, country_code
             FROM storefront.mailing_address
             WHERE member_id = $1
             ORDER BY city, street_address",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(addresses)
    }

    async fn insert_address(&self, address: &MailingAddress) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO storefront.mailing_address
                 (id, member_id, street_address, po_box, city, postal_code,
                  province_code, country_code)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(address.id)
        .bind(address.member_id)
        .bind(&address.street_address)
        .bind(&address.po_box)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.province_code)
        .bind(&address.country_code)
        .execute(&self.pool)
        .await
        .map_err(classify_write_error)?;

        Ok(())
    }

    async fn update_address(&self, address: &MailingAddress) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.mailing_address
             SET street_address = $3, po_box = $4, city = $5, postal_code = $6,
                 province_code = $7, country_code = $8
             WHERE id = $1 AND member_id = $2",
        )
        .bind(address.id)
        .bind(address.member_id)
        .bind(&address.street_address)
        .bind(&address.po_box)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.province_code)
        .bind(&address.country_code)
        .execute(&self.pool)
        .await
        .map_err(classify_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_payment_methods(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<StoredPaymentMethod>, RepositoryError> {
        let cards = sqlx::query_as::<_, StoredPaymentMethod>(
            "SELECT card_reference, member_id, brand, last4,
                    expiry_month, expiry_year, created_at
             FROM storefront.stored_payment_method
             WHERE member_id = $1
             ORDER BY created_at ASC",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    async fn insert_payment_method(
        &self,
        card: &StoredPaymentMethod,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO storefront.stored_payment_method
                 (card_reference, member_id, brand, last4,
                  expiry_month, expiry_year, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&card.card_reference)
        .bind(card.member_id)
        .bind(&card.brand)
        .bind(&card.last4)
        .bind(card.expiry_month)
        .bind(card.expiry_year)
        .bind(card.created_at)
        .execute(&self.pool)
        .await
        .map_err(classify_write_error)?;

        Ok(())
    }

    async fn cart_item_count(&self, member_id: MemberId) -> Result<Option<u32>, RepositoryError> {
        // LEFT JOIN keeps "member missing" distinct from "empty cart".
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(ci.member_id)
             FROM storefront.member m
             LEFT JOIN storefront.cart_item ci ON ci.member_id = m.id
             WHERE m.id = $1
             GROUP BY m.id",
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        count
            .map(|n| {
                u32::try_from(n).map_err(|_| {
                    RepositoryError::DataCorruption(format!("cart item count out of range: {n}"))
                })
            })
            .transpose()
    }
}
