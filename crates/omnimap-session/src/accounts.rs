//! Billing lookup: is the signed-in user on a paid plan.
//!
//! The account table is owned by the billing webhooks; this side only
//! reads it and never migrates anything.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

const ACQUIRE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum AccountsError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn is_paid(&self, email: &str) -> Result<bool, AccountsError>;
}

/// Postgres-backed directory reading `user_profiles.payment_status`.
#[derive(Debug, Clone)]
pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn is_paid(&self, email: &str) -> Result<bool, AccountsError> {
        let paid = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM user_profiles
                WHERE email = $1 AND payment_status = 'paid'
            )",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(paid)
    }
}

/// Treats every signed-in user as paid. Used when no database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccounts;

#[async_trait]
impl AccountDirectory for OpenAccounts {
    async fn is_paid(&self, _email: &str) -> Result<bool, AccountsError> {
        Ok(true)
    }
}

/// Connect a small read-only pool for the billing lookup.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_accounts_admits_everyone() {
        assert!(OpenAccounts.is_paid("anyone@example.com").await.unwrap());
    }
}
