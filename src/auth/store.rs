//! Account persistence

use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error};

use super::models::Account;
use crate::common::{is_unique_violation, ApiError};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint (email or provider identity) rejected the write
    #[error("account conflicts with an existing row: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(e) => ApiError::DatabaseError(e),
            StoreError::Conflict(msg) => {
                error!(error = %msg, "Unresolved account conflict");
                ApiError::InternalServer("Account could not be saved".to_string())
            }
        }
    }
}

/// Lookup and persistence of accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_provider_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert the account, or update every mutable column if the id exists
    async fn save(&self, account: &Account) -> Result<(), StoreError>;

    async fn set_remember_token(
        &self,
        account_id: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError>;
}

const ACCOUNT_COLUMNS: &str = "id, name, email, password, provider, provider_id, avatar, \
     email_verified_at, remember_token, created_at, updated_at";

pub struct SqliteAccountStore {
    db: SqlitePool,
}

impl SqliteAccountStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        binds: &[&str],
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM users WHERE {} LIMIT 1",
            ACCOUNT_COLUMNS, clause
        );
        let mut query = sqlx::query_as::<_, Account>(&sql);
        for value in binds {
            query = query.bind(*value);
        }
        Ok(query.fetch_optional(&self.db).await?)
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_one_where("id = ?", &[id]).await
    }

    async fn find_by_provider_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.fetch_one_where("provider = ? AND provider_id = ?", &[provider, provider_id])
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_one_where("email = ?", &[email]).await
    }

    async fn save(&self, account: &Account) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password, provider, provider_id, avatar,
                email_verified_at, remember_token, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                password = excluded.password,
                provider = excluded.provider,
                provider_id = excluded.provider_id,
                avatar = excluded.avatar,
                email_verified_at = excluded.email_verified_at,
                remember_token = excluded.remember_token,
                updated_at = datetime('now')
            "#,
        )
        .bind(&account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password)
        .bind(&account.provider)
        .bind(&account.provider_id)
        .bind(&account.avatar)
        .bind(&account.email_verified_at)
        .bind(&account.remember_token)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => {
                debug!(user_id = %account.id, "Account saved");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(e.to_string())),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn set_remember_token(
        &self,
        account_id: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET remember_token = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(token)
        .bind(account_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::test_pool;

    fn account(id: &str, email: &str) -> Account {
        Account {
            id: id.to_string(),
            name: "Someone".to_string(),
            email: email.to_string(),
            password: "hash".to_string(),
            provider: None,
            provider_id: None,
            avatar: None,
            email_verified_at: None,
            remember_token: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_save_inserts_then_updates() {
        let store = SqliteAccountStore::new(test_pool().await);

        let mut acc = account("U_1", "one@example.com");
        store.save(&acc).await.unwrap();

        acc.provider = Some("google".to_string());
        acc.provider_id = Some("g-1".to_string());
        store.save(&acc).await.unwrap();

        let by_identity = store
            .find_by_provider_identity("google", "g-1")
            .await
            .unwrap()
            .expect("linked account");
        assert_eq!(by_identity.id, "U_1");
        assert!(by_identity.created_at.is_some());

        let by_email = store.find_by_email("one@example.com").await.unwrap();
        assert_eq!(by_email.map(|a| a.id), Some("U_1".to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let store = SqliteAccountStore::new(test_pool().await);
        store.save(&account("U_1", "dup@example.com")).await.unwrap();

        let err = store
            .save(&account("U_2", "dup@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_remember_token_roundtrip() {
        let store = SqliteAccountStore::new(test_pool().await);
        store.save(&account("U_1", "r@example.com")).await.unwrap();

        store.set_remember_token("U_1", Some("tok")).await.unwrap();
        let acc = store.find_by_id("U_1").await.unwrap().unwrap();
        assert_eq!(acc.remember_token.as_deref(), Some("tok"));

        store.set_remember_token("U_1", None).await.unwrap();
        let acc = store.find_by_id("U_1").await.unwrap().unwrap();
        assert_eq!(acc.remember_token, None);
    }

    #[tokio::test]
    async fn test_lookups_miss() {
        let store = SqliteAccountStore::new(test_pool().await);
        assert!(store.find_by_id("U_none").await.unwrap().is_none());
        assert!(store.find_by_email("x@example.com").await.unwrap().is_none());
        assert!(store
            .find_by_provider_identity("google", "nope")
            .await
            .unwrap()
            .is_none());
    }
}
