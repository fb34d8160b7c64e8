//! Credential store: durable keyed storage of user accounts with uniqueness
//! on `username` and `email`.
//!
//! The application only ever talks to the [`CredentialStore`] trait; the
//! concrete backend is chosen at startup and injected into the state.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;
mod types;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;
pub use types::{NewAccount, ProfileUpdate, UserAccount};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique field(s): {}", .fields.join(", "))]
    DuplicateKey { fields: Vec<&'static str> },

    #[error("account not found")]
    NotFound,

    #[error("credential store unavailable")]
    Unavailable,

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                Self::Unavailable
            }
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Self::DuplicateKey {
                fields: db
                    .constraint()
                    .and_then(postgres::field_for_constraint)
                    .into_iter()
                    .collect(),
            },
            other => Self::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a new account. Fails with [`StoreError::DuplicateKey`] naming
    /// the conflicting field(s) when the username or email is taken.
    async fn create(&self, account: NewAccount) -> StoreResult<UserAccount>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserAccount>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserAccount>>;

    async fn find_by_access_token(&self, token: &str) -> StoreResult<Option<UserAccount>>;

    /// Merges the supplied profile fields; [`StoreError::NotFound`] if `id`
    /// does not exist.
    async fn update(&self, id: Uuid, changes: ProfileUpdate) -> StoreResult<UserAccount>;

    /// Cheap liveness check, consulted before every routed request.
    fn is_connected(&self) -> bool;

    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Unavailable
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable
        ));
    }

    #[test]
    fn row_not_found_stays_a_database_error() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn duplicate_key_message_names_fields() {
        let err = StoreError::DuplicateKey {
            fields: vec!["username", "email"],
        };
        assert_eq!(
            err.to_string(),
            "duplicate value for unique field(s): username, email"
        );
    }
}
