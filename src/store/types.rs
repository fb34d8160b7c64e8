use std::fmt;

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record as persisted by a [`CredentialStore`](super::CredentialStore).
#[derive(Clone, FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub access_token: String,  // bearer credential, fixed at creation
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// Keeps credentials out of logs and panic messages.
impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("age", &self.age)
            .field("location", &self.location)
            .field("description", &self.description)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Everything the store needs to insert a new account. The id and timestamps
/// are assigned by the store.
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub access_token: String,
}

/// Partial profile change. Only the mutable profile fields exist here, so an
/// update can never touch the username, email or credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.age.is_none()
            && self.location.is_none()
            && self.description.is_none()
    }

    /// Merges the supplied fields into `account`, leaving the rest unchanged.
    pub fn apply_to(self, account: &mut UserAccount) {
        if let Some(v) = self.full_name {
            account.full_name = Some(v);
        }
        if let Some(v) = self.age {
            account.age = Some(v);
        }
        if let Some(v) = self.location {
            account.location = Some(v);
        }
        if let Some(v) = self.description {
            account.description = Some(v);
        }
    }
}
