//! Signup, login and profile update, independent of HTTP.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{password, token};
use crate::error::ApiError;
use crate::store::{CredentialStore, NewAccount, ProfileUpdate, UserAccount};

pub(crate) const LOGIN_FAILED: &str = "User not found or password incorrect";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

async fn hash_blocking(plain: String) -> Result<String, ApiError> {
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(hash)
}

/// Verifies on the blocking pool. With no stored hash a dummy verification is
/// done instead, so both outcomes take comparable time.
async fn verify_blocking(plain: String, hash: Option<String>) -> Result<bool, ApiError> {
    let ok = tokio::task::spawn_blocking(move || match hash {
        Some(h) => password::verify_password(&plain, &h),
        None => Ok(password::verify_dummy(&plain)),
    })
    .await
    .map_err(anyhow::Error::from)??;
    Ok(ok)
}

/// Validates input, hashes the password and stores the new account with a
/// fresh access token.
pub async fn signup(
    store: &dyn CredentialStore,
    username: &str,
    email: &str,
    plain_password: String,
) -> Result<UserAccount, ApiError> {
    let username = username.trim();
    let email = email.trim().to_lowercase();

    if username.is_empty() {
        warn!("signup without username");
        return Err(ApiError::Validation("Username is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if plain_password.is_empty() {
        warn!("signup without password");
        return Err(ApiError::Validation("Password is required".into()));
    }

    let password_hash = hash_blocking(plain_password).await?;
    let account = NewAccount {
        username: username.to_string(),
        email,
        password_hash,
        access_token: token::generate_access_token(),
    };

    let user = store.create(account).await.map_err(|e| {
        warn!(error = %e, username = %username, "create account failed");
        ApiError::from(e)
    })?;

    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok(user)
}

/// Looks the account up and checks the password. Unknown user and wrong
/// password produce the same error.
pub async fn login(
    store: &dyn CredentialStore,
    username: &str,
    plain_password: String,
) -> Result<UserAccount, ApiError> {
    let user = store.find_by_username(username.trim()).await?;
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());

    let ok = verify_blocking(plain_password, stored_hash).await?;
    match user {
        Some(u) if ok => {
            info!(user_id = %u.id, "user logged in");
            Ok(u)
        }
        Some(u) => {
            warn!(user_id = %u.id, "login invalid password");
            Err(ApiError::NotFound(LOGIN_FAILED))
        }
        None => {
            warn!(username = %username, "login unknown username");
            Err(ApiError::NotFound(LOGIN_FAILED))
        }
    }
}

/// Applies whitelisted profile changes to `target`, which must be the
/// authenticated account itself.
pub async fn update_profile(
    store: &dyn CredentialStore,
    caller: &UserAccount,
    target: Uuid,
    changes: ProfileUpdate,
) -> Result<UserAccount, ApiError> {
    ensure_owner(caller, target)?;
    if let Some(age) = changes.age {
        if age < 0 {
            return Err(ApiError::Validation("Age must not be negative".into()));
        }
    }
    if changes.is_empty() {
        debug!(user_id = %caller.id, "empty profile update");
        return Ok(caller.clone());
    }

    let user = store.update(target, changes).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

/// A token only grants access to its own account. Other ids look absent.
pub fn ensure_owner(caller: &UserAccount, target: Uuid) -> Result<(), ApiError> {
    if caller.id == target {
        Ok(())
    } else {
        warn!(user_id = %caller.id, target = %target, "access to another account refused");
        Err(ApiError::NotFound("User not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("bob@x.com"));
        assert!(!is_valid_email("bob"));
        assert!(!is_valid_email("bob@x"));
        assert!(!is_valid_email("b ob@x.com"));
    }

    #[tokio::test]
    async fn signup_then_login_returns_the_same_token() {
        let store = MemoryCredentialStore::new();
        let created = signup(&store, "bob", "bob@x.com", "foobar".into())
            .await
            .unwrap();
        assert!(!created.access_token.is_empty());
        assert_ne!(created.password_hash, "foobar");

        let logged_in = login(&store, "bob", "foobar".into()).await.unwrap();
        assert_eq!(logged_in.id, created.id);
        assert_eq!(logged_in.access_token, created.access_token);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let store = MemoryCredentialStore::new();
        signup(&store, "bob", "bob@x.com", "foobar".into())
            .await
            .unwrap();

        let wrong = login(&store, "bob", "wrong".into()).await.unwrap_err();
        let unknown = login(&store, "alice", "foobar".into()).await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.status(), unknown.status());
    }

    #[tokio::test]
    async fn distinct_signups_get_distinct_credentials() {
        let store = MemoryCredentialStore::new();
        let a = signup(&store, "a", "a@x.com", "same".into()).await.unwrap();
        let b = signup(&store, "b", "b@x.com", "same".into()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.access_token, b.access_token);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[tokio::test]
    async fn signup_normalizes_email_and_rejects_duplicates() {
        let store = MemoryCredentialStore::new();
        let first = signup(&store, "bob", "  Bob@X.com ", "foobar".into())
            .await
            .unwrap();
        assert_eq!(first.email, "bob@x.com");

        let err = signup(&store, "robert", "bob@x.com", "pw".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateKey { ref fields } if fields == &["email"]));
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let store = MemoryCredentialStore::new();
        for (user, email, pw) in [("", "a@x.com", "pw"), ("a", "nope", "pw"), ("a", "a@x.com", "")] {
            let err = signup(&store, user, email, pw.into()).await.unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{user}/{email}");
        }
        assert!(store.find_by_username("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_profile_requires_ownership() {
        let store = MemoryCredentialStore::new();
        let bob = signup(&store, "bob", "bob@x.com", "pw".into()).await.unwrap();
        let amy = signup(&store, "amy", "amy@x.com", "pw".into()).await.unwrap();

        let changes = ProfileUpdate {
            description: Some("hacked".into()),
            ..Default::default()
        };
        let err = update_profile(&store, &bob, amy.id, changes).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let amy_now = store.find_by_id(amy.id).await.unwrap().unwrap();
        assert_eq!(amy_now.description, None);
    }

    #[tokio::test]
    async fn update_profile_merges_own_fields() {
        let store = MemoryCredentialStore::new();
        let bob = signup(&store, "bob", "bob@x.com", "pw".into()).await.unwrap();
        let updated = update_profile(
            &store,
            &bob,
            bob.id,
            ProfileUpdate {
                age: Some(33),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.age, Some(33));
        assert_eq!(updated.access_token, bob.access_token);
    }

    #[tokio::test]
    async fn update_profile_rejects_negative_age() {
        let store = MemoryCredentialStore::new();
        let bob = signup(&store, "bob", "bob@x.com", "pw".into()).await.unwrap();
        let err = update_profile(
            &store,
            &bob,
            bob.id,
            ProfileUpdate {
                age: Some(-1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn store_unavailable_surfaces_as_such() {
        let store = MemoryCredentialStore::new();
        store.close().await;
        let err = login(&store, "bob", "pw".into()).await.unwrap_err();
        assert!(matches!(err, ApiError::StoreUnavailable));
    }
}
