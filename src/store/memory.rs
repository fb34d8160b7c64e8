use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CredentialStore, NewAccount, ProfileUpdate, StoreError, StoreResult, UserAccount};

/// In-process store for tests and database-less runs. The uniqueness check
/// and the insert happen under the same write lock.
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<Uuid, UserAccount>>,
    open: AtomicBool,
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            open: AtomicBool::new(true),
        }
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    async fn find_by<P>(&self, pred: P) -> StoreResult<Option<UserAccount>>
    where
        P: Fn(&UserAccount) -> bool,
    {
        self.ensure_open()?;
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| pred(a)).cloned())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, account: NewAccount) -> StoreResult<UserAccount> {
        self.ensure_open()?;
        let mut accounts = self.accounts.write().await;

        let mut fields = Vec::new();
        if accounts.values().any(|a| a.username == account.username) {
            fields.push("username");
        }
        if accounts.values().any(|a| a.email == account.email) {
            fields.push("email");
        }
        if !fields.is_empty() {
            return Err(StoreError::DuplicateKey { fields });
        }

        let now = OffsetDateTime::now_utc();
        let user = UserAccount {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            access_token: account.access_token,
            full_name: None,
            age: None,
            location: None,
            description: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(user.id, user.clone());
        debug!(user_id = %user.id, "account inserted in memory");
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserAccount>> {
        self.find_by(|a| a.username == username).await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserAccount>> {
        self.ensure_open()?;
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_access_token(&self, token: &str) -> StoreResult<Option<UserAccount>> {
        self.find_by(|a| a.access_token == token).await
    }

    async fn update(&self, id: Uuid, changes: ProfileUpdate) -> StoreResult<UserAccount> {
        self.ensure_open()?;
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        changes.apply_to(account);
        account.updated_at = OffsetDateTime::now_utc();
        Ok(account.clone())
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}
