use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{CredentialStore, NewAccount, ProfileUpdate, StoreError, StoreResult, UserAccount};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, access_token, \
     full_name, age, location, description, created_at, updated_at";

const HEALTH_CHECK_EVERY: Duration = Duration::from_secs(5);
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Maps a violated unique constraint (see `migrations/`) to the field it guards.
pub(super) fn field_for_constraint(constraint: &str) -> Option<&'static str> {
    match constraint {
        "users_username_key" => Some("username"),
        "users_email_key" => Some("email"),
        _ => None,
    }
}

/// PostgreSQL-backed store. Uniqueness and atomic inserts are delegated to
/// the table's `UNIQUE` constraints.
///
/// Reachability is tracked in a flag: a background `SELECT 1` refreshes it
/// and every query that fails for connectivity reasons clears it, so the
/// request guard can refuse work without waiting on the pool.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
    reachable: Arc<AtomicBool>,
}

impl PgCredentialStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        info!(max_connections, "credential store connected");

        let store = Self::from_pool(pool);
        store.reachable.store(true, Ordering::Release);
        store.spawn_health_check(HEALTH_CHECK_EVERY);
        Ok(store)
    }

    /// Wraps an existing pool. Reported as disconnected until the first
    /// successful [`check_health`](Self::check_health) or query.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            reachable: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }

    /// Runs `SELECT 1` and records whether it succeeded.
    pub async fn check_health(&self) -> bool {
        ping(&self.pool, &self.reachable).await
    }

    /// Repeats the health check every `every` until the pool is closed.
    pub fn spawn_health_check(&self, every: Duration) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let reachable = Arc::clone(&self.reachable);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            while !pool.is_closed() {
                ticker.tick().await;
                ping(&pool, &reachable).await;
            }
            debug!("health check stopped");
        })
    }

    /// Maps a query result and keeps the reachability flag current.
    fn track<T>(&self, result: Result<T, sqlx::Error>) -> StoreResult<T> {
        match result.map_err(StoreError::from) {
            Err(StoreError::Unavailable) => {
                if self.reachable.swap(false, Ordering::AcqRel) {
                    warn!("credential store became unreachable");
                }
                Err(StoreError::Unavailable)
            }
            other => {
                self.reachable.store(true, Ordering::Release);
                other
            }
        }
    }
}

async fn ping(pool: &PgPool, reachable: &AtomicBool) -> bool {
    let ok = matches!(
        tokio::time::timeout(HEALTH_CHECK_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await,
        Ok(Ok(_))
    );
    let was = reachable.swap(ok, Ordering::AcqRel);
    if was != ok {
        if ok {
            info!("credential store reachable");
        } else {
            warn!("credential store unreachable");
        }
    }
    ok
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, account: NewAccount) -> StoreResult<UserAccount> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, access_token)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let user = self.track(
            sqlx::query_as::<_, UserAccount>(&sql)
                .bind(&account.username)
                .bind(&account.email)
                .bind(&account.password_hash)
                .bind(&account.access_token)
                .fetch_one(&self.pool)
                .await,
        )?;
        debug!(user_id = %user.id, "account row inserted");
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserAccount>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = $1");
        self.track(
            sqlx::query_as::<_, UserAccount>(&sql)
                .bind(username)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserAccount>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        self.track(
            sqlx::query_as::<_, UserAccount>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn find_by_access_token(&self, token: &str) -> StoreResult<Option<UserAccount>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE access_token = $1");
        self.track(
            sqlx::query_as::<_, UserAccount>(&sql)
                .bind(token)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn update(&self, id: Uuid, changes: ProfileUpdate) -> StoreResult<UserAccount> {
        let sql = format!(
            r#"
            UPDATE users
               SET full_name   = COALESCE($2, full_name),
                   age         = COALESCE($3, age),
                   location    = COALESCE($4, location),
                   description = COALESCE($5, description),
                   updated_at  = now()
             WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        self.track(
            sqlx::query_as::<_, UserAccount>(&sql)
                .bind(id)
                .bind(changes.full_name)
                .bind(changes.age)
                .bind(changes.location)
                .bind(changes.description)
                .fetch_optional(&self.pool)
                .await,
        )?
        .ok_or(StoreError::NotFound)
    }

    fn is_connected(&self) -> bool {
        !self.pool.is_closed() && self.reachable.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.reachable.store(false, Ordering::Release);
        self.pool.close().await;
        info!("credential store closed");
    }
}
