use crate::auth::password;
use crate::config::{AppConfig, StoreBackend};
use crate::store::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        match tokio::task::spawn_blocking(password::init_dummy_hash).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "login timing parity disabled"),
            Err(e) => tracing::error!(error = %e, "dummy hash task failed"),
        }

        let store = match config.store {
            StoreBackend::Postgres => {
                let pg =
                    PgCredentialStore::connect(&config.database_url, config.max_connections).await?;
                pg.migrate().await?;
                Arc::new(pg) as Arc<dyn CredentialStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory credential store; accounts are not persisted");
                Arc::new(MemoryCredentialStore::new()) as Arc<dyn CredentialStore>
            }
        };

        Ok(Self::from_store(store))
    }

    pub fn from_store(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// State backed by a fresh in-memory store.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_store(Arc::new(MemoryCredentialStore::new()))
    }
}
