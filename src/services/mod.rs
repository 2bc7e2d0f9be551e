//! Business logic services

pub mod catalog;
pub mod circulation;
pub mod identity;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    repository::{CatalogStore, CatalogTransaction},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub identity: Arc<dyn identity::IdentityProvider>,
    store: Arc<dyn CatalogStore>,
}

impl Services {
    /// Create all services around one catalog store
    pub fn new(
        store: Arc<dyn CatalogStore>,
        identity: Arc<dyn identity::IdentityProvider>,
        circulation_config: &CirculationConfig,
    ) -> Self {
        let deadline = circulation_config.storage_timeout();
        Self {
            catalog: catalog::CatalogService::new(store.clone(), deadline),
            circulation: circulation::CirculationService::new(store.clone(), deadline),
            identity,
            store,
        }
    }

    /// Readiness probe against the catalog store
    pub async fn ping_store(&self) -> AppResult<()> {
        self.store.ping().await
    }
}

/// Run one storage unit of work under a deadline, then commit it.
///
/// `work` returns its open transaction along with its result. The deadline covers the
/// work only: on expiry the future is dropped, which drops the transaction and rolls it
/// back. Commit runs outside the deadline so a `Timeout` always means nothing was written.
pub(crate) async fn with_deadline<T, F>(deadline: Duration, operation: &str, work: F) -> AppResult<T>
where
    F: Future<Output = AppResult<(Box<dyn CatalogTransaction>, T)>>,
{
    let (tx, value) = match tokio::time::timeout(deadline, work).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(AppError::Timeout(format!(
                "{} did not complete within {} ms",
                operation,
                deadline.as_millis()
            )))
        }
    };
    tx.commit().await?;
    Ok(value)
}
