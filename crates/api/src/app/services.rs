use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use market_infra::{
    InMemoryMarketStore, MarketConfig, MarketStore, Marketplace, PostgresMarketStore, StorageConfig,
    StoreError, seed_catalog,
};

/// The marketplace service behind a type-erased store.
pub type AppServices = Marketplace<Arc<dyn MarketStore>>;

/// Build the services selected by `config`.
///
/// Persistent stores get their schema applied before use. The catalog seed
/// runs afterwards when enabled.
pub async fn build_services(config: &MarketConfig) -> Result<AppServices, StoreError> {
    let store: Arc<dyn MarketStore> = match &config.storage {
        StorageConfig::InMemory => {
            info!("using in-memory stores");
            Arc::new(InMemoryMarketStore::new())
        }
        StorageConfig::Postgres { database_url } => {
            info!("using postgres stores");
            let store = PostgresMarketStore::connect(database_url).await?;
            store.migrate().await?;
            Arc::new(store)
        }
    };

    if config.seed_catalog {
        let created = seed_catalog(&store, Utc::now()).await?;
        info!(created, "catalog seed finished");
    }

    Ok(Marketplace::new(store))
}

/// Fresh in-memory services (tests/dev).
pub fn in_memory_services() -> AppServices {
    let store: Arc<dyn MarketStore> = Arc::new(InMemoryMarketStore::new());
    Marketplace::new(store)
}
