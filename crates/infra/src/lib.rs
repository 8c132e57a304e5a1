//! Infrastructure layer: storage backends, the marketplace service, config.

pub mod config;
pub mod marketplace;
pub mod seed;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use config::{ConfigError, MarketConfig, StorageConfig};
pub use marketplace::{MarketError, MarketResult, Marketplace, NewProduct};
pub use seed::seed_catalog;
pub use store::{InMemoryMarketStore, MarketStore, PostgresMarketStore, StoreError, StoreResult};
