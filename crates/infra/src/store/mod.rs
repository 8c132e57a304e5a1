//! Storage boundary for products, cart items and orders.
//!
//! Domain decisions are made by the domain crates; stores persist them and
//! enforce the referential rules:
//! - deleting a product detaches every cart item that references it (the
//!   snapshot stays);
//! - deleting an order deletes the cart items it owns;
//! - placing an order moves all live cart rows of a scope in one atomic step.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryMarketStore;
pub use postgres::PostgresMarketStore;
pub use r#trait::{MarketStore, StoreError, StoreResult};
