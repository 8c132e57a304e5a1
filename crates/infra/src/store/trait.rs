use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use market_cart::{CartItem, CartLine, CartScope};
use market_core::{CartItemId, DomainError, OrderId, ProductId, UserId};
use market_orders::Order;
use market_products::{Approval, Product};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing database failed or is unreachable.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row cannot be turned back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    LockPoisoned,

    /// A domain rule evaluated inside the store's unit of work refused the change.
    #[error(transparent)]
    Rejected(#[from] DomainError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for the marketplace.
///
/// Methods that return `bool` report whether a matching row existed; callers
/// turn `false` into a not-found error.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn insert_product(&self, product: Product) -> StoreResult<()>;

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn product_by_name(&self, name: &str) -> StoreResult<Option<Product>>;

    /// Every product, unfiltered. Visibility is applied by the caller.
    async fn products(&self) -> StoreResult<Vec<Product>>;

    async fn save_approval(&self, id: ProductId, approval: &Approval) -> StoreResult<bool>;

    /// Delete a product and detach the cart items referencing it.
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

    /// Persist a new cart item. Fails with a not-found rejection when the
    /// referenced product no longer exists.
    async fn insert_cart_item(&self, item: CartItem) -> StoreResult<()>;

    /// Live cart of a scope, newest first, joined with the live product fields.
    async fn cart_lines(&self, scope: &CartScope) -> StoreResult<Vec<CartLine>>;

    /// Remove a live item of `scope`. Items of other scopes and items already
    /// moved under an order are reported as absent.
    async fn remove_cart_item(&self, scope: &CartScope, id: CartItemId) -> StoreResult<bool>;

    /// Atomically build an order from the live cart of `scope` and move every
    /// cart row under it.
    async fn place_order(
        &self,
        scope: &CartScope,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> StoreResult<Order>;

    /// Orders of a scope, newest first, each with its lines.
    async fn orders(&self, scope: &CartScope) -> StoreResult<Vec<Order>>;

    /// Delete an order owned by `owner` together with its cart items.
    async fn delete_order(&self, owner: UserId, id: OrderId) -> StoreResult<bool>;
}

#[async_trait]
impl<S> MarketStore for Arc<S>
where
    S: MarketStore + ?Sized,
{
    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        (**self).insert_product(product).await
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        (**self).product(id).await
    }

    async fn product_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        (**self).product_by_name(name).await
    }

    async fn products(&self) -> StoreResult<Vec<Product>> {
        (**self).products().await
    }

    async fn save_approval(&self, id: ProductId, approval: &Approval) -> StoreResult<bool> {
        (**self).save_approval(id, approval).await
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        (**self).delete_product(id).await
    }

    async fn insert_cart_item(&self, item: CartItem) -> StoreResult<()> {
        (**self).insert_cart_item(item).await
    }

    async fn cart_lines(&self, scope: &CartScope) -> StoreResult<Vec<CartLine>> {
        (**self).cart_lines(scope).await
    }

    async fn remove_cart_item(&self, scope: &CartScope, id: CartItemId) -> StoreResult<bool> {
        (**self).remove_cart_item(scope, id).await
    }

    async fn place_order(
        &self,
        scope: &CartScope,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> StoreResult<Order> {
        (**self).place_order(scope, order_id, at).await
    }

    async fn orders(&self, scope: &CartScope) -> StoreResult<Vec<Order>> {
        (**self).orders(scope).await
    }

    async fn delete_order(&self, owner: UserId, id: OrderId) -> StoreResult<bool> {
        (**self).delete_order(owner, id).await
    }
}
