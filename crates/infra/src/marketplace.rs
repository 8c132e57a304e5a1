//! Application service: every marketplace operation, end to end.
//!
//! Each operation follows the same shape:
//!
//! ```text
//! caller identity
//!   ↓
//! 1. Authenticate / authorize (domain policy, no IO)
//!   ↓
//! 2. Load what the decision needs from the store
//!   ↓
//! 3. Decide (pure domain function)
//!   ↓
//! 4. Persist through `MarketStore`
//! ```
//!
//! Failures surface synchronously as [`MarketError`]; nothing is retried.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use market_auth::{Identity, IdentityCheck};
use market_cart::{CartItem, CartScope, CartSummary};
use market_core::{CartItemId, DomainError, OrderId, ProductId};
use market_orders::{Order, authorize_order_deletion};
use market_products::{Product, ProductListing, SubmitProduct, authorize_approval, catalog_for};

use crate::store::{MarketStore, StoreError};

/// Error taxonomy reported to the boundary layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Role or ownership check failed.
    #[error("{0}")]
    Permission(String),

    /// The operation needs a logged-in identity.
    #[error("{0}")]
    Authentication(String),

    /// Absent, or not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl MarketError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::Validation(_) => "validation_error",
            MarketError::Permission(_) => "permission_denied",
            MarketError::Authentication(_) => "authentication_required",
            MarketError::NotFound(_) => "not_found",
            MarketError::Store(_) => "internal_error",
        }
    }
}

impl From<DomainError> for MarketError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => MarketError::Validation(msg),
            DomainError::Permission(msg) => MarketError::Permission(msg),
            DomainError::Authentication(msg) => MarketError::Authentication(msg),
            DomainError::NotFound(msg) => MarketError::NotFound(msg),
            DomainError::InvariantViolation(msg) => MarketError::Store(StoreError::Corrupt(msg)),
        }
    }
}

impl From<StoreError> for MarketError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Rejected(domain) => domain.into(),
            other => MarketError::Store(other),
        }
    }
}

pub type MarketResult<T> = Result<T, MarketError>;

/// Raw submission fields as supplied by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProduct {
    pub name: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
}

const PRODUCT_NOT_FOUND: &str = "Product not found";
const CART_ITEM_NOT_FOUND: &str = "Item not found in your cart";
const ORDER_NOT_FOUND: &str = "Order not found";

/// The marketplace service over a store.
#[derive(Debug, Clone)]
pub struct Marketplace<S> {
    store: S,
}

impl<S> Marketplace<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> Marketplace<S>
where
    S: MarketStore,
{
    /// Catalog as seen by `viewer`, ordered by name.
    #[instrument(skip(self, viewer), fields(authenticated = viewer.is_authenticated()), err)]
    pub async fn list_products(&self, viewer: &Identity) -> MarketResult<Vec<ProductListing>> {
        let products = self.store.products().await?;
        Ok(catalog_for(viewer, products))
    }

    #[instrument(skip(self, creator, input), err)]
    pub async fn submit_product(&self, creator: &Identity, input: NewProduct) -> MarketResult<Product> {
        let product = Product::submit(
            creator,
            SubmitProduct {
                product_id: ProductId::new(),
                name: input.name,
                price: input.price,
                image_url: input.image_url,
                occurred_at: Utc::now(),
            },
        )
        .inspect_err(|e| debug!(error = %e, "product submission rejected"))?;

        self.store.insert_product(product.clone()).await?;
        info!(
            product_id = %product.id,
            approved = product.is_approved(),
            "product submitted"
        );
        Ok(product)
    }

    #[instrument(skip(self, actor), fields(product_id = %id), err)]
    pub async fn approve_product(&self, actor: &Identity, id: ProductId) -> MarketResult<Product> {
        let admin = authorize_approval(actor)?;
        let mut product = self
            .store
            .product(id)
            .await?
            .ok_or_else(|| MarketError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;

        product.approve(admin, Utc::now());
        let Some(approval) = product.approval.as_ref() else {
            return Err(DomainError::invariant("approval not recorded").into());
        };
        if !self.store.save_approval(id, approval).await? {
            return Err(MarketError::NotFound(PRODUCT_NOT_FOUND.to_string()));
        }

        info!(product_id = %id, approved_by = %admin.username, "product approved");
        Ok(product)
    }

    #[instrument(skip(self, actor), fields(product_id = %id), err)]
    pub async fn delete_product(&self, actor: &Identity, id: ProductId) -> MarketResult<()> {
        if !actor.is_authenticated() {
            return Err(MarketError::Authentication("Authentication required".to_string()));
        }
        let product = self
            .store
            .product(id)
            .await?
            .ok_or_else(|| MarketError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;
        product.authorize_deletion(actor)?;

        if !self.store.delete_product(id).await? {
            return Err(MarketError::NotFound(PRODUCT_NOT_FOUND.to_string()));
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Add one unit of a product to the caller's cart.
    #[instrument(skip(self, buyer), fields(product_id = %product_id), err)]
    pub async fn add_to_cart(&self, buyer: &Identity, product_id: ProductId) -> MarketResult<CartItem> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;
        product.ensure_purchasable_by(buyer)?;
        let scope = CartScope::resolve(buyer)?;

        let item = CartItem::add(CartItemId::new(), scope, buyer, &product, Utc::now())?;
        self.store.insert_cart_item(item.clone()).await?;

        info!(item_id = %item.id, product_id = %product_id, "item added to cart");
        Ok(item)
    }

    #[instrument(skip(self, viewer), err)]
    pub async fn cart(&self, viewer: &Identity) -> MarketResult<CartSummary> {
        let scope = CartScope::resolve(viewer)?;
        let lines = self.store.cart_lines(&scope).await?;
        Ok(CartSummary::new(lines)?)
    }

    /// Remove an item from the caller's live cart.
    ///
    /// Items of other scopes are reported as not found.
    #[instrument(skip(self, actor), fields(item_id = %item_id), err)]
    pub async fn remove_from_cart(&self, actor: &Identity, item_id: CartItemId) -> MarketResult<()> {
        let scope = CartScope::resolve(actor)?;
        if !self.store.remove_cart_item(&scope, item_id).await? {
            debug!(item_id = %item_id, "cart item not in caller's cart");
            return Err(MarketError::NotFound(CART_ITEM_NOT_FOUND.to_string()));
        }
        info!(item_id = %item_id, "item removed from cart");
        Ok(())
    }

    /// Turn the caller's live cart into an order.
    #[instrument(skip(self, buyer), err)]
    pub async fn place_order(&self, buyer: &Identity) -> MarketResult<Order> {
        let scope = CartScope::resolve(buyer)?;
        let order = self.store.place_order(&scope, OrderId::new(), Utc::now()).await?;

        info!(
            order_id = %order.id,
            total = %order.total,
            item_count = order.lines.len(),
            "order placed"
        );
        Ok(order)
    }

    /// Orders of the caller's scope, newest first.
    #[instrument(skip(self, viewer), err)]
    pub async fn orders(&self, viewer: &Identity) -> MarketResult<Vec<Order>> {
        let scope = CartScope::resolve(viewer)?;
        Ok(self.store.orders(&scope).await?)
    }

    #[instrument(skip(self, actor), fields(order_id = %id), err)]
    pub async fn delete_order(&self, actor: &Identity, id: OrderId) -> MarketResult<()> {
        let owner = authorize_order_deletion(actor)?;
        if !self.store.delete_order(owner, id).await? {
            return Err(MarketError::NotFound(ORDER_NOT_FOUND.to_string()));
        }
        info!(order_id = %id, "order deleted");
        Ok(())
    }

    pub fn check_identity(&self, identity: &Identity) -> IdentityCheck {
        identity.check()
    }
}
