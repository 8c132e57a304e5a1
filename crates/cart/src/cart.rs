use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use market_auth::Identity;
use market_core::{CartItemId, DomainError, Entity, Money, OrderId, ProductId, SessionToken, UserId, ValueObject};
use market_products::Product;

/// Visibility boundary for carts and orders.
///
/// Exactly one of user or session: the enum makes a record owned by both (or
/// neither) unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartScope {
    User(UserId),
    Session(SessionToken),
}

impl CartScope {
    /// Resolve the cart scope of a caller.
    ///
    /// Guests must present their own session token; there is no shared
    /// fallback cart.
    pub fn resolve(identity: &Identity) -> Result<CartScope, DomainError> {
        match identity {
            Identity::Authenticated(p) => Ok(CartScope::User(p.user_id)),
            Identity::Guest { session: Some(token) } => Ok(CartScope::Session(token.clone())),
            Identity::Guest { session: None } => {
                Err(DomainError::validation("Session ID is required for guest users"))
            }
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            CartScope::User(id) => Some(*id),
            CartScope::Session(_) => None,
        }
    }

    pub fn session(&self) -> Option<&SessionToken> {
        match self {
            CartScope::User(_) => None,
            CartScope::Session(token) => Some(token),
        }
    }
}

/// Product fields copied at add-to-cart time.
///
/// Each field is optional because rows written before snapshots existed have
/// none; readers fall back to the live product field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub image_url: Option<String>,
}

impl ValueObject for ProductSnapshot {}

impl ProductSnapshot {
    pub fn of(product: &Product) -> Self {
        Self {
            name: Some(product.name.clone()),
            price: Some(product.price),
            image_url: Some(product.image_url.clone()),
        }
    }
}

/// A line in a live cart or, once placed, in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    /// `None` once the referenced product has been deleted.
    pub product_id: Option<ProductId>,
    pub snapshot: ProductSnapshot,
    pub scope: CartScope,
    pub created_at: DateTime<Utc>,
    pub ordered: bool,
    pub order_id: Option<OrderId>,
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl CartItem {
    /// Decide the item created by adding `product` to the cart of `scope`.
    pub fn add(
        id: CartItemId,
        scope: CartScope,
        buyer: &Identity,
        product: &Product,
        at: DateTime<Utc>,
    ) -> Result<CartItem, DomainError> {
        product.ensure_purchasable_by(buyer)?;
        Ok(CartItem {
            id,
            product_id: Some(product.id),
            snapshot: ProductSnapshot::of(product),
            scope,
            created_at: at,
            ordered: false,
            order_id: None,
        })
    }

    /// In the live cart (not yet moved under an order).
    pub fn is_live(&self) -> bool {
        !self.ordered && self.order_id.is_none()
    }

    pub fn is_in_cart_of(&self, scope: &CartScope) -> bool {
        self.is_live() && &self.scope == scope
    }

    /// Move this item under an order.
    pub fn assign_to(&mut self, order_id: OrderId) {
        self.ordered = true;
        self.order_id = Some(order_id);
    }

    /// Called when the referenced product is deleted; the snapshot stays.
    pub fn detach_product(&mut self) {
        self.product_id = None;
    }
}

/// A cart item together with the live product it references (if it still exists).
///
/// All display and pricing goes through here: snapshot first, live product
/// second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item: CartItem,
    pub live: Option<ProductSnapshot>,
}

impl CartLine {
    pub fn new(item: CartItem, live: Option<ProductSnapshot>) -> Self {
        Self { item, live }
    }

    pub fn name(&self) -> Option<&str> {
        self.item
            .snapshot
            .name
            .as_deref()
            .or_else(|| self.live.as_ref().and_then(|l| l.name.as_deref()))
    }

    /// Unit price; zero when neither snapshot nor live product knows it.
    pub fn price(&self) -> Money {
        self.item
            .snapshot
            .price
            .or_else(|| self.live.as_ref().and_then(|l| l.price))
            .unwrap_or(Money::ZERO)
    }

    pub fn image_url(&self) -> Option<&str> {
        self.item
            .snapshot
            .image_url
            .as_deref()
            .or_else(|| self.live.as_ref().and_then(|l| l.image_url.as_deref()))
    }
}

/// Sum of line prices.
///
/// Fails instead of saturating when the sum does not fit in [`Money`].
pub fn total_of(lines: &[CartLine]) -> Result<Money, DomainError> {
    Money::checked_sum(lines.iter().map(CartLine::price))
        .ok_or_else(|| DomainError::validation("Cart total is too large"))
}

/// Newest first, ties broken by id, so a read is stable.
pub fn sort_newest_first(lines: &mut [CartLine]) {
    lines.sort_by(|a, b| {
        b.item
            .created_at
            .cmp(&a.item.created_at)
            .then_with(|| b.item.id.cmp(&a.item.id))
    });
}

/// The live cart of a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub total: Money,
}

impl CartSummary {
    pub fn new(mut lines: Vec<CartLine>) -> Result<Self, DomainError> {
        sort_newest_first(&mut lines);
        let total = total_of(&lines)?;
        Ok(Self { lines, total })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
