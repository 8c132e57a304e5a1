use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use market_cart::{CartItem, CartLine, CartScope, ProductSnapshot, sort_newest_first};
use market_core::{CartItemId, DomainError, Money, OrderId, ProductId, UserId};
use market_orders::Order;
use market_products::{Approval, Product};

use super::r#trait::{MarketStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct OrderRow {
    id: OrderId,
    scope: CartScope,
    total: Money,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MarketState {
    products: HashMap<ProductId, Product>,
    cart_items: HashMap<CartItemId, CartItem>,
    orders: HashMap<OrderId, OrderRow>,
}

impl MarketState {
    fn line(&self, item: &CartItem) -> CartLine {
        let live = item
            .product_id
            .and_then(|id| self.products.get(&id))
            .map(ProductSnapshot::of);
        CartLine::new(item.clone(), live)
    }

    fn lines_where(&self, keep: impl Fn(&CartItem) -> bool) -> Vec<CartLine> {
        let mut lines: Vec<CartLine> = self
            .cart_items
            .values()
            .filter(|item| keep(item))
            .map(|item| self.line(item))
            .collect();
        sort_newest_first(&mut lines);
        lines
    }

    fn order(&self, row: &OrderRow) -> Order {
        Order {
            id: row.id,
            scope: row.scope.clone(),
            total: row.total,
            created_at: row.created_at,
            lines: self.lines_where(|item| item.order_id == Some(row.id)),
        }
    }
}

/// In-memory marketplace store.
///
/// Intended for tests/dev. Every multi-row change happens under a single
/// write guard, which gives the same all-or-nothing behavior as a transaction.
#[derive(Debug, Default)]
pub struct InMemoryMarketStore {
    state: RwLock<MarketState>,
}

impl InMemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MarketState>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MarketState>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.products.contains_key(&product.id) {
            return Err(StoreError::Database(format!(
                "product {} already exists",
                product.id
            )));
        }
        state.products.insert(product.id, product);
        Ok(())
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn product_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        let state = self.read()?;
        Ok(state
            .products
            .values()
            .filter(|p| p.name == name)
            .min_by_key(|p| p.id)
            .cloned())
    }

    async fn products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn save_approval(&self, id: ProductId, approval: &Approval) -> StoreResult<bool> {
        let mut state = self.write()?;
        match state.products.get_mut(&id) {
            Some(product) => {
                product.approval = Some(approval.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.products.remove(&id).is_none() {
            return Ok(false);
        }
        for item in state.cart_items.values_mut() {
            if item.product_id == Some(id) {
                item.detach_product();
            }
        }
        Ok(true)
    }

    async fn insert_cart_item(&self, item: CartItem) -> StoreResult<()> {
        let mut state = self.write()?;
        let product_exists = item
            .product_id
            .is_some_and(|id| state.products.contains_key(&id));
        if !product_exists {
            return Err(DomainError::not_found("Product not found").into());
        }
        if state.cart_items.contains_key(&item.id) {
            return Err(StoreError::Database(format!(
                "cart item {} already exists",
                item.id
            )));
        }
        state.cart_items.insert(item.id, item);
        Ok(())
    }

    async fn cart_lines(&self, scope: &CartScope) -> StoreResult<Vec<CartLine>> {
        Ok(self.read()?.lines_where(|item| item.is_in_cart_of(scope)))
    }

    async fn remove_cart_item(&self, scope: &CartScope, id: CartItemId) -> StoreResult<bool> {
        let mut state = self.write()?;
        match state.cart_items.get(&id) {
            Some(item) if item.is_in_cart_of(scope) => {
                state.cart_items.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn place_order(
        &self,
        scope: &CartScope,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> StoreResult<Order> {
        let mut state = self.write()?;
        let cart = state.lines_where(|item| item.is_in_cart_of(scope));
        let order = Order::place(order_id, scope.clone(), cart, at)?;

        for line in &order.lines {
            state.cart_items.insert(line.item.id, line.item.clone());
        }
        state.orders.insert(
            order.id,
            OrderRow {
                id: order.id,
                scope: order.scope.clone(),
                total: order.total,
                created_at: order.created_at,
            },
        );
        Ok(order)
    }

    async fn orders(&self, scope: &CartScope) -> StoreResult<Vec<Order>> {
        let state = self.read()?;
        let mut rows: Vec<&OrderRow> = state.orders.values().filter(|o| &o.scope == scope).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(rows.into_iter().map(|row| state.order(row)).collect())
    }

    async fn delete_order(&self, owner: UserId, id: OrderId) -> StoreResult<bool> {
        let mut state = self.write()?;
        let owned = state
            .orders
            .get(&id)
            .is_some_and(|o| o.scope.user_id() == Some(owner));
        if !owned {
            return Ok(false);
        }
        state.orders.remove(&id);
        state.cart_items.retain(|_, item| item.order_id != Some(id));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_auth::{Identity, Principal, Role, UserRef};
    use market_core::SessionToken;

    fn approved(name: &str, major: u64) -> Product {
        let at = Utc::now();
        Product::seeded(
            ProductId::new(),
            name,
            Money::from_major(major),
            format!("https://img/{name}.jpg"),
            Some(Approval {
                approved_at: at,
                approved_by: UserRef {
                    id: UserId::new(),
                    username: "root".to_string(),
                },
            }),
            at,
        )
    }

    fn guest(token: &str) -> Identity {
        Identity::guest(Some(SessionToken::parse(token).unwrap()))
    }

    async fn add(store: &InMemoryMarketStore, buyer: &Identity, product: &Product) -> CartItemId {
        let scope = CartScope::resolve(buyer).unwrap();
        let item = CartItem::add(CartItemId::new(), scope, buyer, product, Utc::now()).unwrap();
        let id = item.id;
        store.insert_cart_item(item).await.unwrap();
        id
    }

    #[tokio::test]
    async fn deleting_a_product_detaches_cart_items() {
        let store = InMemoryMarketStore::new();
        let pot = approved("Clay Pot", 700);
        store.insert_product(pot.clone()).await.unwrap();
        let buyer = guest("abc");
        add(&store, &buyer, &pot).await;

        assert!(store.delete_product(pot.id).await.unwrap());
        assert!(!store.delete_product(pot.id).await.unwrap());

        let scope = CartScope::resolve(&buyer).unwrap();
        let lines = store.cart_lines(&scope).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item.product_id, None);
        assert_eq!(lines[0].live, None);
        assert_eq!(lines[0].name(), Some("Clay Pot"));
    }

    #[tokio::test]
    async fn cart_item_for_missing_product_is_rejected() {
        let store = InMemoryMarketStore::new();
        let ghost = approved("Ghost", 10);
        let buyer = guest("abc");
        let scope = CartScope::resolve(&buyer).unwrap();
        let item = CartItem::add(CartItemId::new(), scope, &buyer, &ghost, Utc::now()).unwrap();

        let err = store.insert_cart_item(item).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn placement_moves_rows_and_empty_cart_creates_nothing() {
        let store = InMemoryMarketStore::new();
        let x = approved("X", 500);
        store.insert_product(x.clone()).await.unwrap();
        let buyer = guest("abc");
        let scope = CartScope::resolve(&buyer).unwrap();

        let err = store.place_order(&scope, OrderId::new(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(DomainError::Validation(_))));
        assert!(store.orders(&scope).await.unwrap().is_empty());

        add(&store, &buyer, &x).await;
        let order = store.place_order(&scope, OrderId::new(), Utc::now()).await.unwrap();
        assert_eq!(order.lines.len(), 1);
        assert!(store.cart_lines(&scope).await.unwrap().is_empty());

        let listed = store.orders(&scope).await.unwrap();
        assert_eq!(listed, vec![order]);
    }

    #[tokio::test]
    async fn remove_ignores_foreign_and_ordered_items() {
        let store = InMemoryMarketStore::new();
        let x = approved("X", 500);
        store.insert_product(x.clone()).await.unwrap();
        let a: Identity = Principal::new(UserId::new(), "a", vec![]).into();
        let b: Identity = Principal::new(UserId::new(), "b", vec![Role::artisan()]).into();
        let a_scope = CartScope::resolve(&a).unwrap();
        let b_scope = CartScope::resolve(&b).unwrap();

        let item = add(&store, &b, &x).await;
        assert!(!store.remove_cart_item(&a_scope, item).await.unwrap());

        store.place_order(&b_scope, OrderId::new(), Utc::now()).await.unwrap();
        assert!(!store.remove_cart_item(&b_scope, item).await.unwrap());
    }

    #[tokio::test]
    async fn delete_order_requires_owner_and_drops_its_items() {
        let store = InMemoryMarketStore::new();
        let x = approved("X", 500);
        store.insert_product(x.clone()).await.unwrap();
        let owner = Principal::new(UserId::new(), "owner", vec![]);
        let buyer: Identity = owner.clone().into();
        let scope = CartScope::resolve(&buyer).unwrap();
        add(&store, &buyer, &x).await;
        let order = store.place_order(&scope, OrderId::new(), Utc::now()).await.unwrap();

        assert!(!store.delete_order(UserId::new(), order.id).await.unwrap());
        assert!(store.delete_order(owner.user_id, order.id).await.unwrap());
        assert!(store.orders(&scope).await.unwrap().is_empty());
        assert!(store.read().unwrap().cart_items.is_empty());
    }
}
