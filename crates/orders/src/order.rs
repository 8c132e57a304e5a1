use chrono::{DateTime, Utc};

use market_auth::Identity;
use market_cart::{CartLine, CartScope, sort_newest_first, total_of};
use market_core::{CartItemId, DomainError, Entity, Money, OrderId, UserId};

/// A placed order. Immutable after placement; it can only be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    /// Same scope as the cart it was built from.
    pub scope: CartScope,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    /// The cart items owned by this order.
    pub lines: Vec<CartLine>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Order {
    /// Build an order from the live cart of `scope`.
    ///
    /// `cart` must be exactly the scope's live items, read under the same lock
    /// or transaction the caller uses to persist the result. Every item is
    /// reassigned to the new order. The total uses the same snapshot-first
    /// pricing as the cart view, so the amount shown in the cart is the amount
    /// ordered.
    pub fn place(
        id: OrderId,
        scope: CartScope,
        cart: Vec<CartLine>,
        at: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        if cart.is_empty() {
            return Err(DomainError::validation("Cart is empty"));
        }
        if let Some(stray) = cart.iter().find(|l| !l.item.is_in_cart_of(&scope)) {
            return Err(DomainError::invariant(format!(
                "cart item {} is not in the live cart of this scope",
                stray.item.id
            )));
        }

        let total = total_of(&cart)?;
        let mut lines = cart;
        for line in &mut lines {
            line.item.assign_to(id);
        }
        sort_newest_first(&mut lines);

        Ok(Order {
            id,
            scope,
            total,
            created_at: at,
            lines,
        })
    }

    pub fn item_ids(&self) -> Vec<CartItemId> {
        self.lines.iter().map(|l| l.item.id).collect()
    }
}

/// Only logged-in users can delete orders, and only their own.
///
/// Returns the user whose orders may be deleted.
pub fn authorize_order_deletion(actor: &Identity) -> Result<UserId, DomainError> {
    actor
        .user_id()
        .ok_or_else(|| DomainError::authentication("Authentication required to delete orders"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_auth::{Principal, Role};
    use market_cart::{CartItem, ProductSnapshot};
    use market_core::{ProductId, SessionToken};
    use market_products::{Product, SubmitProduct, authorize_approval};

    fn approved_product(name: &str, price: &str) -> Product {
        let artisan: Identity = Principal::new(UserId::new(), "meera", vec![Role::artisan()]).into();
        let admin: Identity = Principal::new(UserId::new(), "root", vec![Role::admin()]).into();
        let mut p = Product::submit(
            &artisan,
            SubmitProduct {
                product_id: ProductId::new(),
                name: Some(name.to_string()),
                price: Some(price.to_string()),
                image_url: Some("https://img".to_string()),
                occurred_at: Utc::now(),
            },
        )
        .unwrap();
        p.approve(authorize_approval(&admin).unwrap(), Utc::now());
        p
    }

    fn guest(token: &str) -> Identity {
        Identity::guest(Some(SessionToken::parse(token).unwrap()))
    }

    fn cart_of(buyer: &Identity, products: &[Product]) -> (CartScope, Vec<CartLine>) {
        let scope = CartScope::resolve(buyer).unwrap();
        let lines = products
            .iter()
            .map(|p| {
                let item = CartItem::add(CartItemId::new(), scope.clone(), buyer, p, Utc::now()).unwrap();
                CartLine::new(item, Some(ProductSnapshot::of(p)))
            })
            .collect();
        (scope, lines)
    }

    #[test]
    fn place_moves_every_item_under_the_order() {
        let buyer = guest("abc");
        let (scope, lines) = cart_of(
            &buyer,
            &[approved_product("X", "500"), approved_product("Y", "300")],
        );
        let order_id = OrderId::new();

        let order = Order::place(order_id, scope.clone(), lines, Utc::now()).unwrap();

        assert_eq!(order.total, Money::from_major(800));
        assert_eq!(order.scope, scope);
        assert_eq!(order.lines.len(), 2);
        for line in &order.lines {
            assert!(line.item.ordered);
            assert_eq!(line.item.order_id, Some(order_id));
            assert!(!line.item.is_in_cart_of(&scope));
        }
    }

    #[test]
    fn empty_cart_cannot_be_placed() {
        let buyer = guest("abc");
        let scope = CartScope::resolve(&buyer).unwrap();
        let err = Order::place(OrderId::new(), scope, vec![], Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("Cart is empty"));
    }

    #[test]
    fn foreign_items_are_rejected() {
        let (_, lines) = cart_of(&guest("abc"), &[approved_product("X", "500")]);
        let other = CartScope::resolve(&guest("zzz")).unwrap();
        let err = Order::place(OrderId::new(), other, lines, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn total_uses_snapshot_price_not_live_price() {
        let buyer = guest("abc");
        let mut p = approved_product("X", "500");
        let (scope, lines) = cart_of(&buyer, std::slice::from_ref(&p));

        p.price = Money::from_major(999);
        let lines = lines
            .into_iter()
            .map(|l| CartLine::new(l.item, Some(ProductSnapshot::of(&p))))
            .collect();

        let order = Order::place(OrderId::new(), scope, lines, Utc::now()).unwrap();
        assert_eq!(order.total, Money::from_major(500));
    }

    #[test]
    fn deletion_requires_login() {
        assert!(matches!(
            authorize_order_deletion(&guest("abc")),
            Err(DomainError::Authentication(_))
        ));
        let user = Principal::new(UserId::new(), "kiran", vec![]);
        assert_eq!(authorize_order_deletion(&user.clone().into()), Ok(user.user_id));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: placement keeps every line and totals them.
            #[test]
            fn placement_preserves_lines_and_total(prices in proptest::collection::vec(1u64..1_000_000, 1..20)) {
                let buyer = guest("prop");
                let products: Vec<Product> = prices
                    .iter()
                    .map(|m| approved_product("P", &Money::from_minor(*m).to_string()))
                    .collect();
                let (scope, lines) = cart_of(&buyer, &products);
                let before = lines.len();

                let order = Order::place(OrderId::new(), scope, lines, Utc::now()).unwrap();
                prop_assert_eq!(order.lines.len(), before);
                prop_assert_eq!(order.total.minor(), prices.iter().sum::<u64>());
                prop_assert!(order.lines.iter().all(|l| !l.item.is_live()));
            }
        }
    }
}
