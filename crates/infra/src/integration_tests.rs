//! Integration tests for the marketplace service over the in-memory store.
//!
//! Tests: identity → Marketplace → MarketStore → listings
//!
//! Verifies:
//! - The approval workflow controls catalog visibility
//! - Carts are isolated per scope and orders drain them atomically
//! - Snapshots keep cart and order lines readable after product deletion

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use market_auth::{Identity, Principal, Role};
    use market_core::{CartItemId, Money, OrderId, ProductId, SessionToken, UserId};

    use crate::marketplace::{MarketError, Marketplace, NewProduct};
    use crate::seed::seed_catalog;
    use crate::store::{InMemoryMarketStore, MarketStore};

    fn market() -> Marketplace<InMemoryMarketStore> {
        Marketplace::new(InMemoryMarketStore::new())
    }

    fn artisan(name: &str) -> Identity {
        Principal::new(UserId::new(), name, vec![Role::artisan()]).into()
    }

    fn admin() -> Identity {
        Principal::new(UserId::new(), "root", vec![Role::admin()]).into()
    }

    fn user(name: &str) -> Identity {
        Principal::new(UserId::new(), name, vec![]).into()
    }

    fn guest(token: &str) -> Identity {
        Identity::guest(Some(SessionToken::parse(token).unwrap()))
    }

    fn input(name: &str, price: &str) -> NewProduct {
        NewProduct {
            name: Some(name.to_string()),
            price: Some(price.to_string()),
            image_url: Some(format!("https://img/{}.jpg", name.replace(' ', "-"))),
        }
    }

    async fn approved(market: &Marketplace<InMemoryMarketStore>, name: &str, price: &str) -> ProductId {
        market.submit_product(&admin(), input(name, price)).await.unwrap().id
    }

    #[tokio::test]
    async fn artisan_submission_becomes_public_after_approval() {
        let market = market();
        let meera = artisan("meera");
        let boss = admin();

        let pot = market.submit_product(&meera, input("Clay Pot", "700")).await.unwrap();
        assert!(!pot.is_approved());
        assert_eq!(pot.submission_message(), "Product submitted for approval");

        let anonymous = market.list_products(&Identity::anonymous()).await.unwrap();
        assert!(anonymous.is_empty());
        let own = market.list_products(&meera).await.unwrap();
        assert_eq!(own.len(), 1);
        assert!(own[0].owned);

        let approved = market.approve_product(&boss, pot.id).await.unwrap();
        assert!(approved.is_approved());
        assert_eq!(approved.approved_by().unwrap().username, "root");
        assert!(approved.approved_at().is_some());

        let anonymous = market.list_products(&Identity::anonymous()).await.unwrap();
        assert_eq!(anonymous.len(), 1);
        assert_eq!(anonymous[0].product.name, "Clay Pot");
        assert!(!anonymous[0].owned);
    }

    #[tokio::test]
    async fn submission_and_approval_checks() {
        let market = market();

        let err = market
            .submit_product(&Identity::anonymous(), NewProduct::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Authentication(_)));

        let err = market.submit_product(&user("kiran"), input("Pot", "10")).await.unwrap_err();
        assert!(matches!(err, MarketError::Permission(_)));

        let err = market.submit_product(&artisan("meera"), input("Pot", "0")).await.unwrap_err();
        assert_eq!(err, MarketError::Validation("Price must be greater than zero".to_string()));

        let admin_made = market.submit_product(&admin(), input("Shawl", "1600")).await.unwrap();
        assert!(admin_made.is_approved());
        assert_eq!(admin_made.submission_message(), "Product added successfully");

        let err = market.approve_product(&artisan("meera"), admin_made.id).await.unwrap_err();
        assert!(matches!(err, MarketError::Permission(_)));

        let err = market.approve_product(&admin(), ProductId::new()).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[tokio::test]
    async fn only_owner_or_admin_deletes_products() {
        let market = market();
        let meera = artisan("meera");
        let pot = market.submit_product(&meera, input("Clay Pot", "700")).await.unwrap();

        let err = market.delete_product(&guest("abc"), pot.id).await.unwrap_err();
        assert!(matches!(err, MarketError::Authentication(_)));

        let err = market.delete_product(&artisan("other"), pot.id).await.unwrap_err();
        assert_eq!(err, MarketError::Permission("You can't delete this item".to_string()));

        let err = market.delete_product(&meera, ProductId::new()).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));

        market.delete_product(&meera, pot.id).await.unwrap();
        assert!(market.list_products(&admin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unapproved_products_are_carted_only_by_admins() {
        let market = market();
        let pending = market.submit_product(&artisan("meera"), input("Pending", "10")).await.unwrap();

        let err = market.add_to_cart(&guest("abc"), pending.id).await.unwrap_err();
        assert!(matches!(err, MarketError::Permission(_)));
        assert!(market.cart(&guest("abc")).await.unwrap().is_empty());

        let boss = admin();
        market.add_to_cart(&boss, pending.id).await.unwrap();
        assert_eq!(market.cart(&boss).await.unwrap().lines.len(), 1);

        let err = market.add_to_cart(&guest("abc"), ProductId::new()).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[tokio::test]
    async fn guest_cart_is_ordered_and_emptied() {
        let market = market();
        let x = approved(&market, "X", "500").await;
        let y = approved(&market, "Y", "300").await;
        let abc = guest("abc");

        market.add_to_cart(&abc, x).await.unwrap();
        market.add_to_cart(&abc, y).await.unwrap();

        let cart = market.cart(&abc).await.unwrap();
        assert_eq!(cart.total.to_string(), "800.00");

        let order = market.place_order(&abc).await.unwrap();
        assert_eq!(order.total, Money::from_major(800));
        assert_eq!(order.lines.len(), 2);
        assert!(market.cart(&abc).await.unwrap().is_empty());

        let orders = market.orders(&abc).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, order.id);

        assert!(market.orders(&guest("xyz")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn guests_without_a_session_token_are_rejected() {
        let market = market();
        let x = approved(&market, "X", "500").await;
        let nobody = Identity::anonymous();

        for err in [
            market.add_to_cart(&nobody, x).await.unwrap_err(),
            market.cart(&nobody).await.unwrap_err(),
            market.remove_from_cart(&nobody, CartItemId::new()).await.unwrap_err(),
            market.place_order(&nobody).await.unwrap_err(),
        ] {
            assert_eq!(
                err,
                MarketError::Validation("Session ID is required for guest users".to_string())
            );
        }
    }

    #[tokio::test]
    async fn cross_scope_removal_is_not_found() {
        let market = market();
        let x = approved(&market, "X", "500").await;
        let a = user("a");
        let b = user("b");

        let item = market.add_to_cart(&b, x).await.unwrap();

        let err = market.remove_from_cart(&a, item.id).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
        assert_eq!(market.cart(&b).await.unwrap().lines.len(), 1);

        market.remove_from_cart(&b, item.id).await.unwrap();
        assert!(market.cart(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_cart_creates_no_order() {
        let market = market();
        let kiran = user("kiran");

        let err = market.place_order(&kiran).await.unwrap_err();
        assert_eq!(err, MarketError::Validation("Cart is empty".to_string()));
        assert!(market.orders(&kiran).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn product_deletion_keeps_cart_and_order_lines_readable() {
        let market = market();
        let meera = artisan("meera");
        let boss = admin();
        let pot = market.submit_product(&meera, input("Clay Pot", "700")).await.unwrap();
        market.approve_product(&boss, pot.id).await.unwrap();

        let abc = guest("abc");
        market.add_to_cart(&abc, pot.id).await.unwrap();
        let kiran = user("kiran");
        market.add_to_cart(&kiran, pot.id).await.unwrap();
        market.place_order(&kiran).await.unwrap();

        market.delete_product(&meera, pot.id).await.unwrap();

        let cart = market.cart(&abc).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].item.product_id, None);
        assert_eq!(cart.lines[0].name(), Some("Clay Pot"));
        assert_eq!(cart.total, Money::from_major(700));

        let orders = market.orders(&kiran).await.unwrap();
        assert_eq!(orders[0].lines[0].name(), Some("Clay Pot"));
        assert_eq!(orders[0].total, Money::from_major(700));
    }

    #[tokio::test]
    async fn order_deletion_requires_the_owner() {
        let market = market();
        let x = approved(&market, "X", "500").await;
        let kiran = user("kiran");
        market.add_to_cart(&kiran, x).await.unwrap();
        let order = market.place_order(&kiran).await.unwrap();

        let err = market.delete_order(&guest("abc"), order.id).await.unwrap_err();
        assert!(matches!(err, MarketError::Authentication(_)));

        let err = market.delete_order(&user("other"), order.id).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));

        let err = market.delete_order(&kiran, OrderId::new()).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));

        market.delete_order(&kiran, order.id).await.unwrap();
        assert!(market.orders(&kiran).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeded_catalog_can_be_bought_by_guests() {
        let market = market();
        assert_eq!(seed_catalog(market.store(), Utc::now()).await.unwrap(), 8);

        let basket = market
            .store()
            .product_by_name("Handwoven Bamboo Basket")
            .await
            .unwrap()
            .unwrap();
        let abc = guest("abc");
        market.add_to_cart(&abc, basket.id).await.unwrap();
        assert_eq!(market.cart(&abc).await.unwrap().total.to_string(), "850.00");
    }

    #[tokio::test]
    async fn identity_check_reports_roles() {
        let market = market();
        let check = market.check_identity(&artisan("meera"));
        assert!(check.authenticated);
        assert!(check.is_artisan);
        assert!(!check.is_admin);
        assert_eq!(check.username.as_deref(), Some("meera"));

        let check = market.check_identity(&guest("abc"));
        assert!(!check.authenticated);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 32,
                ..ProptestConfig::default()
            })]

            /// Property: after N adds and M removals the cart holds N - M items of its own scope.
            #[test]
            fn adds_minus_removals(adds in 1usize..12, removal_seed in any::<u64>()) {
                let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
                runtime.block_on(async {
                    let market = market();
                    let x = approved(&market, "X", "500").await;
                    let mine = guest("mine");
                    let theirs = guest("theirs");

                    let mut ids = Vec::new();
                    for _ in 0..adds {
                        ids.push(market.add_to_cart(&mine, x).await.unwrap().id);
                        market.add_to_cart(&theirs, x).await.unwrap();
                    }
                    let removals = (removal_seed as usize) % (adds + 1);
                    for id in ids.iter().take(removals) {
                        market.remove_from_cart(&mine, *id).await.unwrap();
                    }

                    let cart = market.cart(&mine).await.unwrap();
                    assert_eq!(cart.lines.len(), adds - removals);
                    assert!(cart.lines.iter().all(|l| ids.contains(&l.item.id)));
                    assert_eq!(market.cart(&theirs).await.unwrap().lines.len(), adds);
                });
            }
        }
    }
}
