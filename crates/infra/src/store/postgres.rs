//! Postgres-backed marketplace store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (foreign key violation) | `23503` | `Rejected(NotFound)` | Cart item added for a product deleted concurrently |
//! | N/A (amount above BIGINT) | N/A | `Rejected(Validation)` | Order total that does not fit the column |
//! | Database (other) | Any other | `Database` | Constraint violations, connection errors |
//! | PoolClosed | N/A | `Database` | Connection pool was closed |
//! | Decode / ColumnNotFound | N/A | `Corrupt` | Row does not match the schema |
//!
//! ## Atomicity
//!
//! Multi-row changes (order placement, order deletion, product deletion) run
//! in a single transaction. Order placement locks the live cart rows of the
//! scope with `FOR UPDATE`, so a concurrent placement for the same scope waits
//! and then sees an empty cart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use market_auth::UserRef;
use market_cart::{CartItem, CartLine, CartScope, ProductSnapshot};
use market_core::{CartItemId, DomainError, Money, OrderId, ProductId, SessionToken, UserId};
use market_orders::Order;
use market_products::{Approval, Product};

use super::r#trait::{MarketStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../migrations/0001_marketplace.sql");

const PRODUCT_SELECT: &str = r#"
    SELECT
        id,
        name,
        price_minor,
        image_url,
        owner_id,
        owner_username,
        approved_at,
        approved_by_id,
        approved_by_username,
        created_at
    FROM products
"#;

const LINE_SELECT: &str = r#"
    SELECT
        ci.id,
        ci.product_id,
        ci.product_name,
        ci.product_price_minor,
        ci.product_image_url,
        ci.user_id,
        ci.session_id,
        ci.created_at,
        ci.ordered,
        ci.order_id,
        p.id AS live_id,
        p.name AS live_name,
        p.price_minor AS live_price_minor,
        p.image_url AS live_image_url
    FROM cart_items ci
    LEFT JOIN products p ON p.id = ci.product_id
"#;

const LIVE_CART_FILTER: &str = r#"
    WHERE ci.user_id IS NOT DISTINCT FROM $1
      AND ci.session_id IS NOT DISTINCT FROM $2
      AND NOT ci.ordered
      AND ci.order_id IS NULL
"#;

const NEWEST_FIRST: &str = "ORDER BY ci.created_at DESC, ci.id DESC";

/// Postgres-backed marketplace store.
///
/// Uses the SQLx connection pool, so the store is `Send + Sync` and cheap to
/// clone.
#[derive(Debug, Clone)]
pub struct PostgresMarketStore {
    pool: Arc<PgPool>,
}

impl PostgresMarketStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` with a small pool.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the schema if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        let (approved_at, approved_by_id, approved_by_username) = match &product.approval {
            Some(a) => (
                Some(a.approved_at),
                Some(*a.approved_by.id.as_uuid()),
                Some(a.approved_by.username.as_str()),
            ),
            None => (None, None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id,
                name,
                price_minor,
                image_url,
                owner_id,
                owner_username,
                approved_at,
                approved_by_id,
                approved_by_username,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(money_to_db(product.price)?)
        .bind(&product.image_url)
        .bind(product.owner.as_ref().map(|o| *o.id.as_uuid()))
        .bind(product.owner.as_ref().map(|o| o.username.as_str()))
        .bind(approved_at)
        .bind(approved_by_id)
        .bind(approved_by_username)
        .bind(product.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("{PRODUCT_SELECT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn product_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("{PRODUCT_SELECT} WHERE name = $1 ORDER BY id LIMIT 1"))
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_by_name", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), fields(product_count = tracing::field::Empty), err)]
    async fn products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(PRODUCT_SELECT)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("products", e))?;

        Span::current().record("product_count", rows.len());
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self, approval), fields(product_id = %id), err)]
    async fn save_approval(&self, id: ProductId, approval: &Approval) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET approved_at = $2,
                approved_by_id = $3,
                approved_by_username = $4
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(approval.approved_at)
        .bind(approval.approved_by.id.as_uuid())
        .bind(&approval.approved_by.username)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_approval", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(product_id = %id, detached_items = tracing::field::Empty), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Cart items keep their snapshot and lose the product reference.
        let detached = sqlx::query("UPDATE cart_items SET product_id = NULL WHERE product_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("detach_cart_items", e))?;

        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if deleted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(false);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("detached_items", detached.rows_affected());
        Ok(true)
    }

    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn insert_cart_item(&self, item: CartItem) -> StoreResult<()> {
        let (user_id, session_id) = scope_columns(&item.scope);

        sqlx::query(
            r#"
            INSERT INTO cart_items (
                id,
                product_id,
                product_name,
                product_price_minor,
                product_image_url,
                user_id,
                session_id,
                created_at,
                ordered,
                order_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.product_id.map(|id| *id.as_uuid()))
        .bind(item.snapshot.name.as_deref())
        .bind(item.snapshot.price.map(money_to_db).transpose()?)
        .bind(item.snapshot.image_url.as_deref())
        .bind(user_id)
        .bind(session_id)
        .bind(item.created_at)
        .bind(item.ordered)
        .bind(item.order_id.map(|id| *id.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::Rejected(DomainError::not_found("Product not found"))
            } else {
                map_sqlx_error("insert_cart_item", e)
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn cart_lines(&self, scope: &CartScope) -> StoreResult<Vec<CartLine>> {
        let (user_id, session_id) = scope_columns(scope);

        let rows = sqlx::query(&format!("{LINE_SELECT} {LIVE_CART_FILTER} {NEWEST_FIRST}"))
            .bind(user_id)
            .bind(session_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("cart_lines", e))?;

        rows.iter().map(line_from_row).collect()
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn remove_cart_item(&self, scope: &CartScope, id: CartItemId) -> StoreResult<bool> {
        let (user_id, session_id) = scope_columns(scope);

        let result = sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE id = $3
              AND user_id IS NOT DISTINCT FROM $1
              AND session_id IS NOT DISTINCT FROM $2
              AND NOT ordered
              AND order_id IS NULL
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_cart_item", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(order_id = %order_id, item_count = tracing::field::Empty), err)]
    async fn place_order(
        &self,
        scope: &CartScope,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> StoreResult<Order> {
        let (user_id, session_id) = scope_columns(scope);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let rows = sqlx::query(&format!(
            "{LINE_SELECT} {LIVE_CART_FILTER} {NEWEST_FIRST} FOR UPDATE OF ci"
        ))
        .bind(user_id)
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_cart", e))?;

        let cart = rows.iter().map(line_from_row).collect::<StoreResult<Vec<_>>>()?;
        let order = match Order::place(order_id, scope.clone(), cart, at) {
            Ok(order) => order,
            Err(rejected) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(rejected.into());
            }
        };

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, session_id, total_minor, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(user_id)
        .bind(session_id)
        .bind(money_to_db(order.total)?)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        let item_ids: Vec<Uuid> = order.item_ids().iter().map(|id| *id.as_uuid()).collect();
        let moved = sqlx::query("UPDATE cart_items SET ordered = TRUE, order_id = $1 WHERE id = ANY($2)")
            .bind(order.id.as_uuid())
            .bind(&item_ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("assign_cart_items", e))?;

        if moved.rows_affected() != item_ids.len() as u64 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Database(format!(
                "order placement moved {} of {} cart items",
                moved.rows_affected(),
                item_ids.len()
            )));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("item_count", item_ids.len());
        Ok(order)
    }

    #[instrument(skip(self), err)]
    async fn orders(&self, scope: &CartScope) -> StoreResult<Vec<Order>> {
        let (user_id, session_id) = scope_columns(scope);

        let order_rows = sqlx::query(
            r#"
            SELECT id, user_id, session_id, total_minor, created_at
            FROM orders
            WHERE user_id IS NOT DISTINCT FROM $1
              AND session_id IS NOT DISTINCT FROM $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders", e))?;

        if order_rows.is_empty() {
            return Ok(vec![]);
        }

        let order_ids: Vec<Uuid> = order_rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_order_ids", e))?;

        let line_rows = sqlx::query(&format!("{LINE_SELECT} WHERE ci.order_id = ANY($1) {NEWEST_FIRST}"))
            .bind(&order_ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("order_lines", e))?;

        let mut lines_by_order: HashMap<OrderId, Vec<CartLine>> = HashMap::new();
        for row in &line_rows {
            let line = line_from_row(row)?;
            if let Some(order_id) = line.item.order_id {
                lines_by_order.entry(order_id).or_default().push(line);
            }
        }

        order_rows
            .iter()
            .map(|row| {
                let id = OrderId::from_uuid(get(row, "id")?);
                Ok(Order {
                    id,
                    scope: scope_from_row(row, "user_id", "session_id")?,
                    total: money_from_db("total_minor", get(row, "total_minor")?)?,
                    created_at: get(row, "created_at")?,
                    lines: lines_by_order.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete_order(&self, owner: UserId, id: OrderId) -> StoreResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let owned = sqlx::query("SELECT id FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id.as_uuid())
            .bind(owner.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_order", e))?;

        if owned.is_none() {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(false);
        }

        // Order lines are removed with the order, not archived.
        sqlx::query("DELETE FROM cart_items WHERE order_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order_items", e))?;

        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(true)
    }
}

fn scope_columns(scope: &CartScope) -> (Option<Uuid>, Option<&str>) {
    (
        scope.user_id().map(Uuid::from),
        scope.session().map(SessionToken::as_str),
    )
}

fn money_to_db(amount: Money) -> StoreResult<i64> {
    i64::try_from(amount.minor())
        .map_err(|_| StoreError::Rejected(DomainError::validation("Amount is too large")))
}

fn money_from_db(column: &str, minor: i64) -> StoreResult<Money> {
    u64::try_from(minor)
        .map(Money::from_minor)
        .map_err(|_| StoreError::Corrupt(format!("negative {column}: {minor}")))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Corrupt(format!("column {column}: {e}")))
}

fn scope_from_row(row: &PgRow, user_col: &str, session_col: &str) -> StoreResult<CartScope> {
    let user_id: Option<Uuid> = get(row, user_col)?;
    let session_id: Option<String> = get(row, session_col)?;
    match (user_id, session_id) {
        (Some(user_id), None) => Ok(CartScope::User(UserId::from_uuid(user_id))),
        (None, Some(token)) => SessionToken::parse(&token)
            .map(CartScope::Session)
            .map_err(|e| StoreError::Corrupt(format!("session token: {e}"))),
        _ => Err(StoreError::Corrupt(
            "row must carry exactly one of user_id and session_id".to_string(),
        )),
    }
}

fn user_ref(id: Option<Uuid>, username: Option<String>, what: &str) -> StoreResult<Option<UserRef>> {
    match (id, username) {
        (Some(id), Some(username)) => Ok(Some(UserRef {
            id: UserId::from_uuid(id),
            username,
        })),
        (None, None) => Ok(None),
        _ => Err(StoreError::Corrupt(format!("incomplete {what} reference"))),
    }
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let owner = user_ref(get(row, "owner_id")?, get(row, "owner_username")?, "owner")?;
    let approved_by = user_ref(
        get(row, "approved_by_id")?,
        get(row, "approved_by_username")?,
        "approver",
    )?;
    let approved_at: Option<DateTime<Utc>> = get(row, "approved_at")?;
    let approval = match (approved_at, approved_by) {
        (Some(approved_at), Some(approved_by)) => Some(Approval {
            approved_at,
            approved_by,
        }),
        (None, None) => None,
        _ => return Err(StoreError::Corrupt("incomplete approval metadata".to_string())),
    };

    Ok(Product {
        id: ProductId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        price: money_from_db("price_minor", get(row, "price_minor")?)?,
        image_url: get(row, "image_url")?,
        owner,
        approval,
        created_at: get(row, "created_at")?,
    })
}

fn line_from_row(row: &PgRow) -> StoreResult<CartLine> {
    let snapshot_price: Option<i64> = get(row, "product_price_minor")?;
    let item = CartItem {
        id: CartItemId::from_uuid(get(row, "id")?),
        product_id: get::<Option<Uuid>>(row, "product_id")?.map(ProductId::from_uuid),
        snapshot: ProductSnapshot {
            name: get(row, "product_name")?,
            price: snapshot_price
                .map(|minor| money_from_db("product_price_minor", minor))
                .transpose()?,
            image_url: get(row, "product_image_url")?,
        },
        scope: scope_from_row(row, "user_id", "session_id")?,
        created_at: get(row, "created_at")?,
        ordered: get(row, "ordered")?,
        order_id: get::<Option<Uuid>>(row, "order_id")?.map(OrderId::from_uuid),
    };

    let live = match get::<Option<Uuid>>(row, "live_id")? {
        Some(_) => {
            let live_price: i64 = get(row, "live_price_minor")?;
            Some(ProductSnapshot {
                name: get(row, "live_name")?,
                price: Some(money_from_db("live_price_minor", live_price)?),
                image_url: get(row, "live_image_url")?,
            })
        }
        None => None,
    };

    Ok(CartLine::new(item, live))
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            StoreError::Database(format!(
                "database error in {operation} ({code}): {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("failed to decode row in {operation}: {err}"))
        }
        _ => StoreError::Database(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a foreign key violation.
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}
