use serde::Deserialize;
use serde_json::{Value, json};

use market_cart::{CartLine, CartSummary};
use market_orders::Order;
use market_products::ProductListing;

// -------------------------
// Request DTOs
// -------------------------

/// A price given either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(serde_json::Number),
    Text(String),
}

impl PriceInput {
    pub fn into_raw(self) -> String {
        match self {
            PriceInput::Number(n) => n.to_string(),
            PriceInput::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitProductRequest {
    pub name: Option<String>,
    pub price: Option<PriceInput>,
    #[serde(alias = "image_url")]
    pub img: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveFromCartRequest {
    pub session_id: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn listing_to_json(row: ProductListing) -> Value {
    let p = row.product;
    json!({
        "id": p.id.to_string(),
        "name": p.name,
        "price": p.price.to_f64(),
        "img": p.image_url,
        "owner": p.owner.as_ref().map(|o| o.username.clone()),
        "owned": row.owned,
        "is_approved": p.is_approved(),
        "approved_at": p.approved_at().map(|t| t.to_rfc3339()),
        "approved_by": p.approved_by().map(|u| u.username.clone()),
        "created_at": p.created_at.to_rfc3339(),
    })
}

pub fn line_to_json(line: &CartLine) -> Value {
    json!({
        "id": line.item.id.to_string(),
        "product_id": line.item.product_id.map(|id| id.to_string()),
        "name": line.name(),
        "price": line.price().to_f64(),
        "img": line.image_url(),
    })
}

pub fn cart_to_json(cart: &CartSummary) -> Value {
    json!({
        "items": cart.lines.iter().map(line_to_json).collect::<Vec<_>>(),
        "total": cart.total.to_f64(),
    })
}

pub fn order_to_json(order: &Order) -> Value {
    json!({
        "id": order.id.to_string(),
        "total": order.total.to_f64(),
        "created_at": order.created_at.to_rfc3339(),
        "items": order.lines.iter().map(line_to_json).collect::<Vec<_>>(),
    })
}
