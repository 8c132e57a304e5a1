//! Cart domain module.
//!
//! Carts are scoped to an identity: an authenticated user or a guest session
//! token. Items carry a snapshot of the product taken when they were added, so
//! carts and orders keep displaying correctly after the product changes or is
//! deleted.

pub mod cart;

pub use cart::{
    CartItem, CartLine, CartScope, CartSummary, ProductSnapshot, sort_newest_first, total_of,
};
