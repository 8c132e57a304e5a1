//! Orders domain module.
//!
//! An order is built from the live cart of a scope: the cart's items are moved
//! under the order (not copied), which empties the cart in the same step.

pub mod order;

pub use order::{Order, authorize_order_deletion};
