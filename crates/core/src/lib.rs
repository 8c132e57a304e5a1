//! `market-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CartItemId, OrderId, ProductId, SessionToken, UserId};
pub use value_object::{Money, ValueObject};
