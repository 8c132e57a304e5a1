//! Product catalog domain module.
//!
//! This crate contains business rules for the catalog: artisan submission,
//! admin approval, owner/admin deletion and per-viewer visibility. It is pure
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;

pub use product::{
    Approval, Product, ProductListing, SubmitProduct, authorize_approval, authorize_submission,
    catalog_for,
};
