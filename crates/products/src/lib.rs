//! Product catalog domain module.
//!
//! Business rules for catalog entries, implemented as deterministic domain
//! logic (no IO, no HTTP, no storage). Current stock is never part of a
//! product; it is derived by `stockyard-inventory`.

pub mod category;
pub mod product;

pub use category::{ProductCategory, ProductUnit};
pub use product::Product;
