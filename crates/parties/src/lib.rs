//! Parties domain module (suppliers and customers).
//!
//! Both kinds share one shape and are keyed by tax id; deliveries reference
//! suppliers and orders reference customers.

pub mod party;

pub use party::{ContactInfo, Party, PartyKind};
