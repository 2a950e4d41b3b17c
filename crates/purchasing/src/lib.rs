//! Purchasing domain module: deliveries (inbound stock).
//!
//! Deliveries are aggregate roots owning their line items. Every change to
//! the line set is planned here (keyed diff plus recomputed total) and then
//! committed by the store in one write.

pub mod delivery;

pub use delivery::{Delivery, DeliveryHeader, DeliveryItem, DeliveryUpdate, NewDelivery};
