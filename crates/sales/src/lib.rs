//! Sales domain module: customer orders (outbound stock).
//!
//! Order lines capture the product price when they are added and derive
//! their final price from quantity and markup; the order total is the sum
//! of final prices.

pub mod order;

pub use order::{NewOrder, Order, OrderHeader, OrderItem, OrderLineInput, OrderUpdate};
