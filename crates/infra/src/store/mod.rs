//! Entity store: durable state for the catalog, parties, headers with their
//! line items, and user accounts.
//!
//! Two implementations share one contract:
//! - [`InMemoryWarehouseStore`] for tests and local development
//! - [`PostgresWarehouseStore`] for production (sqlx, one transaction per write)
//!
//! Derived values (totals, final prices) are computed by the domain crates
//! before they reach the store; the store persists them together with the
//! line changes they belong to, or not at all.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryWarehouseStore;
pub use postgres::PostgresWarehouseStore;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use stockyard_auth::{Role, User};
use stockyard_core::{Barcode, DeliveryId, OrderId, TaxId, UserId};
use stockyard_inventory::StockLedger;
use stockyard_parties::{Party, PartyKind};
use stockyard_products::Product;
use stockyard_purchasing::{Delivery, DeliveryUpdate, NewDelivery};
use stockyard_sales::{NewOrder, Order, OrderUpdate};

/// Entity store operation error.
///
/// These are infrastructure errors; domain validation happens before a
/// call reaches the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate key or stale header version.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Delete refused because other rows still reference the target.
    #[error("{0} is still referenced")]
    InUse(String),

    /// Write refused because a referenced row does not exist.
    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub products: i64,
    pub orders: i64,
    pub deliveries: i64,
    pub customers: i64,
    pub suppliers: i64,
}

/// Storage contract used by the entity services.
#[async_trait::async_trait]
pub trait WarehouseStore: Send + Sync {
    // Products

    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    async fn get_product(&self, barcode: &Barcode) -> StoreResult<Option<Product>>;

    /// Fails with `Conflict` if the barcode is taken.
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;

    async fn update_product(&self, product: &Product) -> StoreResult<()>;

    /// Fails with `InUse` while any delivery or order line references it.
    async fn delete_product(&self, barcode: &Barcode) -> StoreResult<()>;

    // Suppliers and customers

    async fn list_parties(&self, kind: PartyKind) -> StoreResult<Vec<Party>>;

    async fn get_party(&self, kind: PartyKind, tax_id: &TaxId) -> StoreResult<Option<Party>>;

    async fn insert_party(&self, party: &Party) -> StoreResult<()>;

    async fn update_party(&self, party: &Party) -> StoreResult<()>;

    /// Fails with `InUse` while any delivery (supplier) or order (customer)
    /// references it.
    async fn delete_party(&self, kind: PartyKind, tax_id: &TaxId) -> StoreResult<()>;

    // Deliveries

    async fn list_deliveries(&self) -> StoreResult<Vec<Delivery>>;

    async fn get_delivery(&self, id: DeliveryId) -> StoreResult<Option<Delivery>>;

    /// Insert header and items together; the new delivery starts at version 1.
    async fn insert_delivery(&self, delivery: &NewDelivery) -> StoreResult<Delivery>;

    /// Apply header fields, line changes and the new total in one write.
    ///
    /// Fails with `Conflict` if the stored version is no longer
    /// `update.base_version`; nothing is written in that case. The returned
    /// delivery reflects what was stored.
    async fn apply_delivery_update(&self, update: &DeliveryUpdate) -> StoreResult<Delivery>;

    /// Delete the header; its items go with it.
    async fn delete_delivery(&self, id: DeliveryId) -> StoreResult<()>;

    // Orders

    async fn list_orders(&self) -> StoreResult<Vec<Order>>;

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    async fn insert_order(&self, order: &NewOrder) -> StoreResult<Order>;

    /// Same contract as [`WarehouseStore::apply_delivery_update`].
    async fn apply_order_update(&self, update: &OrderUpdate) -> StoreResult<Order>;

    async fn delete_order(&self, id: OrderId) -> StoreResult<()>;

    // Stock

    /// Every delivery and order line with its header status. With `barcode`
    /// set, only lines for that product.
    async fn stock_ledger(&self, barcode: Option<&Barcode>) -> StoreResult<StockLedger>;

    async fn counts(&self) -> StoreResult<EntityCounts>;

    // Users

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Fails with `Conflict` if the username is taken.
    async fn insert_user(&self, username: &str, password_hash: &str, role: Role) -> StoreResult<User>;

    async fn update_user(&self, user: &User) -> StoreResult<()>;

    async fn delete_user(&self, id: UserId) -> StoreResult<()>;

    async fn count_users(&self) -> StoreResult<i64>;
}

/// Shared handle used by the API layer.
pub type SharedStore = Arc<dyn WarehouseStore>;
