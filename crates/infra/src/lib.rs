//! Infrastructure layer: entity storage (in-memory and Postgres) and
//! service settings.

pub mod settings;
pub mod store;

pub use settings::Settings;
pub use store::{
    EntityCounts, InMemoryWarehouseStore, PostgresWarehouseStore, SharedStore, StoreError,
    StoreResult, WarehouseStore,
};
