//! Entity services: the operations behind every route.
//!
//! Each operation takes the request's `Principal` explicitly, authorizes
//! it before touching storage, then works against the `WarehouseStore`.
//! Derived values (totals, final prices, stock) are computed here through the
//! domain crates; client-supplied derived values are never trusted.

mod accounts;
mod catalog;
mod deliveries;
mod insights;
mod orders;
mod parties;

use std::collections::BTreeMap;
use std::sync::Arc;

use stockyard_auth::Hs256Jwt;
use stockyard_core::{Barcode, TaxId};
use stockyard_infra::{InMemoryWarehouseStore, SharedStore};
use stockyard_parties::PartyKind;
use stockyard_products::Product;

use crate::app::dto::Names;
use crate::app::errors::{ApiError, ApiResult};

pub struct AppServices {
    store: SharedStore,
    jwt: Arc<Hs256Jwt>,
}

impl AppServices {
    pub fn new(store: SharedStore, jwt: Arc<Hs256Jwt>) -> Self {
        Self { store, jwt }
    }

    /// Services over a fresh in-memory store (dev/test).
    pub fn in_memory(jwt: Arc<Hs256Jwt>) -> Self {
        Self::new(Arc::new(InMemoryWarehouseStore::new()), jwt)
    }

    pub fn jwt(&self) -> Arc<Hs256Jwt> {
        self.jwt.clone()
    }

    /// All products keyed by barcode.
    async fn catalog(&self) -> ApiResult<BTreeMap<Barcode, Product>> {
        Ok(self
            .store
            .list_products()
            .await?
            .into_iter()
            .map(|p| (p.barcode.clone(), p))
            .collect())
    }

    async fn names(&self, catalog: &BTreeMap<Barcode, Product>, kind: PartyKind) -> ApiResult<Names> {
        let parties = self.store.list_parties(kind).await?;
        Ok(Names::new(catalog.values(), &parties))
    }

    /// Referenced parties must exist before a header is written.
    async fn ensure_party(&self, kind: PartyKind, tax_id: &TaxId) -> ApiResult<()> {
        match self.store.get_party(kind, tax_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::Validation(format!("unknown {kind} {tax_id}"))),
        }
    }
}
