use stockyard_auth::Principal;
use stockyard_auth::permissions::{DELIVERIES_DELETE, DELIVERIES_READ, DELIVERIES_WRITE};
use stockyard_core::{Barcode, DeliveryId, ExpectedVersion};
use stockyard_parties::PartyKind;
use stockyard_purchasing::{Delivery, DeliveryHeader, NewDelivery};

use super::AppServices;
use crate::app::dto::{DeliveryRequest, DeliveryView};
use crate::app::errors::{ApiError, ApiResult};
use crate::authz::require;

impl AppServices {
    pub async fn list_deliveries(&self, principal: &Principal) -> ApiResult<Vec<DeliveryView>> {
        require(principal, &DELIVERIES_READ)?;

        let catalog = self.catalog().await?;
        let names = self.names(&catalog, PartyKind::Supplier).await?;
        let deliveries = self.store.list_deliveries().await?;
        deliveries
            .into_iter()
            .map(|d| DeliveryView::build(d, &names).map_err(ApiError::from))
            .collect()
    }

    pub async fn get_delivery(&self, principal: &Principal, id: &str) -> ApiResult<DeliveryView> {
        require(principal, &DELIVERIES_READ)?;
        let id: DeliveryId = id.parse()?;

        let delivery = self.load_delivery(id).await?;
        let catalog = self.catalog().await?;
        let names = self.names(&catalog, PartyKind::Supplier).await?;
        Ok(DeliveryView::build(delivery, &names)?)
    }

    /// Insert a delivery with its initial items; the total is computed here.
    pub async fn create_delivery(
        &self,
        principal: &Principal,
        req: DeliveryRequest,
    ) -> ApiResult<DeliveryView> {
        require(principal, &DELIVERIES_WRITE)?;

        self.ensure_party(PartyKind::Supplier, &req.supplier_tax_id).await?;
        let catalog = self.catalog().await?;

        let header = DeliveryHeader {
            supplier: req.supplier_tax_id,
            status: req.status.unwrap_or_default(),
            delivery_date: req.delivery_date,
        };
        let planned = NewDelivery::plan(header, req.items, |b| catalog.contains_key(b))?;
        let delivery = self.store.insert_delivery(&planned).await?;

        tracing::info!(
            delivery_id = %delivery.id,
            items = delivery.items.len(),
            total = %delivery.total_amount,
            user = %principal.username,
            "delivery created"
        );
        let names = self.names(&catalog, PartyKind::Supplier).await?;
        Ok(DeliveryView::build(delivery, &names)?)
    }

    /// Reconcile the stored delivery against the submitted header and item list.
    ///
    /// Omitted status or date keep their stored values. A submitted
    /// `version` must match the stored one. With or without it, the write is
    /// refused with a conflict if the delivery changed after it was read.
    pub async fn update_delivery(
        &self,
        principal: &Principal,
        id: &str,
        req: DeliveryRequest,
    ) -> ApiResult<DeliveryView> {
        require(principal, &DELIVERIES_WRITE)?;
        let id: DeliveryId = id.parse()?;

        if req.id.is_some_and(|body_id| body_id != id) {
            return Err(ApiError::Validation("id in body does not match path".into()));
        }
        let current = self.load_delivery(id).await?;
        self.ensure_party(PartyKind::Supplier, &req.supplier_tax_id).await?;
        let catalog = self.catalog().await?;

        let header = DeliveryHeader {
            supplier: req.supplier_tax_id,
            status: req.status.unwrap_or(current.header.status),
            delivery_date: req.delivery_date.or(current.header.delivery_date),
        };
        let update = current.plan_update(
            header,
            req.items,
            ExpectedVersion::from_option(req.version),
            |b| catalog.contains_key(b),
        )?;
        let (deleted, updated, inserted) = (
            update.changes.to_delete.len(),
            update.changes.to_update.len(),
            update.changes.to_insert.len(),
        );
        let delivery = self.store.apply_delivery_update(&update).await?;

        tracing::info!(
            delivery_id = %delivery.id,
            deleted,
            updated,
            inserted,
            total = %delivery.total_amount,
            version = delivery.version,
            user = %principal.username,
            "delivery updated"
        );
        let names = self.names(&catalog, PartyKind::Supplier).await?;
        Ok(DeliveryView::build(delivery, &names)?)
    }

    pub async fn delete_delivery(&self, principal: &Principal, id: &str) -> ApiResult<()> {
        require(principal, &DELIVERIES_DELETE)?;
        let id: DeliveryId = id.parse()?;

        self.store.delete_delivery(id).await?;
        tracing::info!(delivery_id = %id, user = %principal.username, "delivery deleted");
        Ok(())
    }

    /// Remove one line and recompute the header total in the same write.
    pub async fn delete_delivery_item(
        &self,
        principal: &Principal,
        id: &str,
        barcode: &str,
    ) -> ApiResult<DeliveryView> {
        require(principal, &DELIVERIES_WRITE)?;
        let id: DeliveryId = id.parse()?;
        let barcode: Barcode = barcode.parse()?;

        let current = self.load_delivery(id).await?;
        let update = current.plan_item_removal(&barcode)?;
        let delivery = self.store.apply_delivery_update(&update).await?;

        tracing::info!(
            delivery_id = %delivery.id,
            barcode = %barcode,
            total = %delivery.total_amount,
            user = %principal.username,
            "delivery item removed"
        );
        let catalog = self.catalog().await?;
        let names = self.names(&catalog, PartyKind::Supplier).await?;
        Ok(DeliveryView::build(delivery, &names)?)
    }

    async fn load_delivery(&self, id: DeliveryId) -> ApiResult<Delivery> {
        self.store
            .get_delivery(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("delivery {id}")))
    }
}
