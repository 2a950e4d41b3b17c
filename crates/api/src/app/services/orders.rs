use chrono::Utc;

use stockyard_auth::Principal;
use stockyard_auth::permissions::{ORDERS_DELETE, ORDERS_READ, ORDERS_WRITE};
use stockyard_core::{Barcode, ExpectedVersion, OrderId};
use stockyard_parties::PartyKind;
use stockyard_products::Product;
use stockyard_sales::{NewOrder, Order, OrderHeader};

use super::AppServices;
use crate::app::dto::{OrderRequest, OrderView};
use crate::app::errors::{ApiError, ApiResult};
use crate::authz::require;

impl AppServices {
    pub async fn list_orders(&self, principal: &Principal) -> ApiResult<Vec<OrderView>> {
        require(principal, &ORDERS_READ)?;

        let catalog = self.catalog().await?;
        let names = self.names(&catalog, PartyKind::Customer).await?;
        let orders = self.store.list_orders().await?;
        Ok(orders.into_iter().map(|o| OrderView::build(o, &names)).collect())
    }

    pub async fn get_order(&self, principal: &Principal, id: &str) -> ApiResult<OrderView> {
        require(principal, &ORDERS_READ)?;
        let id: OrderId = id.parse()?;

        let order = self.load_order(id).await?;
        let catalog = self.catalog().await?;
        let names = self.names(&catalog, PartyKind::Customer).await?;
        Ok(OrderView::build(order, &names))
    }

    /// Lines without a price capture the product's current list price.
    pub async fn create_order(&self, principal: &Principal, req: OrderRequest) -> ApiResult<OrderView> {
        require(principal, &ORDERS_WRITE)?;

        self.ensure_party(PartyKind::Customer, &req.customer_tax_id).await?;
        let catalog = self.catalog().await?;

        let header = OrderHeader {
            customer: req.customer_tax_id,
            order_date: req.order_date.unwrap_or_else(|| Utc::now().date_naive()),
            status: req.status.unwrap_or_default(),
        };
        let planned = NewOrder::plan(header, req.items, |b| {
            catalog.get(b).map(Product::list_price)
        })?;
        let order = self.store.insert_order(&planned).await?;

        tracing::info!(
            order_id = %order.id,
            items = order.items.len(),
            total = %order.total_amount,
            user = %principal.username,
            "order created"
        );
        let names = self.names(&catalog, PartyKind::Customer).await?;
        Ok(OrderView::build(order, &names))
    }

    /// Reconcile the stored order against the submitted header and lines.
    ///
    /// Lines that omit a price keep the price captured when they were added.
    /// The write is refused with a conflict if the order changed after it was
    /// read, whether or not the client sent a `version`.
    pub async fn update_order(
        &self,
        principal: &Principal,
        id: &str,
        req: OrderRequest,
    ) -> ApiResult<OrderView> {
        require(principal, &ORDERS_WRITE)?;
        let id: OrderId = id.parse()?;

        if req.id.is_some_and(|body_id| body_id != id) {
            return Err(ApiError::Validation("id in body does not match path".into()));
        }
        let current = self.load_order(id).await?;
        self.ensure_party(PartyKind::Customer, &req.customer_tax_id).await?;
        let catalog = self.catalog().await?;

        let header = OrderHeader {
            customer: req.customer_tax_id,
            order_date: req.order_date.unwrap_or(current.header.order_date),
            status: req.status.unwrap_or(current.header.status),
        };
        let update = current.plan_update(
            header,
            req.items,
            ExpectedVersion::from_option(req.version),
            |b| catalog.get(b).map(Product::list_price),
        )?;
        let (deleted, updated, inserted) = (
            update.changes.to_delete.len(),
            update.changes.to_update.len(),
            update.changes.to_insert.len(),
        );
        let order = self.store.apply_order_update(&update).await?;

        tracing::info!(
            order_id = %order.id,
            deleted,
            updated,
            inserted,
            total = %order.total_amount,
            version = order.version,
            user = %principal.username,
            "order updated"
        );
        let names = self.names(&catalog, PartyKind::Customer).await?;
        Ok(OrderView::build(order, &names))
    }

    pub async fn delete_order(&self, principal: &Principal, id: &str) -> ApiResult<()> {
        require(principal, &ORDERS_DELETE)?;
        let id: OrderId = id.parse()?;

        self.store.delete_order(id).await?;
        tracing::info!(order_id = %id, user = %principal.username, "order deleted");
        Ok(())
    }

    pub async fn delete_order_item(
        &self,
        principal: &Principal,
        id: &str,
        barcode: &str,
    ) -> ApiResult<OrderView> {
        require(principal, &ORDERS_WRITE)?;
        let id: OrderId = id.parse()?;
        let barcode: Barcode = barcode.parse()?;

        let current = self.load_order(id).await?;
        let update = current.plan_item_removal(&barcode)?;
        let order = self.store.apply_order_update(&update).await?;

        tracing::info!(
            order_id = %order.id,
            barcode = %barcode,
            total = %order.total_amount,
            user = %principal.username,
            "order item removed"
        );
        let catalog = self.catalog().await?;
        let names = self.names(&catalog, PartyKind::Customer).await?;
        Ok(OrderView::build(order, &names))
    }

    async fn load_order(&self, id: OrderId) -> ApiResult<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("order {id}")))
    }
}
