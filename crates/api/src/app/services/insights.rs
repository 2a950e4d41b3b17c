use std::cmp::Reverse;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use stockyard_auth::Principal;
use stockyard_auth::permissions::{DASHBOARD_READ, REPORTS_READ};
use stockyard_core::money::checked_mul;
use stockyard_inventory::{
    CustomerSaleLine, DateRange, LineItem, PurchaseLine, SaleLine, SupplierPurchaseLine,
    customer_report, product_report, supplier_report,
};
use stockyard_parties::PartyKind;
use stockyard_products::Product;

use super::AppServices;
use crate::app::dto::{
    CustomerReportView, DashboardView, DeliverySummary, InteractionQuery, Names, OrderSummary,
    ProductReportView, ReportQuery, SupplierReportView,
};
use crate::app::errors::{ApiError, ApiResult};
use crate::authz::require;

const RECENT_LIMIT: usize = 5;

impl AppServices {
    /// Entity counts plus the most recent deliveries and orders.
    pub async fn dashboard(&self, principal: &Principal) -> ApiResult<DashboardView> {
        require(principal, &DASHBOARD_READ)?;

        let counts = self.store.counts().await?;
        let suppliers = self.store.list_parties(PartyKind::Supplier).await?;
        let customers = self.store.list_parties(PartyKind::Customer).await?;
        let names = Names::new(
            std::iter::empty::<&Product>(),
            suppliers.iter().chain(&customers),
        );

        let mut deliveries = self.store.list_deliveries().await?;
        // Newest first; undated deliveries sort last.
        deliveries.sort_by_key(|d| Reverse((d.header.delivery_date, d.id)));
        let recent_deliveries = deliveries
            .iter()
            .take(RECENT_LIMIT)
            .map(|d| DeliverySummary::build(d, &names))
            .collect();

        let mut recent_orders: Vec<OrderSummary> = self
            .store
            .list_orders()
            .await?
            .iter()
            .map(|o| OrderSummary::build(o, &names))
            .collect();
        // Same-day orders read alphabetically by customer.
        recent_orders.sort_by(|a, b| {
            b.order_date
                .cmp(&a.order_date)
                .then_with(|| a.customer_name.cmp(&b.customer_name))
        });
        recent_orders.truncate(RECENT_LIMIT);

        Ok(DashboardView {
            counts,
            recent_deliveries,
            recent_orders,
        })
    }

    /// Per-product purchases, sales and gross profit within an optional window.
    ///
    /// Lines of every status are included; undated deliveries only count
    /// when no bound is given.
    pub async fn product_report(
        &self,
        principal: &Principal,
        query: ReportQuery,
    ) -> ApiResult<Vec<ProductReportView>> {
        require(principal, &REPORTS_READ)?;
        let range = report_range(query.from, query.to)?;

        let catalog = self.catalog().await?;
        let mut purchases = Vec::new();
        for delivery in self.store.list_deliveries().await? {
            for item in &delivery.items {
                purchases.push(PurchaseLine {
                    barcode: item.barcode.clone(),
                    quantity: i64::from(item.quantity),
                    cost: item.amount()?,
                    date: delivery.header.delivery_date,
                });
            }
        }
        let sales: Vec<SaleLine> = self
            .store
            .list_orders()
            .await?
            .iter()
            .flat_map(|o| {
                o.items.iter().map(|item| SaleLine {
                    barcode: item.barcode.clone(),
                    quantity: i64::from(item.quantity),
                    revenue: item.final_price,
                    date: Some(o.header.order_date),
                })
            })
            .collect();

        let rows = product_report(catalog.keys(), &purchases, &sales, range);
        Ok(rows
            .into_iter()
            .map(|row| ProductReportView {
                product_name: catalog
                    .get(&row.barcode)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                row,
            })
            .collect())
    }

    /// Quantity, revenue, cost and profit per customer and product, by
    /// order date.
    pub async fn customer_report(
        &self,
        principal: &Principal,
        query: InteractionQuery,
    ) -> ApiResult<Vec<CustomerReportView>> {
        require(principal, &REPORTS_READ)?;
        let range = report_range(query.from, query.to)?;

        let mut sales = Vec::new();
        for order in self.store.list_orders().await? {
            if query.tax_id.as_ref().is_some_and(|t| t != &order.header.customer) {
                continue;
            }
            for item in &order.items {
                if query.barcode.as_ref().is_some_and(|b| b != &item.barcode) {
                    continue;
                }
                let cost = checked_mul("cost", Decimal::from(item.quantity), item.price_at_order)?;
                sales.push(CustomerSaleLine {
                    customer: order.header.customer.clone(),
                    barcode: item.barcode.clone(),
                    quantity: i64::from(item.quantity),
                    revenue: item.final_price,
                    cost,
                    date: order.header.order_date,
                });
            }
        }

        let catalog = self.catalog().await?;
        let names = self.names(&catalog, PartyKind::Customer).await?;
        Ok(customer_report(&sales, range)
            .into_iter()
            .map(|row| CustomerReportView::build(row, &names))
            .collect())
    }

    /// Quantity and purchase cost per supplier and product, by delivery date.
    pub async fn supplier_report(
        &self,
        principal: &Principal,
        query: InteractionQuery,
    ) -> ApiResult<Vec<SupplierReportView>> {
        require(principal, &REPORTS_READ)?;
        let range = report_range(query.from, query.to)?;

        let mut purchases = Vec::new();
        for delivery in self.store.list_deliveries().await? {
            if query.tax_id.as_ref().is_some_and(|t| t != &delivery.header.supplier) {
                continue;
            }
            for item in &delivery.items {
                if query.barcode.as_ref().is_some_and(|b| b != &item.barcode) {
                    continue;
                }
                purchases.push(SupplierPurchaseLine {
                    supplier: delivery.header.supplier.clone(),
                    barcode: item.barcode.clone(),
                    quantity: i64::from(item.quantity),
                    cost: item.amount()?,
                    date: delivery.header.delivery_date,
                });
            }
        }

        let catalog = self.catalog().await?;
        let names = self.names(&catalog, PartyKind::Supplier).await?;
        Ok(supplier_report(&purchases, range)
            .into_iter()
            .map(|row| SupplierReportView::build(row, &names))
            .collect())
    }
}

fn report_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ApiResult<DateRange> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ApiError::Validation(format!(
                "report range starts after it ends ({from} > {to})"
            )));
        }
    }
    Ok(DateRange::new(from, to))
}
