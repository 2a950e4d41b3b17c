//! Turnover reports: per product, per customer and product, and per
//! supplier and product.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockyard_core::money::round_money;
use stockyard_core::{Barcode, TaxId};

/// Inclusive date window; an open bound matches everything on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Undated lines only match an unbounded range.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        match date {
            Some(d) => self.from.is_none_or(|f| d >= f) && self.to.is_none_or(|t| d <= t),
            None => self.from.is_none() && self.to.is_none(),
        }
    }
}

/// A delivery line as seen by the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLine {
    pub barcode: Barcode,
    pub quantity: i64,
    /// Line cost (quantity times unit price).
    pub cost: Decimal,
    pub date: Option<NaiveDate>,
}

/// An order line as seen by the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
    pub barcode: Barcode,
    pub quantity: i64,
    /// Line revenue (the order line's final price).
    pub revenue: Decimal,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReportRow {
    pub barcode: Barcode,
    pub purchased_quantity: i64,
    pub purchase_cost: Decimal,
    pub sold_quantity: i64,
    pub revenue: Decimal,
    pub gross_profit: Decimal,
    /// Profit as a percentage of revenue; zero when nothing was sold.
    pub margin_percent: Decimal,
}

impl ProductReportRow {
    fn empty(barcode: Barcode) -> Self {
        Self {
            barcode,
            purchased_quantity: 0,
            purchase_cost: Decimal::ZERO,
            sold_quantity: 0,
            revenue: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            margin_percent: Decimal::ZERO,
        }
    }
}

/// Build one row per known product, ordered by barcode.
///
/// Lines for barcodes outside `known` are ignored.
pub fn product_report<'a, I>(
    known: I,
    purchases: &[PurchaseLine],
    sales: &[SaleLine],
    range: DateRange,
) -> Vec<ProductReportRow>
where
    I: IntoIterator<Item = &'a Barcode>,
{
    let mut rows: BTreeMap<Barcode, ProductReportRow> = known
        .into_iter()
        .map(|b| (b.clone(), ProductReportRow::empty(b.clone())))
        .collect();

    for line in purchases.iter().filter(|l| range.contains(l.date)) {
        if let Some(row) = rows.get_mut(&line.barcode) {
            row.purchased_quantity += line.quantity;
            row.purchase_cost += line.cost;
        }
    }
    for line in sales.iter().filter(|l| range.contains(l.date)) {
        if let Some(row) = rows.get_mut(&line.barcode) {
            row.sold_quantity += line.quantity;
            row.revenue += line.revenue;
        }
    }

    rows.into_values()
        .map(|mut row| {
            row.purchase_cost = round_money(row.purchase_cost);
            row.revenue = round_money(row.revenue);
            row.gross_profit = row.revenue - row.purchase_cost;
            if !row.revenue.is_zero() {
                row.margin_percent =
                    round_money(row.gross_profit / row.revenue * Decimal::ONE_HUNDRED);
            }
            row
        })
        .collect()
}

/// An order line attributed to the customer it was sold to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSaleLine {
    pub customer: TaxId,
    pub barcode: Barcode,
    pub quantity: i64,
    /// The order line's final price.
    pub revenue: Decimal,
    /// Quantity times the price captured at order time.
    pub cost: Decimal,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerReportRow {
    pub customer_tax_id: TaxId,
    pub barcode: Barcode,
    pub quantity: i64,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

/// One row per customer and product with sales inside `range`, ordered by
/// tax id then barcode.
pub fn customer_report(sales: &[CustomerSaleLine], range: DateRange) -> Vec<CustomerReportRow> {
    let mut rows: BTreeMap<(TaxId, Barcode), CustomerReportRow> = BTreeMap::new();
    for line in sales.iter().filter(|l| range.contains(Some(l.date))) {
        let row = rows
            .entry((line.customer.clone(), line.barcode.clone()))
            .or_insert_with(|| CustomerReportRow {
                customer_tax_id: line.customer.clone(),
                barcode: line.barcode.clone(),
                quantity: 0,
                revenue: Decimal::ZERO,
                cost: Decimal::ZERO,
                profit: Decimal::ZERO,
            });
        row.quantity += line.quantity;
        row.revenue += line.revenue;
        row.cost += line.cost;
    }

    rows.into_values()
        .map(|mut row| {
            row.revenue = round_money(row.revenue);
            row.cost = round_money(row.cost);
            row.profit = row.revenue - row.cost;
            row
        })
        .collect()
}

/// A delivery line attributed to the supplier it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierPurchaseLine {
    pub supplier: TaxId,
    pub barcode: Barcode,
    pub quantity: i64,
    pub cost: Decimal,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierReportRow {
    pub supplier_tax_id: TaxId,
    pub barcode: Barcode,
    pub quantity: i64,
    pub total_cost: Decimal,
}

/// One row per supplier and product with deliveries inside `range`.
pub fn supplier_report(
    purchases: &[SupplierPurchaseLine],
    range: DateRange,
) -> Vec<SupplierReportRow> {
    let mut rows: BTreeMap<(TaxId, Barcode), SupplierReportRow> = BTreeMap::new();
    for line in purchases.iter().filter(|l| range.contains(l.date)) {
        let row = rows
            .entry((line.supplier.clone(), line.barcode.clone()))
            .or_insert_with(|| SupplierReportRow {
                supplier_tax_id: line.supplier.clone(),
                barcode: line.barcode.clone(),
                quantity: 0,
                total_cost: Decimal::ZERO,
            });
        row.quantity += line.quantity;
        row.total_cost += line.cost;
    }

    rows.into_values()
        .map(|mut row| {
            row.total_cost = round_money(row.total_cost);
            row
        })
        .collect()
}
