//! Stock reconciliation engine.
//!
//! Pure computation over delivery and order history: current stock per
//! product, keyed diffing of line-item collections, header totals and the
//! turnover reports. Nothing here performs IO.

pub mod reconcile;
pub mod report;
pub mod stock;
pub mod totals;

pub use reconcile::{LineChanges, LineItem, diff_lines, remove_line};
pub use report::{
    CustomerReportRow, CustomerSaleLine, DateRange, ProductReportRow, PurchaseLine, SaleLine,
    SupplierPurchaseLine, SupplierReportRow, customer_report, product_report, supplier_report,
};
pub use stock::{StockEntry, StockLedger, counts_as_issued, counts_as_received, current_stock};
pub use totals::total_amount;
