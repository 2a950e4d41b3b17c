//! Current-stock aggregation.
//!
//! Stock is never stored. It is derived on every read as
//! `received - issued`, where a delivery line counts as received once its
//! delivery is shipped or completed, and an order line counts as issued
//! unless its order is still pending or was cancelled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stockyard_core::{Barcode, Status};

/// One line of stock history annotated with its parent header's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub barcode: Barcode,
    pub quantity: i64,
    pub status: Status,
}

impl StockEntry {
    pub fn new(barcode: Barcode, quantity: impl Into<i64>, status: Status) -> Self {
        Self {
            barcode,
            quantity: quantity.into(),
            status,
        }
    }
}

/// Whether a delivery in `status` contributes to stock.
pub fn counts_as_received(status: Status) -> bool {
    matches!(status, Status::Shipped | Status::Completed)
}

/// Whether an order in `status` draws down stock.
pub fn counts_as_issued(status: Status) -> bool {
    !matches!(status, Status::Pending | Status::Cancelled)
}

/// Compute current stock for every barcode in `known`.
///
/// Every known barcode appears in the result (zero without history).
/// Barcodes that only occur in history are included as well. Negative
/// values are kept: they flag an oversold product.
pub fn current_stock<'a, I>(
    known: I,
    inbound: &[StockEntry],
    outbound: &[StockEntry],
) -> BTreeMap<Barcode, i64>
where
    I: IntoIterator<Item = &'a Barcode>,
{
    let mut levels: BTreeMap<Barcode, i64> =
        known.into_iter().map(|b| (b.clone(), 0)).collect();

    for entry in inbound.iter().filter(|e| counts_as_received(e.status)) {
        *levels.entry(entry.barcode.clone()).or_insert(0) += entry.quantity;
    }
    for entry in outbound.iter().filter(|e| counts_as_issued(e.status)) {
        *levels.entry(entry.barcode.clone()).or_insert(0) -= entry.quantity;
    }

    levels
}

/// Snapshot of all delivery (inbound) and order (outbound) lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLedger {
    pub inbound: Vec<StockEntry>,
    pub outbound: Vec<StockEntry>,
}

impl StockLedger {
    pub fn levels<'a, I>(&self, known: I) -> BTreeMap<Barcode, i64>
    where
        I: IntoIterator<Item = &'a Barcode>,
    {
        current_stock(known, &self.inbound, &self.outbound)
    }

    /// Stock of a single product.
    pub fn level_of(&self, barcode: &Barcode) -> i64 {
        let received: i64 = self
            .inbound
            .iter()
            .filter(|e| &e.barcode == barcode && counts_as_received(e.status))
            .map(|e| e.quantity)
            .sum();
        let issued: i64 = self
            .outbound
            .iter()
            .filter(|e| &e.barcode == barcode && counts_as_issued(e.status))
            .map(|e| e.quantity)
            .sum();
        received - issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bc(s: &str) -> Barcode {
        s.parse().unwrap()
    }

    #[test]
    fn delivered_minus_issued() {
        let inbound = vec![
            StockEntry::new(bc("111"), 30, Status::Completed),
            StockEntry::new(bc("111"), 20, Status::Shipped),
            StockEntry::new(bc("111"), 99, Status::Pending),
        ];
        let outbound = vec![
            StockEntry::new(bc("111"), 7, Status::Confirmed),
            StockEntry::new(bc("111"), 5, Status::Paid),
            StockEntry::new(bc("111"), 40, Status::Pending),
            StockEntry::new(bc("111"), 40, Status::Cancelled),
        ];

        let levels = current_stock([&bc("111")], &inbound, &outbound);
        assert_eq!(levels[&bc("111")], 38);
    }

    #[test]
    fn known_products_without_history_are_zero() {
        let known = [bc("111"), bc("222")];
        let levels = current_stock(known.iter(), &[], &[]);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[&bc("222")], 0);
    }

    #[test]
    fn oversold_stock_stays_negative() {
        let outbound = vec![StockEntry::new(bc("111"), 4, Status::Shipped)];
        let levels = current_stock([&bc("111")], &[], &outbound);
        assert_eq!(levels[&bc("111")], -4);
    }

    #[test]
    fn status_predicates() {
        let received: Vec<_> = Status::ALL.into_iter().filter(|s| counts_as_received(*s)).collect();
        assert_eq!(received, vec![Status::Shipped, Status::Completed]);

        let issued: Vec<_> = Status::ALL.into_iter().filter(|s| counts_as_issued(*s)).collect();
        assert_eq!(
            issued,
            vec![Status::Confirmed, Status::Paid, Status::Shipped, Status::Completed]
        );
    }

    fn status_strategy() -> impl Strategy<Value = Status> {
        prop::sample::select(Status::ALL.to_vec())
    }

    fn entries() -> impl Strategy<Value = Vec<StockEntry>> {
        prop::collection::vec(
            (prop::sample::select(vec!["111", "222", "333"]), 0i64..1_000, status_strategy())
                .prop_map(|(b, q, s)| StockEntry::new(b.parse().unwrap(), q, s)),
            0..40,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the aggregated map agrees with the per-product formula.
        #[test]
        fn aggregate_matches_per_product_formula(inbound in entries(), outbound in entries()) {
            let ledger = StockLedger { inbound, outbound };
            let known = [bc("111"), bc("222"), bc("333"), bc("444")];
            let levels = ledger.levels(known.iter());

            for barcode in &known {
                prop_assert_eq!(levels[barcode], ledger.level_of(barcode));
            }
            prop_assert_eq!(levels[&bc("444")], 0);
        }

        /// Property: pending deliveries and pending/cancelled orders never move stock.
        #[test]
        fn inactive_history_is_ignored(inbound in entries(), outbound in entries()) {
            let active_in: Vec<_> = inbound.iter().filter(|e| counts_as_received(e.status)).cloned().collect();
            let active_out: Vec<_> = outbound.iter().filter(|e| counts_as_issued(e.status)).cloned().collect();
            let known = [bc("111")];

            prop_assert_eq!(
                current_stock(known.iter(), &inbound, &outbound),
                current_stock(known.iter(), &active_in, &active_out)
            );
        }
    }
}
