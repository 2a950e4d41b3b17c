//! Keyed reconciliation of a header's line items.
//!
//! Deliveries and orders own at most one line per barcode. An update carries
//! the full target collection; the diff against what is stored yields three
//! disjoint sets keyed by barcode.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use stockyard_core::{Barcode, DomainError, DomainResult};

/// A line item owned by a header, identified within it by barcode.
pub trait LineItem: Clone + PartialEq {
    fn barcode(&self) -> &Barcode;

    fn quantity(&self) -> i32;

    /// Monetary contribution of this line to the header total.
    ///
    /// Fails when the line's arithmetic leaves the representable range.
    fn amount(&self) -> DomainResult<Decimal>;

    /// Field-level checks; quantity must be non-negative.
    fn validate(&self) -> DomainResult<()> {
        if self.quantity() < 0 {
            return Err(DomainError::validation(format!(
                "quantity for {} must not be negative",
                self.barcode()
            )));
        }
        Ok(())
    }
}

/// Result of diffing stored lines against a target collection.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChanges<T> {
    /// Stored barcodes absent from the target.
    pub to_delete: Vec<Barcode>,
    /// Target lines whose barcode is stored and whose content changed.
    pub to_update: Vec<T>,
    /// Target lines whose barcode is not stored yet.
    pub to_insert: Vec<T>,
    /// The complete line set after applying the changes, in target order.
    pub result: Vec<T>,
}

impl<T> LineChanges<T> {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_update.is_empty() && self.to_insert.is_empty()
    }
}

/// Diff `existing` against `incoming`.
///
/// Fails with a validation error if `incoming` repeats a barcode or carries
/// an invalid line; nothing is planned in that case. Lines equal to their
/// stored counterpart are left out of `to_update`, so resubmitting the same
/// payload yields an empty change set.
pub fn diff_lines<T: LineItem>(existing: &[T], incoming: Vec<T>) -> DomainResult<LineChanges<T>> {
    let mut seen = BTreeSet::new();
    for item in &incoming {
        item.validate()?;
        if !seen.insert(item.barcode().clone()) {
            return Err(DomainError::validation(format!(
                "duplicate line for barcode {}",
                item.barcode()
            )));
        }
    }

    let stored: BTreeMap<&Barcode, &T> = existing.iter().map(|i| (i.barcode(), i)).collect();

    let to_delete = existing
        .iter()
        .filter(|i| !seen.contains(i.barcode()))
        .map(|i| i.barcode().clone())
        .collect();

    let mut to_update = Vec::new();
    let mut to_insert = Vec::new();
    for item in &incoming {
        match stored.get(item.barcode()) {
            Some(current) if *current == item => {}
            Some(_) => to_update.push(item.clone()),
            None => to_insert.push(item.clone()),
        }
    }

    Ok(LineChanges {
        to_delete,
        to_update,
        to_insert,
        result: incoming,
    })
}

/// Remove exactly the line for `barcode`, returning the remaining lines.
pub fn remove_line<T: LineItem>(items: &[T], barcode: &Barcode) -> DomainResult<Vec<T>> {
    if !items.iter().any(|i| i.barcode() == barcode) {
        return Err(DomainError::not_found(format!("line item {barcode}")));
    }
    Ok(items.iter().filter(|i| i.barcode() != barcode).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Line {
        barcode: Barcode,
        quantity: i32,
    }

    impl LineItem for Line {
        fn barcode(&self) -> &Barcode {
            &self.barcode
        }

        fn quantity(&self) -> i32 {
            self.quantity
        }

        fn amount(&self) -> DomainResult<Decimal> {
            Ok(Decimal::from(self.quantity))
        }
    }

    fn line(b: &str, q: i32) -> Line {
        Line {
            barcode: b.parse().unwrap(),
            quantity: q,
        }
    }

    fn bc(s: &str) -> Barcode {
        s.parse().unwrap()
    }

    #[test]
    fn round_trip_deletes_keeps_and_inserts() {
        let existing = vec![line("A", 5), line("B", 3)];
        let changes = diff_lines(&existing, vec![line("B", 3), line("C", 2)]).unwrap();

        assert_eq!(changes.to_delete, vec![bc("A")]);
        assert!(changes.to_update.is_empty());
        assert_eq!(changes.to_insert, vec![line("C", 2)]);
        assert_eq!(changes.result, vec![line("B", 3), line("C", 2)]);
    }

    #[test]
    fn changed_quantity_is_an_update() {
        let existing = vec![line("A", 5)];
        let changes = diff_lines(&existing, vec![line("A", 6)]).unwrap();
        assert_eq!(changes.to_update, vec![line("A", 6)]);
        assert!(changes.to_insert.is_empty());
        assert!(changes.to_delete.is_empty());
    }

    #[test]
    fn duplicate_barcode_is_rejected() {
        let err = diff_lines(&[], vec![line("A", 1), line("A", 2)]).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("duplicate") => {}
            other => panic!("Expected duplicate-line validation error, got {other:?}"),
        }
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let err = diff_lines(&[], vec![line("A", -1)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn empty_target_clears_all_lines() {
        let existing = vec![line("A", 5), line("B", 3)];
        let changes = diff_lines(&existing, Vec::new()).unwrap();
        assert_eq!(changes.to_delete, vec![bc("A"), bc("B")]);
        assert!(changes.result.is_empty());
    }

    #[test]
    fn remove_line_requires_existing_barcode() {
        let items = vec![line("A", 5), line("B", 3)];
        assert_eq!(remove_line(&items, &bc("A")).unwrap(), vec![line("B", 3)]);
        assert!(matches!(
            remove_line(&items, &bc("Z")),
            Err(DomainError::NotFound(_))
        ));
    }

    fn target() -> impl Strategy<Value = Vec<Line>> {
        prop::collection::btree_map(
            prop::sample::select(vec!["A", "B", "C", "D", "E"]),
            0i32..50,
            0..5,
        )
        .prop_map(|m| m.into_iter().map(|(b, q)| line(b, q)).collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the three sets are disjoint and cover the symmetric difference.
        #[test]
        fn change_sets_are_disjoint(existing in target(), incoming in target()) {
            let changes = diff_lines(&existing, incoming.clone()).unwrap();

            let deleted: BTreeSet<_> = changes.to_delete.iter().cloned().collect();
            let updated: BTreeSet<_> = changes.to_update.iter().map(|l| l.barcode.clone()).collect();
            let inserted: BTreeSet<_> = changes.to_insert.iter().map(|l| l.barcode.clone()).collect();

            prop_assert!(deleted.is_disjoint(&updated));
            prop_assert!(deleted.is_disjoint(&inserted));
            prop_assert!(updated.is_disjoint(&inserted));

            for l in &existing {
                prop_assert_eq!(deleted.contains(&l.barcode), !incoming.iter().any(|i| i.barcode == l.barcode));
            }
            prop_assert_eq!(changes.result, incoming);
        }

        /// Property: applying a target and diffing it again yields no changes.
        #[test]
        fn resubmission_is_idempotent(existing in target(), incoming in target()) {
            let first = diff_lines(&existing, incoming.clone()).unwrap();
            let second = diff_lines(&first.result, incoming).unwrap();
            prop_assert!(second.is_empty());
            prop_assert_eq!(second.result, first.result);
        }
    }
}
