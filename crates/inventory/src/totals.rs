use rust_decimal::Decimal;
use stockyard_core::DomainResult;
use stockyard_core::money::checked_sum;

use crate::reconcile::LineItem;

/// Header total: the rounded sum of every line's amount.
///
/// A total that overflows or does not fit a money column is a validation
/// error.
pub fn total_amount<T: LineItem>(items: &[T]) -> DomainResult<Decimal> {
    checked_sum("total_amount", items.iter().map(LineItem::amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use stockyard_core::money::checked_mul;
    use stockyard_core::{Barcode, DomainError};

    #[derive(Debug, Clone, PartialEq)]
    struct Priced {
        barcode: Barcode,
        quantity: i32,
        unit_price: Option<Decimal>,
    }

    impl LineItem for Priced {
        fn barcode(&self) -> &Barcode {
            &self.barcode
        }

        fn quantity(&self) -> i32 {
            self.quantity
        }

        fn amount(&self) -> DomainResult<Decimal> {
            checked_mul("amount", Decimal::from(self.quantity), self.unit_price.unwrap_or(Decimal::ZERO))
        }
    }

    fn priced(b: &str, q: i32, p: Option<Decimal>) -> Priced {
        Priced {
            barcode: b.parse().unwrap(),
            quantity: q,
            unit_price: p,
        }
    }

    #[test]
    fn sums_line_amounts() {
        let items = vec![priced("111", 10, Some(dec!(2.50))), priced("222", 4, Some(dec!(5.00)))];
        assert_eq!(total_amount(&items).unwrap(), dec!(45.00));
    }

    #[test]
    fn missing_price_contributes_zero() {
        let items = vec![priced("111", 10, None), priced("222", 1, Some(dec!(0.99)))];
        assert_eq!(total_amount(&items).unwrap(), dec!(0.99));
    }

    #[test]
    fn empty_collection_totals_zero() {
        assert_eq!(total_amount::<Priced>(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn oversized_total_is_rejected() {
        let items = vec![
            priced("111", 1, Some(dec!(9999999999.99))),
            priced("222", 1, Some(dec!(0.01))),
        ];
        assert!(matches!(total_amount(&items), Err(DomainError::Validation(_))));

        let huge = vec![priced("111", 1_000_000, Some(dec!(100000000000000000000000)))];
        assert!(matches!(total_amount(&huge), Err(DomainError::Validation(_))));
    }

    proptest! {
        /// Property: removing a line lowers the total by exactly its amount.
        #[test]
        fn removal_subtracts_line_amount(
            lines in prop::collection::vec((0i32..500, 0i64..100_000), 1..10)
        ) {
            let items: Vec<Priced> = lines
                .iter()
                .enumerate()
                .map(|(i, (q, cents))| priced(&format!("B{i}"), *q, Some(Decimal::new(*cents, 2))))
                .collect();
            let full = total_amount(&items).unwrap();
            let rest = total_amount(&items[1..]).unwrap();
            prop_assert_eq!(full - rest, items[0].amount().unwrap());
        }
    }
}
