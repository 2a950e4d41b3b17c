use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockyard_core::money::{checked_mul, ensure_money, ensure_non_negative, round_money};
use stockyard_core::{
    AggregateRoot, Barcode, DomainError, DomainResult, ExpectedVersion, OrderId, Status, TaxId,
};
use stockyard_inventory::{LineChanges, LineItem, diff_lines, remove_line, total_amount};

/// Markup is stored as NUMERIC(5,2).
const MAX_MARKUP_PERCENT: Decimal = Decimal::from_parts(99_999, 0, 0, false, 2);

/// One product sold in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub barcode: Barcode,
    pub quantity: i32,
    pub markup_percent: Decimal,
    /// Product unit price captured when the line was added.
    pub price_at_order: Decimal,
    /// Line total: quantity * price_at_order * (1 + markup_percent / 100).
    pub final_price: Decimal,
}

impl OrderItem {
    /// Build a line with its final price derived from the other fields.
    ///
    /// Inputs are checked first; a final price that does not fit a money
    /// column is a validation error.
    pub fn priced(
        barcode: Barcode,
        quantity: i32,
        price_at_order: Decimal,
        markup_percent: Decimal,
    ) -> DomainResult<Self> {
        check_line(&barcode, quantity, price_at_order, markup_percent)?;

        let field = format!("final_price for {barcode}");
        let gross = checked_mul(&field, Decimal::from(quantity), price_at_order)?;
        let final_price = round_money(checked_mul(&field, gross, markup_factor(markup_percent))?);
        ensure_money(&field, final_price)?;

        Ok(Self {
            barcode,
            quantity,
            markup_percent,
            price_at_order,
            final_price,
        })
    }

    /// Per-unit price after markup.
    pub fn unit_final_price(&self) -> Decimal {
        round_money(self.price_at_order * markup_factor(self.markup_percent))
    }
}

fn markup_factor(markup_percent: Decimal) -> Decimal {
    Decimal::ONE + markup_percent / Decimal::ONE_HUNDRED
}

fn check_line(
    barcode: &Barcode,
    quantity: i32,
    price_at_order: Decimal,
    markup_percent: Decimal,
) -> DomainResult<()> {
    if quantity < 0 {
        return Err(DomainError::validation(format!(
            "quantity for {barcode} must not be negative"
        )));
    }
    ensure_money("price_at_order", price_at_order)?;
    ensure_non_negative("markup_percent", markup_percent)?;
    if markup_percent > MAX_MARKUP_PERCENT {
        return Err(DomainError::validation(format!(
            "markup_percent must not exceed {MAX_MARKUP_PERCENT}"
        )));
    }
    Ok(())
}

impl LineItem for OrderItem {
    fn barcode(&self) -> &Barcode {
        &self.barcode
    }

    fn quantity(&self) -> i32 {
        self.quantity
    }

    fn amount(&self) -> DomainResult<Decimal> {
        Ok(self.final_price)
    }

    fn validate(&self) -> DomainResult<()> {
        check_line(&self.barcode, self.quantity, self.price_at_order, self.markup_percent)?;
        ensure_money("final_price", self.final_price)
    }
}

/// A line as supplied by a client. Derived fields are never accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub barcode: Barcode,
    pub quantity: i32,
    pub markup_percent: Option<Decimal>,
    pub price_at_order: Option<Decimal>,
}

impl OrderLineInput {
    /// Resolve into a stored line.
    ///
    /// A missing price keeps the price captured on `existing`, or falls back
    /// to `list_price` for a new line. A missing markup is zero.
    fn resolve(self, existing: Option<&OrderItem>, list_price: Decimal) -> DomainResult<OrderItem> {
        let price_at_order = self
            .price_at_order
            .or_else(|| existing.map(|e| e.price_at_order))
            .unwrap_or(list_price);
        let markup_percent = self.markup_percent.unwrap_or(Decimal::ZERO);
        OrderItem::priced(self.barcode, self.quantity, price_at_order, markup_percent)
    }
}

/// Mutable header fields of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub customer: TaxId,
    pub order_date: NaiveDate,
    pub status: Status,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(flatten)]
    pub header: OrderHeader,
    /// Always equal to the sum of item final prices.
    pub total_amount: Decimal,
    pub version: u64,
    pub items: Vec<OrderItem>,
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// A validated order ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub header: OrderHeader,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
}

impl NewOrder {
    /// `list_price` returns the product's current price, or `None` when the
    /// barcode is not in the catalog.
    pub fn plan(
        header: OrderHeader,
        lines: Vec<OrderLineInput>,
        list_price: impl Fn(&Barcode) -> Option<Decimal>,
    ) -> DomainResult<Self> {
        let items = resolve_lines(&[], lines, &list_price)?;
        let items = diff_lines(&[], items)?.result;
        let total_amount = total_amount(&items)?;
        Ok(Self {
            header,
            items,
            total_amount,
        })
    }
}

/// A planned change to a stored order, committed atomically by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub id: OrderId,
    pub header: OrderHeader,
    pub changes: LineChanges<OrderItem>,
    pub total_amount: Decimal,
    /// Version of the order the changes were planned against.
    pub base_version: u64,
}

impl OrderUpdate {
    /// The order as it reads once this update is committed.
    pub fn into_order(self, version: u64) -> Order {
        Order {
            id: self.id,
            header: self.header,
            total_amount: self.total_amount,
            version,
            items: self.changes.result,
        }
    }
}

impl Order {
    /// Reconcile this order against a full target header and line list.
    pub fn plan_update(
        &self,
        header: OrderHeader,
        lines: Vec<OrderLineInput>,
        expected: ExpectedVersion,
        list_price: impl Fn(&Barcode) -> Option<Decimal>,
    ) -> DomainResult<OrderUpdate> {
        expected.check(self.version())?;

        let items = resolve_lines(&self.items, lines, &list_price)?;
        let changes = diff_lines(&self.items, items)?;
        let total_amount = total_amount(&changes.result)?;
        Ok(OrderUpdate {
            id: self.id,
            header,
            changes,
            total_amount,
            base_version: self.version(),
        })
    }

    /// Drop the line for `barcode` and recompute the total.
    pub fn plan_item_removal(&self, barcode: &Barcode) -> DomainResult<OrderUpdate> {
        let remaining = remove_line(&self.items, barcode)?;
        let total_amount = total_amount(&remaining)?;
        Ok(OrderUpdate {
            id: self.id,
            header: self.header.clone(),
            changes: LineChanges {
                to_delete: vec![barcode.clone()],
                to_update: Vec::new(),
                to_insert: Vec::new(),
                result: remaining,
            },
            total_amount,
            base_version: self.version(),
        })
    }
}

fn resolve_lines(
    existing: &[OrderItem],
    lines: Vec<OrderLineInput>,
    list_price: impl Fn(&Barcode) -> Option<Decimal>,
) -> DomainResult<Vec<OrderItem>> {
    lines
        .into_iter()
        .map(|line| {
            let price = list_price(&line.barcode).ok_or_else(|| {
                DomainError::validation(format!("unknown product barcode {}", line.barcode))
            })?;
            let current = existing.iter().find(|i| i.barcode == line.barcode);
            line.resolve(current, price)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn bc(s: &str) -> Barcode {
        s.parse().unwrap()
    }

    fn header() -> OrderHeader {
        OrderHeader {
            customer: "770123456789".parse().unwrap(),
            order_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            status: Status::Confirmed,
        }
    }

    fn input(b: &str, quantity: i32, price: Option<Decimal>, markup: Option<Decimal>) -> OrderLineInput {
        OrderLineInput {
            barcode: bc(b),
            quantity,
            markup_percent: markup,
            price_at_order: price,
        }
    }

    fn catalog(b: &Barcode) -> Option<Decimal> {
        match b.as_str() {
            "111" => Some(dec!(10.00)),
            "222" => Some(dec!(4.00)),
            "333" => Some(Decimal::ZERO),
            _ => None,
        }
    }

    fn stored(items: Vec<OrderItem>) -> Order {
        let total_amount = total_amount(&items).unwrap();
        Order {
            id: OrderId::new(7),
            header: header(),
            total_amount,
            version: 1,
            items,
        }
    }

    #[test]
    fn final_price_is_the_marked_up_line_total() {
        let item = OrderItem::priced(bc("111"), 3, dec!(100.00), dec!(20)).unwrap();
        assert_eq!(item.unit_final_price(), dec!(120.00));
        assert_eq!(item.final_price, dec!(360.00));
    }

    #[test]
    fn missing_price_is_captured_from_catalog() {
        let planned = NewOrder::plan(header(), vec![input("111", 2, None, None)], catalog).unwrap();
        assert_eq!(planned.items[0].price_at_order, dec!(10.00));
        assert_eq!(planned.items[0].markup_percent, Decimal::ZERO);
        assert_eq!(planned.total_amount, dec!(20.00));
    }

    #[test]
    fn unknown_product_is_rejected() {
        let err = NewOrder::plan(header(), vec![input("999", 1, None, None)], catalog).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn negative_markup_is_rejected() {
        let err = NewOrder::plan(header(), vec![input("111", 1, None, Some(dec!(-5)))], catalog)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn huge_markup_is_rejected_before_pricing() {
        let err = NewOrder::plan(header(), vec![input("111", 1000, None, Some(Decimal::MAX))], catalog)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn price_beyond_money_column_is_rejected() {
        let line = input("111", 1, Some(dec!(10000000000.00)), None);
        let err = NewOrder::plan(header(), vec![line], catalog).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn final_price_beyond_money_column_is_rejected() {
        let err = OrderItem::priced(bc("111"), i32::MAX, dec!(9999999999.99), dec!(999.99)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("final_price"), "{msg}"),
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn order_total_beyond_money_column_is_rejected() {
        let lines = vec![
            input("111", 1, Some(dec!(9999999999.99)), None),
            input("222", 1, Some(dec!(0.01)), None),
        ];
        let err = NewOrder::plan(header(), lines, catalog).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_keeps_captured_price_when_omitted() {
        let order = stored(vec![OrderItem::priced(bc("111"), 1, dec!(8.00), dec!(0)).unwrap()]);
        let update = order
            .plan_update(header(), vec![input("111", 2, None, None)], ExpectedVersion::Any, catalog)
            .unwrap();
        assert_eq!(update.changes.to_update.len(), 1);
        assert_eq!(update.changes.to_update[0].price_at_order, dec!(8.00));
        assert_eq!(update.total_amount, dec!(16.00));
        assert_eq!(update.base_version, 1);
    }

    #[test]
    fn diff_round_trip_against_stored_lines() {
        let order = stored(vec![
            OrderItem::priced(bc("111"), 5, dec!(10.00), dec!(0)).unwrap(),
            OrderItem::priced(bc("222"), 3, dec!(4.00), dec!(0)).unwrap(),
        ]);
        let update = order
            .plan_update(
                header(),
                vec![input("222", 3, Some(dec!(4.00)), None), input("333", 2, Some(dec!(1.50)), None)],
                ExpectedVersion::Exact(1),
                catalog,
            )
            .unwrap();

        assert_eq!(update.changes.to_delete, vec![bc("111")]);
        assert!(update.changes.to_update.is_empty());
        assert_eq!(update.changes.to_insert.len(), 1);
        assert_eq!(update.total_amount, dec!(15.00));
    }

    #[test]
    fn item_removal_excludes_line_from_total() {
        let order = stored(vec![
            OrderItem::priced(bc("111"), 1, dec!(10.00), dec!(10)).unwrap(),
            OrderItem::priced(bc("222"), 2, dec!(4.00), dec!(0)).unwrap(),
        ]);
        assert_eq!(order.total_amount, dec!(19.00));

        let update = order.plan_item_removal(&bc("111")).unwrap();
        assert_eq!(update.total_amount, dec!(8.00));
        assert!(matches!(
            order.plan_item_removal(&bc("333")),
            Err(DomainError::NotFound(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: after any update the total equals the sum of final prices,
        /// and resubmitting the same payload changes nothing.
        #[test]
        fn total_is_sum_of_final_prices(
            lines in prop::collection::btree_map(
                prop::sample::select(vec!["111", "222", "333"]),
                (0i32..100, prop::option::of(0i64..100_000), prop::option::of(0i64..50_000)),
                0..4,
            )
        ) {
            let inputs: Vec<OrderLineInput> = lines
                .into_iter()
                .map(|(b, (q, price, markup))| {
                    input(b, q, price.map(|c| Decimal::new(c, 2)), markup.map(|m| Decimal::new(m, 2)))
                })
                .collect();

            let order = stored(vec![OrderItem::priced(bc("111"), 1, dec!(3), dec!(0)).unwrap()]);
            let update = order
                .plan_update(header(), inputs.clone(), ExpectedVersion::Any, catalog)
                .unwrap();

            let sum: Decimal = update.changes.result.iter().map(|i| i.final_price).sum();
            prop_assert_eq!(update.total_amount, sum);

            let after = update.into_order(2);
            let again = after
                .plan_update(after.header.clone(), inputs, ExpectedVersion::Exact(2), catalog)
                .unwrap();
            prop_assert!(again.changes.is_empty());
            prop_assert_eq!(again.total_amount, after.total_amount);
        }
    }
}
