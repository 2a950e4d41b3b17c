use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockyard_core::money::{checked_mul, ensure_money};
use stockyard_core::{
    AggregateRoot, Barcode, DeliveryId, DomainError, DomainResult, ExpectedVersion, Status, TaxId,
};
use stockyard_inventory::{LineChanges, LineItem, diff_lines, remove_line, total_amount};

/// One product received in a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryItem {
    pub barcode: Barcode,
    pub quantity: i32,
    /// Purchase price per unit; a missing price counts as zero.
    pub unit_price: Option<Decimal>,
    pub production_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
}

impl LineItem for DeliveryItem {
    fn barcode(&self) -> &Barcode {
        &self.barcode
    }

    fn quantity(&self) -> i32 {
        self.quantity
    }

    fn amount(&self) -> DomainResult<Decimal> {
        let price = self.unit_price.unwrap_or(Decimal::ZERO);
        checked_mul(&format!("amount for {}", self.barcode), Decimal::from(self.quantity), price)
    }

    fn validate(&self) -> DomainResult<()> {
        if self.quantity < 0 {
            return Err(DomainError::validation(format!(
                "quantity for {} must not be negative",
                self.barcode
            )));
        }
        if let Some(price) = self.unit_price {
            ensure_money("unit_price", price)?;
        }
        if let (Some(produced), Some(expires)) = (self.production_date, self.expiration_date) {
            if expires < produced {
                return Err(DomainError::validation(format!(
                    "expiration_date for {} precedes production_date",
                    self.barcode
                )));
            }
        }
        Ok(())
    }
}

/// Mutable header fields of a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryHeader {
    pub supplier: TaxId,
    pub status: Status,
    pub delivery_date: Option<NaiveDate>,
}

/// Aggregate root: Delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    #[serde(flatten)]
    pub header: DeliveryHeader,
    /// Always equal to the sum of item amounts.
    pub total_amount: Decimal,
    pub version: u64,
    pub items: Vec<DeliveryItem>,
}

impl AggregateRoot for Delivery {
    type Id = DeliveryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// A validated delivery ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDelivery {
    pub header: DeliveryHeader,
    pub items: Vec<DeliveryItem>,
    pub total_amount: Decimal,
}

impl NewDelivery {
    /// Validate the initial item list and compute the total.
    ///
    /// `is_known` reports whether a barcode exists in the catalog.
    pub fn plan(
        header: DeliveryHeader,
        items: Vec<DeliveryItem>,
        is_known: impl Fn(&Barcode) -> bool,
    ) -> DomainResult<Self> {
        ensure_known(&items, &is_known)?;
        let items = diff_lines(&[], items)?.result;
        let total_amount = total_amount(&items)?;
        Ok(Self {
            header,
            items,
            total_amount,
        })
    }
}

/// A planned change to a stored delivery, committed atomically by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryUpdate {
    pub id: DeliveryId,
    pub header: DeliveryHeader,
    pub changes: LineChanges<DeliveryItem>,
    pub total_amount: Decimal,
    /// Version of the delivery the changes were planned against. The store
    /// refuses the write once the stored version has moved past it.
    pub base_version: u64,
}

impl DeliveryUpdate {
    /// The delivery as it reads once this update is committed.
    pub fn into_delivery(self, version: u64) -> Delivery {
        Delivery {
            id: self.id,
            header: self.header,
            total_amount: self.total_amount,
            version,
            items: self.changes.result,
        }
    }
}

impl Delivery {
    /// Reconcile this delivery against a full target header and item list.
    pub fn plan_update(
        &self,
        header: DeliveryHeader,
        items: Vec<DeliveryItem>,
        expected: ExpectedVersion,
        is_known: impl Fn(&Barcode) -> bool,
    ) -> DomainResult<DeliveryUpdate> {
        expected.check(self.version())?;
        ensure_known(&items, &is_known)?;

        let changes = diff_lines(&self.items, items)?;
        let total_amount = total_amount(&changes.result)?;
        Ok(DeliveryUpdate {
            id: self.id,
            header,
            changes,
            total_amount,
            base_version: self.version(),
        })
    }

    /// Drop the line for `barcode` and recompute the total.
    pub fn plan_item_removal(&self, barcode: &Barcode) -> DomainResult<DeliveryUpdate> {
        let remaining = remove_line(&self.items, barcode)?;
        let total_amount = total_amount(&remaining)?;
        Ok(DeliveryUpdate {
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

fn ensure_known(items: &[DeliveryItem], is_known: impl Fn(&Barcode) -> bool) -> DomainResult<()> {
    match items.iter().find(|i| !is_known(&i.barcode)) {
        Some(item) => Err(DomainError::validation(format!(
            "unknown product barcode {}",
            item.barcode
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn bc(s: &str) -> Barcode {
        s.parse().unwrap()
    }

    fn header() -> DeliveryHeader {
        DeliveryHeader {
            supplier: "7701234567".parse().unwrap(),
            status: Status::Pending,
            delivery_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        }
    }

    fn item(b: &str, quantity: i32, unit_price: Option<Decimal>) -> DeliveryItem {
        DeliveryItem {
            barcode: bc(b),
            quantity,
            unit_price,
            production_date: None,
            expiration_date: None,
        }
    }

    fn any_product(_: &Barcode) -> bool {
        true
    }

    fn stored(items: Vec<DeliveryItem>) -> Delivery {
        let total_amount = total_amount(&items).unwrap();
        Delivery {
            id: DeliveryId::new(7),
            header: header(),
            total_amount,
            version: 3,
            items,
        }
    }

    #[test]
    fn create_computes_total() {
        let planned = NewDelivery::plan(
            header(),
            vec![item("111", 10, Some(dec!(2.50))), item("222", 4, Some(dec!(5.00)))],
            any_product,
        )
        .unwrap();
        assert_eq!(planned.total_amount, dec!(45.00));
    }

    #[test]
    fn create_rejects_unknown_product() {
        let err = NewDelivery::plan(header(), vec![item("999", 1, None)], |b| b.as_str() != "999")
            .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("999") => {}
            other => panic!("Expected unknown-product validation error, got {other:?}"),
        }
    }

    #[test]
    fn expiration_before_production_is_rejected() {
        let mut bad = item("111", 1, None);
        bad.production_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        bad.expiration_date = NaiveDate::from_ymd_opt(2024, 4, 1);
        assert!(NewDelivery::plan(header(), vec![bad], any_product).is_err());
    }

    #[test]
    fn unit_price_beyond_money_column_is_rejected() {
        let err = NewDelivery::plan(header(), vec![item("111", 1, Some(dec!(10000000000.00)))], any_product)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn oversized_total_is_a_validation_error() {
        let lines = vec![
            item("111", 1_000_000, Some(dec!(9999999999.99))),
            item("222", 1, Some(dec!(1.00))),
        ];
        let err = NewDelivery::plan(header(), lines, any_product).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("total_amount"), "{msg}"),
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn update_recomputes_total_from_result() {
        let delivery = stored(vec![item("111", 10, Some(dec!(2.50))), item("222", 4, Some(dec!(5.00)))]);
        let update = delivery
            .plan_update(
                header(),
                vec![item("222", 4, Some(dec!(5.00))), item("333", 2, None)],
                ExpectedVersion::Any,
                any_product,
            )
            .unwrap();

        assert_eq!(update.changes.to_delete, vec![bc("111")]);
        assert_eq!(update.changes.to_insert.len(), 1);
        assert_eq!(update.total_amount, dec!(20.00));
    }

    #[test]
    fn stale_version_is_a_conflict() {
        let delivery = stored(vec![]);
        let err = delivery
            .plan_update(header(), vec![], ExpectedVersion::Exact(2), any_product)
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn unversioned_update_still_pins_the_base_version() {
        let delivery = stored(vec![item("111", 1, Some(dec!(1.00)))]);
        let update = delivery
            .plan_update(header(), vec![item("222", 1, Some(dec!(2.00)))], ExpectedVersion::Any, any_product)
            .unwrap();
        assert_eq!(update.base_version, 3);
    }

    #[test]
    fn item_removal_recomputes_total() {
        let delivery = stored(vec![item("111", 10, Some(dec!(2.50))), item("222", 4, Some(dec!(5.00)))]);
        let update = delivery.plan_item_removal(&bc("111")).unwrap();
        assert_eq!(update.total_amount, dec!(20.00));
        assert_eq!(update.base_version, 3);

        let after = update.into_delivery(4);
        assert_eq!(after.items, vec![item("222", 4, Some(dec!(5.00)))]);
    }

    #[test]
    fn removing_missing_item_is_not_found() {
        let delivery = stored(vec![item("111", 1, None)]);
        assert!(matches!(
            delivery.plan_item_removal(&bc("222")),
            Err(DomainError::NotFound(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: after any update the total equals sum(quantity * (unit_price or 0)).
        #[test]
        fn total_matches_items_after_update(
            lines in prop::collection::btree_map("[0-9]{3}", (0i32..100, prop::option::of(0i64..10_000)), 0..6)
        ) {
            let items: Vec<DeliveryItem> = lines
                .into_iter()
                .map(|(b, (q, cents))| item(&b, q, cents.map(|c| Decimal::new(c, 2))))
                .collect();
            let update = stored(vec![item("111", 1, Some(dec!(1)))])
                .plan_update(header(), items.clone(), ExpectedVersion::Any, any_product)
                .unwrap();

            let expected: Decimal = items
                .iter()
                .map(|i| Decimal::from(i.quantity) * i.unit_price.unwrap_or(Decimal::ZERO))
                .sum();
            prop_assert_eq!(update.total_amount, expected);
        }
    }
}
