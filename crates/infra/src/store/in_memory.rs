use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockyard_auth::{Role, User};
use stockyard_core::{Barcode, DeliveryId, Entity, OrderId, TaxId, UserId};
use stockyard_inventory::{StockEntry, StockLedger};
use stockyard_parties::{Party, PartyKind};
use stockyard_products::Product;
use stockyard_purchasing::{Delivery, DeliveryUpdate, NewDelivery};
use stockyard_sales::{NewOrder, Order, OrderUpdate};

use super::{EntityCounts, StoreError, StoreResult, WarehouseStore};

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<Barcode, Product>,
    suppliers: BTreeMap<TaxId, Party>,
    customers: BTreeMap<TaxId, Party>,
    deliveries: BTreeMap<DeliveryId, Delivery>,
    orders: BTreeMap<OrderId, Order>,
    users: BTreeMap<UserId, User>,
    last_delivery_id: i32,
    last_order_id: i32,
    last_user_id: i32,
}

impl Tables {
    fn parties(&self, kind: PartyKind) -> &BTreeMap<TaxId, Party> {
        match kind {
            PartyKind::Supplier => &self.suppliers,
            PartyKind::Customer => &self.customers,
        }
    }

    fn parties_mut(&mut self, kind: PartyKind) -> &mut BTreeMap<TaxId, Party> {
        match kind {
            PartyKind::Supplier => &mut self.suppliers,
            PartyKind::Customer => &mut self.customers,
        }
    }

    fn ensure_party(&self, kind: PartyKind, tax_id: &TaxId) -> StoreResult<()> {
        if self.parties(kind).contains_key(tax_id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference(format!("{kind} {tax_id}")))
        }
    }

    fn ensure_products<'a>(&self, barcodes: impl IntoIterator<Item = &'a Barcode>) -> StoreResult<()> {
        match barcodes.into_iter().find(|b| !self.products.contains_key(*b)) {
            Some(missing) => Err(StoreError::MissingReference(format!("product {missing}"))),
            None => Ok(()),
        }
    }

    fn product_in_use(&self, barcode: &Barcode) -> bool {
        self.deliveries
            .values()
            .any(|d| d.items.iter().any(|i| &i.barcode == barcode))
            || self
                .orders
                .values()
                .any(|o| o.items.iter().any(|i| &i.barcode == barcode))
    }

    fn party_in_use(&self, kind: PartyKind, tax_id: &TaxId) -> bool {
        match kind {
            PartyKind::Supplier => self.deliveries.values().any(|d| &d.header.supplier == tax_id),
            PartyKind::Customer => self.orders.values().any(|o| &o.header.customer == tax_id),
        }
    }

    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

/// In-memory entity store for tests/dev.
///
/// Every write takes the table lock once, validates references and versions,
/// then mutates; a failed write leaves the tables untouched.
#[derive(Debug, Default)]
pub struct InMemoryWarehouseStore {
    tables: RwLock<Tables>,
}

impl InMemoryWarehouseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory tables poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory tables poisoned".into()))
    }
}

#[async_trait::async_trait]
impl WarehouseStore for InMemoryWarehouseStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn get_product(&self, barcode: &Barcode) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(barcode).cloned())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.products.contains_key(product.id()) {
            return Err(StoreError::Conflict(format!("product {} already exists", product.barcode)));
        }
        t.products.insert(product.id().clone(), product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.write()?;
        match t.products.get_mut(product.id()) {
            Some(stored) => {
                *stored = product.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("product {}", product.barcode))),
        }
    }

    async fn delete_product(&self, barcode: &Barcode) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.products.contains_key(barcode) {
            return Err(StoreError::NotFound(format!("product {barcode}")));
        }
        if t.product_in_use(barcode) {
            return Err(StoreError::InUse(format!("product {barcode}")));
        }
        t.products.remove(barcode);
        Ok(())
    }

    async fn list_parties(&self, kind: PartyKind) -> StoreResult<Vec<Party>> {
        Ok(self.read()?.parties(kind).values().cloned().collect())
    }

    async fn get_party(&self, kind: PartyKind, tax_id: &TaxId) -> StoreResult<Option<Party>> {
        Ok(self.read()?.parties(kind).get(tax_id).cloned())
    }

    async fn insert_party(&self, party: &Party) -> StoreResult<()> {
        let mut t = self.write()?;
        let table = t.parties_mut(party.kind);
        if table.contains_key(party.id()) {
            return Err(StoreError::Conflict(format!("{} {} already exists", party.kind, party.tax_id)));
        }
        table.insert(party.id().clone(), party.clone());
        Ok(())
    }

    async fn update_party(&self, party: &Party) -> StoreResult<()> {
        let mut t = self.write()?;
        match t.parties_mut(party.kind).get_mut(party.id()) {
            Some(stored) => {
                *stored = party.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("{} {}", party.kind, party.tax_id))),
        }
    }

    async fn delete_party(&self, kind: PartyKind, tax_id: &TaxId) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.parties(kind).contains_key(tax_id) {
            return Err(StoreError::NotFound(format!("{kind} {tax_id}")));
        }
        if t.party_in_use(kind, tax_id) {
            return Err(StoreError::InUse(format!("{kind} {tax_id}")));
        }
        t.parties_mut(kind).remove(tax_id);
        Ok(())
    }

    async fn list_deliveries(&self) -> StoreResult<Vec<Delivery>> {
        Ok(self.read()?.deliveries.values().cloned().collect())
    }

    async fn get_delivery(&self, id: DeliveryId) -> StoreResult<Option<Delivery>> {
        Ok(self.read()?.deliveries.get(&id).cloned())
    }

    async fn insert_delivery(&self, delivery: &NewDelivery) -> StoreResult<Delivery> {
        let mut t = self.write()?;
        t.ensure_party(PartyKind::Supplier, &delivery.header.supplier)?;
        t.ensure_products(delivery.items.iter().map(|i| &i.barcode))?;

        t.last_delivery_id += 1;
        let stored = Delivery {
            id: DeliveryId::new(t.last_delivery_id),
            header: delivery.header.clone(),
            total_amount: delivery.total_amount,
            version: 1,
            items: delivery.items.clone(),
        };
        t.deliveries.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn apply_delivery_update(&self, update: &DeliveryUpdate) -> StoreResult<Delivery> {
        let mut t = self.write()?;
        let current = t
            .deliveries
            .get(&update.id)
            .ok_or_else(|| StoreError::NotFound(format!("delivery {}", update.id)))?;
        if current.version != update.base_version {
            return Err(StoreError::Conflict(format!(
                "delivery {} was modified concurrently (version {})",
                update.id, current.version
            )));
        }
        let version = current.version + 1;

        t.ensure_party(PartyKind::Supplier, &update.header.supplier)?;
        t.ensure_products(update.changes.to_insert.iter().map(|i| &i.barcode))?;

        let updated = update.clone().into_delivery(version);
        t.deliveries.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_delivery(&self, id: DeliveryId) -> StoreResult<()> {
        match self.write()?.deliveries.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("delivery {id}"))),
        }
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        Ok(self.read()?.orders.values().cloned().collect())
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn insert_order(&self, order: &NewOrder) -> StoreResult<Order> {
        let mut t = self.write()?;
        t.ensure_party(PartyKind::Customer, &order.header.customer)?;
        t.ensure_products(order.items.iter().map(|i| &i.barcode))?;

        t.last_order_id += 1;
        let stored = Order {
            id: OrderId::new(t.last_order_id),
            header: order.header.clone(),
            total_amount: order.total_amount,
            version: 1,
            items: order.items.clone(),
        };
        t.orders.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn apply_order_update(&self, update: &OrderUpdate) -> StoreResult<Order> {
        let mut t = self.write()?;
        let current = t
            .orders
            .get(&update.id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", update.id)))?;
        if current.version != update.base_version {
            return Err(StoreError::Conflict(format!(
                "order {} was modified concurrently (version {})",
                update.id, current.version
            )));
        }
        let version = current.version + 1;

        t.ensure_party(PartyKind::Customer, &update.header.customer)?;
        t.ensure_products(update.changes.to_insert.iter().map(|i| &i.barcode))?;

        let updated = update.clone().into_order(version);
        t.orders.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_order(&self, id: OrderId) -> StoreResult<()> {
        match self.write()?.orders.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("order {id}"))),
        }
    }

    async fn stock_ledger(&self, barcode: Option<&Barcode>) -> StoreResult<StockLedger> {
        let t = self.read()?;
        let wanted = |b: &Barcode| barcode.is_none_or(|w| w == b);

        let inbound = t
            .deliveries
            .values()
            .flat_map(|d| {
                d.items
                    .iter()
                    .filter(|i| wanted(&i.barcode))
                    .map(|i| StockEntry::new(i.barcode.clone(), i.quantity, d.header.status))
            })
            .collect();
        let outbound = t
            .orders
            .values()
            .flat_map(|o| {
                o.items
                    .iter()
                    .filter(|i| wanted(&i.barcode))
                    .map(|i| StockEntry::new(i.barcode.clone(), i.quantity, o.header.status))
            })
            .collect();

        Ok(StockLedger { inbound, outbound })
    }

    async fn counts(&self) -> StoreResult<EntityCounts> {
        let t = self.read()?;
        Ok(EntityCounts {
            products: t.products.len() as i64,
            orders: t.orders.len() as i64,
            deliveries: t.deliveries.len() as i64,
            customers: t.customers.len() as i64,
            suppliers: t.suppliers.len() as i64,
        })
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, username: &str, password_hash: &str, role: Role) -> StoreResult<User> {
        let mut t = self.write()?;
        if t.username_taken(username, None) {
            return Err(StoreError::Conflict(format!("user {username} already exists")));
        }
        t.last_user_id += 1;
        let user = User {
            id: UserId::new(t.last_user_id),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.users.contains_key(user.id()) {
            return Err(StoreError::NotFound(format!("user {}", user.id)));
        }
        if t.username_taken(&user.username, Some(user.id)) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.username)));
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        match self.write()?.users.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("user {id}"))),
        }
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.read()?.users.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use stockyard_core::{ExpectedVersion, Status};
    use stockyard_inventory::{counts_as_issued, counts_as_received};
    use stockyard_parties::ContactInfo;
    use stockyard_products::{ProductCategory, ProductUnit};
    use stockyard_purchasing::{DeliveryHeader, DeliveryItem};
    use stockyard_sales::{OrderHeader, OrderLineInput};

    fn bc(s: &str) -> Barcode {
        s.parse().unwrap()
    }

    fn supplier_id() -> TaxId {
        "7701234567".parse().unwrap()
    }

    fn customer_id() -> TaxId {
        "770123456789".parse().unwrap()
    }

    async fn seeded() -> InMemoryWarehouseStore {
        let store = InMemoryWarehouseStore::new();
        for (code, price) in [("111", dec!(2.50)), ("222", dec!(5.00))] {
            let p = Product::new(bc(code), format!("Product {code}"), ProductCategory::Groats, ProductUnit::Pack, Some(price), None)
                .unwrap();
            store.insert_product(&p).await.unwrap();
        }
        store
            .insert_party(&Party::new(supplier_id(), PartyKind::Supplier, "Grain Co", ContactInfo::default()).unwrap())
            .await
            .unwrap();
        store
            .insert_party(&Party::new(customer_id(), PartyKind::Customer, "Corner Shop", ContactInfo::default()).unwrap())
            .await
            .unwrap();
        store
    }

    fn delivery_item(b: &str, quantity: i32, price: Decimal) -> DeliveryItem {
        DeliveryItem {
            barcode: bc(b),
            quantity,
            unit_price: Some(price),
            production_date: None,
            expiration_date: None,
        }
    }

    fn delivery_header(status: Status) -> DeliveryHeader {
        DeliveryHeader {
            supplier: supplier_id(),
            status,
            delivery_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        }
    }

    #[tokio::test]
    async fn delivery_lifecycle_bumps_version() {
        let store = seeded().await;
        let planned = NewDelivery::plan(
            delivery_header(Status::Pending),
            vec![delivery_item("111", 10, dec!(2.50)), delivery_item("222", 4, dec!(5.00))],
            |_| true,
        )
        .unwrap();

        let created = store.insert_delivery(&planned).await.unwrap();
        assert_eq!(created.version, 1);
        assert_eq!(created.total_amount, dec!(45.00));

        let update = created
            .plan_update(
                delivery_header(Status::Completed),
                vec![delivery_item("222", 4, dec!(5.00))],
                ExpectedVersion::Exact(1),
                |_| true,
            )
            .unwrap();
        let updated = store.apply_delivery_update(&update).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.total_amount, dec!(20.00));

        // Replaying the same (now stale) plan is refused.
        assert!(matches!(
            store.apply_delivery_update(&update).await,
            Err(StoreError::Conflict(_))
        ));
    }

    fn order_header(status: Status) -> OrderHeader {
        OrderHeader {
            customer: customer_id(),
            order_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            status,
        }
    }

    fn order_line(b: &str, quantity: i32, price: Decimal) -> OrderLineInput {
        OrderLineInput {
            barcode: bc(b),
            quantity,
            markup_percent: None,
            price_at_order: Some(price),
        }
    }

    #[tokio::test]
    async fn racing_unversioned_delivery_updates_keep_total_in_step() {
        let store = seeded().await;
        let planned = NewDelivery::plan(delivery_header(Status::Pending), vec![], |_| true).unwrap();
        let created = store.insert_delivery(&planned).await.unwrap();

        let first = created
            .plan_update(
                delivery_header(Status::Pending),
                vec![delivery_item("111", 1, dec!(1.00))],
                ExpectedVersion::Any,
                |_| true,
            )
            .unwrap();
        let second = created
            .plan_update(
                delivery_header(Status::Pending),
                vec![delivery_item("222", 1, dec!(2.00))],
                ExpectedVersion::Any,
                |_| true,
            )
            .unwrap();

        store.apply_delivery_update(&first).await.unwrap();
        assert!(matches!(
            store.apply_delivery_update(&second).await,
            Err(StoreError::Conflict(_))
        ));

        let stored = store.get_delivery(created.id).await.unwrap().unwrap();
        assert_eq!(stored.items, vec![delivery_item("111", 1, dec!(1.00))]);
        assert_eq!(stored.total_amount, dec!(1.00));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn racing_unversioned_order_updates_keep_total_in_step() {
        let store = seeded().await;
        let planned = NewOrder::plan(order_header(Status::Pending), vec![], |_| Some(dec!(1))).unwrap();
        let created = store.insert_order(&planned).await.unwrap();

        let first = created
            .plan_update(
                order_header(Status::Pending),
                vec![order_line("111", 1, dec!(1.00))],
                ExpectedVersion::Any,
                |_| Some(dec!(1)),
            )
            .unwrap();
        let second = created
            .plan_update(
                order_header(Status::Pending),
                vec![order_line("222", 1, dec!(2.00))],
                ExpectedVersion::Any,
                |_| Some(dec!(1)),
            )
            .unwrap();

        store.apply_order_update(&first).await.unwrap();
        assert!(matches!(store.apply_order_update(&second).await, Err(StoreError::Conflict(_))));

        let stored = store.get_order(created.id).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.total_amount, dec!(1.00));
    }

    #[tokio::test]
    async fn referenced_product_cannot_be_deleted() {
        let store = seeded().await;
        let planned =
            NewDelivery::plan(delivery_header(Status::Shipped), vec![delivery_item("111", 1, dec!(1))], |_| true)
                .unwrap();
        let created = store.insert_delivery(&planned).await.unwrap();

        assert!(matches!(store.delete_product(&bc("111")).await, Err(StoreError::InUse(_))));
        assert!(matches!(
            store.delete_party(PartyKind::Supplier, &supplier_id()).await,
            Err(StoreError::InUse(_))
        ));

        store.delete_delivery(created.id).await.unwrap();
        store.delete_product(&bc("111")).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_supplier_is_a_missing_reference() {
        let store = seeded().await;
        let mut header = delivery_header(Status::Pending);
        header.supplier = "1111111111".parse().unwrap();
        let planned = NewDelivery::plan(header, vec![], |_| true).unwrap();
        assert!(matches!(
            store.insert_delivery(&planned).await,
            Err(StoreError::MissingReference(_))
        ));
    }

    #[tokio::test]
    async fn ledger_reflects_header_statuses() {
        let store = seeded().await;
        store
            .insert_delivery(
                &NewDelivery::plan(delivery_header(Status::Completed), vec![delivery_item("111", 50, dec!(1))], |_| true)
                    .unwrap(),
            )
            .await
            .unwrap();
        let order = NewOrder::plan(
            OrderHeader {
                customer: customer_id(),
                order_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
                status: Status::Paid,
            },
            vec![OrderLineInput {
                barcode: bc("111"),
                quantity: 12,
                markup_percent: None,
                price_at_order: None,
            }],
            |_| Some(dec!(2.50)),
        )
        .unwrap();
        store.insert_order(&order).await.unwrap();

        let ledger = store.stock_ledger(None).await.unwrap();
        assert_eq!(ledger.level_of(&bc("111")), 38);

        let only_222 = store.stock_ledger(Some(&bc("222"))).await.unwrap();
        assert!(only_222.inbound.is_empty() && only_222.outbound.is_empty());
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = InMemoryWarehouseStore::new();
        let alice = store.insert_user("alice", "hash", Role::Admin).await.unwrap();
        assert!(matches!(
            store.insert_user("alice", "hash", Role::Worker).await,
            Err(StoreError::Conflict(_))
        ));

        let bob = store.insert_user("bob", "hash", Role::Worker).await.unwrap();
        let renamed = User {
            username: "alice".into(),
            ..bob
        };
        assert!(matches!(store.update_user(&renamed).await, Err(StoreError::Conflict(_))));
        assert_eq!(store.count_users().await.unwrap(), 2);
        assert_eq!(
            store.find_user_by_username("alice").await.unwrap().map(|u| u.id),
            Some(alice.id)
        );
    }

    const CODES: [&str; 2] = ["111", "222"];

    type DeliveryLines = Vec<(usize, i32, i64)>;
    type OrderLines = Vec<(usize, i32, i64, u32)>;

    #[derive(Debug, Clone)]
    enum Step {
        Delivery(Status, DeliveryLines),
        Order(Status, OrderLines),
        RacingDeliveries(DeliveryLines, DeliveryLines),
        RacingOrders(OrderLines, OrderLines),
        DropDeliveryLine(usize),
        DropOrderLine(usize),
    }

    fn statuses() -> impl Strategy<Value = Status> {
        prop::sample::select(vec![
            Status::Pending,
            Status::Confirmed,
            Status::Shipped,
            Status::Completed,
            Status::Cancelled,
        ])
    }

    fn delivery_lines() -> impl Strategy<Value = DeliveryLines> {
        prop::collection::btree_map(0usize..2, (0i32..50, 0i64..10_000), 0..=2)
            .prop_map(|m| m.into_iter().map(|(i, (q, c))| (i, q, c)).collect())
    }

    fn order_lines() -> impl Strategy<Value = OrderLines> {
        prop::collection::btree_map(0usize..2, (0i32..50, 0i64..10_000, 0u32..50), 0..=2)
            .prop_map(|m| m.into_iter().map(|(i, (q, c, k))| (i, q, c, k)).collect())
    }

    fn steps() -> impl Strategy<Value = Vec<Step>> {
        let step = prop_oneof![
            (statuses(), delivery_lines()).prop_map(|(s, l)| Step::Delivery(s, l)),
            (statuses(), order_lines()).prop_map(|(s, l)| Step::Order(s, l)),
            (delivery_lines(), delivery_lines()).prop_map(|(a, b)| Step::RacingDeliveries(a, b)),
            (order_lines(), order_lines()).prop_map(|(a, b)| Step::RacingOrders(a, b)),
            (0usize..2).prop_map(Step::DropDeliveryLine),
            (0usize..2).prop_map(Step::DropOrderLine),
        ];
        prop::collection::vec(step, 1..12)
    }

    fn delivery_items(lines: &[(usize, i32, i64)]) -> Vec<DeliveryItem> {
        lines
            .iter()
            .map(|&(i, q, c)| delivery_item(CODES[i], q, Decimal::new(c, 2)))
            .collect()
    }

    fn order_inputs(lines: &[(usize, i32, i64, u32)]) -> Vec<OrderLineInput> {
        lines
            .iter()
            .map(|&(i, q, c, k)| OrderLineInput {
                markup_percent: Some(Decimal::from(k)),
                ..order_line(CODES[i], q, Decimal::new(c, 2))
            })
            .collect()
    }

    async fn check_invariants(store: &InMemoryWarehouseStore) -> Result<(), TestCaseError> {
        let deliveries = store.list_deliveries().await.unwrap();
        let orders = store.list_orders().await.unwrap();

        for d in &deliveries {
            let sum: Decimal = d
                .items
                .iter()
                .map(|i| Decimal::from(i.quantity) * i.unit_price.unwrap_or_default())
                .sum();
            prop_assert_eq!(d.total_amount, sum);
        }
        for o in &orders {
            let sum: Decimal = o.items.iter().map(|i| i.final_price).sum();
            prop_assert_eq!(o.total_amount, sum);
        }

        let ledger = store.stock_ledger(None).await.unwrap();
        for code in CODES {
            let b = bc(code);
            let received: i64 = deliveries
                .iter()
                .filter(|d| counts_as_received(d.header.status))
                .flat_map(|d| &d.items)
                .filter(|i| i.barcode == b)
                .map(|i| i64::from(i.quantity))
                .sum();
            let issued: i64 = orders
                .iter()
                .filter(|o| counts_as_issued(o.header.status))
                .flat_map(|o| &o.items)
                .filter(|i| i.barcode == b)
                .map(|i| i64::from(i.quantity))
                .sum();
            prop_assert_eq!(ledger.level_of(&b), received - issued);
        }
        Ok(())
    }

    async fn run_steps(steps: Vec<Step>) -> Result<(), TestCaseError> {
        let store = seeded().await;
        let list_price = |_: &Barcode| Some(dec!(2.50));
        let delivery = store
            .insert_delivery(&NewDelivery::plan(delivery_header(Status::Completed), vec![], |_| true).unwrap())
            .await
            .unwrap();
        let order = store
            .insert_order(&NewOrder::plan(order_header(Status::Paid), vec![], list_price).unwrap())
            .await
            .unwrap();

        for step in steps {
            let current_delivery = store.get_delivery(delivery.id).await.unwrap().unwrap();
            let current_order = store.get_order(order.id).await.unwrap().unwrap();

            match step {
                Step::Delivery(status, lines) => {
                    let update = current_delivery
                        .plan_update(delivery_header(status), delivery_items(&lines), ExpectedVersion::Any, |_| true)
                        .unwrap();
                    store.apply_delivery_update(&update).await.unwrap();
                }
                Step::Order(status, lines) => {
                    let update = current_order
                        .plan_update(order_header(status), order_inputs(&lines), ExpectedVersion::Any, list_price)
                        .unwrap();
                    store.apply_order_update(&update).await.unwrap();
                }
                Step::RacingDeliveries(a, b) => {
                    let header = current_delivery.header.clone();
                    let first = current_delivery
                        .plan_update(header.clone(), delivery_items(&a), ExpectedVersion::Any, |_| true)
                        .unwrap();
                    let second = current_delivery
                        .plan_update(header, delivery_items(&b), ExpectedVersion::Any, |_| true)
                        .unwrap();
                    store.apply_delivery_update(&first).await.unwrap();
                    let raced = store.apply_delivery_update(&second).await;
                    prop_assert!(matches!(raced, Err(StoreError::Conflict(_))));
                }
                Step::RacingOrders(a, b) => {
                    let header = current_order.header.clone();
                    let first = current_order
                        .plan_update(header.clone(), order_inputs(&a), ExpectedVersion::Any, list_price)
                        .unwrap();
                    let second = current_order
                        .plan_update(header, order_inputs(&b), ExpectedVersion::Any, list_price)
                        .unwrap();
                    store.apply_order_update(&first).await.unwrap();
                    let raced = store.apply_order_update(&second).await;
                    prop_assert!(matches!(raced, Err(StoreError::Conflict(_))));
                }
                Step::DropDeliveryLine(i) => {
                    if let Ok(update) = current_delivery.plan_item_removal(&bc(CODES[i])) {
                        store.apply_delivery_update(&update).await.unwrap();
                    }
                }
                Step::DropOrderLine(i) => {
                    if let Ok(update) = current_order.plan_item_removal(&bc(CODES[i])) {
                        store.apply_order_update(&update).await.unwrap();
                    }
                }
            }

            check_invariants(&store).await?;
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: totals match stored lines and stock matches the status
        /// rules after any mix of updates, racing updates and line removals.
        #[test]
        fn totals_and_stock_hold_across_interleaved_writes(steps in steps()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(run_steps(steps))?;
        }
    }
}
