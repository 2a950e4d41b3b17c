use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockyard_auth::{Role, User};
use stockyard_core::money::round_money;
use stockyard_core::{Barcode, DeliveryId, DomainResult, OrderId, Status, TaxId, UserId};
use stockyard_infra::EntityCounts;
use stockyard_inventory::{CustomerReportRow, LineItem, ProductReportRow, SupplierReportRow};
use stockyard_parties::{ContactInfo, Party};
use stockyard_products::{Product, ProductCategory, ProductUnit};
use stockyard_purchasing::{Delivery, DeliveryItem};
use stockyard_sales::{Order, OrderItem, OrderLineInput};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Partial update; omitted fields keep their stored values.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// Create or replace a product. On update the barcode comes from the path;
/// a body barcode, if sent, must match it.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub barcode: Option<Barcode>,
    pub name: String,
    pub category: ProductCategory,
    pub unit: ProductUnit,
    pub unit_price: Option<Decimal>,
    pub storage_days: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PartyRequest {
    pub tax_id: Option<TaxId>,
    pub company_name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

/// Header fields plus the full target item list.
#[derive(Debug, Deserialize)]
pub struct DeliveryRequest {
    pub id: Option<DeliveryId>,
    pub supplier_tax_id: TaxId,
    pub status: Option<Status>,
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<DeliveryItem>,
    /// Header version the client last saw.
    pub version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub id: Option<OrderId>,
    pub customer_tax_id: TaxId,
    pub order_date: Option<NaiveDate>,
    pub status: Option<Status>,
    #[serde(default)]
    pub items: Vec<OrderLineInput>,
    pub version: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Window plus optional narrowing to one party and one product.
#[derive(Debug, Default, Deserialize)]
pub struct InteractionQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub tax_id: Option<TaxId>,
    pub barcode: Option<Barcode>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// Derived on every read, never stored.
    pub current_stock: i64,
}

pub type PartyView = Party;

#[derive(Debug, Serialize)]
pub struct DeliveryItemView {
    pub barcode: Barcode,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub production_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DeliveryView {
    pub id: DeliveryId,
    pub supplier_tax_id: TaxId,
    pub supplier_name: Option<String>,
    pub status: Status,
    pub delivery_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub version: u64,
    pub items: Vec<DeliveryItemView>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub barcode: Barcode,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub markup_percent: Decimal,
    pub price_at_order: Decimal,
    /// Price of one unit after markup.
    pub unit_final_price: Decimal,
    /// Line total: quantity * price_at_order * (1 + markup_percent / 100),
    /// rounded once. Can differ from quantity * `unit_final_price`.
    pub final_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub customer_tax_id: TaxId,
    pub customer_name: Option<String>,
    pub order_date: NaiveDate,
    pub status: Status,
    pub total_amount: Decimal,
    pub version: u64,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Serialize)]
pub struct DeliverySummary {
    pub id: DeliveryId,
    pub supplier_name: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub status: Status,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub customer_name: Option<String>,
    pub order_date: NaiveDate,
    pub status: Status,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub counts: EntityCounts,
    pub recent_deliveries: Vec<DeliverySummary>,
    pub recent_orders: Vec<OrderSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProductReportView {
    pub product_name: String,
    #[serde(flatten)]
    pub row: ProductReportRow,
}

#[derive(Debug, Serialize)]
pub struct CustomerReportView {
    pub customer_name: Option<String>,
    pub product_name: Option<String>,
    #[serde(flatten)]
    pub row: CustomerReportRow,
}

#[derive(Debug, Serialize)]
pub struct SupplierReportView {
    pub supplier_name: Option<String>,
    pub product_name: Option<String>,
    #[serde(flatten)]
    pub row: SupplierReportRow,
}

// -------------------------
// Mapping helpers
// -------------------------

/// Display names joined onto headers and lines.
#[derive(Debug, Default)]
pub struct Names {
    pub products: BTreeMap<Barcode, String>,
    pub parties: BTreeMap<TaxId, String>,
}

impl Names {
    pub fn new<'a>(
        products: impl IntoIterator<Item = &'a Product>,
        parties: impl IntoIterator<Item = &'a Party>,
    ) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|p| (p.barcode.clone(), p.name.clone()))
                .collect(),
            parties: parties
                .into_iter()
                .map(|p| (p.tax_id.clone(), p.company_name.clone()))
                .collect(),
        }
    }

    fn product(&self, barcode: &Barcode) -> Option<String> {
        self.products.get(barcode).cloned()
    }

    fn party(&self, tax_id: &TaxId) -> Option<String> {
        self.parties.get(tax_id).cloned()
    }
}

impl DeliveryView {
    pub fn build(delivery: Delivery, names: &Names) -> DomainResult<Self> {
        let items = delivery
            .items
            .into_iter()
            .map(|item| {
                Ok(DeliveryItemView {
                    product_name: names.product(&item.barcode),
                    amount: round_money(item.amount()?),
                    barcode: item.barcode,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    production_date: item.production_date,
                    expiration_date: item.expiration_date,
                })
            })
            .collect::<DomainResult<_>>()?;

        Ok(Self {
            id: delivery.id,
            supplier_name: names.party(&delivery.header.supplier),
            supplier_tax_id: delivery.header.supplier,
            status: delivery.header.status,
            delivery_date: delivery.header.delivery_date,
            total_amount: delivery.total_amount,
            version: delivery.version,
            items,
        })
    }
}

impl OrderView {
    pub fn build(order: Order, names: &Names) -> Self {
        let items = order
            .items
            .into_iter()
            .map(|item: OrderItem| OrderItemView {
                product_name: names.product(&item.barcode),
                unit_final_price: item.unit_final_price(),
                barcode: item.barcode,
                quantity: item.quantity,
                markup_percent: item.markup_percent,
                price_at_order: item.price_at_order,
                final_price: item.final_price,
            })
            .collect();

        Self {
            id: order.id,
            customer_name: names.party(&order.header.customer),
            customer_tax_id: order.header.customer,
            order_date: order.header.order_date,
            status: order.header.status,
            total_amount: order.total_amount,
            version: order.version,
            items,
        }
    }
}

impl CustomerReportView {
    pub fn build(row: CustomerReportRow, names: &Names) -> Self {
        Self {
            customer_name: names.party(&row.customer_tax_id),
            product_name: names.product(&row.barcode),
            row,
        }
    }
}

impl SupplierReportView {
    pub fn build(row: SupplierReportRow, names: &Names) -> Self {
        Self {
            supplier_name: names.party(&row.supplier_tax_id),
            product_name: names.product(&row.barcode),
            row,
        }
    }
}

impl DeliverySummary {
    pub fn build(delivery: &Delivery, names: &Names) -> Self {
        Self {
            id: delivery.id,
            supplier_name: names.party(&delivery.header.supplier),
            delivery_date: delivery.header.delivery_date,
            status: delivery.header.status,
            total_amount: delivery.total_amount,
        }
    }
}

impl OrderSummary {
    pub fn build(order: &Order, names: &Names) -> Self {
        Self {
            id: order.id,
            customer_name: names.party(&order.header.customer),
            order_date: order.header.order_date,
            status: order.header.status,
            total_amount: order.total_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockyard_sales::OrderHeader;

    #[test]
    fn order_view_exposes_unit_and_line_prices() {
        let barcode: Barcode = "111".parse().unwrap();
        let item = OrderItem::priced(barcode.clone(), 3, dec!(100.00), dec!(20)).unwrap();
        let order = Order {
            id: OrderId::new(7),
            header: OrderHeader {
                customer: "7701234567".parse().unwrap(),
                order_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                status: Status::Confirmed,
            },
            total_amount: item.final_price,
            version: 1,
            items: vec![item],
        };
        let mut names = Names::default();
        names.products.insert(barcode, "Buckwheat".into());

        let view = OrderView::build(order, &names);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["items"][0]["unit_final_price"], "120.00");
        assert_eq!(json["items"][0]["final_price"], "360.00");
        assert_eq!(json["items"][0]["product_name"], "Buckwheat");
        assert_eq!(json["customer_name"], serde_json::Value::Null);
    }

    #[test]
    fn line_total_is_rounded_once() {
        let item = OrderItem::priced("111".parse().unwrap(), 3, dec!(0.01), dec!(50)).unwrap();
        assert_eq!(item.unit_final_price(), dec!(0.02));
        assert_eq!(item.final_price, dec!(0.05));
    }

    #[test]
    fn unknown_status_is_rejected_at_the_boundary() {
        let body = serde_json::json!({
            "supplier_tax_id": "7701234567",
            "status": "lost",
            "items": []
        });
        assert!(serde_json::from_value::<DeliveryRequest>(body).is_err());
    }

    #[test]
    fn party_contact_fields_are_flat() {
        let body = serde_json::json!({
            "tax_id": "7701234567",
            "company_name": "Grain Co",
            "city": "Kazan",
            "email": "sales@grain.test"
        });
        let req: PartyRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.contact.city.as_deref(), Some("Kazan"));
        assert_eq!(req.contact.email.as_deref(), Some("sales@grain.test"));
    }
}
