//! Postgres-backed entity store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` | `Conflict` | Duplicate barcode, tax id or username |
//! | `23503` (delete) | `InUse` | Product or party still referenced by line items or headers |
//! | `23503` (other) | `MissingReference` | Header or item points at an unknown party or product |
//! | Any other | `Database` | Connection failures, decode errors, etc. |
//!
//! ## Versioning
//!
//! Header updates bump `version` in the same `UPDATE` that checks it against
//! the version the line diff was planned from, so two writers racing on one
//! header cannot both commit against the same version. Line changes and the
//! new total are written in the same transaction, and the returned header is
//! read back from the rows that transaction wrote.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockyard_auth::{Role, User};
use stockyard_core::{Barcode, DeliveryId, DomainError, OrderId, TaxId, UserId};
use stockyard_inventory::{LineItem, StockEntry, StockLedger, total_amount};
use stockyard_parties::{ContactInfo, Party, PartyKind};
use stockyard_products::Product;
use stockyard_purchasing::{Delivery, DeliveryHeader, DeliveryItem, DeliveryUpdate, NewDelivery};
use stockyard_sales::{NewOrder, Order, OrderHeader, OrderItem, OrderUpdate};

use super::{EntityCounts, StoreError, StoreResult, WarehouseStore};

/// Postgres-backed entity store.
///
/// Items are returned ordered by barcode.
#[derive(Debug, Clone)]
pub struct PostgresWarehouseStore {
    pool: Arc<PgPool>,
}

impl PostgresWarehouseStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&*self.pool).await
    }
}

#[async_trait::async_trait]
impl WarehouseStore for PostgresWarehouseStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT barcode, name, category, unit, unit_price, storage_days FROM products ORDER BY name",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn get_product(&self, barcode: &Barcode) -> StoreResult<Option<Product>> {
        let row = sqlx::query(
            "SELECT barcode, name, category, unit, unit_price, storage_days FROM products WHERE barcode = $1",
        )
        .bind(barcode.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip_all, fields(barcode = %product.barcode), err)]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (barcode, name, category, unit, unit_price, storage_days)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.barcode.as_str())
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(product.unit.as_str())
        .bind(product.unit_price)
        .bind(product.storage_days)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(barcode = %product.barcode), err)]
    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, category = $3, unit = $4, unit_price = $5, storage_days = $6
            WHERE barcode = $1
            "#,
        )
        .bind(product.barcode.as_str())
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(product.unit.as_str())
        .bind(product.unit_price)
        .bind(product.storage_days)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {}", product.barcode)));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(barcode = %barcode), err)]
    async fn delete_product(&self, barcode: &Barcode) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE barcode = $1")
            .bind(barcode.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {barcode}")));
        }
        Ok(())
    }

    async fn list_parties(&self, kind: PartyKind) -> StoreResult<Vec<Party>> {
        let sql = format!("SELECT {PARTY_COLUMNS} FROM {} ORDER BY company_name", party_table(kind));
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_parties", e))?;

        rows.iter().map(|row| party_from_row(row, kind)).collect()
    }

    async fn get_party(&self, kind: PartyKind, tax_id: &TaxId) -> StoreResult<Option<Party>> {
        let sql = format!("SELECT {PARTY_COLUMNS} FROM {} WHERE tax_id = $1", party_table(kind));
        let row = sqlx::query(&sql)
            .bind(tax_id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_party", e))?;

        row.as_ref().map(|row| party_from_row(row, kind)).transpose()
    }

    #[instrument(skip_all, fields(kind = %party.kind, tax_id = %party.tax_id), err)]
    async fn insert_party(&self, party: &Party) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} ({PARTY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            party_table(party.kind)
        );
        bind_party(sqlx::query(&sql), party)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_party", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(kind = %party.kind, tax_id = %party.tax_id), err)]
    async fn update_party(&self, party: &Party) -> StoreResult<()> {
        let sql = format!(
            r#"
            UPDATE {}
            SET company_name = $2, contact_person = $3, city = $4, region = $5, street = $6,
                mobile_phone = $7, email = $8, bik = $9, settlement_account = $10,
                correspondent_account = $11
            WHERE tax_id = $1
            "#,
            party_table(party.kind)
        );
        let result = bind_party(sqlx::query(&sql), party)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_party", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{} {}", party.kind, party.tax_id)));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(kind = %kind, tax_id = %tax_id), err)]
    async fn delete_party(&self, kind: PartyKind, tax_id: &TaxId) -> StoreResult<()> {
        let sql = format!("DELETE FROM {} WHERE tax_id = $1", party_table(kind));
        let result = sqlx::query(&sql)
            .bind(tax_id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_party", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{kind} {tax_id}")));
        }
        Ok(())
    }

    async fn list_deliveries(&self) -> StoreResult<Vec<Delivery>> {
        let rows = sqlx::query(
            r#"
            SELECT id, supplier_tax_id, status, delivery_date, total_amount, version
            FROM deliveries
            ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_deliveries", e))?;

        let mut items = load_delivery_items(&*self.pool, None).await?;
        rows.iter()
            .map(|row| {
                let id: i32 = row.try_get("id")?;
                delivery_from_row(row, items.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn get_delivery(&self, id: DeliveryId) -> StoreResult<Option<Delivery>> {
        let row = sqlx::query(
            r#"
            SELECT id, supplier_tax_id, status, delivery_date, total_amount, version
            FROM deliveries
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_delivery", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = load_delivery_items(&*self.pool, Some(id))
            .await?
            .remove(&id.get())
            .unwrap_or_default();
        delivery_from_row(&row, items).map(Some)
    }

    #[instrument(skip_all, fields(supplier = %delivery.header.supplier, items = delivery.items.len()), err)]
    async fn insert_delivery(&self, delivery: &NewDelivery) -> StoreResult<Delivery> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO deliveries (supplier_tax_id, status, delivery_date, total_amount, version)
            VALUES ($1, $2, $3, $4, 1)
            RETURNING id
            "#,
        )
        .bind(delivery.header.supplier.as_str())
        .bind(delivery.header.status.as_str())
        .bind(delivery.header.delivery_date)
        .bind(delivery.total_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_delivery", e))?;
        let id: i32 = row.try_get("id")?;

        for item in &delivery.items {
            insert_delivery_item(&mut tx, id, item).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Delivery {
            id: DeliveryId::new(id),
            header: delivery.header.clone(),
            total_amount: delivery.total_amount,
            version: 1,
            items: delivery.items.clone(),
        })
    }

    #[instrument(skip_all, fields(delivery_id = %update.id, base_version = update.base_version), err)]
    async fn apply_delivery_update(&self, update: &DeliveryUpdate) -> StoreResult<Delivery> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            UPDATE deliveries
            SET supplier_tax_id = $2, status = $3, delivery_date = $4, total_amount = $5,
                version = version + 1
            WHERE id = $1 AND version = $6
            RETURNING id, supplier_tax_id, status, delivery_date, total_amount, version
            "#,
        )
        .bind(update.id.get())
        .bind(update.header.supplier.as_str())
        .bind(update.header.status.as_str())
        .bind(update.header.delivery_date)
        .bind(update.total_amount)
        .bind(update.base_version as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_delivery", e))?;

        let Some(row) = row else {
            let err = missing_or_stale(&mut tx, "deliveries", update.id.get(), "delivery").await;
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(err);
        };

        for barcode in &update.changes.to_delete {
            sqlx::query("DELETE FROM delivery_items WHERE delivery_id = $1 AND barcode = $2")
                .bind(update.id.get())
                .bind(barcode.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_delivery_item", e))?;
        }
        for item in &update.changes.to_update {
            sqlx::query(
                r#"
                UPDATE delivery_items
                SET quantity = $3, unit_price = $4, production_date = $5, expiration_date = $6
                WHERE delivery_id = $1 AND barcode = $2
                "#,
            )
            .bind(update.id.get())
            .bind(item.barcode.as_str())
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.production_date)
            .bind(item.expiration_date)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_delivery_item", e))?;
        }
        for item in &update.changes.to_insert {
            insert_delivery_item(&mut tx, update.id.get(), item).await?;
        }

        let items = load_delivery_items(&mut *tx, Some(update.id))
            .await?
            .remove(&update.id.get())
            .unwrap_or_default();
        let stored = delivery_from_row(&row, items)?;
        ensure_total_matches("delivery", update.id.get(), stored.total_amount, &stored.items)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(stored)
    }

    #[instrument(skip_all, fields(delivery_id = %id), err)]
    async fn delete_delivery(&self, id: DeliveryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM deliveries WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_delivery", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("delivery {id}")));
        }
        Ok(())
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_tax_id, order_date, status, total_amount, version
            FROM orders
            ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let mut items = load_order_items(&*self.pool, None).await?;
        rows.iter()
            .map(|row| {
                let id: i32 = row.try_get("id")?;
                order_from_row(row, items.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_tax_id, order_date, status, total_amount, version
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = load_order_items(&*self.pool, Some(id))
            .await?
            .remove(&id.get())
            .unwrap_or_default();
        order_from_row(&row, items).map(Some)
    }

    #[instrument(skip_all, fields(customer = %order.header.customer, items = order.items.len()), err)]
    async fn insert_order(&self, order: &NewOrder) -> StoreResult<Order> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO orders (customer_tax_id, order_date, status, total_amount, version)
            VALUES ($1, $2, $3, $4, 1)
            RETURNING id
            "#,
        )
        .bind(order.header.customer.as_str())
        .bind(order.header.order_date)
        .bind(order.header.status.as_str())
        .bind(order.total_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        let id: i32 = row.try_get("id")?;

        for item in &order.items {
            insert_order_item(&mut tx, id, item).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Order {
            id: OrderId::new(id),
            header: order.header.clone(),
            total_amount: order.total_amount,
            version: 1,
            items: order.items.clone(),
        })
    }

    #[instrument(skip_all, fields(order_id = %update.id, base_version = update.base_version), err)]
    async fn apply_order_update(&self, update: &OrderUpdate) -> StoreResult<Order> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            UPDATE orders
            SET customer_tax_id = $2, order_date = $3, status = $4, total_amount = $5,
                version = version + 1
            WHERE id = $1 AND version = $6
            RETURNING id, customer_tax_id, order_date, status, total_amount, version
            "#,
        )
        .bind(update.id.get())
        .bind(update.header.customer.as_str())
        .bind(update.header.order_date)
        .bind(update.header.status.as_str())
        .bind(update.total_amount)
        .bind(update.base_version as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        let Some(row) = row else {
            let err = missing_or_stale(&mut tx, "orders", update.id.get(), "order").await;
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(err);
        };

        for barcode in &update.changes.to_delete {
            sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND barcode = $2")
                .bind(update.id.get())
                .bind(barcode.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_order_item", e))?;
        }
        for item in &update.changes.to_update {
            sqlx::query(
                r#"
                UPDATE order_items
                SET quantity = $3, markup_percent = $4, price_at_order = $5, final_price = $6
                WHERE order_id = $1 AND barcode = $2
                "#,
            )
            .bind(update.id.get())
            .bind(item.barcode.as_str())
            .bind(item.quantity)
            .bind(item.markup_percent)
            .bind(item.price_at_order)
            .bind(item.final_price)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_order_item", e))?;
        }
        for item in &update.changes.to_insert {
            insert_order_item(&mut tx, update.id.get(), item).await?;
        }

        let items = load_order_items(&mut *tx, Some(update.id))
            .await?
            .remove(&update.id.get())
            .unwrap_or_default();
        let stored = order_from_row(&row, items)?;
        ensure_total_matches("order", update.id.get(), stored.total_amount, &stored.items)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(stored)
    }

    #[instrument(skip_all, fields(order_id = %id), err)]
    async fn delete_order(&self, id: OrderId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("order {id}")));
        }
        Ok(())
    }

    async fn stock_ledger(&self, barcode: Option<&Barcode>) -> StoreResult<StockLedger> {
        let filter = barcode.map(|b| b.as_str());

        let inbound = sqlx::query(
            r#"
            SELECT i.barcode, i.quantity, d.status
            FROM delivery_items i
            JOIN deliveries d ON d.id = i.delivery_id
            WHERE ($1::VARCHAR IS NULL OR i.barcode = $1)
            "#,
        )
        .bind(filter)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_inbound", e))?;

        let outbound = sqlx::query(
            r#"
            SELECT i.barcode, i.quantity, o.status
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE ($1::VARCHAR IS NULL OR i.barcode = $1)
            "#,
        )
        .bind(filter)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_outbound", e))?;

        Ok(StockLedger {
            inbound: inbound.iter().map(stock_entry_from_row).collect::<StoreResult<_>>()?,
            outbound: outbound.iter().map(stock_entry_from_row).collect::<StoreResult<_>>()?,
        })
    }

    async fn counts(&self) -> StoreResult<EntityCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products)   AS products,
                (SELECT COUNT(*) FROM orders)     AS orders,
                (SELECT COUNT(*) FROM deliveries) AS deliveries,
                (SELECT COUNT(*) FROM customers)  AS customers,
                (SELECT COUNT(*) FROM suppliers)  AS suppliers
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("counts", e))?;

        Ok(EntityCounts {
            products: row.try_get("products")?,
            orders: row.try_get("orders")?,
            deliveries: row.try_get("deliveries")?,
            customers: row.try_get("customers")?,
            suppliers: row.try_get("suppliers")?,
        })
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query("SELECT id, username, password_hash, role FROM users ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter().map(user_from_row).collect()
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, password_hash, role FROM users WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, password_hash, role FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_username", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, password_hash), err)]
    async fn insert_user(&self, username: &str, password_hash: &str, role: Role) -> StoreResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        Ok(User {
            id: UserId::new(row.try_get("id")?),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
        })
    }

    #[instrument(skip_all, fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, password_hash = $3, role = $4 WHERE id = $1",
        )
        .bind(user.id.get())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn count_users(&self) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;
        Ok(row.try_get("n")?)
    }
}

const PARTY_COLUMNS: &str = "tax_id, company_name, contact_person, city, region, street, \
     mobile_phone, email, bik, settlement_account, correspondent_account";

fn party_table(kind: PartyKind) -> &'static str {
    match kind {
        PartyKind::Supplier => "suppliers",
        PartyKind::Customer => "customers",
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

/// Bind a party in `PARTY_COLUMNS` order.
fn bind_party<'q>(query: PgQuery<'q>, party: &'q Party) -> PgQuery<'q> {
    let c = &party.contact;
    query
        .bind(party.tax_id.as_str())
        .bind(&party.company_name)
        .bind(&c.contact_person)
        .bind(&c.city)
        .bind(&c.region)
        .bind(&c.street)
        .bind(&c.mobile_phone)
        .bind(&c.email)
        .bind(&c.bik)
        .bind(&c.settlement_account)
        .bind(&c.correspondent_account)
}

/// Refuse to commit a header whose total disagrees with its stored lines.
fn ensure_total_matches<T: LineItem>(
    what: &str,
    id: i32,
    total: Decimal,
    items: &[T],
) -> StoreResult<()> {
    match total_amount(items) {
        Ok(sum) if sum == total => Ok(()),
        _ => Err(StoreError::Conflict(format!(
            "{what} {id} total does not match its stored items"
        ))),
    }
}

/// After a guarded `UPDATE` matched nothing: the header is gone, or its
/// version moved on.
async fn missing_or_stale(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    id: i32,
    what: &str,
) -> StoreError {
    let sql = format!("SELECT version FROM {table} WHERE id = $1");
    match sqlx::query(&sql).bind(id).fetch_optional(&mut **tx).await {
        Ok(Some(row)) => {
            let current: i64 = row.try_get("version").unwrap_or_default();
            StoreError::Conflict(format!(
                "{what} {id} was modified concurrently (version {current})"
            ))
        }
        Ok(None) => StoreError::NotFound(format!("{what} {id}")),
        Err(e) => map_sqlx_error("check_version", e),
    }
}

async fn load_delivery_items<'e, E>(
    executor: E,
    id: Option<DeliveryId>,
) -> StoreResult<HashMap<i32, Vec<DeliveryItem>>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT delivery_id, barcode, quantity, unit_price, production_date, expiration_date
        FROM delivery_items
        WHERE ($1::INTEGER IS NULL OR delivery_id = $1)
        ORDER BY delivery_id, barcode
        "#,
    )
    .bind(id.map(|id| id.get()))
    .fetch_all(executor)
    .await
    .map_err(|e| map_sqlx_error("load_delivery_items", e))?;

    let mut items: HashMap<i32, Vec<DeliveryItem>> = HashMap::new();
    for row in rows {
        let delivery_id: i32 = row.try_get("delivery_id")?;
        items.entry(delivery_id).or_default().push(DeliveryItem {
            barcode: parse_column(&row, "barcode")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            production_date: row.try_get("production_date")?,
            expiration_date: row.try_get("expiration_date")?,
        });
    }
    Ok(items)
}

async fn load_order_items<'e, E>(
    executor: E,
    id: Option<OrderId>,
) -> StoreResult<HashMap<i32, Vec<OrderItem>>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT order_id, barcode, quantity, markup_percent, price_at_order, final_price
        FROM order_items
        WHERE ($1::INTEGER IS NULL OR order_id = $1)
        ORDER BY order_id, barcode
        "#,
    )
    .bind(id.map(|id| id.get()))
    .fetch_all(executor)
    .await
    .map_err(|e| map_sqlx_error("load_order_items", e))?;

    let mut items: HashMap<i32, Vec<OrderItem>> = HashMap::new();
    for row in rows {
        let order_id: i32 = row.try_get("order_id")?;
        items.entry(order_id).or_default().push(OrderItem {
            barcode: parse_column(&row, "barcode")?,
            quantity: row.try_get("quantity")?,
            markup_percent: row.try_get("markup_percent")?,
            price_at_order: row.try_get("price_at_order")?,
            final_price: row.try_get("final_price")?,
        });
    }
    Ok(items)
}

async fn insert_delivery_item(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: i32,
    item: &DeliveryItem,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO delivery_items
            (delivery_id, barcode, quantity, unit_price, production_date, expiration_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(delivery_id)
    .bind(item.barcode.as_str())
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.production_date)
    .bind(item.expiration_date)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_delivery_item", e))?;
    Ok(())
}

async fn insert_order_item(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i32,
    item: &OrderItem,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items
            (order_id, barcode, quantity, markup_percent, price_at_order, final_price)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(order_id)
    .bind(item.barcode.as_str())
    .bind(item.quantity)
    .bind(item.markup_percent)
    .bind(item.price_at_order)
    .bind(item.final_price)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_order_item", e))?;
    Ok(())
}

/// Decode a text column through the domain type's parser.
fn parse_column<T>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T: FromStr<Err = DomainError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: DomainError| {
        StoreError::Database(sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        barcode: parse_column(row, "barcode")?,
        name: row.try_get("name")?,
        category: parse_column(row, "category")?,
        unit: parse_column(row, "unit")?,
        unit_price: row.try_get("unit_price")?,
        storage_days: row.try_get("storage_days")?,
    })
}

fn party_from_row(row: &PgRow, kind: PartyKind) -> StoreResult<Party> {
    Ok(Party {
        tax_id: parse_column(row, "tax_id")?,
        kind,
        company_name: row.try_get("company_name")?,
        contact: ContactInfo {
            contact_person: row.try_get("contact_person")?,
            city: row.try_get("city")?,
            region: row.try_get("region")?,
            street: row.try_get("street")?,
            mobile_phone: row.try_get("mobile_phone")?,
            email: row.try_get("email")?,
            bik: row.try_get("bik")?,
            settlement_account: row.try_get("settlement_account")?,
            correspondent_account: row.try_get("correspondent_account")?,
        },
    })
}

fn delivery_from_row(row: &PgRow, items: Vec<DeliveryItem>) -> StoreResult<Delivery> {
    let version: i64 = row.try_get("version")?;
    Ok(Delivery {
        id: DeliveryId::new(row.try_get("id")?),
        header: DeliveryHeader {
            supplier: parse_column(row, "supplier_tax_id")?,
            status: parse_column(row, "status")?,
            delivery_date: row.try_get("delivery_date")?,
        },
        total_amount: row.try_get("total_amount")?,
        version: version as u64,
        items,
    })
}

fn order_from_row(row: &PgRow, items: Vec<OrderItem>) -> StoreResult<Order> {
    let version: i64 = row.try_get("version")?;
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        header: OrderHeader {
            customer: parse_column(row, "customer_tax_id")?,
            order_date: row.try_get("order_date")?,
            status: parse_column(row, "status")?,
        },
        total_amount: row.try_get("total_amount")?,
        version: version as u64,
        items,
    })
}

fn stock_entry_from_row(row: &PgRow) -> StoreResult<StockEntry> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(StockEntry::new(
        parse_column(row, "barcode")?,
        quantity,
        parse_column(row, "status")?,
    ))
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        role: parse_column(row, "role")?,
    })
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = format!("{operation}: {}", db_err.message());
        match db_err.code().as_deref() {
            Some("23505") => return StoreError::Conflict(msg),
            Some("23503") if operation.starts_with("delete") => return StoreError::InUse(msg),
            Some("23503") => return StoreError::MissingReference(msg),
            _ => {}
        }
    }
    tracing::error!(operation, error = %err, "database operation failed");
    StoreError::Database(err)
}
