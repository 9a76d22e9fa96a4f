//! PostgreSQL implementation of the inventory store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::{
    InventoryStore, MovementFilter, NewFacility, NewMovement, NewOrder, NewReception, OrderWrite,
    ReceptionUpdate, StockWrite,
};
use crate::error::AppResult;
use crate::models::{
    format_order_number, line_cost, normalize_reference, DeliveryType, Facility,
    MovementCategory, MovementDirection, Order, OrderItem, OrderStatus, PaymentStatus, Product,
    ProductKind, ProductSize, ReceptionStatus, StockChange, StockMovement, StockReception,
    StockReceptionItem, StockTarget,
};

/// Inventory store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgInventoryStore {
    db: PgPool,
}

impl PgInventoryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    reference: String,
    name: String,
    kind: String,
    cost_price: Decimal,
    sale_price: Decimal,
    stock: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SizeRow {
    id: Uuid,
    product_id: Uuid,
    label: String,
    stock: i32,
}

#[derive(Debug, FromRow)]
struct FacilityRow {
    id: Uuid,
    name: String,
    phone: Option<String>,
    address: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ReceptionRow {
    id: Uuid,
    facility_id: Uuid,
    received_at: DateTime<Utc>,
    total_cost: Decimal,
    amount_paid: Decimal,
    payment_status: String,
    status: String,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ReceptionItemRow {
    id: Uuid,
    reception_id: Uuid,
    position: i32,
    product_name: String,
    reference: Option<String>,
    size: Option<String>,
    quantity: i32,
    unit_cost: Decimal,
    line_cost: Decimal,
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    direction: String,
    category: String,
    product_id: Option<Uuid>,
    reference: Option<String>,
    product_name: Option<String>,
    size: Option<String>,
    quantity: i32,
    stock_before: Option<i32>,
    stock_after: Option<i32>,
    tracking_number: Option<String>,
    note: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_name: String,
    customer_phone: String,
    wilaya_code: i32,
    commune: Option<String>,
    address: Option<String>,
    delivery_type: String,
    subtotal: Decimal,
    delivery_fee: Decimal,
    total: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    reference: String,
    product_name: String,
    size: Option<String>,
    quantity: i32,
    unit_price: Decimal,
}

impl ProductRow {
    fn into_product(self, sizes: Vec<ProductSize>) -> AppResult<Product> {
        Ok(Product {
            id: self.id,
            reference: self.reference,
            name: self.name,
            kind: ProductKind::parse(&self.kind)?,
            cost_price: self.cost_price,
            sale_price: self.sale_price,
            stock: self.stock,
            is_active: self.is_active,
            sizes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<SizeRow> for ProductSize {
    fn from(row: SizeRow) -> Self {
        ProductSize {
            id: row.id,
            product_id: row.product_id,
            label: row.label,
            stock: row.stock,
        }
    }
}

impl From<FacilityRow> for Facility {
    fn from(row: FacilityRow) -> Self {
        Facility {
            id: row.id,
            name: row.name,
            phone: row.phone,
            address: row.address,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

impl ReceptionRow {
    fn into_reception(self, items: Vec<StockReceptionItem>) -> AppResult<StockReception> {
        Ok(StockReception {
            id: self.id,
            facility_id: self.facility_id,
            received_at: self.received_at,
            total_cost: self.total_cost,
            amount_paid: self.amount_paid,
            payment_status: PaymentStatus::parse(&self.payment_status)?,
            status: ReceptionStatus::parse(&self.status)?,
            notes: self.notes,
            created_by: self.created_by,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<ReceptionItemRow> for StockReceptionItem {
    fn from(row: ReceptionItemRow) -> Self {
        StockReceptionItem {
            id: row.id,
            reception_id: row.reception_id,
            position: row.position,
            product_name: row.product_name,
            reference: row.reference,
            size: row.size,
            quantity: row.quantity,
            unit_cost: row.unit_cost,
            line_cost: row.line_cost,
        }
    }
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = crate::error::AppError;

    fn try_from(row: MovementRow) -> AppResult<Self> {
        Ok(StockMovement {
            id: row.id,
            direction: MovementDirection::parse(&row.direction)?,
            category: MovementCategory::parse(&row.category)?,
            product_id: row.product_id,
            reference: row.reference,
            product_name: row.product_name,
            size: row.size,
            quantity: row.quantity,
            stock_before: row.stock_before,
            stock_after: row.stock_after,
            tracking_number: row.tracking_number,
            note: row.note,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> AppResult<Order> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            wilaya_code: self.wilaya_code,
            commune: self.commune,
            address: self.address,
            delivery_type: DeliveryType::parse(&self.delivery_type)?,
            items,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.total,
            status: OrderStatus::parse(&self.status)?,
            created_at: self.created_at,
        })
    }
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            product_id: row.product_id,
            reference: row.reference,
            product_name: row.product_name,
            size: row.size,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

fn movements_from_rows(rows: Vec<MovementRow>) -> AppResult<Vec<StockMovement>> {
    rows.into_iter().map(StockMovement::try_from).collect()
}

// ============================================================================
// Stock writes
// ============================================================================

/// Add `delta` to one counter on an open connection or transaction.
///
/// Size writes lock the parent product row first so the aggregate recompute
/// runs after every concurrent size write on the same product has committed.
async fn write_delta(
    conn: &mut PgConnection,
    target: StockTarget,
    delta: i32,
) -> Result<StockWrite, sqlx::Error> {
    match target {
        StockTarget::Product { product_id } => {
            let updated = sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE products
                SET stock = stock + $1, updated_at = NOW()
                WHERE id = $2 AND stock + $1 >= 0
                RETURNING stock
                "#,
            )
            .bind(delta)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

            if let Some(after) = updated {
                return Ok(StockWrite::Applied {
                    target: StockChange::new(after - delta, after),
                    product_stock: after,
                });
            }

            let current = sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1")
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await?;

            Ok(current.map_or(StockWrite::Missing, |current| StockWrite::BelowZero {
                current,
            }))
        }
        StockTarget::Size {
            product_id,
            size_id,
        } => {
            let locked =
                sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                    .bind(product_id)
                    .fetch_optional(&mut *conn)
                    .await?;

            if locked.is_none() {
                return Ok(StockWrite::Missing);
            }

            let updated = sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE product_sizes
                SET stock = stock + $1
                WHERE id = $2 AND product_id = $3 AND stock + $1 >= 0
                RETURNING stock
                "#,
            )
            .bind(delta)
            .bind(size_id)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

            let after = match updated {
                Some(after) => after,
                None => {
                    let current = sqlx::query_scalar::<_, i32>(
                        "SELECT stock FROM product_sizes WHERE id = $1 AND product_id = $2",
                    )
                    .bind(size_id)
                    .bind(product_id)
                    .fetch_optional(&mut *conn)
                    .await?;

                    return Ok(current.map_or(StockWrite::Missing, |current| {
                        StockWrite::BelowZero { current }
                    }));
                }
            };

            let product_stock = sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE products
                SET stock = (SELECT COALESCE(SUM(stock), 0)::INT4 FROM product_sizes WHERE product_id = $1),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING stock
                "#,
            )
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;

            Ok(StockWrite::Applied {
                target: StockChange::new(after - delta, after),
                product_stock,
            })
        }
    }
}

// ============================================================================
// Loaders
// ============================================================================

impl PgInventoryStore {
    async fn load_sizes(&self, product_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<ProductSize>>> {
        let rows = sqlx::query_as::<_, SizeRow>(
            r#"
            SELECT id, product_id, label, stock
            FROM product_sizes
            WHERE product_id = ANY($1)
            ORDER BY position, label
            "#,
        )
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_product: HashMap<Uuid, Vec<ProductSize>> = HashMap::new();
        for row in rows {
            by_product.entry(row.product_id).or_default().push(row.into());
        }
        Ok(by_product)
    }

    async fn load_reception_items(
        &self,
        reception_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<StockReceptionItem>>> {
        let rows = sqlx::query_as::<_, ReceptionItemRow>(
            r#"
            SELECT id, reception_id, position, product_name, reference, size, quantity,
                   unit_cost, line_cost
            FROM stock_reception_items
            WHERE reception_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(reception_ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_reception: HashMap<Uuid, Vec<StockReceptionItem>> = HashMap::new();
        for row in rows {
            by_reception.entry(row.reception_id).or_default().push(row.into());
        }
        Ok(by_reception)
    }

    async fn load_order_items(&self, order_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<OrderItem>>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, reference, product_name, size, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            by_order.entry(row.order_id).or_default().push(row.into());
        }
        Ok(by_order)
    }

    async fn assemble_receptions(&self, rows: Vec<ReceptionRow>) -> AppResult<Vec<StockReception>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_reception_items(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_reception(lines)
            })
            .collect()
    }
}

// ============================================================================
// Store implementation
// ============================================================================

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, reference, name, kind, cost_price, sale_price, stock, is_active,
                   created_at, updated_at
            FROM products
            WHERE is_active = true
            ORDER BY reference
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut sizes = self.load_sizes(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let product_sizes = sizes.remove(&row.id).unwrap_or_default();
                row.into_product(product_sizes)
            })
            .collect()
    }

    async fn find_product(&self, reference: &str) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, reference, name, kind, cost_price, sale_price, stock, is_active,
                   created_at, updated_at
            FROM products
            WHERE UPPER(reference) = $1 AND is_active = true
            "#,
        )
        .bind(normalize_reference(reference))
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sizes = self
            .load_sizes(&[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();

        row.into_product(sizes).map(Some)
    }

    async fn apply_stock_delta(&self, target: StockTarget, delta: i32) -> AppResult<StockWrite> {
        let mut tx = self.db.begin().await?;
        let write = write_delta(&mut tx, target, delta).await?;
        tx.commit().await?;
        Ok(write)
    }

    async fn list_facilities(&self) -> AppResult<Vec<Facility>> {
        let rows = sqlx::query_as::<_, FacilityRow>(
            r#"
            SELECT id, name, phone, address, is_active, created_at
            FROM facilities
            WHERE is_active = true
            ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Facility::from).collect())
    }

    async fn find_facility(&self, id: Uuid) -> AppResult<Option<Facility>> {
        let row = sqlx::query_as::<_, FacilityRow>(
            "SELECT id, name, phone, address, is_active, created_at FROM facilities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Facility::from))
    }

    async fn insert_facility(&self, facility: NewFacility) -> AppResult<Facility> {
        let row = sqlx::query_as::<_, FacilityRow>(
            r#"
            INSERT INTO facilities (id, name, phone, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, phone, address, is_active, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&facility.name)
        .bind(&facility.phone)
        .bind(&facility.address)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    async fn insert_reception(&self, reception: NewReception) -> AppResult<StockReception> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ReceptionRow>(
            r#"
            INSERT INTO stock_receptions (
                id, facility_id, received_at, total_cost, amount_paid, payment_status, status,
                notes, created_by
            )
            VALUES ($1, $2, $3, $4, 0, $5, $6, $7, $8)
            RETURNING id, facility_id, received_at, total_cost, amount_paid, payment_status,
                      status, notes, created_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(reception.facility_id)
        .bind(reception.received_at)
        .bind(reception.total_cost)
        .bind(PaymentStatus::Pending.as_str())
        .bind(ReceptionStatus::Completed.as_str())
        .bind(&reception.notes)
        .bind(reception.created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(reception.items.len());
        for (position, item) in reception.items.iter().enumerate() {
            let item_row = sqlx::query_as::<_, ReceptionItemRow>(
                r#"
                INSERT INTO stock_reception_items (
                    id, reception_id, position, product_name, reference, size, quantity,
                    unit_cost, line_cost
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id, reception_id, position, product_name, reference, size, quantity,
                          unit_cost, line_cost
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(position as i32)
            .bind(&item.product_name)
            .bind(&item.reference)
            .bind(&item.size)
            .bind(item.quantity)
            .bind(item.unit_cost)
            .bind(line_cost(item.unit_cost, item.quantity))
            .fetch_one(&mut *tx)
            .await?;

            items.push(item_row.into());
        }

        tx.commit().await?;

        row.into_reception(items)
    }

    async fn get_reception(&self, id: Uuid) -> AppResult<Option<StockReception>> {
        let row = sqlx::query_as::<_, ReceptionRow>(
            r#"
            SELECT id, facility_id, received_at, total_cost, amount_paid, payment_status,
                   status, notes, created_by, created_at, updated_at
            FROM stock_receptions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(self.assemble_receptions(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_receptions(&self, limit: i64) -> AppResult<Vec<StockReception>> {
        let rows = sqlx::query_as::<_, ReceptionRow>(
            r#"
            SELECT id, facility_id, received_at, total_cost, amount_paid, payment_status,
                   status, notes, created_by, created_at, updated_at
            FROM stock_receptions
            ORDER BY received_at DESC, created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        self.assemble_receptions(rows).await
    }

    async fn update_reception(
        &self,
        id: Uuid,
        update: ReceptionUpdate,
    ) -> AppResult<Option<StockReception>> {
        let row = sqlx::query_as::<_, ReceptionRow>(
            r#"
            UPDATE stock_receptions
            SET amount_paid = $1, payment_status = $2, notes = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING id, facility_id, received_at, total_cost, amount_paid, payment_status,
                      status, notes, created_by, created_at, updated_at
            "#,
        )
        .bind(update.amount_paid)
        .bind(update.payment_status.as_str())
        .bind(&update.notes)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(self.assemble_receptions(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete_reception(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM stock_receptions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_movement(&self, movement: NewMovement) -> AppResult<StockMovement> {
        let row = sqlx::query_as::<_, MovementRow>(
            r#"
            INSERT INTO stock_movements (
                id, direction, category, product_id, reference, product_name, size, quantity,
                stock_before, stock_after, tracking_number, note, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, direction, category, product_id, reference, product_name, size,
                      quantity, stock_before, stock_after, tracking_number, note, created_by,
                      created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(movement.direction.as_str())
        .bind(movement.category.as_str())
        .bind(movement.product_id)
        .bind(&movement.reference)
        .bind(&movement.product_name)
        .bind(&movement.size)
        .bind(movement.quantity)
        .bind(movement.stock_before)
        .bind(movement.stock_after)
        .bind(&movement.tracking_number)
        .bind(&movement.note)
        .bind(movement.created_by)
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, direction, category, product_id, reference, product_name, size,
                   quantity, stock_before, stock_after, tracking_number, note, created_by,
                   created_at
            FROM stock_movements
            WHERE ($1::TEXT IS NULL OR direction = $1)
              AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(filter.direction.map(|d| d.as_str()))
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.limit)
        .fetch_all(&self.db)
        .await?;

        movements_from_rows(rows)
    }

    async fn tracking_used(&self, tracking: &str, category: MovementCategory) -> AppResult<bool> {
        let used = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock_movements WHERE tracking_number = $1 AND category = $2)",
        )
        .bind(tracking)
        .bind(category.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(used)
    }

    async fn movements_by_tracking(
        &self,
        tracking: &str,
        category: MovementCategory,
        limit: i64,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, direction, category, product_id, reference, product_name, size,
                   quantity, stock_before, stock_after, tracking_number, note, created_by,
                   created_at
            FROM stock_movements
            WHERE tracking_number = $1 AND category = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(tracking)
        .bind(category.as_str())
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        movements_from_rows(rows)
    }

    async fn insert_order(&self, order: NewOrder, decrement_stock: bool) -> AppResult<OrderWrite> {
        let mut tx = self.db.begin().await?;

        let mut stock = Vec::new();
        if decrement_stock {
            // Lock product rows in a stable order so concurrent orders cannot deadlock
            let mut write_order: Vec<usize> = (0..order.items.len()).collect();
            write_order.sort_by_key(|&i| order.items[i].target.product_id());

            let mut changes: Vec<Option<StockChange>> = vec![None; order.items.len()];
            for position in write_order {
                let item = &order.items[position];
                match write_delta(&mut tx, item.target, -item.quantity).await? {
                    StockWrite::Applied { target, .. } => changes[position] = Some(target),
                    StockWrite::BelowZero { current } => {
                        tx.rollback().await?;
                        return Ok(OrderWrite::Shortage {
                            position,
                            available: current,
                        });
                    }
                    StockWrite::Missing => {
                        tx.rollback().await?;
                        return Ok(OrderWrite::Shortage {
                            position,
                            available: 0,
                        });
                    }
                }
            }
            stock = changes.into_iter().flatten().collect();
        }

        let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('order_number_seq')")
            .fetch_one(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (
                id, order_number, customer_name, customer_phone, wilaya_code, commune, address,
                delivery_type, subtotal, delivery_fee, total, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, order_number, customer_name, customer_phone, wilaya_code, commune,
                      address, delivery_type, subtotal, delivery_fee, total, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(format_order_number(sequence))
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(order.wilaya_code)
        .bind(&order.commune)
        .bind(&order.address)
        .bind(order.delivery_type.as_str())
        .bind(order.subtotal)
        .bind(order.delivery_fee)
        .bind(order.total)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(order.items.len());
        for (position, item) in order.items.iter().enumerate() {
            let item_row = sqlx::query_as::<_, OrderItemRow>(
                r#"
                INSERT INTO order_items (
                    id, order_id, position, product_id, reference, product_name, size, quantity,
                    unit_price
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id, order_id, product_id, reference, product_name, size, quantity,
                          unit_price
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(position as i32)
            .bind(item.product_id)
            .bind(&item.reference)
            .bind(&item.product_name)
            .bind(&item.size)
            .bind(item.quantity)
            .bind(item.unit_price)
            .fetch_one(&mut *tx)
            .await?;

            items.push(item_row.into());
        }

        tx.commit().await?;

        Ok(OrderWrite::Created {
            order: row.into_order(items)?,
            stock,
        })
    }

    async fn list_orders(&self, limit: i64) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, order_number, customer_name, customer_phone, wilaya_code, commune,
                   address, delivery_type, subtotal, delivery_fee, total, status, created_at
            FROM orders
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_order_items(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }
}
