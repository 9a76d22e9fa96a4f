//! In-process inventory store
//!
//! Holds every table behind one async mutex, so each trait call is atomic with
//! respect to every other call. Used by the integration suites and for running
//! the API without a database.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    InventoryStore, MovementFilter, NewFacility, NewMovement, NewOrder, NewReception, OrderWrite,
    ReceptionUpdate, StockWrite,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    format_order_number, line_cost, normalize_reference, Facility, MovementCategory, Order,
    OrderItem, OrderStatus, PaymentStatus, Product, ProductKind, ProductSize, ReceptionStatus,
    StockChange, StockMovement, StockReception, StockReceptionItem, StockTarget,
};

#[derive(Default)]
struct Tables {
    products: Vec<Product>,
    facilities: Vec<Facility>,
    receptions: Vec<StockReception>,
    movements: Vec<StockMovement>,
    orders: Vec<Order>,
    order_seq: i64,
}

impl Tables {
    fn product_mut(&mut self, id: Uuid) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    /// Mirror of the conditional update in the PostgreSQL store.
    ///
    /// A counter that would leave the `INTEGER` range fails the write the way
    /// the database rejects it, leaving every counter unchanged.
    fn write_delta(&mut self, target: StockTarget, delta: i32) -> AppResult<StockWrite> {
        let Some(product) = self.product_mut(target.product_id()) else {
            return Ok(StockWrite::Missing);
        };

        match target {
            StockTarget::Product { .. } => {
                let before = product.stock;
                let after = before.checked_add(delta).ok_or_else(counter_overflow)?;
                if after < 0 {
                    return Ok(StockWrite::BelowZero { current: before });
                }
                product.stock = after;
                product.updated_at = Utc::now();
                Ok(StockWrite::Applied {
                    target: StockChange::new(before, after),
                    product_stock: after,
                })
            }
            StockTarget::Size { size_id, .. } => {
                let Some(index) = product.sizes.iter().position(|s| s.id == size_id) else {
                    return Ok(StockWrite::Missing);
                };
                let before = product.sizes[index].stock;
                let after = before.checked_add(delta).ok_or_else(counter_overflow)?;
                if after < 0 {
                    return Ok(StockWrite::BelowZero { current: before });
                }
                let product_stock = product
                    .sizes
                    .iter()
                    .enumerate()
                    .map(|(i, s)| if i == index { after } else { s.stock })
                    .try_fold(0i32, |total, stock| total.checked_add(stock))
                    .ok_or_else(counter_overflow)?;

                product.sizes[index].stock = after;
                product.stock = product_stock;
                product.updated_at = Utc::now();
                Ok(StockWrite::Applied {
                    target: StockChange::new(before, after),
                    product_stock,
                })
            }
        }
    }
}

fn counter_overflow() -> AppError {
    AppError::Internal("stock counter out of range".to_string())
}

/// Inventory store kept entirely in memory
#[derive(Default)]
pub struct MemoryInventoryStore {
    tables: Mutex<Tables>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active catalog product; `sizes` are `(label, stock)` pairs.
    ///
    /// The aggregate counter starts at the sum of the sizes, or at
    /// `accessory_stock` when no sizes are given.
    pub async fn seed_product(
        &self,
        reference: &str,
        name: &str,
        kind: ProductKind,
        cost_price: Decimal,
        sale_price: Decimal,
        sizes: &[(&str, i32)],
        accessory_stock: i32,
    ) -> Product {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let sizes: Vec<ProductSize> = sizes
            .iter()
            .map(|(label, stock)| ProductSize {
                id: Uuid::new_v4(),
                product_id: id,
                label: label.to_string(),
                stock: *stock,
            })
            .collect();
        let stock = if sizes.is_empty() {
            accessory_stock
        } else {
            sizes.iter().map(|s| s.stock).sum()
        };

        let product = Product {
            id,
            reference: reference.to_string(),
            name: name.to_string(),
            kind,
            cost_price,
            sale_price,
            stock,
            is_active: true,
            sizes,
            created_at: now,
            updated_at: now,
        };

        self.tables.lock().await.products.push(product.clone());
        product
    }

    pub async fn seed_facility(&self, name: &str) -> Facility {
        let facility = Facility {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: None,
            address: None,
            is_active: true,
            created_at: Utc::now(),
        };
        self.tables.lock().await.facilities.push(facility.clone());
        facility
    }

    /// Soft-deactivate a product so catalog lookups no longer see it
    pub async fn deactivate_product(&self, reference: &str) -> bool {
        let wanted = normalize_reference(reference);
        let mut tables = self.tables.lock().await;
        match tables
            .products
            .iter_mut()
            .find(|p| normalize_reference(&p.reference) == wanted)
        {
            Some(product) => {
                product.is_active = false;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let tables = self.tables.lock().await;
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.reference.cmp(&b.reference));
        Ok(products)
    }

    async fn find_product(&self, reference: &str) -> AppResult<Option<Product>> {
        let wanted = normalize_reference(reference);
        let tables = self.tables.lock().await;
        Ok(tables
            .products
            .iter()
            .find(|p| p.is_active && normalize_reference(&p.reference) == wanted)
            .cloned())
    }

    async fn apply_stock_delta(&self, target: StockTarget, delta: i32) -> AppResult<StockWrite> {
        self.tables.lock().await.write_delta(target, delta)
    }

    async fn list_facilities(&self) -> AppResult<Vec<Facility>> {
        let tables = self.tables.lock().await;
        let mut facilities: Vec<Facility> = tables
            .facilities
            .iter()
            .filter(|f| f.is_active)
            .cloned()
            .collect();
        facilities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(facilities)
    }

    async fn find_facility(&self, id: Uuid) -> AppResult<Option<Facility>> {
        let tables = self.tables.lock().await;
        Ok(tables.facilities.iter().find(|f| f.id == id).cloned())
    }

    async fn insert_facility(&self, facility: NewFacility) -> AppResult<Facility> {
        let facility = Facility {
            id: Uuid::new_v4(),
            name: facility.name,
            phone: facility.phone,
            address: facility.address,
            is_active: true,
            created_at: Utc::now(),
        };
        self.tables.lock().await.facilities.push(facility.clone());
        Ok(facility)
    }

    async fn insert_reception(&self, reception: NewReception) -> AppResult<StockReception> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let items = reception
            .items
            .into_iter()
            .enumerate()
            .map(|(position, item)| StockReceptionItem {
                id: Uuid::new_v4(),
                reception_id: id,
                position: position as i32,
                line_cost: line_cost(item.unit_cost, item.quantity),
                product_name: item.product_name,
                reference: item.reference,
                size: item.size,
                quantity: item.quantity,
                unit_cost: item.unit_cost,
            })
            .collect();

        let reception = StockReception {
            id,
            facility_id: reception.facility_id,
            received_at: reception.received_at,
            total_cost: reception.total_cost,
            amount_paid: Decimal::ZERO,
            payment_status: PaymentStatus::Pending,
            status: ReceptionStatus::Completed,
            notes: reception.notes,
            created_by: reception.created_by,
            items,
            created_at: now,
            updated_at: now,
        };

        self.tables.lock().await.receptions.push(reception.clone());
        Ok(reception)
    }

    async fn get_reception(&self, id: Uuid) -> AppResult<Option<StockReception>> {
        let tables = self.tables.lock().await;
        Ok(tables.receptions.iter().find(|r| r.id == id).cloned())
    }

    async fn list_receptions(&self, limit: i64) -> AppResult<Vec<StockReception>> {
        let tables = self.tables.lock().await;
        let mut receptions: Vec<StockReception> = tables.receptions.iter().rev().cloned().collect();
        // Stable sort keeps insertion order (newest first) among equal dates
        receptions.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        receptions.truncate(limit.max(0) as usize);
        Ok(receptions)
    }

    async fn update_reception(
        &self,
        id: Uuid,
        update: ReceptionUpdate,
    ) -> AppResult<Option<StockReception>> {
        let mut tables = self.tables.lock().await;
        let Some(reception) = tables.receptions.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        reception.amount_paid = update.amount_paid;
        reception.payment_status = update.payment_status;
        reception.notes = update.notes;
        reception.updated_at = Utc::now();
        Ok(Some(reception.clone()))
    }

    async fn delete_reception(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.receptions.len();
        tables.receptions.retain(|r| r.id != id);
        Ok(tables.receptions.len() < before)
    }

    async fn insert_movement(&self, movement: NewMovement) -> AppResult<StockMovement> {
        let movement = StockMovement {
            id: Uuid::new_v4(),
            direction: movement.direction,
            category: movement.category,
            product_id: movement.product_id,
            reference: movement.reference,
            product_name: movement.product_name,
            size: movement.size,
            quantity: movement.quantity,
            stock_before: movement.stock_before,
            stock_after: movement.stock_after,
            tracking_number: movement.tracking_number,
            note: movement.note,
            created_by: movement.created_by,
            created_at: Utc::now(),
        };
        self.tables.lock().await.movements.push(movement.clone());
        Ok(movement)
    }

    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<StockMovement>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .movements
            .iter()
            .rev()
            .filter(|m| filter.direction.map_or(true, |d| m.direction == d))
            .filter(|m| filter.category.map_or(true, |c| m.category == c))
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn tracking_used(&self, tracking: &str, category: MovementCategory) -> AppResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .movements
            .iter()
            .any(|m| m.category == category && m.tracking_number.as_deref() == Some(tracking)))
    }

    async fn movements_by_tracking(
        &self,
        tracking: &str,
        category: MovementCategory,
        limit: i64,
    ) -> AppResult<Vec<StockMovement>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .movements
            .iter()
            .rev()
            .filter(|m| m.category == category && m.tracking_number.as_deref() == Some(tracking))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert_order(&self, order: NewOrder, decrement_stock: bool) -> AppResult<OrderWrite> {
        let mut tables = self.tables.lock().await;

        let mut stock = Vec::new();
        if decrement_stock {
            // Validate every line against a scratch copy so a shortage leaves nothing written
            let mut scratch = Tables {
                products: tables.products.clone(),
                ..Tables::default()
            };
            for (position, item) in order.items.iter().enumerate() {
                match scratch.write_delta(item.target, -item.quantity)? {
                    StockWrite::Applied { target, .. } => stock.push(target),
                    StockWrite::BelowZero { current } => {
                        return Ok(OrderWrite::Shortage {
                            position,
                            available: current,
                        })
                    }
                    StockWrite::Missing => {
                        return Ok(OrderWrite::Shortage {
                            position,
                            available: 0,
                        })
                    }
                }
            }
            tables.products = scratch.products;
        }

        tables.order_seq += 1;
        let id = Uuid::new_v4();
        let order = Order {
            id,
            order_number: format_order_number(tables.order_seq),
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            wilaya_code: order.wilaya_code,
            commune: order.commune,
            address: order.address,
            delivery_type: order.delivery_type,
            items: order
                .items
                .into_iter()
                .map(|item| OrderItem {
                    id: Uuid::new_v4(),
                    product_id: item.product_id,
                    reference: item.reference,
                    product_name: item.product_name,
                    size: item.size,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            subtotal: order.subtotal,
            delivery_fee: order.delivery_fee,
            total: order.total,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        tables.orders.push(order.clone());
        Ok(OrderWrite::Created { order, stock })
    }

    async fn list_orders(&self, limit: i64) -> AppResult<Vec<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
