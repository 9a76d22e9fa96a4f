//! Persistence layer
//!
//! Services talk to an [`InventoryStore`]. The PostgreSQL implementation is
//! used by the server; the in-process implementation backs the test suites and
//! local tooling. Both honour the same atomicity contract:
//!
//! - a stock delta is a single conditional write that never lets a counter go
//!   below zero, and a size-level write recomputes the product aggregate in
//!   the same transaction;
//! - a reception and its items are written together or not at all;
//! - an order, its items and (when requested) its stock decrements are written
//!   together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    DeliveryType, Facility, MovementCategory, MovementDirection, Order, PaymentStatus, Product,
    StockChange, StockMovement, StockReception, StockTarget,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryInventoryStore;
pub use postgres::PgInventoryStore;

/// Result of a single stock counter write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockWrite {
    Applied {
        /// Counter that received the delta
        target: StockChange,
        /// Aggregate product stock after the write
        product_stock: i32,
    },
    /// The write would take the counter below zero; nothing was written
    BelowZero { current: i32 },
    /// Product or size row does not exist
    Missing,
}

/// Facility to insert
#[derive(Debug, Clone)]
pub struct NewFacility {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Reception to insert, costs already snapshotted
#[derive(Debug, Clone)]
pub struct NewReception {
    pub facility_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub total_cost: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub items: Vec<NewReceptionItem>,
}

#[derive(Debug, Clone)]
pub struct NewReceptionItem {
    pub product_name: String,
    pub reference: Option<String>,
    pub size: Option<String>,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

/// Payment fields written by a reception update
#[derive(Debug, Clone)]
pub struct ReceptionUpdate {
    pub amount_paid: Decimal,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
}

/// Ledger row to append
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub direction: MovementDirection,
    pub category: MovementCategory,
    pub product_id: Option<Uuid>,
    pub reference: Option<String>,
    pub product_name: Option<String>,
    pub size: Option<String>,
    pub quantity: i32,
    pub stock_before: Option<i32>,
    pub stock_after: Option<i32>,
    pub tracking_number: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Ledger query filter
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub direction: Option<MovementDirection>,
    pub category: Option<MovementCategory>,
    pub limit: i64,
}

/// Order to insert, prices already resolved from the catalog
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: String,
    pub wilaya_code: i32,
    pub commune: Option<String>,
    pub address: Option<String>,
    pub delivery_type: DeliveryType,
    pub delivery_fee: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub target: StockTarget,
    pub reference: String,
    pub product_name: String,
    pub size: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Result of an order insert
#[derive(Debug, Clone)]
pub enum OrderWrite {
    /// `stock` holds one change per item when stock was decremented, else it is empty
    Created { order: Order, stock: Vec<StockChange> },
    /// Item at `position` could not be decremented; nothing was written
    Shortage { position: usize, available: i32 },
}

/// Storage contract shared by every backend
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    /// Connectivity check used by the health endpoint
    async fn ping(&self) -> AppResult<()>;

    // Catalog
    async fn list_products(&self) -> AppResult<Vec<Product>>;
    /// Active product by reference, matched case-insensitively
    async fn find_product(&self, reference: &str) -> AppResult<Option<Product>>;
    /// Atomically add `delta` to the counter behind `target`
    async fn apply_stock_delta(&self, target: StockTarget, delta: i32) -> AppResult<StockWrite>;

    // Facilities
    async fn list_facilities(&self) -> AppResult<Vec<Facility>>;
    async fn find_facility(&self, id: Uuid) -> AppResult<Option<Facility>>;
    async fn insert_facility(&self, facility: NewFacility) -> AppResult<Facility>;

    // Receptions
    async fn insert_reception(&self, reception: NewReception) -> AppResult<StockReception>;
    async fn get_reception(&self, id: Uuid) -> AppResult<Option<StockReception>>;
    /// Newest first
    async fn list_receptions(&self, limit: i64) -> AppResult<Vec<StockReception>>;
    async fn update_reception(
        &self,
        id: Uuid,
        update: ReceptionUpdate,
    ) -> AppResult<Option<StockReception>>;
    async fn delete_reception(&self, id: Uuid) -> AppResult<bool>;

    // Movements
    async fn insert_movement(&self, movement: NewMovement) -> AppResult<StockMovement>;
    /// Newest first
    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<StockMovement>>;
    async fn tracking_used(&self, tracking: &str, category: MovementCategory) -> AppResult<bool>;
    /// Newest first
    async fn movements_by_tracking(
        &self,
        tracking: &str,
        category: MovementCategory,
        limit: i64,
    ) -> AppResult<Vec<StockMovement>>;

    // Orders
    async fn insert_order(&self, order: NewOrder, decrement_stock: bool) -> AppResult<OrderWrite>;
    /// Newest first
    async fn list_orders(&self, limit: i64) -> AppResult<Vec<Order>>;
}
