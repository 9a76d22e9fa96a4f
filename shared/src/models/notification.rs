//! Real-time admin notification events

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Order;

/// Event pushed to connected admin sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// First event written on every newly registered stream
    Connected {
        connection_id: Uuid,
        at: DateTime<Utc>,
    },
    NewOrder {
        order_id: Uuid,
        order_number: String,
        customer_name: String,
        wilaya_code: i32,
        item_count: usize,
        total: Decimal,
        created_at: DateTime<Utc>,
    },
}

impl NotificationEvent {
    pub fn connected(connection_id: Uuid) -> Self {
        NotificationEvent::Connected {
            connection_id,
            at: Utc::now(),
        }
    }

    pub fn new_order(order: &Order) -> Self {
        NotificationEvent::NewOrder {
            order_id: order.id,
            order_number: order.order_number.clone(),
            customer_name: order.customer_name.clone(),
            wilaya_code: order.wilaya_code,
            item_count: order.items.len(),
            total: order.total,
            created_at: order.created_at,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::Connected { .. } => "connected",
            NotificationEvent::NewOrder { .. } => "new_order",
        }
    }
}
