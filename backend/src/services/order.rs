//! Storefront orders

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::validation::{validate_algerian_phone, validate_wilaya_code};
use validator::Validate;

use super::notification::Notifier;
use super::stock::StockService;
use crate::config::OrderStockPolicy;
use crate::error::{AppError, AppResult};
use crate::models::{
    DeliveryType, MovementCategory, MovementDirection, NotificationEvent, Order,
    SizeResolutionError,
};
use crate::store::{InventoryStore, NewMovement, NewOrder, NewOrderItem, OrderWrite};

/// Largest order listing returned to the admin UI
const MAX_ORDER_LIST: i64 = 500;

/// Order service
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn InventoryStore>,
    notifier: Notifier,
    policy: OrderStockPolicy,
}

/// Input for placing an order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, max = 120, message = "Customer name is required"))]
    pub customer_name: String,
    pub customer_phone: String,
    pub wilaya_code: i32,
    pub commune: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub delivery_fee: Decimal,
    #[validate]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrderItemInput {
    #[validate(length(min = 1, message = "Reference is required"))]
    pub reference: String,
    pub size: Option<String>,
    #[validate(range(min = 1, max = 100000, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub limit: Option<i64>,
}

impl OrderService {
    pub fn new(store: Arc<dyn InventoryStore>, notifier: Notifier, policy: OrderStockPolicy) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    /// Place an order priced from the catalog, then notify admins
    pub async fn create_order(&self, input: CreateOrderInput) -> AppResult<Order> {
        if input.items.is_empty() {
            return Err(AppError::validation(
                "items",
                "At least one item is required",
                "Au moins un article est requis",
            ));
        }
        input.validate()?;

        let customer_name = input.customer_name.trim().to_string();
        if customer_name.is_empty() {
            return Err(AppError::validation(
                "customer_name",
                "Customer name is required",
                "Le nom du client est requis",
            ));
        }
        let customer_phone = input.customer_phone.trim().to_string();
        validate_algerian_phone(&customer_phone).map_err(|msg| {
            AppError::validation("customer_phone", msg, "Numéro de téléphone invalide")
        })?;
        validate_wilaya_code(input.wilaya_code)
            .map_err(|msg| AppError::validation("wilaya_code", msg, "Wilaya invalide"))?;
        if input.delivery_fee < Decimal::ZERO {
            return Err(AppError::validation(
                "delivery_fee",
                "Delivery fee cannot be negative",
                "Les frais de livraison ne peuvent pas être négatifs",
            ));
        }

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = self
                .store
                .find_product(&item.reference)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Product {}", item.reference.trim())))?;

            let target = product
                .resolve_target(item.size.as_deref())
                .map_err(|e| match e {
                    SizeResolutionError::SizeRequired { reference } => AppError::validation(
                        "size",
                        &format!("Size required for {}", reference),
                        &format!("Taille requise pour {}", reference),
                    ),
                    SizeResolutionError::SizeNotFound { reference, size } => {
                        AppError::NotFound(format!("Size {} of product {}", size, reference))
                    }
                })?;

            let size = product.label_of(target);

            items.push(NewOrderItem {
                product_id: product.id,
                target,
                reference: product.reference.clone(),
                product_name: product.name.clone(),
                size,
                quantity: item.quantity,
                unit_price: product.sale_price,
            });
        }

        let subtotal: Decimal = items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        let total = subtotal + input.delivery_fee;

        let decrement = self.policy == OrderStockPolicy::DecrementOnCreate;
        let write = self
            .store
            .insert_order(
                NewOrder {
                    customer_name,
                    customer_phone,
                    wilaya_code: input.wilaya_code,
                    commune: input.commune.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
                    address: input.address.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
                    delivery_type: input.delivery_type,
                    delivery_fee: input.delivery_fee,
                    subtotal,
                    total,
                    items: items.clone(),
                },
                decrement,
            )
            .await?;

        let (order, stock) = match write {
            OrderWrite::Created { order, stock } => (order, stock),
            OrderWrite::Shortage {
                position,
                available,
            } => {
                let reference = items
                    .get(position)
                    .map(|i| (i.reference.as_str(), i.quantity))
                    .unwrap_or(("?", 0));
                return Err(AppError::InsufficientStock(format!(
                    "{} (requested {}, available {})",
                    reference.0, reference.1, available
                )));
            }
        };

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            items = order.items.len(),
            total = %order.total,
            stock_decremented = decrement,
            "Order created"
        );

        if !stock.is_empty() {
            let stock_service = StockService::new(self.store.clone());
            for (item, change) in items.iter().zip(stock) {
                stock_service
                    .append_movement(NewMovement {
                        direction: MovementDirection::Out,
                        category: MovementCategory::Sortie,
                        product_id: Some(item.product_id),
                        reference: Some(item.reference.clone()),
                        product_name: Some(item.product_name.clone()),
                        size: item.size.clone(),
                        quantity: item.quantity,
                        stock_before: Some(change.before),
                        stock_after: Some(change.after),
                        tracking_number: None,
                        note: Some(format!("Commande {}", order.order_number)),
                        created_by: None,
                    })
                    .await;
            }
        }

        if let Err(e) = self
            .notifier
            .publish(&NotificationEvent::new_order(&order))
            .await
        {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to notify admins of new order");
        }

        Ok(order)
    }

    /// Most recent orders, newest first
    pub async fn list_orders(&self, query: OrderQuery) -> AppResult<Vec<Order>> {
        let limit = query.limit.unwrap_or(100).clamp(1, MAX_ORDER_LIST);
        self.store.list_orders(limit).await
    }
}
