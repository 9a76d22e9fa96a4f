//! HTTP handlers for storefront orders

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::models::Order;
use crate::services::order::{CreateOrderInput, OrderQuery};
use crate::services::OrderService;
use crate::AppState;

fn service(state: &AppState) -> OrderService {
    OrderService::new(
        state.store.clone(),
        state.notifier.clone(),
        state.config.inventory.order_stock_policy,
    )
}

/// Place an order (public storefront endpoint)
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = service(&state).create_order(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List recent orders
pub async fn list_orders(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = service(&state).list_orders(query).await?;
    Ok(Json(orders))
}
