//! HTTP handlers for catalog lookups and scan adjustments

use axum::{
    extract::State,
    Json,
};

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::models::Product;
use crate::services::stock::{ScanInput, ScanResult};
use crate::services::{CatalogService, StockService};
use crate::AppState;

/// List active products
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.store.clone());
    let products = service.list_products().await?;
    Ok(Json(products))
}

/// Get a product by reference
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(reference): ApiPath<String>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.store.clone());
    let product = service.get_product(&reference).await?;
    Ok(Json(product))
}

/// Add or remove one unit from a scanned barcode
pub async fn scan_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(input): ApiJson<ScanInput>,
) -> AppResult<Json<ScanResult>> {
    let service = StockService::new(state.store.clone());
    let result = service.scan(Some(current_user.0.user_id), input).await?;
    Ok(Json(result))
}
