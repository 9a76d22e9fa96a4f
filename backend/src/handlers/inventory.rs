//! HTTP handlers for receptions and the movement ledger

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::CurrentUser;
use crate::models::{MovementCategory, StockMovement, StockReception};
use crate::services::inventory::{
    CreateReceptionInput, InventoryService, MovementQuery, ReceptionCreated, RecordMovementInput,
    SortieLookup, TrackingCheck, UpdateReceptionInput,
};
use crate::AppState;

fn service(state: &AppState) -> InventoryService {
    InventoryService::new(state.store.clone(), state.config.inventory.clone())
}

/// Record a reception and add its lines to stock
pub async fn create_reception(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(input): ApiJson<CreateReceptionInput>,
) -> AppResult<(StatusCode, Json<ReceptionCreated>)> {
    let created = service(&state)
        .create_reception(Some(current_user.0.user_id), input)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List recent receptions
pub async fn list_receptions(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StockReception>>> {
    let receptions = service(&state).list_receptions().await?;
    Ok(Json(receptions))
}

/// Get a reception with its lines
pub async fn get_reception(
    State(state): State<AppState>,
    ApiPath(reception_id): ApiPath<Uuid>,
) -> AppResult<Json<StockReception>> {
    let reception = service(&state).get_reception(reception_id).await?;
    Ok(Json(reception))
}

/// Update the payment side of a reception
pub async fn update_reception(
    State(state): State<AppState>,
    ApiPath(reception_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateReceptionInput>,
) -> AppResult<Json<StockReception>> {
    let reception = service(&state)
        .update_reception(reception_id, input)
        .await?;
    Ok(Json(reception))
}

/// Delete a reception
pub async fn delete_reception(
    State(state): State<AppState>,
    ApiPath(reception_id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    service(&state).delete_reception(reception_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ValidateTrackingQuery {
    pub tracking_number: String,
    #[serde(rename = "type")]
    pub category: MovementCategory,
}

/// Check whether a tracking number was already used for a category
pub async fn validate_tracking(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ValidateTrackingQuery>,
) -> AppResult<Json<TrackingCheck>> {
    let check = service(&state)
        .validate_tracking(&query.tracking_number, query.category)
        .await?;
    Ok(Json(check))
}

#[derive(Debug, Deserialize)]
pub struct TrackingQuery {
    pub tracking_number: String,
}

/// Find the outbound lines shipped under a tracking number
pub async fn lookup_sortie_by_tracking(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TrackingQuery>,
) -> AppResult<Json<SortieLookup>> {
    let lookup = service(&state)
        .lookup_sortie_by_tracking(&query.tracking_number)
        .await?;
    Ok(Json(lookup))
}

/// Append a movement to the ledger
pub async fn record_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(input): ApiJson<RecordMovementInput>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    let movement = service(&state)
        .record_movement(Some(current_user.0.user_id), input)
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// List ledger movements
pub async fn list_movements(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MovementQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let movements = service(&state).list_movements(query).await?;
    Ok(Json(movements))
}
