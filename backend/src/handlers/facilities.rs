//! HTTP handlers for supplier facilities

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::models::Facility;
use crate::services::catalog::CreateFacilityInput;
use crate::services::CatalogService;
use crate::AppState;

pub async fn list_facilities(State(state): State<AppState>) -> AppResult<Json<Vec<Facility>>> {
    let service = CatalogService::new(state.store.clone());
    let facilities = service.list_facilities().await?;
    Ok(Json(facilities))
}

pub async fn create_facility(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateFacilityInput>,
) -> AppResult<(StatusCode, Json<Facility>)> {
    let service = CatalogService::new(state.store.clone());
    let facility = service.create_facility(input).await?;
    Ok((StatusCode::CREATED, Json(facility)))
}
