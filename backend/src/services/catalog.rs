//! Read-only catalog lookups and supplier facilities

use std::sync::Arc;

use serde::Deserialize;
use shared::validation::validate_algerian_phone;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{Facility, Product};
use crate::store::{InventoryStore, NewFacility};

/// Catalog and facility service
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn InventoryStore>,
}

/// Input for creating a facility
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFacilityInput {
    #[validate(length(min = 1, max = 120, message = "Facility name is required"))]
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Active products with their sizes, ordered by reference
    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        self.store.list_products().await
    }

    pub async fn get_product(&self, reference: &str) -> AppResult<Product> {
        self.store
            .find_product(reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", reference.trim())))
    }

    pub async fn list_facilities(&self) -> AppResult<Vec<Facility>> {
        self.store.list_facilities().await
    }

    pub async fn create_facility(&self, input: CreateFacilityInput) -> AppResult<Facility> {
        input.validate()?;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation(
                "name",
                "Facility name is required",
                "Le nom de l'atelier est requis",
            ));
        }

        let phone = input
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if let Some(phone) = &phone {
            validate_algerian_phone(phone)
                .map_err(|msg| AppError::validation("phone", msg, "Numéro de téléphone invalide"))?;
        }

        let facility = self
            .store
            .insert_facility(NewFacility {
                name,
                phone,
                address: input
                    .address
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty()),
            })
            .await?;

        tracing::info!(facility_id = %facility.id, name = %facility.name, "Facility created");
        Ok(facility)
    }
}
