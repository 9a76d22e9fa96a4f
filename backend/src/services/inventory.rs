//! Inventory service: stock receptions and the movement ledger

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::validation::validate_tracking_number;
use uuid::Uuid;
use validator::Validate;

use super::stock::{reception_movement, StockService};
use crate::config::InventoryConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    normalize_tracking_number, reception_total, MovementCategory, MovementDirection,
    PaymentStatus, Product, StockApplication, StockMovement, StockReception,
};
use crate::store::{
    InventoryStore, MovementFilter, NewMovement, NewReception, NewReceptionItem, ReceptionUpdate,
};

/// Inventory service for receptions and ledger movements
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
    limits: InventoryConfig,
}

// ============================================================================
// Inputs and outputs
// ============================================================================

/// Input for recording a reception
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReceptionInput {
    pub facility_id: Uuid,
    pub received_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate]
    pub items: Vec<ReceptionItemInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReceptionItemInput {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub product_name: String,
    pub reference: Option<String>,
    pub size: Option<String>,
    #[validate(range(min = 1, max = 100000, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// A stored reception together with the outcome of its stock application
#[derive(Debug, Clone, Serialize)]
pub struct ReceptionCreated {
    pub reception: StockReception,
    pub stock: StockApplication,
}

/// Input for updating the payment side of a reception
#[derive(Debug, Default, Deserialize)]
pub struct UpdateReceptionInput {
    pub amount_paid: Option<Decimal>,
    /// Overrides the status derived from `amount_paid`
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

/// Input for appending a ledger movement
#[derive(Debug, Deserialize, Validate)]
pub struct RecordMovementInput {
    pub direction: MovementDirection,
    pub category: MovementCategory,
    pub product_id: Option<Uuid>,
    pub reference: Option<String>,
    pub product_name: Option<String>,
    pub size: Option<String>,
    #[validate(range(min = 1, max = 100000, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub stock_before: Option<i32>,
    pub stock_after: Option<i32>,
    pub tracking_number: Option<String>,
    pub note: Option<String>,
}

/// Ledger listing filters
#[derive(Debug, Default, Deserialize)]
pub struct MovementQuery {
    pub direction: Option<MovementDirection>,
    pub category: Option<MovementCategory>,
    pub limit: Option<i64>,
}

/// Answer to a tracking-number reuse check
#[derive(Debug, Clone, Serialize)]
pub struct TrackingCheck {
    pub tracking_number: String,
    pub category: MovementCategory,
    pub valid: bool,
    pub message: String,
    pub message_fr: String,
}

/// Prior outbound lines for a tracking number
#[derive(Debug, Clone, Serialize)]
pub struct SortieLookup {
    pub tracking_number: String,
    pub found: bool,
    pub movements: Vec<StockMovement>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl InventoryService {
    pub fn new(store: Arc<dyn InventoryStore>, limits: InventoryConfig) -> Self {
        Self { store, limits }
    }

    // ========================================================================
    // Receptions
    // ========================================================================

    /// Record a reception, then add each of its lines to stock.
    ///
    /// The reception is stored before any stock is touched. Lines are applied
    /// one by one; a line that cannot be applied is reported in the returned
    /// `StockApplication` and does not undo the reception or earlier lines.
    pub async fn create_reception(
        &self,
        user_id: Option<Uuid>,
        input: CreateReceptionInput,
    ) -> AppResult<ReceptionCreated> {
        if input.items.is_empty() {
            return Err(AppError::validation(
                "items",
                "At least one item is required",
                "Au moins un article est requis",
            ));
        }
        input.validate()?;
        for (index, item) in input.items.iter().enumerate() {
            if item.product_name.trim().is_empty() {
                return Err(AppError::validation(
                    &format!("items[{}].product_name", index),
                    "Product name is required",
                    "Le nom du produit est requis",
                ));
            }
        }

        if self.store.find_facility(input.facility_id).await?.is_none() {
            return Err(AppError::validation(
                "facility_id",
                "Facility not found",
                "Atelier introuvable",
            ));
        }

        // Snapshot catalog costs; unknown or missing references cost nothing
        let mut catalog: HashMap<String, Option<Product>> = HashMap::new();
        let mut items = Vec::with_capacity(input.items.len());
        for item in input.items {
            let reference = non_blank(item.reference);
            let unit_cost = match &reference {
                Some(reference) => {
                    if !catalog.contains_key(reference) {
                        let product = self.store.find_product(reference).await?;
                        catalog.insert(reference.clone(), product);
                    }
                    catalog
                        .get(reference)
                        .and_then(|p| p.as_ref())
                        .map_or(Decimal::ZERO, |p| p.cost_price)
                }
                None => Decimal::ZERO,
            };

            items.push(NewReceptionItem {
                product_name: item.product_name.trim().to_string(),
                reference,
                size: non_blank(item.size),
                quantity: item.quantity,
                unit_cost,
            });
        }

        let total_cost = reception_total(items.iter().map(|i| (i.unit_cost, i.quantity)));

        let reception = self
            .store
            .insert_reception(NewReception {
                facility_id: input.facility_id,
                received_at: input.received_at.unwrap_or_else(Utc::now),
                total_cost,
                notes: non_blank(input.notes),
                created_by: user_id,
                items,
            })
            .await?;

        tracing::info!(
            reception_id = %reception.id,
            facility_id = %reception.facility_id,
            lines = reception.items.len(),
            total_cost = %reception.total_cost,
            "Reception recorded"
        );

        let stock_service = StockService::new(self.store.clone());
        let mut application = StockApplication::default();
        for item in &reception.items {
            let product = item
                .reference
                .as_ref()
                .and_then(|r| catalog.get(r))
                .and_then(|p| p.as_ref());

            let outcome = stock_service.apply_reception_line(item, product).await;

            if let (Some(product), Some(change)) = (product, outcome.stock) {
                stock_service
                    .append_movement(reception_movement(
                        item,
                        product,
                        change,
                        reception.id,
                        user_id,
                    ))
                    .await;
            }

            application.record(outcome);
        }

        if !application.is_complete() {
            tracing::warn!(
                reception_id = %reception.id,
                applied = application.applied,
                failed = application.failed,
                skipped = application.skipped,
                "Reception partially applied to stock"
            );
        }

        Ok(ReceptionCreated {
            reception,
            stock: application,
        })
    }

    pub async fn get_reception(&self, id: Uuid) -> AppResult<StockReception> {
        self.store
            .get_reception(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reception".to_string()))
    }

    /// Most recent receptions, newest first
    pub async fn list_receptions(&self) -> AppResult<Vec<StockReception>> {
        self.store
            .list_receptions(self.limits.reception_list_limit)
            .await
    }

    /// Update payment details; the status follows the amount unless given
    pub async fn update_reception(
        &self,
        id: Uuid,
        input: UpdateReceptionInput,
    ) -> AppResult<StockReception> {
        if let Some(amount) = input.amount_paid {
            if amount < Decimal::ZERO {
                return Err(AppError::validation(
                    "amount_paid",
                    "Amount paid cannot be negative",
                    "Le montant payé ne peut pas être négatif",
                ));
            }
        }

        let existing = self.get_reception(id).await?;

        let amount_paid = input.amount_paid.unwrap_or(existing.amount_paid);
        let payment_status = input
            .payment_status
            .unwrap_or_else(|| PaymentStatus::derive(amount_paid, existing.total_cost));
        let notes = match input.notes {
            Some(notes) => non_blank(Some(notes)),
            None => existing.notes,
        };

        let updated = self
            .store
            .update_reception(
                id,
                ReceptionUpdate {
                    amount_paid,
                    payment_status,
                    notes,
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound("Reception".to_string()))?;

        tracing::info!(
            reception_id = %id,
            amount_paid = %updated.amount_paid,
            payment_status = updated.payment_status.as_str(),
            "Reception payment updated"
        );

        Ok(updated)
    }

    /// Delete a reception and its lines. Stock already applied is kept.
    pub async fn delete_reception(&self, id: Uuid) -> AppResult<()> {
        if !self.store.delete_reception(id).await? {
            return Err(AppError::NotFound("Reception".to_string()));
        }
        tracing::info!(reception_id = %id, "Reception deleted");
        Ok(())
    }

    // ========================================================================
    // Movement ledger
    // ========================================================================

    /// Append a movement to the ledger. Counters are not touched.
    pub async fn record_movement(
        &self,
        user_id: Option<Uuid>,
        input: RecordMovementInput,
    ) -> AppResult<StockMovement> {
        input.validate()?;

        if !input.category.accepts(input.direction) {
            return Err(AppError::validation(
                "direction",
                &format!(
                    "Category {} does not allow direction {}",
                    input.category.as_str(),
                    input.direction.as_str()
                ),
                &format!(
                    "La catégorie {} n'accepte pas ce sens de mouvement",
                    input.category.label_fr()
                ),
            ));
        }

        let reference = non_blank(input.reference);
        let product_name = non_blank(input.product_name);
        if reference.is_none() && product_name.is_none() {
            return Err(AppError::validation(
                "reference",
                "A reference or a product name is required",
                "Une référence ou un nom de produit est requis",
            ));
        }

        let tracking_number = normalize_tracking_number(input.tracking_number.as_deref());
        if let Some(tracking) = &tracking_number {
            validate_tracking_number(tracking).map_err(|msg| {
                AppError::validation("tracking_number", msg, "Numéro de suivi invalide")
            })?;
        }

        let movement = self
            .store
            .insert_movement(NewMovement {
                direction: input.direction,
                category: input.category,
                product_id: input.product_id,
                reference,
                product_name,
                size: non_blank(input.size),
                quantity: input.quantity,
                stock_before: input.stock_before,
                stock_after: input.stock_after,
                tracking_number,
                note: non_blank(input.note),
                created_by: user_id,
            })
            .await?;

        tracing::debug!(
            movement_id = %movement.id,
            category = movement.category.as_str(),
            direction = movement.direction.as_str(),
            "Movement recorded"
        );

        Ok(movement)
    }

    /// Ledger rows, newest first
    pub async fn list_movements(&self, query: MovementQuery) -> AppResult<Vec<StockMovement>> {
        let limit = query
            .limit
            .unwrap_or(self.limits.movement_default_limit)
            .clamp(1, self.limits.movement_max_limit.max(1));

        self.store
            .list_movements(&MovementFilter {
                direction: query.direction,
                category: query.category,
                limit,
            })
            .await
    }

    /// Whether `tracking_number` is still free for `category`.
    ///
    /// Advisory only: two concurrent callers may both be told it is free.
    pub async fn validate_tracking(
        &self,
        tracking_number: &str,
        category: MovementCategory,
    ) -> AppResult<TrackingCheck> {
        let tracking = required_tracking(tracking_number)?;
        let used = self.store.tracking_used(&tracking, category).await?;

        let (message, message_fr) = if used {
            (
                format!(
                    "Tracking number {} is already used for {}",
                    tracking,
                    category.as_str()
                ),
                format!(
                    "Le numéro de suivi {} est déjà utilisé pour une {}",
                    tracking,
                    category.label_fr()
                ),
            )
        } else {
            (
                "Tracking number available".to_string(),
                "Numéro de suivi disponible".to_string(),
            )
        };

        Ok(TrackingCheck {
            tracking_number: tracking,
            category,
            valid: !used,
            message,
            message_fr,
        })
    }

    /// Most recent outbound lines shipped under `tracking_number`
    pub async fn lookup_sortie_by_tracking(&self, tracking_number: &str) -> AppResult<SortieLookup> {
        let tracking = required_tracking(tracking_number)?;
        let movements = self
            .store
            .movements_by_tracking(
                &tracking,
                MovementCategory::Sortie,
                self.limits.sortie_lookup_limit,
            )
            .await?;

        Ok(SortieLookup {
            found: !movements.is_empty(),
            tracking_number: tracking,
            movements,
        })
    }
}

fn required_tracking(raw: &str) -> AppResult<String> {
    normalize_tracking_number(Some(raw)).ok_or_else(|| {
        AppError::validation(
            "tracking_number",
            "Tracking number is required",
            "Le numéro de suivi est requis",
        )
    })
}
