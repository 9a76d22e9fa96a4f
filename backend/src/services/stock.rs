//! Stock mutation: manual barcode scans and reception line application

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::validation::validate_tracking_number;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    normalize_tracking_number, parse_barcode, LineOutcome, LineStatus, MovementCategory,
    MovementDirection, Product, ProductKind, ScanAction, SizeResolutionError, StockChange,
    StockMovement, StockReceptionItem,
};
use crate::store::{InventoryStore, NewMovement, StockWrite};

/// Stock mutation service
#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn InventoryStore>,
}

/// Input for a manual scan adjustment
#[derive(Debug, Deserialize)]
pub struct ScanInput {
    /// `REFERENCE` or `REFERENCE-SIZE`
    pub barcode: String,
    pub action: ScanAction,
    /// When set, the adjustment is also written to the movement ledger
    pub category: Option<MovementCategory>,
    pub tracking_number: Option<String>,
    pub note: Option<String>,
}

/// Product display info returned by a scan
#[derive(Debug, Clone, Serialize)]
pub struct ScannedProduct {
    pub id: Uuid,
    pub reference: String,
    pub name: String,
    pub kind: ProductKind,
    pub size: Option<String>,
}

/// Result of a scan adjustment
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub product: ScannedProduct,
    pub action: ScanAction,
    /// Counter that was adjusted (size counter for sized products)
    pub old_stock: i32,
    pub new_stock: i32,
    /// Aggregate product stock after the write
    pub product_stock: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement: Option<StockMovement>,
}

impl StockService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Apply a single-unit adjustment from a scanned barcode
    pub async fn scan(&self, user_id: Option<Uuid>, input: ScanInput) -> AppResult<ScanResult> {
        let code = parse_barcode(&input.barcode).map_err(|e| {
            AppError::validation(
                "barcode",
                &format!("Invalid barcode: {}", e),
                "Code-barres invalide",
            )
        })?;

        let direction = match input.action {
            ScanAction::Add => MovementDirection::In,
            ScanAction::Remove => MovementDirection::Out,
        };
        if let Some(category) = input.category {
            if !category.accepts(direction) {
                return Err(AppError::validation(
                    "category",
                    &format!(
                        "Category {} does not allow direction {}",
                        category.as_str(),
                        direction.as_str()
                    ),
                    &format!(
                        "La catégorie {} n'accepte pas ce sens de mouvement",
                        category.label_fr()
                    ),
                ));
            }
        }
        let tracking_number = normalize_tracking_number(input.tracking_number.as_deref());
        if let Some(tracking) = &tracking_number {
            validate_tracking_number(tracking).map_err(|msg| {
                AppError::validation("tracking_number", msg, "Numéro de suivi invalide")
            })?;
        }

        let (product, size) = self.resolve_code(&code.candidates()).await?;

        let target = product.resolve_target(size.as_deref()).map_err(|e| match e {
            SizeResolutionError::SizeRequired { .. } => AppError::validation(
                "barcode",
                &format!("Size required for {}", product.reference),
                &format!("Taille requise pour {}", product.reference),
            ),
            SizeResolutionError::SizeNotFound { reference, size } => {
                AppError::NotFound(format!("Size {} of product {}", size, reference))
            }
        })?;

        // Report the configured label rather than the scanned spelling
        let size_label = product.label_of(target);

        let (change, product_stock) = match self
            .store
            .apply_stock_delta(target, input.action.delta())
            .await?
        {
            StockWrite::Applied {
                target,
                product_stock,
            } => (target, product_stock),
            StockWrite::BelowZero { .. } => {
                return Err(AppError::validation(
                    "action",
                    "Stock already zero",
                    "Le stock est déjà à zéro",
                ))
            }
            StockWrite::Missing => {
                return Err(AppError::NotFound(format!("Product {}", product.reference)))
            }
        };

        tracing::info!(
            reference = %product.reference,
            size = ?size_label,
            before = change.before,
            after = change.after,
            product_stock,
            "Scan adjustment applied"
        );

        let movement = match input.category {
            Some(category) => {
                self.append_movement(NewMovement {
                    direction,
                    category,
                    product_id: Some(product.id),
                    reference: Some(product.reference.clone()),
                    product_name: Some(product.name.clone()),
                    size: size_label.clone(),
                    quantity: 1,
                    stock_before: Some(change.before),
                    stock_after: Some(change.after),
                    tracking_number,
                    note: input.note,
                    created_by: user_id,
                })
                .await
            }
            None => None,
        };

        Ok(ScanResult {
            product: ScannedProduct {
                id: product.id,
                reference: product.reference,
                name: product.name,
                kind: product.kind,
                size: size_label,
            },
            action: input.action,
            old_stock: change.before,
            new_stock: change.after,
            product_stock,
            movement,
        })
    }

    /// First candidate that names an active product wins
    async fn resolve_code(
        &self,
        candidates: &[(String, Option<String>)],
    ) -> AppResult<(Product, Option<String>)> {
        for (reference, size) in candidates {
            if let Some(product) = self.store.find_product(reference).await? {
                return Ok((product, size.clone()));
            }
        }

        let code = candidates
            .first()
            .map(|(code, _)| code.as_str())
            .unwrap_or_default();
        Err(AppError::NotFound(format!("Product {}", code)))
    }

    /// Add one reception line to stock.
    ///
    /// `product` is the catalog entry the line's reference resolved to, if any.
    /// Never fails: every problem is reported in the returned outcome.
    pub async fn apply_reception_line(
        &self,
        item: &StockReceptionItem,
        product: Option<&Product>,
    ) -> LineOutcome {
        let mut outcome = LineOutcome {
            position: item.position as usize,
            product_name: item.product_name.clone(),
            reference: item.reference.clone(),
            size: item.size.clone(),
            quantity: item.quantity,
            status: LineStatus::Skipped,
            reason: None,
            stock: None,
            product_stock: None,
        };

        let Some(reference) = item.reference.as_deref() else {
            outcome.reason = Some("no reference".to_string());
            return outcome;
        };

        let Some(product) = product else {
            return failed(outcome, format!("product {} not found", reference));
        };

        let target = match product.resolve_target(item.size.as_deref()) {
            Ok(target) => target,
            Err(e) => return failed(outcome, e.to_string()),
        };

        match self.store.apply_stock_delta(target, item.quantity).await {
            Ok(StockWrite::Applied {
                target,
                product_stock,
            }) => {
                outcome.status = LineStatus::Success;
                outcome.stock = Some(target);
                outcome.product_stock = Some(product_stock);
                outcome
            }
            Ok(StockWrite::BelowZero { current }) => {
                failed(outcome, format!("stock would go below zero (current {})", current))
            }
            Ok(StockWrite::Missing) => failed(outcome, format!("product {} not found", reference)),
            Err(e) => {
                tracing::error!(reference = %reference, error = %e, "Stock write failed");
                failed(outcome, "stock update failed".to_string())
            }
        }
    }

    /// Append a ledger row; a failure is logged and swallowed
    pub(crate) async fn append_movement(&self, movement: NewMovement) -> Option<StockMovement> {
        let reference = movement.reference.clone();
        match self.store.insert_movement(movement).await {
            Ok(movement) => Some(movement),
            Err(e) => {
                tracing::warn!(reference = ?reference, error = %e, "Failed to record stock movement");
                None
            }
        }
    }
}

fn failed(mut outcome: LineOutcome, reason: String) -> LineOutcome {
    tracing::warn!(
        position = outcome.position,
        reference = ?outcome.reference,
        reason = %reason,
        "Reception line not applied"
    );
    outcome.status = LineStatus::Failed;
    outcome.reason = Some(reason);
    outcome
}

/// Ledger row describing a successful reception line
pub(crate) fn reception_movement(
    item: &StockReceptionItem,
    product: &Product,
    change: StockChange,
    reception_id: Uuid,
    created_by: Option<Uuid>,
) -> NewMovement {
    NewMovement {
        direction: MovementDirection::In,
        category: MovementCategory::Entree,
        product_id: Some(product.id),
        reference: Some(product.reference.clone()),
        product_name: Some(item.product_name.clone()),
        size: product
            .resolve_target(item.size.as_deref())
            .ok()
            .and_then(|target| product.label_of(target)),
        quantity: item.quantity,
        stock_before: Some(change.before),
        stock_after: Some(change.after),
        tracking_number: None,
        note: Some(format!("Réception {}", reception_id)),
        created_by,
    }
}
