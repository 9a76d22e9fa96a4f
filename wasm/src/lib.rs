//! WebAssembly module for the Boutique stock platform
//!
//! Provides client-side helpers for the admin UI:
//! - Barcode parsing for the scan screen
//! - Reception total preview
//! - Payment status preview
//! - Tracking number and size normalisation

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::barcode::*;
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

#[derive(Serialize)]
struct ParsedBarcode {
    code: String,
    reference: Option<String>,
    size: Option<String>,
}

/// Parse a scanned barcode into `{ code, reference, size }` JSON
#[wasm_bindgen]
pub fn parse_scanned_barcode(raw: &str) -> Result<String, JsValue> {
    let code = parse_barcode(raw).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let (reference, size) = match code.split.clone() {
        Some((reference, size)) => (Some(reference), Some(size)),
        None => (None, None),
    };

    serde_json::to_string(&ParsedBarcode {
        code: code.code,
        reference,
        size,
    })
    .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Canonical size label used when matching sizes
#[wasm_bindgen]
pub fn normalize_size(label: &str) -> String {
    normalize_size_label(label)
}

/// Canonical tracking number; empty when blank
#[wasm_bindgen]
pub fn normalize_tracking(raw: &str) -> String {
    normalize_tracking_number(Some(raw)).unwrap_or_default()
}

#[derive(Deserialize)]
struct PreviewLine {
    unit_cost: Decimal,
    quantity: i32,
}

/// Total cost of reception lines given as `[{ unit_cost, quantity }]` JSON
#[wasm_bindgen]
pub fn preview_reception_total(lines_json: &str) -> Result<String, JsValue> {
    let lines: Vec<PreviewLine> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid lines JSON: {}", e)))?;

    if let Some(line) = lines.iter().find(|l| validate_quantity(l.quantity).is_err()) {
        return Err(JsValue::from_str(&format!(
            "Invalid quantity: {}",
            line.quantity
        )));
    }

    let total = reception_total(lines.iter().map(|l| (l.unit_cost, l.quantity)));
    Ok(total.to_string())
}

/// Payment status implied by an amount paid against a total, as decimal strings
#[wasm_bindgen]
pub fn preview_payment_status(amount_paid: &str, total_cost: &str) -> Result<String, JsValue> {
    let amount = Decimal::from_str(amount_paid.trim())
        .map_err(|_| JsValue::from_str("Invalid amount paid"))?;
    let total =
        Decimal::from_str(total_cost.trim()).map_err(|_| JsValue::from_str("Invalid total cost"))?;

    Ok(PaymentStatus::derive(amount, total).as_str().to_string())
}

/// Whether a movement category accepts a direction (`in` / `out`)
#[wasm_bindgen]
pub fn category_accepts_direction(category: &str, direction: &str) -> bool {
    match (
        MovementCategory::parse(category),
        MovementDirection::parse(direction),
    ) {
        (Ok(category), Ok(direction)) => category.accepts(direction),
        _ => false,
    }
}

/// Whether a phone number is an Algerian mobile number
#[wasm_bindgen]
pub fn is_valid_algerian_phone(phone: &str) -> bool {
    validate_algerian_phone(phone).is_ok()
}
