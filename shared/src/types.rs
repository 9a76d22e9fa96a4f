//! Common types used across the platform

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currency used for every price and cost on the platform
pub const CURRENCY: &str = "DZD";

/// Before/after values of a single stock counter write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub before: i32,
    pub after: i32,
}

impl StockChange {
    pub fn new(before: i32, after: i32) -> Self {
        Self { before, after }
    }

    pub fn delta(&self) -> i32 {
        self.after - self.before
    }
}

/// Single-unit adjustment requested by a barcode scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanAction {
    Add,
    Remove,
}

impl ScanAction {
    pub fn delta(&self) -> i32 {
        match self {
            ScanAction::Add => 1,
            ScanAction::Remove => -1,
        }
    }
}

/// Returned when a stored or submitted enum label is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
