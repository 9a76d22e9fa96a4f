//! Catalog models and size resolution rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UnknownVariant;

/// How a product's stock is broken down
///
/// Set explicitly when the product is defined in the catalog. `Accessory`
/// products keep a single counter; `Sized` products keep one counter per size
/// label and an aggregate counter equal to their sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    #[default]
    Sized,
    Accessory,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Sized => "sized",
            ProductKind::Accessory => "accessory",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownVariant> {
        match s {
            "sized" => Ok(ProductKind::Sized),
            "accessory" => Ok(ProductKind::Accessory),
            other => Err(UnknownVariant::new("product kind", other)),
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// Unique catalog reference printed on barcodes (e.g. "TS001")
    pub reference: String,
    pub name: String,
    pub kind: ProductKind,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    /// Aggregate stock; the sum of `sizes` when the product tracks sizes
    pub stock: i32,
    pub is_active: bool,
    pub sizes: Vec<ProductSize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock counter for one size label of a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSize {
    pub id: Uuid,
    pub product_id: Uuid,
    pub label: String,
    pub stock: i32,
}

/// Which counter a stock delta should be written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockTarget {
    Product { product_id: Uuid },
    Size { product_id: Uuid, size_id: Uuid },
}

impl StockTarget {
    pub fn product_id(&self) -> Uuid {
        match self {
            StockTarget::Product { product_id } | StockTarget::Size { product_id, .. } => {
                *product_id
            }
        }
    }
}

/// Why a product/size pair could not be resolved to a stock counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeResolutionError {
    SizeRequired { reference: String },
    SizeNotFound { reference: String, size: String },
}

impl std::fmt::Display for SizeResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeResolutionError::SizeRequired { reference } => {
                write!(f, "size required for {}", reference)
            }
            SizeResolutionError::SizeNotFound { reference, size } => {
                write!(f, "size {} not found for {}", size, reference)
            }
        }
    }
}

impl Product {
    /// Whether writes must go to a size counter rather than the product counter
    pub fn tracks_sizes(&self) -> bool {
        self.kind == ProductKind::Sized && !self.sizes.is_empty()
    }

    /// Find a configured size, trimmed and case-insensitive
    pub fn find_size(&self, label: &str) -> Option<&ProductSize> {
        let wanted = normalize_size_label(label);
        if wanted.is_empty() {
            return None;
        }
        self.sizes
            .iter()
            .find(|s| normalize_size_label(&s.label) == wanted)
    }

    /// Resolve which counter a stock change for `size` applies to.
    ///
    /// Products without size tracking ignore `size` entirely.
    pub fn resolve_target(&self, size: Option<&str>) -> Result<StockTarget, SizeResolutionError> {
        if !self.tracks_sizes() {
            return Ok(StockTarget::Product { product_id: self.id });
        }

        let size = size.map(str::trim).unwrap_or_default();
        if size.is_empty() {
            return Err(SizeResolutionError::SizeRequired {
                reference: self.reference.clone(),
            });
        }

        self.find_size(size)
            .map(|s| StockTarget::Size {
                product_id: self.id,
                size_id: s.id,
            })
            .ok_or_else(|| SizeResolutionError::SizeNotFound {
                reference: self.reference.clone(),
                size: size.to_string(),
            })
    }

    /// Sum of all size counters
    pub fn sizes_total(&self) -> i32 {
        self.sizes.iter().map(|s| s.stock).sum()
    }

    /// Configured size label behind `target`; `None` for the product counter
    pub fn label_of(&self, target: StockTarget) -> Option<String> {
        match target {
            StockTarget::Size { size_id, .. } => self
                .sizes
                .iter()
                .find(|s| s.id == size_id)
                .map(|s| s.label.clone()),
            StockTarget::Product { .. } => None,
        }
    }

    /// Current value of the counter behind `target`
    pub fn stock_of(&self, target: StockTarget) -> Option<i32> {
        match target {
            StockTarget::Product { product_id } if product_id == self.id => Some(self.stock),
            StockTarget::Size { product_id, size_id } if product_id == self.id => self
                .sizes
                .iter()
                .find(|s| s.id == size_id)
                .map(|s| s.stock),
            _ => None,
        }
    }
}

/// Canonical form of a size label used for matching
pub fn normalize_size_label(label: &str) -> String {
    label.trim().to_uppercase()
}

/// Canonical form of a catalog reference used for matching
pub fn normalize_reference(reference: &str) -> String {
    reference.trim().to_uppercase()
}
