//! Stock movement ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UnknownVariant;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "in",
            MovementDirection::Out => "out",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownVariant> {
        match s {
            "in" => Ok(MovementDirection::In),
            "out" => Ok(MovementDirection::Out),
            other => Err(UnknownVariant::new("movement direction", other)),
        }
    }
}

/// Operation category of a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementCategory {
    /// Intake (reception or manual add)
    Entree,
    /// Stock leaving for a shipment
    Sortie,
    /// Exchange of an item with a customer
    Echange,
    /// Returned shipment
    Retour,
}

impl MovementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementCategory::Entree => "entree",
            MovementCategory::Sortie => "sortie",
            MovementCategory::Echange => "echange",
            MovementCategory::Retour => "retour",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownVariant> {
        match s {
            "entree" => Ok(MovementCategory::Entree),
            "sortie" => Ok(MovementCategory::Sortie),
            "echange" => Ok(MovementCategory::Echange),
            "retour" => Ok(MovementCategory::Retour),
            other => Err(UnknownVariant::new("movement category", other)),
        }
    }

    /// Whether a movement of this category may go in `direction`
    pub fn accepts(&self, direction: MovementDirection) -> bool {
        match self {
            MovementCategory::Entree | MovementCategory::Retour => {
                direction == MovementDirection::In
            }
            MovementCategory::Sortie => direction == MovementDirection::Out,
            MovementCategory::Echange => true,
        }
    }

    /// French label shown in the admin UI
    pub fn label_fr(&self) -> &'static str {
        match self {
            MovementCategory::Entree => "entrée",
            MovementCategory::Sortie => "sortie",
            MovementCategory::Echange => "échange",
            MovementCategory::Retour => "retour",
        }
    }
}

/// An immutable ledger row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub direction: MovementDirection,
    pub category: MovementCategory,
    pub product_id: Option<Uuid>,
    pub reference: Option<String>,
    pub product_name: Option<String>,
    pub size: Option<String>,
    pub quantity: i32,
    pub stock_before: Option<i32>,
    pub stock_after: Option<i32>,
    pub tracking_number: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Canonical form of a courier tracking number; blank becomes `None`
pub fn normalize_tracking_number(raw: Option<&str>) -> Option<String> {
    raw.map(|t| t.trim().to_uppercase()).filter(|t| !t.is_empty())
}
