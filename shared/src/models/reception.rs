//! Stock reception models
//!
//! A reception is a batch of incoming goods from a facility. Each line keeps a
//! snapshot of the unit cost at reception time, decoupled from later catalog
//! price changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{StockChange, UnknownVariant};

/// Payment state of a reception towards its facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownVariant> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(UnknownVariant::new("payment status", other)),
        }
    }

    /// Derive the status implied by the amount paid so far
    pub fn derive(amount_paid: Decimal, total_cost: Decimal) -> Self {
        if amount_paid <= Decimal::ZERO {
            PaymentStatus::Pending
        } else if amount_paid >= total_cost {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        }
    }
}

/// Lifecycle state of a reception
///
/// `Completed` means stock has been applied, not that payment is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceptionStatus {
    Completed,
}

impl ReceptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceptionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownVariant> {
        match s {
            "completed" => Ok(ReceptionStatus::Completed),
            other => Err(UnknownVariant::new("reception status", other)),
        }
    }
}

/// A recorded intake batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReception {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub total_cost: Decimal,
    pub amount_paid: Decimal,
    pub payment_status: PaymentStatus,
    pub status: ReceptionStatus,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub items: Vec<StockReceptionItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a reception
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReceptionItem {
    pub id: Uuid,
    pub reception_id: Uuid,
    pub position: i32,
    pub product_name: String,
    pub reference: Option<String>,
    pub size: Option<String>,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub line_cost: Decimal,
}

/// Cost of one line at its snapshot price
pub fn line_cost(unit_cost: Decimal, quantity: i32) -> Decimal {
    unit_cost * Decimal::from(quantity)
}

/// Total cost of a batch given `(unit_cost, quantity)` pairs
pub fn reception_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(unit_cost, quantity)| line_cost(unit_cost, quantity))
        .sum()
}

/// Result of applying one reception line to stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Success,
    Failed,
    Skipped,
}

/// Per-line outcome of the stock application step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineOutcome {
    pub position: usize,
    pub product_name: String,
    pub reference: Option<String>,
    pub size: Option<String>,
    pub quantity: i32,
    pub status: LineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Counter that received the delta (size counter for sized products)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<StockChange>,
    /// Aggregate product stock after the write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_stock: Option<i32>,
}

/// Outcome of applying every line of a reception to stock
///
/// Lines are applied independently: a failed line never rolls back the
/// reception nor the lines applied before it. Callers inspect `failed` to
/// detect a partially applied batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockApplication {
    pub results: Vec<LineOutcome>,
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StockApplication {
    pub fn record(&mut self, outcome: LineOutcome) {
        match outcome.status {
            LineStatus::Success => self.applied += 1,
            LineStatus::Failed => self.failed += 1,
            LineStatus::Skipped => self.skipped += 1,
        }
        self.results.push(outcome);
    }

    /// True when no line failed
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    pub fn statuses(&self) -> Vec<LineStatus> {
        self.results.iter().map(|r| r.status).collect()
    }

    pub fn rejected(&self) -> impl Iterator<Item = &LineOutcome> {
        self.results
            .iter()
            .filter(|r| r.status == LineStatus::Failed)
    }
}
