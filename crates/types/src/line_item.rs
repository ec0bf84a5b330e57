//! Financial line items ("income" entries) attached to an event record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One income entry associated with an event record.
///
/// Line items are mutated by the payment-recording modules; the
/// reconciliation engine reads them as facts, and its only write is the
/// narrow mark-as-paid operation carried by [`PaymentDetails`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub record_id: String,
    pub description: String,
    pub amount: Decimal,
    pub invoiced: bool,
    pub collected: bool,
    /// ISO 8601 date string (`YYYY-MM-DD`). None when no due date is set.
    #[serde(default)]
    pub payment_due_date: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string. Set by mark-as-paid.
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

/// Payment metadata recorded when a line item is marked as collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// ISO 8601 / RFC 3339 timestamp string.
    pub paid_at: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}
