use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    /// A checkout was started with the payment provider but not yet confirmed.
    Pending,
    Paid,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    /// Once money has moved the billed amount is frozen.
    pub fn is_settled(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Refunded)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub order_id: Option<String>,
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl InvoiceItem {
    pub fn amount_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// Authoritative capture data, recorded only after the provider confirmed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub transaction_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub payer_email: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// Consolidated invoice covering one or more orders of a single customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub customer_id: String,
    pub order_ids: Vec<String>,
    pub items: Vec<InvoiceItem>,
    pub total_cents: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,
    pub provider_order_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

pub fn items_total(items: &[InvoiceItem]) -> i64 {
    items.iter().map(InvoiceItem::amount_cents).sum()
}

/// Parameters for creating an invoice.
#[derive(Debug, Clone)]
pub struct InvoiceCreate {
    pub invoice_number: String,
    pub customer_id: String,
    pub order_ids: Vec<String>,
    pub items: Vec<InvoiceItem>,
    pub currency: String,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InvoicePatch {
    pub items: Option<Vec<InvoiceItem>>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Builds invoice numbers like `INV-20260115-0003`.
pub fn invoice_number(date: NaiveDate, sequence: u64) -> String {
    format!("INV-{}-{:04}", date.format("%Y%m%d"), sequence)
}

/// Renders cents as `12.50` for display and provider payloads.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}
