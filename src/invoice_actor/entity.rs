use chrono::Utc;

use super::actions::InvoiceAction;
use super::error::InvoiceError;
use crate::actor_framework::Entity;
use crate::domain::{items_total, Invoice, InvoiceCreate, InvoiceItem, InvoicePatch, PaymentStatus};

fn validate_items(items: &[InvoiceItem]) -> Result<i64, InvoiceError> {
    if items.is_empty() {
        return Err(InvoiceError::ValidationError("An invoice needs at least one item".into()));
    }
    for item in items {
        if item.description.trim().is_empty() {
            return Err(InvoiceError::ValidationError("Item description is required".into()));
        }
        if item.quantity == 0 || item.unit_price_cents < 0 {
            return Err(InvoiceError::ValidationError(format!(
                "Invalid quantity or price for item {:?}",
                item.description
            )));
        }
    }
    Ok(items_total(items))
}

impl Entity for Invoice {
    const KIND: &'static str = "invoice";

    type Id = String;
    type CreateParams = InvoiceCreate;
    type Patch = InvoicePatch;
    type Action = InvoiceAction;
    type ActionResult = Invoice;
    type Error = InvoiceError;

    fn id(&self) -> &String {
        &self.id
    }

    fn from_create_params(id: String, params: InvoiceCreate) -> Result<Self, InvoiceError> {
        if params.order_ids.is_empty() {
            return Err(InvoiceError::ValidationError("An invoice must reference at least one order".into()));
        }
        let total_cents = validate_items(&params.items)?;
        Ok(Self {
            id,
            invoice_number: params.invoice_number,
            customer_id: params.customer_id,
            order_ids: params.order_ids,
            items: params.items,
            total_cents,
            currency: params.currency,
            payment_status: PaymentStatus::Unpaid,
            payment_details: None,
            provider_order_id: None,
            due_date: params.due_date,
            notes: params.notes,
            created_at: Utc::now(),
            paid_at: None,
        })
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("invoiceNumber", self.invoice_number.clone())]
    }

    /// Edits items, due date or notes. The billed total is frozen once settled.
    fn on_update(&mut self, patch: InvoicePatch) -> Result<(), InvoiceError> {
        if let Some(items) = patch.items {
            if self.payment_status.is_settled() {
                return Err(InvoiceError::AlreadyPaid);
            }
            self.total_cents = validate_items(&items)?;
            self.items = items;
        }
        if let Some(due) = patch.due_date {
            self.due_date = Some(due);
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        Ok(())
    }

    fn on_delete(&self) -> Result<(), InvoiceError> {
        if self.payment_status.is_settled() {
            return Err(InvoiceError::AlreadyPaid);
        }
        Ok(())
    }

    fn handle_action(&mut self, action: InvoiceAction) -> Result<Invoice, InvoiceError> {
        let status = self.payment_status;
        match action {
            InvoiceAction::StartPayment { provider_order_id } => match status {
                PaymentStatus::Unpaid | PaymentStatus::Pending => {
                    self.provider_order_id = Some(provider_order_id);
                    self.payment_status = PaymentStatus::Pending;
                }
                PaymentStatus::Paid => return Err(InvoiceError::AlreadyPaid),
                _ => return Err(InvoiceError::InvalidPaymentState { status, action: "start payment for" }),
            },
            InvoiceAction::MarkPaid(details) => match status {
                PaymentStatus::Unpaid | PaymentStatus::Pending => {
                    self.paid_at = Some(details.captured_at);
                    self.payment_details = Some(details);
                    self.payment_status = PaymentStatus::Paid;
                }
                PaymentStatus::Paid => return Err(InvoiceError::AlreadyPaid),
                _ => return Err(InvoiceError::InvalidPaymentState { status, action: "mark as paid" }),
            },
            InvoiceAction::Cancel => match status {
                PaymentStatus::Unpaid | PaymentStatus::Pending => self.payment_status = PaymentStatus::Cancelled,
                _ => return Err(InvoiceError::InvalidPaymentState { status, action: "cancel" }),
            },
            InvoiceAction::Refund => match status {
                PaymentStatus::Paid => self.payment_status = PaymentStatus::Refunded,
                _ => return Err(InvoiceError::InvalidPaymentState { status, action: "refund" }),
            },
        }
        Ok(self.clone())
    }
}
