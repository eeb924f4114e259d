use crate::domain::PaymentDetails;

/// Custom actions for Invoice entities: the payment state machine.
#[derive(Debug, Clone)]
pub enum InvoiceAction {
    /// Records the provider checkout started for this invoice.
    StartPayment { provider_order_id: String },
    /// Records a capture the provider has confirmed.
    MarkPaid(PaymentDetails),
    Cancel,
    Refund,
}
