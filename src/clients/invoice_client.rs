use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, instrument, warn};

use super::access::{ensure_active, ensure_admin};
use super::{NotificationClient, OrderClient, UserClient};
use crate::actor_framework::{Filter, ResourceClient};
use crate::domain::{
    format_amount, invoice_number, Actor, Invoice, InvoiceCreate, InvoiceItem, InvoicePatch, NotificationCreate,
    NotificationKind, Order, PaymentDetails, PaymentStatus, Role, User,
};
use crate::error::{AppError, AppResult};
use crate::gateways::{emails, CaptureStatus, CheckoutRequest, Email, Mailer, PaymentProvider};
use crate::invoice_actor::InvoiceAction;

/// Admin request to bill one or more orders of a single customer.
#[derive(Debug, Clone, Default)]
pub struct InvoiceRequest {
    pub order_ids: Vec<String>,
    /// Explicit line items. When `None`, one item per order at its price.
    pub items: Option<Vec<InvoiceItem>>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A started checkout: the payer approves it at `approval_url`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSession {
    pub invoice: Invoice,
    pub provider_order_id: String,
    pub approval_url: Option<String>,
}

/// Client for invoices and payment capture.
///
/// Capture success is only ever taken from the payment provider, never from
/// the caller.
#[derive(Clone)]
pub struct InvoiceClient {
    inner: ResourceClient<Invoice>,
    orders: OrderClient,
    users: UserClient,
    notifications: NotificationClient,
    mailer: Arc<dyn Mailer>,
    payments: Arc<dyn PaymentProvider>,
    currency: String,
    sequence: Arc<AtomicU64>,
}

impl_client_methods!(InvoiceClient, Invoice, invoice);

fn default_items(orders: &[Order]) -> AppResult<Vec<InvoiceItem>> {
    orders
        .iter()
        .map(|order| {
            let price = order
                .price_cents
                .ok_or_else(|| AppError::validation(format!("Order {} has no price yet", order.order_number)))?;
            Ok(InvoiceItem {
                order_id: Some(order.id.clone()),
                description: format!("{} - {}", order.order_number, order.details.design_name()),
                quantity: 1,
                unit_price_cents: price,
            })
        })
        .collect()
}

fn ensure_can_view(actor: &Actor, invoice: &Invoice) -> AppResult<()> {
    ensure_active(actor)?;
    match actor.role {
        Role::Admin => Ok(()),
        Role::Customer if invoice.customer_id == actor.id => Ok(()),
        _ => Err(AppError::forbidden(format!("You cannot view invoice {}", invoice.invoice_number))),
    }
}

impl InvoiceClient {
    pub fn new(
        inner: ResourceClient<Invoice>,
        orders: OrderClient,
        users: UserClient,
        notifications: NotificationClient,
        mailer: Arc<dyn Mailer>,
        payments: Arc<dyn PaymentProvider>,
        currency: String,
    ) -> Self {
        Self {
            inner,
            orders,
            users,
            notifications,
            mailer,
            payments,
            currency,
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Bills orders of one customer on a single invoice and links each order to it.
    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id, orders = request.order_ids.len()))]
    pub async fn create_invoice(&self, actor: &Actor, request: InvoiceRequest) -> AppResult<Invoice> {
        info!("Processing create_invoice request (Client Side)");
        ensure_admin(actor)?;

        // Step 1: Load and validate the orders
        let mut seen = HashSet::new();
        let order_ids: Vec<String> = request.order_ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        if order_ids.is_empty() {
            return Err(AppError::validation("An invoice must reference at least one order"));
        }
        let mut orders = Vec::with_capacity(order_ids.len());
        for id in &order_ids {
            orders.push(self.orders.find_order(id).await?);
        }
        let customer_id = orders[0].customer_id.clone();
        if orders.iter().any(|o| o.customer_id != customer_id) {
            return Err(AppError::validation("All orders on an invoice must belong to the same customer"));
        }
        if let Some(billed) = orders.iter().find(|o| o.has_invoice) {
            return Err(AppError::validation(format!("Order {} is already invoiced", billed.order_number)));
        }
        let items = match request.items {
            Some(items) => items,
            None => default_items(&orders)?,
        };

        // Step 2: Create invoice in ResourceActor
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let id = self
            .inner
            .create(InvoiceCreate {
                invoice_number: invoice_number(Utc::now().date_naive(), sequence),
                customer_id,
                order_ids: order_ids.clone(),
                items,
                currency: self.currency.clone(),
                due_date: request.due_date,
                notes: request.notes,
            })
            .await?;

        // Step 3: Link every order; unwind everything if one link fails
        let mut linked: Vec<String> = Vec::new();
        for order_id in &order_ids {
            if let Err(e) = self.orders.link_invoice(order_id, &id, PaymentStatus::Unpaid).await {
                error!(error = %e, order_id = %order_id, "Linking order to invoice failed; rolling back");
                for done in &linked {
                    if let Err(unlink) = self.orders.unlink_invoice(done).await {
                        error!(error = %unlink, order_id = %done, "Could not unlink order");
                    }
                }
                if let Err(cleanup) = self.inner.delete(id.clone()).await {
                    error!(error = %cleanup, invoice_id = %id, "Orphaned invoice left behind");
                }
                return Err(e);
            }
            linked.push(order_id.clone());
        }

        let invoice = self.inner.fetch(id).await?;
        info!(invoice_id = %invoice.id, number = %invoice.invoice_number, total = %format_amount(invoice.total_cents), "Invoice created");

        // Step 4: Tell the customer
        self.notify_customer(
            &invoice,
            NotificationKind::InvoiceCreated,
            "New invoice",
            format!(
                "Invoice {} for {} {} is ready for payment.",
                invoice.invoice_number,
                format_amount(invoice.total_cents),
                invoice.currency
            ),
            emails::invoice_created,
        )
        .await;
        Ok(invoice)
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn get_invoice(&self, actor: &Actor, id: &str) -> AppResult<Invoice> {
        let invoice = self.find_invoice(id).await?;
        ensure_can_view(actor, &invoice)?;
        Ok(invoice)
    }

    /// Customers see their own invoices, admins all. Newest first.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn list_invoices(&self, actor: &Actor) -> AppResult<Vec<Invoice>> {
        ensure_active(actor)?;
        let filter = match actor.role {
            Role::Admin => Filter::all(),
            Role::Customer => {
                let customer_id = actor.id.clone();
                Filter::new(move |i: &Invoice| i.customer_id == customer_id)
            }
            Role::Employee => return Err(AppError::forbidden("Employees have no access to invoices")),
        };
        let mut invoices = self.list_invoices_where(filter).await?;
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.invoice_number.cmp(&a.invoice_number)));
        Ok(invoices)
    }

    /// Replaces the line items. Refused once the invoice is settled.
    #[instrument(skip(self, actor, items), fields(actor_id = %actor.id))]
    pub async fn update_items(&self, actor: &Actor, id: &str, items: Vec<InvoiceItem>) -> AppResult<Invoice> {
        ensure_admin(actor)?;
        let patch = InvoicePatch { items: Some(items), ..InvoicePatch::default() };
        Ok(self.inner.update(id.to_string(), patch).await?)
    }

    /// Opens a provider checkout for the invoice total.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn start_payment(&self, actor: &Actor, id: &str) -> AppResult<PaymentSession> {
        let invoice = self.find_invoice(id).await?;
        ensure_can_view(actor, &invoice)?;
        match invoice.payment_status {
            PaymentStatus::Unpaid | PaymentStatus::Pending => {}
            PaymentStatus::Paid => return Err(AppError::validation("Invoice is already paid")),
            other => return Err(AppError::validation(format!("Invoice is {}", other))),
        }

        let handle = self
            .payments
            .create_checkout(CheckoutRequest {
                amount_cents: invoice.total_cents,
                currency: invoice.currency.clone(),
                reference: invoice.invoice_number.clone(),
            })
            .await?;
        let invoice = self
            .inner
            .perform_action(
                invoice.id,
                InvoiceAction::StartPayment { provider_order_id: handle.provider_order_id.clone() },
            )
            .await?;
        info!(invoice_id = %invoice.id, provider_order_id = %handle.provider_order_id, "Checkout started");
        self.set_order_status(&invoice, PaymentStatus::Pending).await;
        Ok(PaymentSession {
            invoice,
            provider_order_id: handle.provider_order_id,
            approval_url: handle.approval_url,
        })
    }

    /// Marks the invoice paid after re-reading the capture from the provider.
    /// Only a completed capture made out to this invoice's number for the exact
    /// total is accepted. A capture already recorded on another invoice is refused.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn confirm_payment(&self, actor: &Actor, id: &str, transaction_id: &str) -> AppResult<Invoice> {
        info!("Processing confirm_payment request (Client Side)");
        let invoice = self.find_invoice(id).await?;
        ensure_can_view(actor, &invoice)?;
        if invoice.payment_status == PaymentStatus::Paid {
            return Err(AppError::validation("Invoice is already paid"));
        }

        // Step 1: Ask the provider
        let capture = self.payments.fetch_capture(transaction_id).await?;
        if capture.status != CaptureStatus::Completed {
            warn!(transaction_id, status = ?capture.status, "Capture not completed");
            return Err(AppError::validation(format!(
                "Payment {} is not completed (status {:?})",
                transaction_id, capture.status
            )));
        }
        if capture.invoice_reference.as_deref() != Some(invoice.invoice_number.as_str()) {
            warn!(
                transaction_id,
                reference = ?capture.invoice_reference,
                expected = %invoice.invoice_number,
                "Capture belongs to another checkout"
            );
            return Err(AppError::validation(format!(
                "Payment {} was not made for invoice {}",
                transaction_id, invoice.invoice_number
            )));
        }
        if capture.amount_cents != invoice.total_cents || !capture.currency.eq_ignore_ascii_case(&invoice.currency) {
            warn!(
                transaction_id,
                captured = %format_amount(capture.amount_cents),
                expected = %format_amount(invoice.total_cents),
                "Capture does not match the invoice"
            );
            return Err(AppError::validation(format!(
                "Captured {} {} does not match invoice total {} {}",
                format_amount(capture.amount_cents),
                capture.currency,
                format_amount(invoice.total_cents),
                invoice.currency
            )));
        }

        let settled_id = capture.transaction_id.clone();
        let invoice_id = invoice.id.clone();
        let settled_elsewhere = self
            .list_invoices_where(Filter::new(move |i: &Invoice| {
                i.id != invoice_id && i.payment_details.as_ref().is_some_and(|p| p.transaction_id == settled_id)
            }))
            .await?;
        if let Some(other) = settled_elsewhere.first() {
            warn!(transaction_id, other_invoice = %other.invoice_number, "Capture already recorded");
            return Err(AppError::validation(format!(
                "Payment {} is already recorded on invoice {}",
                transaction_id, other.invoice_number
            )));
        }

        // Step 2: Record the payment
        let details = PaymentDetails {
            transaction_id: capture.transaction_id,
            amount_cents: capture.amount_cents,
            currency: capture.currency,
            payer_email: capture.payer_email,
            captured_at: Utc::now(),
        };
        let invoice = self.inner.perform_action(invoice.id, InvoiceAction::MarkPaid(details)).await?;
        info!(invoice_id = %invoice.id, "Invoice paid");

        // Step 3: Propagate to the orders and tell people
        self.set_order_status(&invoice, PaymentStatus::Paid).await;
        let message = format!(
            "Payment of {} {} received for invoice {}.",
            format_amount(invoice.total_cents),
            invoice.currency,
            invoice.invoice_number
        );
        self.notify_customer(
            &invoice,
            NotificationKind::PaymentReceived,
            "Payment received",
            message.clone(),
            emails::payment_received,
        )
        .await;
        match self.users.list_admins().await {
            Ok(admins) => {
                let template = NotificationCreate::new("", NotificationKind::PaymentReceived, "Payment received", message)
                    .from_role(Role::Customer);
                self.notifications.deliver_all(admins.into_iter().map(|a| a.id), template).await;
            }
            Err(e) => warn!(error = %e, "Could not load admins for notification"),
        }
        Ok(invoice)
    }

    /// Voids an unpaid invoice and releases its orders for re-billing.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn cancel_invoice(&self, actor: &Actor, id: &str) -> AppResult<Invoice> {
        ensure_admin(actor)?;
        let invoice = self.inner.perform_action(id.to_string(), InvoiceAction::Cancel).await?;
        info!(invoice_id = %invoice.id, "Invoice cancelled");
        for order_id in &invoice.order_ids {
            if let Err(e) = self.orders.unlink_invoice(order_id).await {
                warn!(error = %e, order_id = %order_id, "Could not release order from invoice");
            }
        }
        self.notifications
            .deliver(
                NotificationCreate::new(
                    &invoice.customer_id,
                    NotificationKind::InvoiceCancelled,
                    "Invoice cancelled",
                    format!("Invoice {} was cancelled.", invoice.invoice_number),
                )
                .from_role(Role::Admin),
            )
            .await;
        Ok(invoice)
    }

    /// Records a refund issued outside the desk.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn mark_refunded(&self, actor: &Actor, id: &str) -> AppResult<Invoice> {
        ensure_admin(actor)?;
        let invoice = self.inner.perform_action(id.to_string(), InvoiceAction::Refund).await?;
        info!(invoice_id = %invoice.id, "Invoice refunded");
        self.set_order_status(&invoice, PaymentStatus::Refunded).await;
        Ok(invoice)
    }

    async fn set_order_status(&self, invoice: &Invoice, status: PaymentStatus) {
        for order_id in &invoice.order_ids {
            if let Err(e) = self.orders.set_invoice_status(order_id, status).await {
                warn!(error = %e, order_id = %order_id, %status, "Order invoice status not updated");
            }
        }
    }

    async fn notify_customer(
        &self,
        invoice: &Invoice,
        kind: NotificationKind,
        title: &str,
        message: String,
        email: fn(&User, &Invoice) -> Email,
    ) {
        self.notifications
            .deliver(NotificationCreate::new(&invoice.customer_id, kind, title, message).from_role(Role::Admin))
            .await;
        match self.users.find_user(&invoice.customer_id).await {
            Ok(customer) => {
                if let Err(e) = self.mailer.send(email(&customer, invoice)).await {
                    warn!(error = %e, invoice_id = %invoice.id, "Invoice email failed");
                }
            }
            Err(e) => warn!(error = %e, "Customer lookup failed; skipping email"),
        }
    }
}
