//! Email bodies for lifecycle events. Plain markup only.

use super::mailer::Email;
use crate::domain::{format_amount, Invoice, Order, User};

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn layout(heading: &str, paragraphs: &[String]) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", escape(p))).collect();
    format!("<html><body><h2>{}</h2>{}</body></html>", escape(heading), body)
}

fn email(to: &str, subject: String, heading: &str, paragraphs: &[String]) -> Email {
    Email {
        to: to.to_string(),
        html_body: layout(heading, paragraphs),
        subject,
        attachments: Vec::new(),
    }
}

fn describe(order: &Order) -> String {
    format!("{} ({} - {})", order.order_number, order.order_type, order.details.design_name())
}

pub fn order_confirmation(customer: &User, order: &Order) -> Email {
    email(
        &customer.email,
        format!("Order {} received", order.order_number),
        "Thanks for your order",
        &[
            format!("Hi {}, we received your order {}.", customer.name, describe(order)),
            "We will email you as soon as a sample is ready for review.".to_string(),
        ],
    )
}

pub fn admin_new_order(admin_email: &str, customer: &User, order: &Order) -> Email {
    email(
        admin_email,
        format!("New {} order {}", order.order_type, order.order_number),
        "New order",
        &[format!("{} placed order {}.", customer.name, describe(order))],
    )
}

pub fn assignment(employee: &User, order: &Order) -> Email {
    email(
        &employee.email,
        format!("Order {} assigned to you", order.order_number),
        "New assignment",
        &[format!("Hi {}, order {} is now assigned to you.", employee.name, describe(order))],
    )
}

pub fn status_changed(customer: &User, order: &Order) -> Email {
    email(
        &customer.email,
        format!("Order {} is now {}", order.order_number, order.status),
        "Order update",
        &[format!("Your order {} moved to \"{}\".", describe(order), order.status)],
    )
}

pub fn sample_ready(customer: &User, order: &Order) -> Email {
    email(
        &customer.email,
        format!("Sample ready for order {}", order.order_number),
        "Your sample is ready",
        &[format!("A new sample for {} is waiting for your approval.", describe(order))],
    )
}

pub fn tracking_number(customer: &User, order: &Order, tracking: &str) -> Email {
    email(
        &customer.email,
        format!("Your patches from order {} have shipped", order.order_number),
        "Shipped",
        &[
            format!("Order {} is on its way.", describe(order)),
            format!("Tracking number: {}", tracking),
        ],
    )
}

pub fn invoice_created(customer: &User, invoice: &Invoice) -> Email {
    email(
        &customer.email,
        format!("Invoice {}", invoice.invoice_number),
        "New invoice",
        &[format!(
            "Invoice {} for {} {} covering {} order(s) is ready for payment.",
            invoice.invoice_number,
            format_amount(invoice.total_cents),
            invoice.currency,
            invoice.order_ids.len()
        )],
    )
}

pub fn payment_received(customer: &User, invoice: &Invoice) -> Email {
    email(
        &customer.email,
        format!("Payment received for {}", invoice.invoice_number),
        "Payment received",
        &[format!(
            "We received {} {} for invoice {}. Thank you!",
            format_amount(invoice.total_cents),
            invoice.currency,
            invoice.invoice_number
        )],
    )
}
