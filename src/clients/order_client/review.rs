use chrono::Utc;
use tracing::{info, instrument, warn};

use super::{ensure_assignee, OrderClient};
use crate::clients::access::{ensure_active, ensure_admin};
use crate::domain::{
    Actor, FileInput, NotificationCreate, NotificationKind, Order, OrderStatus, Role, StoredFile, WorkSubmission,
};
use crate::error::{AppError, AppResult};
use crate::gateways::emails;
use crate::order_actor::{OrderAction, OrderTransition};

/// Work an employee stages for admin review.
#[derive(Debug, Clone, Default)]
pub struct WorkReport {
    pub proposed_status: Option<OrderStatus>,
    pub files: Vec<FileInput>,
    pub report: Option<String>,
}

fn submitter(transition: &OrderTransition) -> Option<String> {
    transition.before.pending_work.submission().map(|s| s.submitted_by.clone())
}

impl OrderClient {
    /// Stages work on an assigned order. Admins are told; the customer is not.
    /// A new submission replaces any earlier pending or rejected one.
    #[instrument(skip(self, actor, work), fields(actor_id = %actor.id))]
    pub async fn submit_pending_work(&self, actor: &Actor, order_id: &str, work: WorkReport) -> AppResult<Order> {
        ensure_active(actor)?;
        let order = self.find_order(order_id).await?;
        ensure_assignee(actor, &order)?;

        let files = self.store_files(work.files, &format!("pending/{}", order.id)).await?;
        let submission = WorkSubmission {
            proposed_status: work.proposed_status,
            files: files.clone(),
            report: work.report,
            submitted_by: actor.id.clone(),
            submitted_at: Utc::now(),
        };
        let transition = match self.transition(order_id, OrderAction::SubmitPendingWork(submission)).await {
            Ok(transition) => transition,
            Err(e) => {
                self.discard_files(&files).await;
                return Err(e);
            }
        };

        if let Some(replaced) = transition.before.pending_work.submission() {
            let orphaned: Vec<StoredFile> =
                replaced.files.iter().filter(|f| !files.contains(f)).cloned().collect();
            self.discard_files(&orphaned).await;
        }

        let order = transition.after;
        info!(order_id = %order.id, files = files.len(), "Work submitted for review");
        self.notifications
            .deliver_all(
                self.admin_ids().await,
                NotificationCreate::new(
                    "",
                    NotificationKind::EmployeeWorkPending,
                    "Work awaiting review",
                    format!("New work was submitted on order {}.", order.order_number),
                )
                .for_order(&order.id)
                .from_role(Role::Employee),
            )
            .await;
        Ok(order.view_for(actor))
    }

    /// Publishes the staged work: files become samples, the proposed status
    /// and report apply, and the customer hears about it for the first time.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn approve_pending_work(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        ensure_admin(actor)?;
        let transition = self.transition(order_id, OrderAction::ApprovePendingWork).await?;
        let order = &transition.after;
        info!(order_id = %order.id, status = %order.status, "Pending work approved");

        // Samples carry their own status; any other resulting status is announced separately.
        let published = &order.sample_images[transition.before.sample_images.len()..];
        if let Some(first) = published.first() {
            let files: Vec<StoredFile> = published.iter().map(|s| s.file.clone()).collect();
            self.announce_samples(order, first.kind, &files).await;
        }
        let status_news = transition.status_changed() && (published.is_empty() || !order.status.awaits_customer());
        if status_news {
            self.notifications
                .deliver(
                    NotificationCreate::new(
                        &order.customer_id,
                        NotificationKind::OrderStatusChanged,
                        "Order status updated",
                        format!("Order {} is now {}.", order.order_number, order.status),
                    )
                    .for_order(&order.id)
                    .from_role(Role::Admin),
                )
                .await;
            if let Some(customer) = self.customer_of(order).await {
                self.send_email(emails::status_changed(&customer, order)).await;
            }
        } else if published.is_empty() {
            self.notifications
                .deliver(
                    NotificationCreate::new(
                        &order.customer_id,
                        NotificationKind::OrderUpdated,
                        "Order updated",
                        format!("Order {} has a progress update.", order.order_number),
                    )
                    .for_order(&order.id)
                    .from_role(Role::Admin),
                )
                .await;
        }

        match submitter(&transition) {
            Some(employee_id) => {
                self.notifications
                    .deliver(
                        NotificationCreate::new(
                            employee_id,
                            NotificationKind::WorkApproved,
                            "Work approved",
                            format!("Your work on order {} was approved.", order.order_number),
                        )
                        .for_order(&order.id)
                        .from_role(Role::Admin),
                    )
                    .await
            }
            None => warn!(order_id = %order.id, "Approved work had no submitter"),
        }
        Ok(order.clone())
    }

    /// Sends staged work back to the employee. The customer is never told.
    #[instrument(skip(self, actor, reason), fields(actor_id = %actor.id))]
    pub async fn reject_pending_work(&self, actor: &Actor, order_id: &str, reason: String) -> AppResult<Order> {
        ensure_admin(actor)?;
        if reason.trim().is_empty() {
            return Err(AppError::validation("A rejection reason is required"));
        }
        let transition = self
            .transition(order_id, OrderAction::RejectPendingWork { reason: reason.clone() })
            .await?;
        let order = &transition.after;
        info!(order_id = %order.id, "Pending work rejected");

        if let Some(employee_id) = submitter(&transition) {
            self.notifications
                .deliver(
                    NotificationCreate::new(
                        employee_id,
                        NotificationKind::WorkRejected,
                        "Work rejected",
                        format!("Your work on order {} was rejected: {}", order.order_number, reason.trim()),
                    )
                    .for_order(&order.id)
                    .from_role(Role::Admin),
                )
                .await;
        }
        Ok(order.clone())
    }
}
