use tracing::{info, instrument};

use super::{ensure_assignee, ensure_owner, OrderClient};
use crate::clients::access::{ensure_active, ensure_admin, ensure_customer};
use crate::domain::{
    Actor, FileInput, NotificationCreate, NotificationKind, Order, OrderType, Role, SampleKind, StoredFile,
};
use crate::error::{AppError, AppResult};
use crate::gateways::{emails, Attachment, Email};
use crate::order_actor::{OrderAction, OrderTransition, StatusUpdate};

/// Previews an admin publishes to the customer.
#[derive(Debug, Clone)]
pub struct SampleUpload {
    pub kind: SampleKind,
    pub files: Vec<FileInput>,
    pub comments: Option<String>,
}

pub(super) fn with_attachments(mut email: Email, files: &[StoredFile]) -> Email {
    email.attachments = files
        .iter()
        .map(|f| Attachment { filename: f.filename.clone(), url: f.url.clone() })
        .collect();
    email
}

impl OrderClient {
    /// Direct status edit by an admin or the assigned employee. The customer
    /// hears about it only when the status actually moved.
    #[instrument(skip(self, actor, update), fields(actor_id = %actor.id))]
    pub async fn update_status(&self, actor: &Actor, order_id: &str, update: StatusUpdate) -> AppResult<Order> {
        ensure_active(actor)?;
        let order = self.find_order(order_id).await?;
        match actor.role {
            Role::Admin => {}
            Role::Employee => ensure_assignee(actor, &order)?,
            Role::Customer => return Err(AppError::forbidden("Customers cannot change order status")),
        }

        let transition = self.transition(order_id, OrderAction::UpdateStatus(update)).await?;
        info!(
            order_id = %order_id,
            from = %transition.before.status,
            to = %transition.after.status,
            "Order status updated"
        );
        self.announce_status_update(actor, &transition).await;
        Ok(transition.after.view_for(actor))
    }

    async fn announce_status_update(&self, actor: &Actor, transition: &OrderTransition) {
        let order = &transition.after;
        let status_changed = transition.status_changed();
        let shipped = transition.tracking_changed() && order.order_type == OrderType::Patches;
        if !status_changed && !shipped {
            return;
        }

        if status_changed {
            self.notifications
                .deliver(
                    NotificationCreate::new(
                        &order.customer_id,
                        NotificationKind::OrderStatusChanged,
                        "Order status updated",
                        format!("Order {} is now {}.", order.order_number, order.status),
                    )
                    .for_order(&order.id)
                    .from_role(actor.role),
                )
                .await;
        }
        let tracking = order.tracking_number.as_deref().filter(|_| shipped);
        if let Some(tracking) = tracking {
            self.notifications
                .deliver(
                    NotificationCreate::new(
                        &order.customer_id,
                        NotificationKind::TrackingNumberAdded,
                        "Your patches have shipped",
                        format!("Order {} shipped with tracking number {}.", order.order_number, tracking),
                    )
                    .for_order(&order.id)
                    .from_role(actor.role),
                )
                .await;
        }

        if let Some(customer) = self.customer_of(order).await {
            if status_changed {
                self.send_email(emails::status_changed(&customer, order)).await;
            }
            if let Some(tracking) = tracking {
                self.send_email(emails::tracking_number(&customer, order, tracking)).await;
            }
        }
    }

    /// Customer replaces the free-text notes of their order.
    #[instrument(skip(self, actor, notes), fields(actor_id = %actor.id))]
    pub async fn update_notes(&self, actor: &Actor, order_id: &str, notes: String) -> AppResult<Order> {
        ensure_customer(actor)?;
        let order = self.find_order(order_id).await?;
        ensure_owner(actor, &order)?;

        let order = self.transition(order_id, OrderAction::ReplaceNotes(notes)).await?.after;
        self.notify_staff(
            &order,
            NotificationKind::NotesUpdated,
            "Notes updated",
            format!("The customer updated the notes on order {}.", order.order_number),
        )
        .await;
        Ok(order.view_for(actor))
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn approve_design(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        ensure_customer(actor)?;
        let order = self.find_order(order_id).await?;
        ensure_owner(actor, &order)?;

        let order = self.transition(order_id, OrderAction::ApproveDesign).await?.after;
        info!(order_id = %order.id, status = %order.status, "Design approved by customer");
        self.notify_staff(
            &order,
            NotificationKind::DesignApproved,
            "Design approved",
            format!("The customer approved the design for order {}.", order.order_number),
        )
        .await;
        Ok(order.view_for(actor))
    }

    #[instrument(skip(self, actor, comment), fields(actor_id = %actor.id))]
    pub async fn request_revision(&self, actor: &Actor, order_id: &str, comment: String) -> AppResult<Order> {
        ensure_customer(actor)?;
        let order = self.find_order(order_id).await?;
        ensure_owner(actor, &order)?;

        let order = self
            .transition(order_id, OrderAction::RequestRevision { comment: comment.clone() })
            .await?
            .after;
        info!(order_id = %order.id, "Revision requested by customer");
        self.notify_staff(
            &order,
            NotificationKind::RevisionRequested,
            "Revision requested",
            format!("Revision requested on order {}: {}", order.order_number, comment.trim()),
        )
        .await;
        Ok(order.view_for(actor))
    }

    /// Admin publishes sample previews straight to the customer.
    #[instrument(skip(self, actor, upload), fields(actor_id = %actor.id, kind = ?upload.kind))]
    pub async fn upload_samples(&self, actor: &Actor, order_id: &str, upload: SampleUpload) -> AppResult<Order> {
        ensure_admin(actor)?;
        let order = self.find_order(order_id).await?;
        if upload.files.is_empty() {
            return Err(AppError::validation("At least one sample file is required"));
        }

        let files = self.store_files(upload.files, &format!("samples/{}", order.id)).await?;
        let action = OrderAction::AddSamples { kind: upload.kind, files: files.clone(), comments: upload.comments };
        let order = match self.transition(order_id, action).await {
            Ok(transition) => transition.after,
            Err(e) => {
                self.discard_files(&files).await;
                return Err(e);
            }
        };
        info!(order_id = %order.id, count = files.len(), "Samples published");
        self.announce_samples(&order, upload.kind, &files).await;
        Ok(order)
    }

    pub(super) async fn announce_samples(&self, order: &Order, kind: SampleKind, files: &[StoredFile]) {
        let (notification_kind, title) = match kind {
            SampleKind::Initial => (NotificationKind::SampleUploaded, "Sample ready"),
            SampleKind::Revision => (NotificationKind::RevisionUploaded, "Revision ready"),
        };
        self.notifications
            .deliver(
                NotificationCreate::new(
                    &order.customer_id,
                    notification_kind,
                    title,
                    format!("A new sample for order {} is waiting for your approval.", order.order_number),
                )
                .for_order(&order.id)
                .from_role(Role::Admin),
            )
            .await;
        if let Some(customer) = self.customer_of(order).await {
            self.send_email(with_attachments(emails::sample_ready(&customer, order), files)).await;
        }
    }

    async fn notify_staff(&self, order: &Order, kind: NotificationKind, title: &str, message: String) {
        let template = NotificationCreate::new("", kind, title, message)
            .for_order(&order.id)
            .from_role(Role::Customer);
        self.notifications.deliver_all(self.staff_watchers(order).await, template).await;
    }
}
