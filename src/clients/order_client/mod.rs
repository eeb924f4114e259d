//! Order lifecycle engine.
//!
//! The order store only enforces single-document rules. This client layers
//! the cross-store work on top: role checks, file storage, the employee
//! `assigned_orders` back-reference, notifications and email. The primary
//! mutation always comes first; everything after it is best-effort and only
//! logged on failure.

mod assignment;
mod intake;
mod removal;
mod review;
mod revision;
mod workflow;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

pub use assignment::{BulkAssignment, BulkFailure};
pub use intake::NewOrder;
pub use review::WorkReport;
pub use workflow::SampleUpload;

use super::access::{ensure_active, ensure_admin};
use super::{NotificationClient, UserClient};
use crate::actor_framework::{Filter, ResourceClient};
use crate::domain::{
    Actor, FileInput, NotificationCreate, NotificationKind, Order, OrderPatch, OrderStatus, OrderType, PaymentStatus,
    Role, StoredFile, User,
};
use crate::error::{AppError, AppResult};
use crate::gateways::{Email, FileStorage, Mailer};
use crate::order_actor::{OrderAction, OrderTransition};

/// Knobs for the side effects of lifecycle operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleSettings {
    /// Receives new-order emails. When unset every active admin does.
    pub admin_notify_email: Option<String>,
}

/// Optional list filters; `None` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub order_type: Option<OrderType>,
}

/// Client for interacting with the Order actor.
///
/// This client handles the complex orchestration: every operation validates
/// the caller against the order before mutating it, then fans out the
/// notifications and emails the transition calls for.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    users: UserClient,
    notifications: NotificationClient,
    mailer: Arc<dyn Mailer>,
    storage: Arc<dyn FileStorage>,
    settings: LifecycleSettings,
    sequence: Arc<AtomicU64>,
}

impl_client_methods!(OrderClient, Order, order);

fn may_view(actor: &Actor, order: &Order) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Employee => order.is_assigned_to(&actor.id),
        Role::Customer => order.customer_id == actor.id,
    }
}

fn ensure_owner(actor: &Actor, order: &Order) -> AppResult<()> {
    if actor.is_customer() && order.customer_id == actor.id {
        Ok(())
    } else {
        Err(AppError::forbidden(format!("Order {} is not yours", order.order_number)))
    }
}

fn ensure_assignee(actor: &Actor, order: &Order) -> AppResult<()> {
    if actor.is_employee() && order.is_assigned_to(&actor.id) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!("Order {} is not assigned to you", order.order_number)))
    }
}

impl OrderClient {
    pub fn new(
        inner: ResourceClient<Order>,
        users: UserClient,
        notifications: NotificationClient,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn FileStorage>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            inner,
            users,
            notifications,
            mailer,
            storage,
            settings,
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// One order as the caller may see it.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn get_order(&self, actor: &Actor, id: &str) -> AppResult<Order> {
        ensure_active(actor)?;
        let order = self.find_order(id).await?;
        if !may_view(actor, &order) {
            return Err(AppError::forbidden(format!("You cannot view order {}", order.order_number)));
        }
        Ok(order.view_for(actor))
    }

    /// Orders visible to the caller, newest first: customers see their own,
    /// employees their assignments, admins everything.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn list_orders(&self, actor: &Actor, query: OrderQuery) -> AppResult<Vec<Order>> {
        ensure_active(actor)?;
        let viewer = actor.clone();
        let mut orders = self
            .list_orders_where(Filter::new(move |o: &Order| {
                may_view(&viewer, o)
                    && query.status.map_or(true, |s| o.status == s)
                    && query.order_type.map_or(true, |t| o.order_type == t)
            }))
            .await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.order_number.cmp(&a.order_number)));
        Ok(orders.iter().map(|o| o.view_for(actor)).collect())
    }

    /// Admin edit of descriptive fields. The order type itself is immutable.
    #[instrument(skip(self, actor, patch), fields(actor_id = %actor.id))]
    pub async fn update_order(&self, actor: &Actor, id: &str, patch: OrderPatch) -> AppResult<Order> {
        ensure_admin(actor)?;
        let order = self.inner.update(id.to_string(), patch).await?;
        info!(order_id = %order.id, "Order updated");
        self.notifications
            .deliver(
                NotificationCreate::new(
                    &order.customer_id,
                    NotificationKind::OrderUpdated,
                    "Order updated",
                    format!("Order {} was updated.", order.order_number),
                )
                .for_order(&order.id)
                .from_role(Role::Admin),
            )
            .await;
        Ok(order.view_for(actor))
    }

    // --- Invoice links, driven by the invoice client ---

    pub(crate) async fn link_invoice(&self, order_id: &str, invoice_id: &str, status: PaymentStatus) -> AppResult<()> {
        self.transition(
            order_id,
            OrderAction::LinkInvoice { invoice_id: invoice_id.to_string(), status },
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn set_invoice_status(&self, order_id: &str, status: PaymentStatus) -> AppResult<()> {
        self.transition(order_id, OrderAction::SetInvoiceStatus(status)).await?;
        Ok(())
    }

    pub(crate) async fn unlink_invoice(&self, order_id: &str) -> AppResult<()> {
        self.transition(order_id, OrderAction::UnlinkInvoice).await?;
        Ok(())
    }

    // --- Shared plumbing ---

    async fn transition(&self, order_id: &str, action: OrderAction) -> AppResult<OrderTransition> {
        debug!(order_id, ?action, "Sending request");
        Ok(self.inner.perform_action(order_id.to_string(), action).await?)
    }

    /// Uploads raw files into `folder`. On a failed upload the files already
    /// stored by this call are removed again.
    async fn store_files(&self, inputs: Vec<FileInput>, folder: &str) -> AppResult<Vec<StoredFile>> {
        let mut stored = Vec::with_capacity(inputs.len());
        let mut uploaded = Vec::new();
        for input in inputs {
            match input {
                FileInput::Stored(file) => stored.push(file),
                FileInput::Upload(upload) => match self.storage.upload(upload, folder).await {
                    Ok(file) => {
                        uploaded.push(file.clone());
                        stored.push(file);
                    }
                    Err(e) => {
                        warn!(error = %e, folder, "Upload failed");
                        self.discard_files(&uploaded).await;
                        return Err(e.into());
                    }
                },
            }
        }
        Ok(stored)
    }

    async fn discard_files(&self, files: &[StoredFile]) {
        for file in files {
            if let Err(e) = self.storage.delete(file).await {
                warn!(error = %e, url = %file.url, "Could not remove stored file");
            }
        }
    }

    async fn send_email(&self, email: Email) {
        let to = email.to.clone();
        let subject = email.subject.clone();
        if let Err(e) = self.mailer.send(email).await {
            warn!(error = %e, %to, %subject, "Email delivery failed");
        }
    }

    async fn admin_ids(&self) -> Vec<String> {
        match self.users.list_admins().await {
            Ok(admins) => admins.into_iter().map(|a| a.id).collect(),
            Err(e) => {
                warn!(error = %e, "Could not load admins for notification");
                Vec::new()
            }
        }
    }

    async fn admin_emails(&self) -> Vec<String> {
        if let Some(address) = &self.settings.admin_notify_email {
            return vec![address.clone()];
        }
        match self.users.list_admins().await {
            Ok(admins) => admins.into_iter().map(|a| a.email).collect(),
            Err(e) => {
                warn!(error = %e, "Could not load admin addresses");
                Vec::new()
            }
        }
    }

    async fn customer_of(&self, order: &Order) -> Option<User> {
        match self.users.find_user(&order.customer_id).await {
            Ok(customer) => Some(customer),
            Err(e) => {
                warn!(error = %e, customer_id = %order.customer_id, "Customer lookup failed; skipping email");
                None
            }
        }
    }

    /// Everyone staff-side who follows an order: all admins plus its assignee.
    async fn staff_watchers(&self, order: &Order) -> Vec<String> {
        let mut watchers = self.admin_ids().await;
        if let Some(employee) = &order.assigned_to {
            if !watchers.contains(employee) {
                watchers.push(employee.clone());
            }
        }
        watchers
    }
}
