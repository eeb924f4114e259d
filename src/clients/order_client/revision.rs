use tracing::{error, info, instrument, warn};

use super::{ensure_owner, OrderClient};
use crate::actor_framework::Filter;
use crate::clients::access::ensure_customer;
use crate::domain::{
    revision_order_number, Actor, NotificationCreate, NotificationKind, Order, OrderCreate, OrderStatus,
    RevisionLink, Role, StoredFile,
};
use crate::error::{AppError, AppResult};
use crate::order_actor::OrderAction;

impl OrderClient {
    /// Forks a completed order into a new revision order and retires the
    /// parent as `Superseded`. The fork cannot be undone.
    #[instrument(skip(self, actor, reason), fields(actor_id = %actor.id))]
    pub async fn create_revision_order(
        &self,
        actor: &Actor,
        parent_id: &str,
        reason: Option<String>,
    ) -> AppResult<Order> {
        info!("Processing create_revision_order request");
        ensure_customer(actor)?;

        // Step 1: Validate the parent
        let parent = self.find_order(parent_id).await?;
        ensure_owner(actor, &parent)?;
        if parent.status != OrderStatus::Completed {
            return Err(AppError::validation(format!(
                "Only completed orders can be revised; order {} is {}",
                parent.order_number, parent.status
            )));
        }

        // Step 2: Number the revision after the highest one in its lineage
        let root_order_id = parent.root_order_id().to_string();
        let lineage_root = root_order_id.clone();
        let revision_number = self
            .list_orders_where(Filter::new(move |o: &Order| {
                o.revision.as_ref().is_some_and(|r| r.root_order_id == lineage_root)
            }))
            .await?
            .iter()
            .filter_map(|o| o.revision.as_ref().map(|r| r.revision_number))
            .max()
            .unwrap_or(0)
            + 1;

        // Step 3: Create the revision as a copy of the parent
        let payload = OrderCreate {
            order_number: revision_order_number(&parent.order_number, revision_number),
            customer_id: parent.customer_id.clone(),
            details: parent.details.clone(),
            files: parent.files.clone(),
            notes: parent.notes.clone(),
            revision: Some(RevisionLink {
                parent_order_id: parent.id.clone(),
                root_order_id,
                revision_number,
                reason: reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            }),
        };
        let revision_id = self.inner.create(payload).await?;

        // Step 4: Retire the parent; undo the fork if that fails
        let retired = match self.transition(&parent.id, OrderAction::MarkSuperseded).await {
            Ok(transition) => transition,
            Err(e) => {
                error!(error = %e, parent_id = %parent.id, "Could not supersede parent; removing revision");
                if let Err(cleanup) = self.inner.delete(revision_id.clone()).await {
                    error!(error = %cleanup, revision_id = %revision_id, "Orphaned revision order left behind");
                }
                return Err(e);
            }
        };
        if let Some(dropped) = retired.before.pending_work.submission() {
            let kept = retired.after.all_files();
            let staged: Vec<StoredFile> = dropped.files.iter().filter(|f| !kept.contains(f)).cloned().collect();
            warn!(parent_id = %parent.id, files = staged.len(), "Dropping unreviewed work of superseded order");
            self.discard_files(&staged).await;
        }
        let revision = self.find_order(&revision_id).await?;
        info!(
            order_id = %revision.id,
            order_number = %revision.order_number,
            revision_number,
            "Revision order created"
        );

        // Step 5: Tell the customer and the admins
        let template = NotificationCreate::new(
            "",
            NotificationKind::RevisionOrderCreated,
            "Revision order created",
            format!(
                "Order {} was created as revision {} of {}.",
                revision.order_number, revision_number, parent.order_number
            ),
        )
        .for_order(&revision.id)
        .from_role(Role::Customer);
        let mut recipients = vec![revision.customer_id.clone()];
        recipients.extend(self.admin_ids().await);
        self.notifications.deliver_all(recipients, template).await;

        Ok(revision.view_for(actor))
    }
}
