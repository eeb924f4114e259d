use std::collections::HashSet;

use tracing::{error, info, instrument, warn};

use super::{ensure_owner, OrderClient};
use crate::actor_framework::Filter;
use crate::clients::access::{ensure_active, ensure_admin};
use crate::domain::{Actor, NotificationCreate, NotificationKind, Order, Role, StoredFile, User};
use crate::error::{AppError, AppResult};
use crate::order_actor::OrderAction;

impl OrderClient {
    /// Hard-deletes an order. Admins may delete any order, customers their own.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_order(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        ensure_active(actor)?;
        let order = self.find_order(order_id).await?;
        if !actor.is_admin() {
            ensure_owner(actor, &order)?;
        }

        // Step 1: Remove the document
        let removed = self.inner.delete(order.id.clone()).await?;
        info!(order_id = %removed.id, order_number = %removed.order_number, "Order deleted");

        // Step 2: Detach the assignee
        if let Some(employee_id) = &removed.assigned_to {
            if let Err(e) = self.users.remove_assigned_order(employee_id, &removed.id).await {
                error!(error = %e, employee_id = %employee_id, "assignedOrders back-reference left stale");
            }
        }

        // Step 3: Release files no other order still references
        self.discard_files(&self.unshared_files(&removed).await).await;

        // Step 4: Notify the customer and every admin
        let template = NotificationCreate::new(
            "",
            NotificationKind::OrderDeleted,
            "Order deleted",
            format!("Order {} was deleted.", removed.order_number),
        )
        .from_role(actor.role);
        let mut recipients = vec![removed.customer_id.clone()];
        recipients.extend(self.admin_ids().await);
        self.notifications.deliver_all(recipients, template).await;

        Ok(removed)
    }

    /// Deletes an employee account after unassigning the orders still assigned to it.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_employee(&self, actor: &Actor, employee_id: &str) -> AppResult<User> {
        ensure_admin(actor)?;
        let employee = self.users.find_user(employee_id).await?;
        if employee.role != Role::Employee {
            return Err(AppError::validation(format!(
                "Only employee accounts can be deleted; {} is a {}",
                employee.id, employee.role
            )));
        }

        for order_id in &employee.assigned_orders {
            let order = match self.find_order(order_id).await {
                Ok(order) => order,
                Err(AppError::NotFound(_)) => {
                    warn!(order_id = %order_id, "Assigned order no longer exists");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !order.is_assigned_to(&employee.id) {
                warn!(order_id = %order_id, assigned_to = ?order.assigned_to, "Stale assignedOrders entry skipped");
                continue;
            }
            self.transition(order_id, OrderAction::Unassign).await?;
        }
        let removed = self.users.remove_account(&employee.id).await?;
        info!(employee_id = %removed.id, unassigned = removed.assigned_orders.len(), "Employee deleted");
        Ok(removed)
    }

    /// Files of `removed` that no remaining order points at. Revisions share
    /// their parent's uploads.
    async fn unshared_files(&self, removed: &Order) -> Vec<StoredFile> {
        let urls: HashSet<String> = removed.all_files().iter().map(|f| f.url.clone()).collect();
        let still_used: HashSet<String> = match self
            .list_orders_where(Filter::new(move |o: &Order| o.all_files().iter().any(|f| urls.contains(&f.url))))
            .await
        {
            Ok(orders) => orders
                .iter()
                .flat_map(|o| o.all_files().into_iter().map(|f| f.url.clone()))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Could not check shared files; keeping all of them");
                return Vec::new();
            }
        };
        let mut seen = HashSet::new();
        removed
            .all_files()
            .into_iter()
            .filter(|f| !still_used.contains(&f.url) && seen.insert(f.url.clone()))
            .cloned()
            .collect()
    }
}
