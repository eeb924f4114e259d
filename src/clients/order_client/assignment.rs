use tracing::{debug, error, info, instrument, warn};

use super::OrderClient;
use crate::clients::access::ensure_admin;
use crate::domain::{Actor, NotificationCreate, NotificationKind, Order, Role, User};
use crate::error::{AppError, AppResult};
use crate::gateways::emails;
use crate::order_actor::OrderAction;

#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub order_id: String,
    pub message: String,
}

/// Outcome of a bulk assignment. One bad order never stops the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkAssignment {
    pub assigned: Vec<String>,
    pub failures: Vec<BulkFailure>,
}

impl OrderClient {
    /// Assigns (or reassigns) an order to an employee and moves the
    /// `assigned_orders` back-reference along with it.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn assign_order(&self, actor: &Actor, order_id: &str, employee_id: &str) -> AppResult<Order> {
        ensure_admin(actor)?;
        let employee = self.assignable_employee(employee_id).await?;
        self.assign_to(order_id, &employee).await
    }

    #[instrument(skip(self, actor, order_ids), fields(actor_id = %actor.id, count = order_ids.len()))]
    pub async fn bulk_assign(&self, actor: &Actor, order_ids: &[String], employee_id: &str) -> AppResult<BulkAssignment> {
        ensure_admin(actor)?;
        let employee = self.assignable_employee(employee_id).await?;

        let mut outcome = BulkAssignment::default();
        for order_id in order_ids {
            match self.assign_to(order_id, &employee).await {
                Ok(order) => outcome.assigned.push(order.id),
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "Bulk assignment skipped an order");
                    outcome.failures.push(BulkFailure { order_id: order_id.clone(), message: e.to_string() });
                }
            }
        }
        info!(assigned = outcome.assigned.len(), failed = outcome.failures.len(), "Bulk assignment finished");
        Ok(outcome)
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn unassign_order(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        ensure_admin(actor)?;
        let transition = self.transition(order_id, OrderAction::Unassign).await?;
        let order = transition.after;
        if let Some(previous) = transition.before.assigned_to {
            if let Err(e) = self.users.remove_assigned_order(&previous, &order.id).await {
                error!(error = %e, employee_id = %previous, "assignedOrders back-reference left stale");
            }
            self.notifications
                .deliver(
                    NotificationCreate::new(
                        &previous,
                        NotificationKind::OrderUnassigned,
                        "Assignment removed",
                        format!("Order {} is no longer assigned to you.", order.order_number),
                    )
                    .for_order(&order.id)
                    .from_role(Role::Admin)
                    .reassignment(None, Some(previous.clone())),
                )
                .await;
        }
        Ok(order)
    }

    async fn assignable_employee(&self, employee_id: &str) -> AppResult<User> {
        let user = self.users.find_user(employee_id).await?;
        if user.role != Role::Employee {
            return Err(AppError::validation(format!("User {} is not an employee", user.id)));
        }
        if !user.is_active {
            return Err(AppError::validation(format!("Employee {} is deactivated", user.id)));
        }
        Ok(user)
    }

    async fn assign_to(&self, order_id: &str, employee: &User) -> AppResult<Order> {
        // Step 1: Point the order at the employee
        let transition = self
            .transition(order_id, OrderAction::Assign { employee_id: employee.id.clone() })
            .await?;
        let order = transition.after;
        if employee.employee_role != Some(order.required_employee_role) {
            warn!(
                employee_id = %employee.id,
                required = %order.required_employee_role,
                "Employee specialty does not match the order type"
            );
        }
        if transition.before.assigned_to.as_deref() == Some(employee.id.as_str()) {
            debug!(order_id = %order.id, "Order already assigned to this employee");
            return Ok(order);
        }
        let previous = transition.before.assigned_to;

        // Step 2: Move the back-reference
        if let Some(previous) = &previous {
            if let Err(e) = self.users.remove_assigned_order(previous, &order.id).await {
                error!(error = %e, employee_id = %previous, "assignedOrders back-reference left stale");
            }
        }
        if let Err(e) = self.users.add_assigned_order(&employee.id, &order.id).await {
            error!(error = %e, employee_id = %employee.id, "assignedOrders back-reference not recorded");
        }
        info!(order_id = %order.id, employee_id = %employee.id, previous = ?previous, "Order assigned");

        // Step 3: Notify both sides, then email the new assignee
        self.notifications
            .deliver(
                NotificationCreate::new(
                    &employee.id,
                    NotificationKind::OrderAssigned,
                    "New assignment",
                    format!("Order {} has been assigned to you.", order.order_number),
                )
                .for_order(&order.id)
                .from_role(Role::Admin)
                .reassignment(Some(employee.id.clone()), previous.clone()),
            )
            .await;
        if let Some(previous) = &previous {
            self.notifications
                .deliver(
                    NotificationCreate::new(
                        previous,
                        NotificationKind::OrderUnassigned,
                        "Assignment removed",
                        format!("Order {} has been reassigned to {}.", order.order_number, employee.name),
                    )
                    .for_order(&order.id)
                    .from_role(Role::Admin)
                    .reassignment(Some(employee.id.clone()), Some(previous.clone())),
                )
                .await;
        }
        self.send_email(emails::assignment(employee, &order)).await;
        Ok(order)
    }
}
