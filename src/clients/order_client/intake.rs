use std::sync::atomic::Ordering;

use chrono::Utc;
use tracing::{error, info, instrument};

use super::OrderClient;
use crate::clients::access::ensure_customer;
use crate::domain::{
    order_number, Actor, FileInput, NotificationCreate, NotificationKind, Order, OrderCreate, OrderDetails,
    OrderFields, OrderType, Role,
};
use crate::error::{AppError, AppResult};
use crate::gateways::emails;

/// Order placement as submitted by a customer.
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    /// Raw type name; parsed and rejected here when unknown.
    pub order_type: String,
    pub fields: OrderFields,
    pub files: Vec<FileInput>,
    pub notes: Option<String>,
}

impl OrderClient {
    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id, order_type = %request.order_type))]
    pub async fn create_order(&self, actor: &Actor, request: NewOrder) -> AppResult<Order> {
        info!("Processing create_order request (Client Side)");
        ensure_customer(actor)?;

        // Step 1: Validate the payload before anything is stored
        let order_type: OrderType = request.order_type.parse().map_err(AppError::Validation)?;
        if request.files.is_empty() {
            return Err(AppError::validation("At least one file is required"));
        }
        let details = OrderDetails::from_fields(order_type, &request.fields).map_err(|missing| {
            AppError::validation(format!("Missing required fields: {}", missing.join(", ")))
        })?;

        // Step 2: Store uploads
        let files = self.store_files(request.files, &format!("orders/{}", actor.id)).await?;

        // Step 3: Create order in ResourceActor
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let payload = OrderCreate {
            order_number: order_number(order_type, Utc::now().date_naive(), sequence),
            customer_id: actor.id.clone(),
            details,
            files: files.clone(),
            notes: request.notes.unwrap_or_default(),
            revision: None,
        };
        let id = match self.inner.create(payload).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "Order creation failed");
                self.discard_files(&files).await;
                return Err(e.into());
            }
        };
        let order = self.find_order(&id).await?;
        info!(order_id = %order.id, order_number = %order.order_number, "Order created");

        // Step 4: Tell everyone
        self.announce_new_order(&order).await;
        Ok(order.view_for(actor))
    }

    async fn announce_new_order(&self, order: &Order) {
        self.notifications
            .deliver(
                NotificationCreate::new(
                    &order.customer_id,
                    NotificationKind::OrderCreated,
                    "Order received",
                    format!("Your order {} has been received.", order.order_number),
                )
                .for_order(&order.id),
            )
            .await;
        self.notifications
            .deliver_all(
                self.admin_ids().await,
                NotificationCreate::new(
                    "",
                    NotificationKind::OrderCreated,
                    "New order",
                    format!(
                        "New {} order {} ({})",
                        order.order_type,
                        order.order_number,
                        order.details.design_name()
                    ),
                )
                .for_order(&order.id)
                .from_role(Role::Customer),
            )
            .await;

        if let Some(customer) = self.customer_of(order).await {
            self.send_email(emails::order_confirmation(&customer, order)).await;
            for address in self.admin_emails().await {
                self.send_email(emails::admin_new_order(&address, &customer, order)).await;
            }
        }
    }
}
