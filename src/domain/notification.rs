use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderCreated,
    OrderUpdated,
    OrderStatusChanged,
    OrderAssigned,
    OrderUnassigned,
    OrderDeleted,
    NotesUpdated,
    SampleUploaded,
    RevisionUploaded,
    DesignApproved,
    RevisionRequested,
    RevisionOrderCreated,
    TrackingNumberAdded,
    EmployeeWorkPending,
    WorkApproved,
    WorkRejected,
    InvoiceCreated,
    PaymentReceived,
    InvoiceCancelled,
}

/// Inbox entry for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub order_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub sender_role: Option<Role>,
    pub assigned_employee: Option<String>,
    pub previous_assigned_employee: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a notification.
#[derive(Debug, Clone)]
pub struct NotificationCreate {
    pub user_id: String,
    pub order_id: Option<String>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub sender_role: Option<Role>,
    pub assigned_employee: Option<String>,
    pub previous_assigned_employee: Option<String>,
}

impl NotificationCreate {
    pub fn new(
        user_id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            order_id: None,
            kind,
            title: title.into(),
            message: message.into(),
            sender_role: None,
            assigned_employee: None,
            previous_assigned_employee: None,
        }
    }

    pub fn for_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn from_role(mut self, role: Role) -> Self {
        self.sender_role = Some(role);
        self
    }

    pub fn reassignment(mut self, assigned: Option<String>, previous: Option<String>) -> Self {
        self.assigned_employee = assigned;
        self.previous_assigned_employee = previous;
        self
    }
}
