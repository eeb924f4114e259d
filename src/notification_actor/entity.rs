use chrono::Utc;

use super::error::NotificationError;
use crate::actor_framework::Entity;
use crate::domain::{Notification, NotificationCreate};

#[derive(Debug, Clone)]
pub enum NotificationAction {
    MarkRead,
}

impl Entity for Notification {
    const KIND: &'static str = "notification";

    type Id = String;
    type CreateParams = NotificationCreate;
    type Patch = ();
    type Action = NotificationAction;
    /// Whether the read flag actually flipped.
    type ActionResult = bool;
    type Error = NotificationError;

    fn id(&self) -> &String {
        &self.id
    }

    fn from_create_params(id: String, params: NotificationCreate) -> Result<Self, NotificationError> {
        if params.user_id.is_empty() {
            return Err(NotificationError::ValidationError("recipient is required".into()));
        }
        Ok(Self {
            id,
            user_id: params.user_id,
            order_id: params.order_id,
            kind: params.kind,
            title: params.title,
            message: params.message,
            is_read: false,
            sender_role: params.sender_role,
            assigned_employee: params.assigned_employee,
            previous_assigned_employee: params.previous_assigned_employee,
            created_at: Utc::now(),
        })
    }

    /// Content is immutable.
    fn on_update(&mut self, _patch: ()) -> Result<(), NotificationError> {
        Err(NotificationError::ValidationError("notifications cannot be edited".into()))
    }

    fn on_delete(&self) -> Result<(), NotificationError> {
        Err(NotificationError::Undeletable)
    }

    fn handle_action(&mut self, action: NotificationAction) -> Result<bool, NotificationError> {
        match action {
            NotificationAction::MarkRead => {
                let changed = !self.is_read;
                self.is_read = true;
                Ok(changed)
            }
        }
    }
}
