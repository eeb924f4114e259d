use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::access::ensure_active;
use crate::actor_framework::{Filter, ResourceClient};
use crate::domain::{Actor, Notification, NotificationCreate};
use crate::error::{AppError, AppResult};
use crate::gateways::{user_room, PushChannel, PushMessage};
use crate::notification_actor::NotificationAction;

const PUSH_EVENT: &str = "notification";

/// Client for the notification inbox.
///
/// Every notification is persisted first and then pushed to the recipient's
/// room. Push is best-effort; the stored record is the source of truth.
#[derive(Clone)]
pub struct NotificationClient {
    inner: ResourceClient<Notification>,
    push: Arc<dyn PushChannel>,
}

impl_client_methods!(NotificationClient, Notification, notification);

impl NotificationClient {
    pub fn new(inner: ResourceClient<Notification>, push: Arc<dyn PushChannel>) -> Self {
        Self { inner, push }
    }

    #[instrument(skip(self, notification), fields(user_id = %notification.user_id, kind = ?notification.kind))]
    pub async fn notify(&self, notification: NotificationCreate) -> AppResult<Notification> {
        debug!("Sending request");
        let id = self.inner.create(notification).await?;
        let stored = self.inner.fetch(id).await?;

        match serde_json::to_value(&stored) {
            Ok(payload) => {
                let message = PushMessage {
                    room: user_room(&stored.user_id),
                    event: PUSH_EVENT.to_string(),
                    payload,
                };
                if let Err(e) = self.push.emit(message).await {
                    warn!(error = %e, "Real-time push failed; notification kept");
                }
            }
            Err(e) => warn!(error = %e, "Could not encode notification for push"),
        }

        Ok(stored)
    }

    /// Side-effect variant of [`notify`](Self::notify) used by lifecycle
    /// operations: a failure is logged and never reaches the caller.
    pub(crate) async fn deliver(&self, notification: NotificationCreate) {
        if let Err(e) = self.notify(notification).await {
            warn!(error = %e, "Notification could not be recorded");
        }
    }

    /// Delivers one copy of `template` to each recipient.
    pub(crate) async fn deliver_all(&self, recipients: impl IntoIterator<Item = String>, template: NotificationCreate) {
        for user_id in recipients {
            self.deliver(NotificationCreate { user_id, ..template.clone() }).await;
        }
    }

    /// Inbox of the caller, newest first.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn list_for_user(&self, actor: &Actor) -> AppResult<Vec<Notification>> {
        ensure_active(actor)?;
        let user_id = actor.id.clone();
        let mut inbox = self
            .list_notifications_where(Filter::new(move |n: &Notification| n.user_id == user_id))
            .await?;
        inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(inbox)
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn unread_count(&self, actor: &Actor) -> AppResult<usize> {
        ensure_active(actor)?;
        let user_id = actor.id.clone();
        let unread = self
            .list_notifications_where(Filter::new(move |n: &Notification| n.user_id == user_id && !n.is_read))
            .await?;
        Ok(unread.len())
    }

    /// Marks one notification read. Only its recipient may do so.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn mark_read(&self, actor: &Actor, id: &str) -> AppResult<bool> {
        ensure_active(actor)?;
        let notification = self.find_notification(id).await?;
        if notification.user_id != actor.id {
            return Err(AppError::forbidden("Not your notification"));
        }
        Ok(self.inner.perform_action(notification.id, NotificationAction::MarkRead).await?)
    }

    /// Marks the caller's whole inbox read; returns how many flipped.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn mark_all_read(&self, actor: &Actor) -> AppResult<usize> {
        ensure_active(actor)?;
        let user_id = actor.id.clone();
        let unread = self
            .list_notifications_where(Filter::new(move |n: &Notification| n.user_id == user_id && !n.is_read))
            .await?;
        let mut flipped = 0;
        for notification in unread {
            if self.inner.perform_action(notification.id, NotificationAction::MarkRead).await? {
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}
