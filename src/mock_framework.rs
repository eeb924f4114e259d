//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_create`] or [`expect_action`] to assert behavior.

use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Entity, Filter, ResourceClient, ResourceRequest};

type Reply<R, T> = oneshot::Sender<Result<R, <T as Entity>::Error>>;

/// Creates a mock client and a receiver for asserting requests.
///
/// The client sends to a channel the test controls, so the test plays the
/// actor: it inspects each request and decides the reply (success, failure,
/// or nothing at all).
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, Reply<T::Id, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Reply<Option<T>, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a List request
pub async fn expect_list<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(Filter<T>, Reply<Vec<T>, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::List { filter, respond_to }) => Some((filter, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Reply<T::ActionResult, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::clients::{LifecycleSettings, NotificationClient, OrderClient, UserClient};
    use crate::domain::{Actor, Notification, Order, Role, User, UserCreate};
    use crate::gateways::testing::{MemoryStorage, RecordingMailer, RecordingPush};
    use crate::user_actor::{UserAction, UserActionResult};

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            name: "Test".into(),
            username: id.into(),
            email: format!("{}@example.com", id),
            role,
            employee_role: None,
            is_active: true,
            assigned_orders: BTreeSet::new(),
            customer_number: None,
            created_at: Utc::now(),
        }
    }

    fn admin() -> Actor {
        Actor { id: "user_1".into(), role: Role::Admin, employee_role: None, is_active: true }
    }

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<User>(10);

        // Test Create
        let create_task = tokio::spawn(async move {
            let user = UserCreate {
                name: "Test".to_string(),
                username: "test".to_string(),
                email: "test@example.com".to_string(),
                role: Role::Customer,
                employee_role: None,
                customer_number: None,
            };
            client.create(user).await
        });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(payload.name, "Test");
        responder.send(Ok("user_1".to_string())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok("user_1".to_string()));
    }

    #[tokio::test]
    async fn test_set_active_sends_one_action() {
        let (inner, mut user_rx) = create_mock_client::<User>(10);
        let users = UserClient::new(inner);

        let task = tokio::spawn(async move { users.set_active(&admin(), "user_7", false).await });

        let (id, action, responder) = expect_action(&mut user_rx).await.expect("Expected User Action");
        assert_eq!(id, "user_7");
        assert!(matches!(action, UserAction::SetActive(false)));
        responder.send(Ok(UserActionResult::Changed(true))).unwrap();

        assert_eq!(task.await.unwrap(), Ok(true));
    }

    #[tokio::test]
    async fn test_list_users_orders_by_signup() {
        let (inner, mut user_rx) = create_mock_client::<User>(10);
        let users = UserClient::new(inner);

        let task = tokio::spawn(async move { users.list_users(&admin(), None).await });

        let (_filter, responder) = expect_list(&mut user_rx).await.expect("Expected User List");
        let mut newer = user("user_9", Role::Employee);
        newer.created_at = Utc::now() + chrono::Duration::seconds(5);
        responder.send(Ok(vec![newer, user("user_2", Role::Customer)])).unwrap();

        let listed = task.await.unwrap().unwrap();
        let ids: Vec<&str> = listed.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["user_2", "user_9"]);
    }

    #[tokio::test]
    async fn test_assign_to_non_employee_never_touches_the_order() {
        // 1. Setup Mocks
        let (user_inner, mut user_rx) = create_mock_client::<User>(10);
        let (order_inner, mut order_rx) = create_mock_client::<Order>(10);
        let (notification_inner, _notification_rx) = create_mock_client::<Notification>(10);

        let users = UserClient::new(user_inner);
        let notifications = NotificationClient::new(notification_inner, Arc::new(RecordingPush::default()));
        let orders = OrderClient::new(
            order_inner,
            users,
            notifications,
            Arc::new(RecordingMailer::default()),
            Arc::new(MemoryStorage::default()),
            LifecycleSettings::default(),
        );

        // 2. Execute assignment in background
        let task = tokio::spawn(async move { orders.assign_order(&admin(), "order_1", "user_5").await });

        // 3. The user lookup answers with a customer
        let (user_id, responder) = expect_get(&mut user_rx).await.expect("Expected User Get");
        assert_eq!(user_id, "user_5");
        responder.send(Ok(Some(user("user_5", Role::Customer)))).unwrap();

        // 4. Verify Result: rejected, and the order store saw nothing
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(order_rx.try_recv().is_err());
    }
}
