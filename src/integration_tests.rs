#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::app_system::{AppConfig, Gateways, OrderSystem};
    use crate::clients::{
        AdminSeed, InvoiceRequest, NewOrder, OrderQuery, SampleUpload, Signup, StaffAccount, WorkReport,
    };
    use crate::domain::{
        Actor, FileInput, FileUpload, Invoice, Notification, NotificationKind, Order, OrderFields, OrderPatch, OrderStatus,
        OrderType, PaymentStatus, PendingWork, Role, SampleKind,
    };
    use crate::gateways::testing::{FailingMailer, MemoryStorage, RecordingMailer, RecordingPush, ScriptedPayments};
    use crate::gateways::{CaptureReport, CaptureStatus, Mailer};
    use crate::order_actor::StatusUpdate;

    const ADMIN_EMAIL: &str = "root@desk.test";

    struct Desk {
        system: OrderSystem,
        mailer: Arc<RecordingMailer>,
        storage: Arc<MemoryStorage>,
        push: Arc<RecordingPush>,
        payments: Arc<ScriptedPayments>,
        admin: Actor,
    }

    async fn start() -> Desk {
        start_with(None, ScriptedPayments::default()).await
    }

    async fn start_with(mailer: Option<Arc<dyn Mailer>>, payments: ScriptedPayments) -> Desk {
        let recording = Arc::new(RecordingMailer::default());
        let default_mailer: Arc<dyn Mailer> = recording.clone();
        let storage = Arc::new(MemoryStorage::default());
        let push = Arc::new(RecordingPush::default());
        let payments = Arc::new(payments);
        let config = AppConfig {
            admin_seed: Some(AdminSeed { name: "Root".into(), username: "root".into(), email: ADMIN_EMAIL.into() }),
            ..AppConfig::default()
        };
        let gateways = Gateways {
            mailer: mailer.unwrap_or(default_mailer),
            storage: storage.clone(),
            payments: payments.clone(),
            push: push.clone(),
        };
        let system = OrderSystem::with_gateways(&config, gateways);
        let admin = system.seed_admin(&config).await.unwrap().expect("seed configured");
        Desk { system, mailer: recording, storage, push, payments, admin: Actor::from(&admin) }
    }

    impl Desk {
        async fn customer(&self, name: &str) -> Actor {
            let user = self
                .system
                .user_client
                .register_customer(Signup {
                    name: name.into(),
                    username: name.into(),
                    email: format!("{}@shop.test", name),
                })
                .await
                .unwrap();
            Actor::from(&user)
        }

        async fn employee(&self, name: &str, specialty: OrderType) -> Actor {
            let user = self
                .system
                .user_client
                .create_staff(
                    &self.admin,
                    StaffAccount {
                        name: name.into(),
                        username: name.into(),
                        email: format!("{}@desk.test", name),
                        role: Role::Employee,
                        employee_role: Some(specialty),
                    },
                )
                .await
                .unwrap();
            Actor::from(&user)
        }

        async fn vector_order(&self, customer: &Actor) -> Order {
            self.system.order_client.create_order(customer, vector_request()).await.unwrap()
        }

        async fn inbox(&self, actor: &Actor) -> Vec<Notification> {
            self.system.notification_client.list_for_user(actor).await.unwrap()
        }

        async fn count(&self, actor: &Actor, kind: NotificationKind) -> usize {
            self.inbox(actor).await.iter().filter(|n| n.kind == kind).count()
        }

        async fn set_status(&self, order: &Order, status: OrderStatus) -> Order {
            let update = StatusUpdate { status: Some(status), ..StatusUpdate::default() };
            self.system.order_client.update_status(&self.admin, &order.id, update).await.unwrap()
        }

        async fn price(&self, order: &Order, cents: i64) {
            let patch = OrderPatch { price_cents: Some(cents), ..OrderPatch::default() };
            self.system.order_client.update_order(&self.admin, &order.id, patch).await.unwrap();
        }
    }

    fn upload(name: &str) -> FileInput {
        FileInput::Upload(FileUpload { filename: name.into(), mimetype: "image/png".into(), bytes: vec![1, 2, 3] })
    }

    fn vector_request() -> NewOrder {
        NewOrder {
            order_type: "vector".into(),
            fields: OrderFields {
                design_name: Some("Club logo".into()),
                file_format: Some("AI".into()),
                ..OrderFields::default()
            },
            files: vec![upload("logo.png")],
            notes: Some("Keep the colors".into()),
        }
    }

    fn patch_fields() -> OrderFields {
        OrderFields {
            design_name: Some("Team badge".into()),
            patch_length: Some(3.0),
            patch_width: Some(3.0),
            unit: Some("in".into()),
            patch_style: Some("embroidered".into()),
            patch_backing: Some("iron-on".into()),
            patch_quantity: Some(50),
            patch_address: Some("1 Main St".into()),
            ..OrderFields::default()
        }
    }

    fn capture(id: &str, status: CaptureStatus, amount_cents: i64, invoice: &Invoice) -> CaptureReport {
        CaptureReport {
            transaction_id: id.into(),
            status,
            amount_cents,
            currency: "USD".into(),
            payer_email: Some("payer@shop.test".into()),
            invoice_reference: Some(invoice.invoice_number.clone()),
        }
    }

    #[tokio::test]
    async fn test_patches_order_without_address_is_rejected() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let mut fields = patch_fields();
        fields.patch_address = None;

        let err = desk
            .system
            .order_client
            .create_order(
                &customer,
                NewOrder { order_type: "patches".into(), fields, files: vec![upload("art.png")], notes: None },
            )
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("patchAddress"));
        assert!(desk.storage.uploaded().is_empty());
        let all = desk.system.order_client.list_orders(&desk.admin, OrderQuery::default()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_and_missing_files_are_rejected() {
        let desk = start().await;
        let customer = desk.customer("ana").await;

        let bad_type = NewOrder { order_type: "stickers".into(), ..vector_request() };
        let err = desk.system.order_client.create_order(&customer, bad_type).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let no_files = NewOrder { files: Vec::new(), ..vector_request() };
        let err = desk.system.order_client.create_order(&customer, no_files).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = desk.system.order_client.create_order(&desk.admin, vector_request()).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_new_order_reaches_customer_and_admins() {
        let desk = start().await;
        let customer = desk.customer("ana").await;

        let order = desk.vector_order(&customer).await;

        assert!(order.order_number.starts_with("VEC-"));
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.required_employee_role, OrderType::Vector);
        assert_eq!(order.files[0].url, "memory://orders/user_2/1-logo.png");
        assert_eq!(desk.count(&customer, NotificationKind::OrderCreated).await, 1);
        assert_eq!(desk.count(&desk.admin, NotificationKind::OrderCreated).await, 1);
        assert_eq!(desk.mailer.sent_to("ana@shop.test").len(), 1);
        assert_eq!(desk.mailer.sent_to(ADMIN_EMAIL).len(), 1);
        assert!(desk.push.messages().iter().any(|m| m.room == format!("user-{}", customer.id)));
    }

    #[tokio::test]
    async fn test_reassignment_moves_back_reference() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let first = desk.employee("vic", OrderType::Vector).await;
        let second = desk.employee("val", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;

        orders.assign_order(&desk.admin, &order.id, &first.id).await.unwrap();
        let reassigned = orders.assign_order(&desk.admin, &order.id, &second.id).await.unwrap();
        assert_eq!(reassigned.assigned_to.as_deref(), Some(second.id.as_str()));

        let users = &desk.system.user_client;
        let first_user = users.get_user(&desk.admin, &first.id).await.unwrap();
        let second_user = users.get_user(&desk.admin, &second.id).await.unwrap();
        assert!(first_user.assigned_orders.is_empty());
        assert!(second_user.assigned_orders.contains(&order.id));

        assert_eq!(desk.count(&first, NotificationKind::OrderUnassigned).await, 1);
        let assigned = desk.inbox(&second).await;
        let note = assigned.iter().find(|n| n.kind == NotificationKind::OrderAssigned).unwrap();
        assert_eq!(note.previous_assigned_employee.as_deref(), Some(first.id.as_str()));
        assert_eq!(desk.mailer.sent_to("val@desk.test").len(), 1);

        // The old assignee loses access, the new one gains it.
        assert_eq!(orders.get_order(&first, &order.id).await.unwrap_err().status_code(), 403);
        assert!(orders.get_order(&second, &order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_assign_reports_failures() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;

        let outcome = desk
            .system
            .order_client
            .bulk_assign(&desk.admin, &[order.id.clone(), "order_404".to_string()], &employee.id)
            .await
            .unwrap();
        assert_eq!(outcome.assigned, vec![order.id.clone()]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].order_id, "order_404");

        let err = desk
            .system
            .order_client
            .bulk_assign(&desk.admin, &[order.id.clone()], &customer.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_status_notification_only_on_change() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;

        desk.set_status(&order, OrderStatus::InProgress).await;
        assert_eq!(desk.count(&customer, NotificationKind::OrderStatusChanged).await, 0);

        desk.set_status(&order, OrderStatus::Manufacturing).await;
        assert_eq!(desk.count(&customer, NotificationKind::OrderStatusChanged).await, 1);
        assert_eq!(desk.mailer.sent_to("ana@shop.test").len(), 2);

        let update = StatusUpdate { status: Some(OrderStatus::Completed), ..StatusUpdate::default() };
        let err = orders.update_status(&employee, &order.id, update.clone()).await.unwrap_err();
        assert_eq!(err.status_code(), 403);

        orders.assign_order(&desk.admin, &order.id, &employee.id).await.unwrap();
        let done = orders.update_status(&employee, &order.id, update).await.unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
        assert_eq!(desk.count(&customer, NotificationKind::OrderStatusChanged).await, 2);
    }

    #[tokio::test]
    async fn test_tracking_number_is_announced_once() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let order = desk
            .system
            .order_client
            .create_order(
                &customer,
                NewOrder {
                    order_type: "patches".into(),
                    fields: patch_fields(),
                    files: vec![upload("art.png")],
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert!(order.order_number.starts_with("PAT-"));

        let shipped = StatusUpdate { tracking_number: Some("1Z999".into()), ..StatusUpdate::default() };
        for _ in 0..2 {
            desk.system.order_client.update_status(&desk.admin, &order.id, shipped.clone()).await.unwrap();
        }

        assert_eq!(desk.count(&customer, NotificationKind::TrackingNumberAdded).await, 1);
        assert_eq!(desk.count(&customer, NotificationKind::OrderStatusChanged).await, 0);
        let tracking_emails =
            desk.mailer.sent_to("ana@shop.test").into_iter().filter(|e| e.html_body.contains("1Z999")).count();
        assert_eq!(tracking_emails, 1);
    }

    #[tokio::test]
    async fn test_customer_feedback_cycle() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;

        let err = orders.approve_design(&customer, &order.id).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let sample = SampleUpload { kind: SampleKind::Initial, files: vec![upload("proof.png")], comments: None };
        let waiting = orders.upload_samples(&desk.admin, &order.id, sample).await.unwrap();
        assert_eq!(waiting.status, OrderStatus::WaitingForApproval);
        assert_eq!(desk.count(&customer, NotificationKind::SampleUploaded).await, 1);
        let proof_mail = desk.mailer.sent_to("ana@shop.test").pop().unwrap();
        assert_eq!(proof_mail.attachments.len(), 1);

        let revising = orders.request_revision(&customer, &order.id, "Bigger text".into()).await.unwrap();
        assert_eq!(revising.status, OrderStatus::InRevision);
        assert!(revising.notes.ends_with("Revision request: Bigger text"));
        assert_eq!(desk.count(&desk.admin, NotificationKind::RevisionRequested).await, 1);

        let revision = SampleUpload { kind: SampleKind::Revision, files: vec![upload("proof2.png")], comments: None };
        let ready = orders.upload_samples(&desk.admin, &order.id, revision).await.unwrap();
        assert_eq!(ready.status, OrderStatus::RevisionReady);

        let approved = orders.approve_design(&customer, &order.id).await.unwrap();
        assert_eq!(approved.status, OrderStatus::RevisionApproved);
        assert_eq!(orders.approve_design(&customer, &order.id).await.unwrap_err().status_code(), 400);

        let stranger = desk.customer("bob").await;
        assert_eq!(orders.approve_design(&stranger, &order.id).await.unwrap_err().status_code(), 403);
    }

    #[tokio::test]
    async fn test_pending_work_hidden_until_approved() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;
        orders.assign_order(&desk.admin, &order.id, &employee.id).await.unwrap();

        let work = WorkReport { files: vec![upload("draft.png")], report: Some("first pass".into()), ..WorkReport::default() };
        let staged = orders.submit_pending_work(&employee, &order.id, work).await.unwrap();
        assert!(staged.pending_work.has_pending_work());
        assert_eq!(desk.count(&desk.admin, NotificationKind::EmployeeWorkPending).await, 1);

        let seen_by_customer = orders.get_order(&customer, &order.id).await.unwrap();
        assert_eq!(seen_by_customer.pending_work, PendingWork::None);
        assert!(seen_by_customer.sample_images.is_empty());
        assert_eq!(desk.count(&customer, NotificationKind::SampleUploaded).await, 0);
        assert!(orders.get_order(&desk.admin, &order.id).await.unwrap().pending_work.has_pending_work());

        let published = orders.approve_pending_work(&desk.admin, &order.id).await.unwrap();
        assert_eq!(published.pending_work, PendingWork::None);
        assert_eq!(published.sample_images.len(), 1);
        assert_eq!(published.status, OrderStatus::WaitingForApproval);
        assert_eq!(published.report.as_deref(), Some("first pass"));
        assert_eq!(desk.count(&customer, NotificationKind::SampleUploaded).await, 1);
        assert_eq!(desk.count(&customer, NotificationKind::OrderStatusChanged).await, 0);
        assert_eq!(desk.count(&employee, NotificationKind::WorkApproved).await, 1);

        let err = orders.approve_pending_work(&desk.admin, &order.id).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_approved_final_work_announces_status() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;
        orders.assign_order(&desk.admin, &order.id, &employee.id).await.unwrap();

        let final_work = WorkReport {
            proposed_status: Some(OrderStatus::Completed),
            files: vec![upload("final.svg")],
            ..WorkReport::default()
        };
        orders.submit_pending_work(&employee, &order.id, final_work).await.unwrap();
        let done = orders.approve_pending_work(&desk.admin, &order.id).await.unwrap();

        assert_eq!(done.status, OrderStatus::Completed);
        assert_eq!(done.sample_images.len(), 1);
        assert_eq!(desk.count(&customer, NotificationKind::SampleUploaded).await, 1);
        assert_eq!(desk.count(&customer, NotificationKind::OrderStatusChanged).await, 1);
    }

    #[tokio::test]
    async fn test_rejected_work_only_reaches_employee() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;
        orders.assign_order(&desk.admin, &order.id, &employee.id).await.unwrap();

        let work = WorkReport { files: vec![upload("draft.png")], ..WorkReport::default() };
        orders.submit_pending_work(&employee, &order.id, work).await.unwrap();
        let rejected = orders.reject_pending_work(&desk.admin, &order.id, "blurry image".into()).await.unwrap();
        assert!(rejected.pending_work.was_rejected());

        let inbox = desk.inbox(&employee).await;
        let note = inbox.iter().find(|n| n.kind == NotificationKind::WorkRejected).unwrap();
        assert!(note.message.contains("blurry image"));
        let customer_kinds: Vec<NotificationKind> = desk.inbox(&customer).await.iter().map(|n| n.kind).collect();
        assert_eq!(customer_kinds, vec![NotificationKind::OrderCreated]);

        // A fresh submission replaces the rejected one and drops its files.
        let retry = WorkReport { files: vec![upload("sharp.png")], ..WorkReport::default() };
        let staged = orders.submit_pending_work(&employee, &order.id, retry).await.unwrap();
        assert!(staged.pending_work.has_pending_work());
        assert_eq!(desk.storage.deleted().len(), 1);
        assert!(desk.storage.deleted()[0].ends_with("draft.png"));
    }

    #[tokio::test]
    async fn test_revision_supersedes_completed_parent() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let parent = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;

        let err = orders.create_revision_order(&customer, &parent.id, None).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        desk.set_status(&parent, OrderStatus::Completed).await;
        let first = orders
            .create_revision_order(&customer, &parent.id, Some("Change the font".into()))
            .await
            .unwrap();
        let link = first.revision.clone().unwrap();
        assert_eq!(link.parent_order_id, parent.id);
        assert_eq!(link.revision_number, 1);
        assert_eq!(first.order_number, format!("{}-R1", parent.order_number));
        assert_eq!(first.details, parent.details);
        assert_eq!(first.order_type, parent.order_type);
        assert_eq!(first.status, OrderStatus::InProgress);

        let retired = orders.get_order(&customer, &parent.id).await.unwrap();
        assert_eq!(retired.status, OrderStatus::Superseded);
        assert_eq!(desk.count(&customer, NotificationKind::RevisionOrderCreated).await, 1);

        // Superseded is terminal.
        let reopen = StatusUpdate { status: Some(OrderStatus::InProgress), ..StatusUpdate::default() };
        assert_eq!(orders.update_status(&desk.admin, &parent.id, reopen).await.unwrap_err().status_code(), 400);
        assert_eq!(
            orders.create_revision_order(&customer, &parent.id, None).await.unwrap_err().status_code(),
            400
        );

        desk.set_status(&first, OrderStatus::Completed).await;
        let second = orders.create_revision_order(&customer, &first.id, None).await.unwrap();
        assert_eq!(second.revision.as_ref().unwrap().revision_number, 2);
        assert_eq!(second.order_number, format!("{}-R2", parent.order_number));
    }

    #[tokio::test]
    async fn test_unreviewed_work_dies_with_superseded_parent() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let parent = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;
        orders.assign_order(&desk.admin, &parent.id, &employee.id).await.unwrap();
        desk.set_status(&parent, OrderStatus::Completed).await;

        let late = WorkReport {
            proposed_status: Some(OrderStatus::WaitingForApproval),
            files: vec![upload("late.png")],
            ..WorkReport::default()
        };
        orders.submit_pending_work(&employee, &parent.id, late).await.unwrap();
        orders.create_revision_order(&customer, &parent.id, None).await.unwrap();

        let err = orders.approve_pending_work(&desk.admin, &parent.id).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        let retired = orders.get_order(&desk.admin, &parent.id).await.unwrap();
        assert_eq!(retired.status, OrderStatus::Superseded);
        assert!(retired.sample_images.is_empty());
        assert_eq!(retired.pending_work, PendingWork::None);
        assert_eq!(desk.storage.deleted().len(), 1);
        assert!(desk.storage.deleted()[0].ends_with("late.png"));
        assert_eq!(desk.count(&customer, NotificationKind::SampleUploaded).await, 0);
    }

    #[tokio::test]
    async fn test_revision_numbers_survive_deleted_revisions() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let root = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;

        desk.set_status(&root, OrderStatus::Completed).await;
        let first = orders.create_revision_order(&customer, &root.id, None).await.unwrap();
        desk.set_status(&first, OrderStatus::Completed).await;
        let second = orders.create_revision_order(&customer, &first.id, None).await.unwrap();
        orders.delete_order(&customer, &first.id).await.unwrap();

        desk.set_status(&second, OrderStatus::Completed).await;
        let third = orders.create_revision_order(&customer, &second.id, None).await.unwrap();
        assert_eq!(third.revision.as_ref().unwrap().revision_number, 3);
        assert_eq!(third.order_number, format!("{}-R3", root.order_number));
    }

    #[tokio::test]
    async fn test_email_failure_never_rolls_back() {
        let desk = start_with(Some(Arc::new(FailingMailer)), ScriptedPayments::default()).await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;

        let order = desk.vector_order(&customer).await;
        desk.system.order_client.assign_order(&desk.admin, &order.id, &employee.id).await.unwrap();
        desk.set_status(&order, OrderStatus::Manufacturing).await;

        let stored = desk.system.order_client.get_order(&desk.admin, &order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Manufacturing);
        assert!(stored.is_assigned_to(&employee.id));
        assert_eq!(desk.count(&customer, NotificationKind::OrderStatusChanged).await, 1);
        assert_eq!(desk.count(&employee, NotificationKind::OrderAssigned).await, 1);
    }

    #[tokio::test]
    async fn test_order_type_is_immutable() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;

        let retype = OrderPatch { order_type: Some(OrderType::Patches), ..OrderPatch::default() };
        let err = orders.update_order(&desk.admin, &order.id, retype).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let rename = OrderPatch {
            order_type: Some(OrderType::Vector),
            fields: Some(OrderFields { design_name: Some("New logo".into()), ..OrderFields::default() }),
            ..OrderPatch::default()
        };
        let renamed = orders.update_order(&desk.admin, &order.id, rename).await.unwrap();
        assert_eq!(renamed.order_type, OrderType::Vector);
        assert_eq!(renamed.details.design_name(), "New logo");
        assert_eq!(desk.count(&customer, NotificationKind::OrderUpdated).await, 1);
    }

    #[tokio::test]
    async fn test_orders_are_scoped_by_role() {
        let desk = start().await;
        let ana = desk.customer("ana").await;
        let bob = desk.customer("bob").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let first = desk.vector_order(&ana).await;
        let second = desk.vector_order(&ana).await;
        desk.vector_order(&bob).await;
        let orders = &desk.system.order_client;
        orders.assign_order(&desk.admin, &first.id, &employee.id).await.unwrap();
        desk.set_status(&second, OrderStatus::Manufacturing).await;

        let mine = orders.list_orders(&ana, OrderQuery::default()).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|o| o.customer_id == ana.id));
        assert!(mine[0].created_at >= mine[1].created_at);

        let assigned = orders.list_orders(&employee, OrderQuery::default()).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, first.id);

        let manufacturing = OrderQuery { status: Some(OrderStatus::Manufacturing), ..OrderQuery::default() };
        assert_eq!(orders.list_orders(&desk.admin, manufacturing).await.unwrap().len(), 1);
        assert_eq!(orders.list_orders(&desk.admin, OrderQuery::default()).await.unwrap().len(), 3);
        assert_eq!(orders.get_order(&bob, &first.id).await.unwrap_err().status_code(), 403);
    }

    #[tokio::test]
    async fn test_inactive_accounts_are_locked_out() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;

        desk.system.user_client.set_active(&desk.admin, &employee.id, false).await.unwrap();
        let err = desk.system.order_client.assign_order(&desk.admin, &order.id, &employee.id).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let locked = Actor { is_active: false, ..customer.clone() };
        let err = desk.system.order_client.get_order(&locked, &order.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_delete_order_cleans_up() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;
        orders.assign_order(&desk.admin, &order.id, &employee.id).await.unwrap();

        let stranger = desk.customer("bob").await;
        assert_eq!(orders.delete_order(&stranger, &order.id).await.unwrap_err().status_code(), 403);

        orders.delete_order(&customer, &order.id).await.unwrap();
        assert_eq!(desk.storage.deleted(), vec![order.files[0].url.clone()]);
        let employee_user = desk.system.user_client.get_user(&desk.admin, &employee.id).await.unwrap();
        assert!(employee_user.assigned_orders.is_empty());
        assert_eq!(desk.count(&customer, NotificationKind::OrderDeleted).await, 1);
        assert_eq!(desk.count(&desk.admin, NotificationKind::OrderDeleted).await, 1);
        assert_eq!(orders.get_order(&desk.admin, &order.id).await.unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn test_deleting_a_revision_keeps_shared_files() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let parent = desk.vector_order(&customer).await;
        desk.set_status(&parent, OrderStatus::Completed).await;
        let revision = desk.system.order_client.create_revision_order(&customer, &parent.id, None).await.unwrap();

        desk.system.order_client.delete_order(&desk.admin, &revision.id).await.unwrap();
        assert!(desk.storage.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_delete_employee_detaches_assignments() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let employee = desk.employee("vic", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;
        orders.assign_order(&desk.admin, &order.id, &employee.id).await.unwrap();

        let err = orders.delete_employee(&desk.admin, &customer.id).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        orders.delete_employee(&desk.admin, &employee.id).await.unwrap();
        assert_eq!(orders.get_order(&desk.admin, &order.id).await.unwrap().assigned_to, None);
        let err = desk.system.user_client.get_user(&desk.admin, &employee.id).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_delete_employee_leaves_reassigned_orders_alone() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let leaving = desk.employee("vic", OrderType::Vector).await;
        let staying = desk.employee("val", OrderType::Vector).await;
        let order = desk.vector_order(&customer).await;
        let orders = &desk.system.order_client;
        orders.assign_order(&desk.admin, &order.id, &staying.id).await.unwrap();
        // A back-reference left behind by a failed reassignment cleanup.
        desk.system.user_client.add_assigned_order(&leaving.id, &order.id).await.unwrap();

        orders.delete_employee(&desk.admin, &leaving.id).await.unwrap();
        let stored = orders.get_order(&desk.admin, &order.id).await.unwrap();
        assert!(stored.is_assigned_to(&staying.id));
        let staying_user = desk.system.user_client.get_user(&desk.admin, &staying.id).await.unwrap();
        assert!(staying_user.assigned_orders.contains(&order.id));
    }

    #[tokio::test]
    async fn test_invoice_requires_single_customer() {
        let desk = start().await;
        let ana = desk.customer("ana").await;
        let bob = desk.customer("bob").await;
        let first = desk.vector_order(&ana).await;
        let second = desk.vector_order(&bob).await;
        desk.price(&first, 2500).await;
        desk.price(&second, 2500).await;

        let request = InvoiceRequest { order_ids: vec![first.id.clone(), second.id.clone()], ..InvoiceRequest::default() };
        let err = desk.system.invoice_client.create_invoice(&desk.admin, request).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        for order in [&first, &second] {
            let stored = desk.system.order_client.get_order(&desk.admin, &order.id).await.unwrap();
            assert!(!stored.has_invoice);
        }
        let invoices = desk.system.invoice_client.list_invoices(&desk.admin).await.unwrap();
        assert!(invoices.is_empty());
    }

    #[tokio::test]
    async fn test_invoice_links_orders_and_cancel_releases_them() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let first = desk.vector_order(&customer).await;
        let second = desk.vector_order(&customer).await;
        desk.price(&first, 2500).await;
        desk.price(&second, 1999).await;
        let invoices = &desk.system.invoice_client;

        let request = InvoiceRequest { order_ids: vec![first.id.clone(), second.id.clone()], ..InvoiceRequest::default() };
        let invoice = invoices.create_invoice(&desk.admin, request.clone()).await.unwrap();
        assert!(invoice.invoice_number.starts_with("INV-"));
        assert_eq!(invoice.total_cents, 4499);
        assert_eq!(invoice.items.len(), 2);
        assert_eq!(invoice.payment_status, PaymentStatus::Unpaid);
        assert_eq!(desk.count(&customer, NotificationKind::InvoiceCreated).await, 1);

        let linked = desk.system.order_client.get_order(&desk.admin, &first.id).await.unwrap();
        assert_eq!(linked.invoice_id.as_deref(), Some(invoice.id.as_str()));
        assert_eq!(linked.invoice_status, Some(PaymentStatus::Unpaid));

        let err = invoices.create_invoice(&desk.admin, request.clone()).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let other = desk.customer("bob").await;
        assert_eq!(invoices.get_invoice(&other, &invoice.id).await.unwrap_err().status_code(), 403);
        assert_eq!(invoices.list_invoices(&customer).await.unwrap().len(), 1);

        invoices.cancel_invoice(&desk.admin, &invoice.id).await.unwrap();
        let released = desk.system.order_client.get_order(&desk.admin, &first.id).await.unwrap();
        assert!(!released.has_invoice);
        assert!(invoices.create_invoice(&desk.admin, request).await.is_ok());
    }

    #[tokio::test]
    async fn test_unconfirmed_payment_is_refused() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let order = desk.vector_order(&customer).await;
        desk.price(&order, 4500).await;
        let invoices = &desk.system.invoice_client;
        let invoice = invoices
            .create_invoice(&desk.admin, InvoiceRequest { order_ids: vec![order.id.clone()], ..InvoiceRequest::default() })
            .await
            .unwrap();
        desk.payments.record(capture("TX-PENDING", CaptureStatus::Pending, 4500, &invoice));
        desk.payments.record(capture("TX-SHORT", CaptureStatus::Completed, 4000, &invoice));
        desk.payments.record(capture("TX-OK", CaptureStatus::Completed, 4500, &invoice));

        let session = invoices.start_payment(&customer, &invoice.id).await.unwrap();
        assert_eq!(session.invoice.payment_status, PaymentStatus::Pending);
        assert_eq!(desk.payments.checkouts()[0].amount_cents, 4500);

        for tx in ["TX-PENDING", "TX-SHORT"] {
            let err = invoices.confirm_payment(&customer, &invoice.id, tx).await.unwrap_err();
            assert_eq!(err.status_code(), 400);
        }
        let unknown = invoices.confirm_payment(&customer, &invoice.id, "TX-NOPE").await.unwrap_err();
        assert_eq!(unknown.status_code(), 502);
        let still_open = invoices.get_invoice(&customer, &invoice.id).await.unwrap();
        assert_ne!(still_open.payment_status, PaymentStatus::Paid);

        let paid = invoices.confirm_payment(&customer, &invoice.id, "TX-OK").await.unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_details.as_ref().unwrap().transaction_id, "TX-OK");
        let order = desk.system.order_client.get_order(&desk.admin, &order.id).await.unwrap();
        assert_eq!(order.invoice_status, Some(PaymentStatus::Paid));
        assert_eq!(desk.count(&customer, NotificationKind::PaymentReceived).await, 1);
        assert_eq!(desk.count(&desk.admin, NotificationKind::PaymentReceived).await, 1);

        assert_eq!(invoices.confirm_payment(&customer, &invoice.id, "TX-OK").await.unwrap_err().status_code(), 400);
        let items = invoice.items.clone();
        assert_eq!(invoices.update_items(&desk.admin, &invoice.id, items).await.unwrap_err().status_code(), 400);

        let refunded = invoices.mark_refunded(&desk.admin, &invoice.id).await.unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_capture_only_settles_its_own_invoice() {
        let desk = start().await;
        let customer = desk.customer("ana").await;
        let invoices = &desk.system.invoice_client;
        let mut billed = Vec::new();
        for _ in 0..2 {
            let order = desk.vector_order(&customer).await;
            desk.price(&order, 4500).await;
            let request = InvoiceRequest { order_ids: vec![order.id.clone()], ..InvoiceRequest::default() };
            billed.push(invoices.create_invoice(&desk.admin, request).await.unwrap());
        }
        let (first, second) = (&billed[0], &billed[1]);
        desk.payments.record(capture("TX-FIRST", CaptureStatus::Completed, 4500, first));

        let err = invoices.confirm_payment(&customer, &second.id, "TX-FIRST").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        invoices.confirm_payment(&customer, &first.id, "TX-FIRST").await.unwrap();
        let err = invoices.confirm_payment(&customer, &second.id, "TX-FIRST").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        let unpaid = invoices.get_invoice(&customer, &second.id).await.unwrap();
        assert_eq!(unpaid.payment_status, PaymentStatus::Unpaid);

        // A capture claiming the second invoice's number cannot reuse a settled transaction.
        desk.payments.record(CaptureReport {
            invoice_reference: Some(second.invoice_number.clone()),
            ..capture("TX-FIRST", CaptureStatus::Completed, 4500, first)
        });
        let err = invoices.confirm_payment(&customer, &second.id, "TX-FIRST").await.unwrap_err();
        assert!(err.to_string().contains(&first.invoice_number));
    }

    #[tokio::test]
    async fn test_shutdown_stops_all_actors() {
        let desk = start().await;
        desk.system.shutdown().await.unwrap();
    }
}
