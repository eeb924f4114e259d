use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::config::AppConfig;
use crate::actor_framework::ResourceActor;
use crate::clients::{InvoiceClient, LifecycleSettings, NotificationClient, OrderClient, UserClient};
use crate::domain::{Invoice, Notification, Order, User};
use crate::error::AppResult;
use crate::gateways::{
    FileStorage, LocalFileStorage, LogMailer, Mailer, PayPalClient, PaymentProvider, PushChannel, PushHub,
    PushMessage, ResendMailer, UnconfiguredPayments,
};

const PUSH_CAPACITY: usize = 256;

/// The external collaborators the system is wired with.
#[derive(Clone)]
pub struct Gateways {
    pub mailer: Arc<dyn Mailer>,
    pub storage: Arc<dyn FileStorage>,
    pub payments: Arc<dyn PaymentProvider>,
    pub push: Arc<dyn PushChannel>,
}

impl Gateways {
    /// Production collaborators. Unconfigured providers fall back to a
    /// logging mailer and a payment stub that always fails.
    pub fn from_config(config: &AppConfig, push: Arc<dyn PushChannel>) -> Self {
        let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
            Some(key) => Arc::new(ResendMailer::new(key.clone(), config.mail_from.clone())),
            None => {
                warn!("RESEND_API_KEY not set; emails will only be logged");
                Arc::new(LogMailer)
            }
        };
        let payments: Arc<dyn PaymentProvider> = match &config.paypal {
            Some(paypal) => Arc::new(PayPalClient::new(
                paypal.client_id.clone(),
                paypal.client_secret.clone(),
                paypal.mode,
            )),
            None => {
                warn!("PayPal credentials not set; payments are disabled");
                Arc::new(UnconfiguredPayments)
            }
        };
        Self {
            mailer,
            storage: Arc::new(LocalFileStorage::new(config.upload_dir.clone(), config.public_base_url.clone())),
            payments,
            push,
        }
    }
}

fn id_sequence(prefix: &'static str) -> impl Fn() -> String + Send + Sync + 'static {
    let counter = Arc::new(AtomicU64::new(1));
    move || format!("{}_{}", prefix, counter.fetch_add(1, Ordering::SeqCst))
}

/// The main application system that orchestrates all actors.
///
/// Responsible for starting up actors, wiring them together, and handling shutdown.
pub struct OrderSystem {
    pub user_client: UserClient,
    pub order_client: OrderClient,
    pub invoice_client: InvoiceClient,
    pub notification_client: NotificationClient,
    push_hub: Option<PushHub>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl OrderSystem {
    /// Starts the system with production gateways and an in-process push hub.
    pub fn new(config: &AppConfig) -> Self {
        let hub = PushHub::new(PUSH_CAPACITY);
        let gateways = Gateways::from_config(config, Arc::new(hub.clone()));
        let mut system = Self::with_gateways(config, gateways);
        system.push_hub = Some(hub);
        system
    }

    pub fn with_gateways(config: &AppConfig, gateways: Gateways) -> Self {
        let buffer = config.actor_buffer_size;

        // 1. Setup User Service
        let (user_actor, user_resource_client) = ResourceActor::<User>::new(buffer, id_sequence("user"));
        let user_client = UserClient::new(user_resource_client);
        let user_handle = tokio::spawn(user_actor.run());

        // 2. Setup Notification Service
        let (notification_actor, notification_resource_client) =
            ResourceActor::<Notification>::new(buffer, id_sequence("notification"));
        let notification_client = NotificationClient::new(notification_resource_client, gateways.push.clone());
        let notification_handle = tokio::spawn(notification_actor.run());

        // 3. Setup Order Service
        let (order_actor, order_resource_client) = ResourceActor::<Order>::new(buffer, id_sequence("order"));
        let order_client = OrderClient::new(
            order_resource_client,
            user_client.clone(),
            notification_client.clone(),
            gateways.mailer.clone(),
            gateways.storage.clone(),
            LifecycleSettings { admin_notify_email: config.admin_notify_email.clone() },
        );
        let order_handle = tokio::spawn(order_actor.run());

        // 4. Setup Invoice Service
        let (invoice_actor, invoice_resource_client) = ResourceActor::<Invoice>::new(buffer, id_sequence("invoice"));
        let invoice_client = InvoiceClient::new(
            invoice_resource_client,
            order_client.clone(),
            user_client.clone(),
            notification_client.clone(),
            gateways.mailer.clone(),
            gateways.payments.clone(),
            config.currency.clone(),
        );
        let invoice_handle = tokio::spawn(invoice_actor.run());

        info!(buffer, "Order system started");
        Self {
            user_client,
            order_client,
            invoice_client,
            notification_client,
            push_hub: None,
            handles: vec![user_handle, notification_handle, order_handle, invoice_handle],
        }
    }

    /// Creates the bootstrap admin from config, if one is configured.
    pub async fn seed_admin(&self, config: &AppConfig) -> AppResult<Option<User>> {
        match &config.admin_seed {
            Some(seed) => Ok(Some(self.user_client.seed_admin(seed).await?)),
            None => {
                info!("No admin seed configured");
                Ok(None)
            }
        }
    }

    /// Live push events, for a socket layer to forward. `None` when the
    /// system was wired with a custom push channel.
    pub fn push_events(&self) -> Option<broadcast::Receiver<PushMessage>> {
        self.push_hub.as_ref().map(PushHub::subscribe)
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");
        // Actors stop once every client holding their channel is gone.
        drop(self.invoice_client);
        drop(self.order_client);
        drop(self.notification_client);
        drop(self.user_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
