use tracing::{error, info, warn, Instrument};

use order_desk::app_system::{setup_tracing, AppConfig, OrderSystem};
use order_desk::clients::{AdminSeed, NewOrder, SampleUpload, Signup, StaffAccount};
use order_desk::domain::{Actor, FileInput, FileUpload, OrderFields, OrderStatus, OrderType, Role, SampleKind};
use order_desk::order_actor::StatusUpdate;

fn demo_upload(name: &str) -> FileInput {
    FileInput::Upload(FileUpload {
        filename: name.to_string(),
        mimetype: "image/png".to_string(),
        bytes: b"demo".to_vec(),
    })
}

#[tokio::main]
async fn main() -> Result<(), String> {
    dotenvy::dotenv().ok();
    // Setup tracing once for the entire application
    setup_tracing();

    let mut config = AppConfig::from_env().map_err(|e| e.to_string())?;
    if config.admin_seed.is_none() {
        warn!("ADMIN_SEED_EMAIL not set; using a demo admin");
        config.admin_seed = Some(AdminSeed {
            name: "Administrator".to_string(),
            username: "admin".to_string(),
            email: "admin@localhost".to_string(),
        });
    }
    info!(?config, "Starting order desk");

    // Create the entire order system (starts all services)
    let system = OrderSystem::new(&config);
    let admin = system
        .seed_admin(&config)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("admin seed missing")?;
    let admin = Actor::from(&admin);

    let span = tracing::info_span!("account_setup");
    let (customer, employee) = async {
        info!("Registering demo accounts");
        let customer = system
            .user_client
            .register_customer(Signup {
                name: "Alice".to_string(),
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
            })
            .await?;
        let employee = system
            .user_client
            .create_staff(
                &admin,
                StaffAccount {
                    name: "Victor".to_string(),
                    username: "victor".to_string(),
                    email: "victor@example.com".to_string(),
                    role: Role::Employee,
                    employee_role: Some(OrderType::Vector),
                },
            )
            .await?;
        Ok::<_, order_desk::error::AppError>((Actor::from(&customer), Actor::from(&employee)))
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    // Walk one order through its lifecycle
    let span = tracing::info_span!("order_lifecycle");
    let lifecycle = async {
        let orders = &system.order_client;
        let order = orders
            .create_order(
                &customer,
                NewOrder {
                    order_type: "vector".to_string(),
                    fields: OrderFields {
                        design_name: Some("Bakery logo".to_string()),
                        file_format: Some("SVG".to_string()),
                        ..OrderFields::default()
                    },
                    files: vec![demo_upload("sketch.png")],
                    notes: Some("Two colors please".to_string()),
                },
            )
            .await?;
        info!(order_number = %order.order_number, "Order placed");

        orders.assign_order(&admin, &order.id, &employee.id).await?;
        let sample = SampleUpload {
            kind: SampleKind::Initial,
            files: vec![demo_upload("proof.png")],
            comments: Some("First proof".to_string()),
        };
        orders.upload_samples(&admin, &order.id, sample).await?;
        orders.approve_design(&customer, &order.id).await?;

        let done = StatusUpdate { status: Some(OrderStatus::Completed), ..StatusUpdate::default() };
        orders.update_status(&employee, &order.id, done).await
    }
    .instrument(span)
    .await;

    match lifecycle {
        Ok(order) => info!(order_number = %order.order_number, status = %order.status, "Order lifecycle finished"),
        Err(e) => error!(error = %e, status = e.status_code(), "Order lifecycle failed"),
    }

    let unread = system.notification_client.unread_count(&customer).await.map_err(|e| e.to_string())?;
    info!(unread, "Customer inbox");

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
