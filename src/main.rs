use order_service::{setup_tracing, Config, OrderSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), String> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| e.to_string())?;
    setup_tracing(config.log_format);

    info!(
        catalog = %config.product_service_url,
        postgres = config.database.is_some(),
        "Starting order service"
    );

    let system = OrderSystem::from_config(&config).await.map_err(|e| {
        error!(error = %e, "Failed to start order system");
        e.to_string()
    })?;

    info!("Order service ready, press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }

    system.shutdown().await?;

    info!("Order service stopped");
    Ok(())
}
