use clap::Parser;
use tracing::{error, info, Instrument};

use storefront_orders::app_system::{run_demo, setup_tracing, StorefrontEnv, StorefrontSystem};

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = StorefrontEnv::parse().into_config().map_err(|e| e.to_string())?;
    setup_tracing(config.log_level.into());

    info!("Starting storefront order core");
    let mut system = StorefrontSystem::new(&config).map_err(|e| e.to_string())?;
    system.start_cleanup();

    let outcome = if config.demo {
        let span = tracing::info_span!("demo_order");
        match run_demo(&system).instrument(span).await {
            Ok(order) => {
                info!(order_number = %order.order_number, status = ?order.order_status, "Demo order completed");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Demo order failed");
                Err(e.to_string())
            }
        }
    } else {
        info!("Running until interrupted");
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))
    };

    system.shutdown().await?;
    outcome?;
    info!("Application completed successfully");
    Ok(())
}
