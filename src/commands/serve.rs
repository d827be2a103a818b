use anyhow::{Context, Result};

use termin::api::BookingServer;
use termin::config::Config;

/// Start the booking API server
pub async fn serve(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind
            .parse()
            .with_context(|| format!("Invalid bind address: {bind}"))?;
    }

    if config.server.enable_metrics {
        if let Err(e) = termin::metrics::init_metrics() {
            tracing::warn!("Metrics initialization failed: {}", e);
        }
    }

    let server = BookingServer::new(config).context("Failed to create booking server")?;
    let info = server.info();

    println!("{}", info.display());
    println!();
    println!("API Endpoints:");
    println!("  GET    /api/health                             - Health check");
    if info.metrics_enabled {
        println!("  GET    /metrics                                - Prometheus metrics endpoint");
    }
    println!("  GET    /api/profiles/{{id}}                      - Get profile");
    println!("  PUT    /api/profiles/{{id}}                      - Upsert profile");
    println!("  GET    /api/profiles/{{id}}/availability         - Slots (serviceId, date, staffId)");
    println!("  GET    /api/profiles/{{id}}/unavailable-days     - Blocked and taken days");
    println!("  GET    /api/profiles/{{id}}/staff                - List staff");
    println!("  PUT    /api/profiles/{{id}}/staff/{{staffId}}      - Upsert staff member");
    println!("  DELETE /api/profiles/{{id}}/staff/{{staffId}}      - Remove staff member");
    println!("  POST   /api/reservations                       - Book a slot or send an inquiry");
    println!("  POST   /api/day-reservations                   - Request a whole day");
    println!("  GET    /api/reservations/{{id}}                  - Get reservation");
    println!("  PATCH  /api/reservations/{{id}}/status           - Accept, reject or cancel");
    println!();
    println!("Booking server listening on http://{}", info.bind_address);
    println!("Press Ctrl+C to stop.\n");

    // Start with graceful shutdown
    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Booking server stopped.");
    Ok(())
}
