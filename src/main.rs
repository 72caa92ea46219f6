// Club Attendance Server

use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use club_attendance::{
    create_router, data_seeder::seed_sample_data, error::set_expose_internal_errors, AppState,
    Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    set_expose_internal_errors(config.is_development());
    info!(
        environment = ?config.app.environment,
        database = %config.database.url,
        node_id = config.app.node_id,
        "Configuration loaded"
    );

    let state = AppState::new(config.clone()).await?;

    if config.app.seed_sample_data {
        if let Err(e) = seed_sample_data(&state).await {
            error!(error = %e, "Sample data seeding failed");
        }
    }

    let app = create_router(state);

    let address = config.server_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Club attendance server listening on http://{}", address);
    info!("  GET    /api/health");
    info!("  GET    /api/dashboard");
    info!("  CRUD   /api/organizations, /api/members, /api/events, /api/activity-logs");
    info!("  GET    /api/analytics/organizations/{{id}}?startDate=&endDate=");
    info!("  GET    /api/analytics/system");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
