//! Meal Planner
//!
//! Main application entry point: loads configuration, prepares storage,
//! wires the services and follows authentication changes until shutdown.

use tracing::{error, info, warn};

use meal_planner::{
    config::Settings,
    database::DatabaseService,
    services::ServiceFactory,
    state::Session,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration, from the file named on the command line if any
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new()?,
    };
    settings.validate()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", meal_planner::info());

    // Storage, with migrations for PostgreSQL
    info!(backend = ?settings.database.backend, "Preparing storage...");
    let database = DatabaseService::from_settings(&settings).await?;

    info!("Initializing services...");
    let services = ServiceFactory::from_settings(&settings, database).await?;

    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!(issue = %issue, "Service health issue");
    }
    if !health.is_healthy() {
        error!("Storage is unavailable, shutting down");
        anyhow::bail!("storage health check failed");
    }

    let mut session = Session::new(&services);
    let mut auth_changes = services.identity.subscribe();
    session.refresh().await?;
    info!(state = %session.state(), "Meal planner is ready");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            followed = session.follow(&mut auth_changes) => match followed {
                Ok(true) => info!(state = %session.state(), "Session state changed"),
                Ok(false) => break,
                Err(e) => error!(error = %e, code = e.error_code(), "Failed to follow authentication change"),
            },
        }
    }

    info!("Meal planner stopped");
    Ok(())
}
