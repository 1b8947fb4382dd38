//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the meal planner.

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::utils::errors::{MealPlannerError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .try_init()
        .map_err(|e| MealPlannerError::Config(format!("Failed to install logger: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log group lifecycle events
pub fn log_group_event(group_id: Uuid, event: &str, uid: Option<&str>, details: Option<&str>) {
    info!(
        group_id = %group_id,
        event = event,
        uid = uid,
        details = details,
        "Group event occurred"
    );
}

/// Log a meal status declaration
pub fn log_status_declared(uid: &str, date: NaiveDate, breakfast: bool, lunch: bool, dinner: bool) {
    info!(
        uid = uid,
        date = %date,
        breakfast = breakfast,
        lunch = lunch,
        dinner = dinner,
        "Meal status declared"
    );
}

/// Log roster aggregation results
pub fn log_aggregation(group_id: Uuid, date: NaiveDate, members: usize, duration_ms: u64, success: bool) {
    if success {
        debug!(
            group_id = %group_id,
            date = %date,
            members = members,
            duration_ms = duration_ms,
            "Roster aggregated"
        );
    } else {
        error!(
            group_id = %group_id,
            date = %date,
            members = members,
            duration_ms = duration_ms,
            "Roster aggregation failed"
        );
    }
}

/// Log a result that arrived for a superseded selection
pub fn log_stale_result(view: &str, requested: &str, sequence: u64) {
    warn!(
        view = view,
        requested = requested,
        sequence = sequence,
        "Discarding result for superseded selection"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
