use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::utils::error::{AppError, Result};

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. When a log
/// directory is configured, output is also written to a daily rolling file;
/// the returned guard must be held until shutdown so buffered lines are flushed.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| AppError::Validation(format!("Invalid log filter '{}': {}", config.filter, e)))?;

    match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::daily(directory, "dealwatch.log");
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stdout.and(file_writer))
                .try_init()
                .map_err(|e| AppError::Internal(format!("Failed to install subscriber: {}", e)))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| AppError::Internal(format!("Failed to install subscriber: {}", e)))?;
            Ok(None)
        }
    }
}

/// Metric names emitted through the `metrics` facade.
pub mod metric {
    pub const CYCLES: &str = "dealwatch_cycles_total";
    pub const CYCLE_ERRORS: &str = "dealwatch_cycle_errors_total";
    pub const OBSERVATIONS: &str = "dealwatch_observations_total";
    pub const NOTIFICATIONS_SENT: &str = "dealwatch_notifications_sent_total";
    pub const NOTIFICATIONS_FAILED: &str = "dealwatch_notifications_failed_total";
    pub const CONTINUATIONS: &str = "dealwatch_continuations_enqueued_total";
    pub const MISSING_TARGETS: &str = "dealwatch_missing_target_cycles_total";
    pub const RENDER_SECONDS: &str = "dealwatch_render_duration_seconds";
}
