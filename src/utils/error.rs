use thiserror::Error;

/// Failures while turning a URL into an `ExtractionResult`. Never fatal to a cycle.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Page render timed out after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("No candidate matched for {field}")]
    NoCandidate { field: &'static str },

    #[error("Malformed structured data: {0}")]
    MalformedStructuredData(String),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("{owner_id} already tracks {url}")]
    Duplicate { owner_id: String, url: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification not configured: {0}")]
    Configuration(String),

    #[error("Notification delivery failed: {0}")]
    Transport(String),
}

impl NotificationError {
    pub fn error_type(&self) -> &'static str {
        match self {
            NotificationError::Configuration(_) => "configuration_error",
            NotificationError::Transport(_) => "transport_error",
        }
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Failed to start rendering session: {0}")]
    SessionStart(String),

    #[error("Rendering task aborted: {0}")]
    TaskAborted(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scheduling error: {0}")]
    Scheduling(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Extraction(_) => "extraction",
            AppError::Persistence(_) => "persistence",
            AppError::Notification(_) => "notification",
            AppError::Resource(_) => "resource",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Scheduling(_) => "scheduling",
            AppError::Validation(_) => "validation",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Persistence(PersistenceError::Database(err))
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for AppError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        AppError::Scheduling(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
