pub mod cli;
pub mod config;
pub mod extraction;
pub mod models;
pub mod monitor;
pub mod plugins;
pub mod pricing;
pub mod scheduler;
pub mod scraper;
pub mod storage;
pub mod threshold;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use monitor::{CheckSummary, CycleReport, Monitor};
pub use utils::error::{AppError, Result};
