//! Augur Core Library
//!
//! This crate provides the foundational utilities shared by the Augur crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Trace export registration
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use telemetry::{TelemetryConfig, TelemetryGuard};
