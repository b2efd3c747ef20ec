//! Utilities module for error handling and logging
//!
//! This module provides:
//! - Structured logging with tracing
//! - Error handling types shared across the pipeline

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{LeafsightError, Result};
pub use logging::{init_logging, LogConfig, LogLevel};
