//! showfile - open a file in Preview sized for the current display
//!
//! The configured displays are matched against the size of the screen in
//! use, and Preview's window is moved onto the matching target extent through
//! AppleScript. Without a usable display configuration the file is opened in
//! the default web browser instead.

pub mod cli;
pub mod config;
pub mod logging;
pub mod macos;
pub mod models;
pub mod services;

pub use models::*;
pub use services::*;

use std::time::Duration;

/// Result type alias for showfile operations
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to showfile operations
#[derive(thiserror::Error, Debug)]
pub enum ShowFileError {
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] config::ConfigParseError),

    #[error("Could not invoke <{command}>: {message} ({code})")]
    AutomationFailed {
        command: String,
        message: String,
        code: i32,
    },

    #[error("Could not start osascript: {0}")]
    AutomationSpawn(String),

    #[error("Automation timed out after {0:?}")]
    AutomationTimeout(Duration),

    #[error("No display entry for bounds: {0}")]
    NoDisplayForBounds(Size),

    #[error("Could not read screen bounds: {0}")]
    ScreenQuery(String),

    #[error("Display not configured: {0}")]
    DisplayNotFound(String),

    #[error("Browser error: {0}")]
    Browser(String),
}
