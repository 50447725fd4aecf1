//! Core services for showfile

pub mod browser;
pub mod display_registry;
pub mod screen_manager;

pub use browser::*;
pub use display_registry::*;
pub use screen_manager::*;
