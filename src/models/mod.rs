//! Value types shared by the display registry and the resize orchestrator

pub mod display;
pub mod error_type;
pub mod geometry;

pub use display::*;
pub use error_type::*;
pub use geometry::*;
