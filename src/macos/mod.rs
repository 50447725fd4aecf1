//! macOS integration layer for showfile
//!
//! AppleScript automation through `osascript` and the Core Graphics display
//! query used by the browser fallback. The executor is a trait so the resize
//! logic can run against an in-memory stand-in.

pub mod automation;
pub mod screen;

pub use self::automation::*;
pub use self::screen::*;
