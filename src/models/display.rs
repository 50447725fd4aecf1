use super::geometry::{Extent, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured logical monitor: its physical size and where the viewer
/// window goes when that monitor is the active one
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Display {
    pub width: i32,
    pub height: i32,
    /// Configuration section name; left out of diagnostic dumps
    #[serde(skip_serializing, default)]
    pub name: String,
    pub target: Extent,
}

impl Display {
    pub fn new(name: impl Into<String>, size: Size, target: Extent) -> Self {
        Self {
            width: size.width,
            height: size.height,
            name: name.into(),
            target,
        }
    }

    /// Physical size used to match a detected screen
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.size(), self.name)
    }
}
