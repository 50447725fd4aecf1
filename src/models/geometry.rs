use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width and height of a screen, either measured or configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} X {}", self.width, self.height)
    }
}

/// Position and dimensions of a window on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl Extent {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    /// The dimensions without the offset
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl From<Size> for Extent {
    fn from(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ ({}, {})", self.size(), self.x, self.y)
    }
}

/// Parses `x,y,width,height`
impl FromStr for Extent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .split(',')
            .map(|field| field.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Invalid extent '{}': {}", s, e))?;

        match fields.as_slice() {
            [x, y, width, height] => Ok(Extent::new(*x, *y, *width, *height)),
            _ => Err(format!(
                "Invalid extent '{}': expected x,y,width,height",
                s
            )),
        }
    }
}
