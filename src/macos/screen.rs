use crate::models::Size;
use crate::{Result, ShowFileError};

/// Size of the main display in points, as reported by Core Graphics
#[cfg(target_os = "macos")]
pub fn primary_monitor_size() -> Result<Size> {
    use core_graphics::display::CGDisplay;

    let bounds = CGDisplay::main().bounds();
    let size = Size::new(bounds.size.width as i32, bounds.size.height as i32);
    if size.width <= 0 || size.height <= 0 {
        return Err(ShowFileError::Browser(format!(
            "Core Graphics reported an empty main display: {}",
            size
        ))
        .into());
    }

    Ok(size)
}

#[cfg(not(target_os = "macos"))]
pub fn primary_monitor_size() -> Result<Size> {
    Err(ShowFileError::Browser(format!(
        "Primary monitor size is not available on {}",
        std::env::consts::OS
    ))
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn unsupported_platform_reports_error() {
        let err = primary_monitor_size().unwrap_err();
        assert!(err.to_string().contains(std::env::consts::OS));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn main_display_has_area() {
        if let Ok(size) = primary_monitor_size() {
            assert!(size.width > 0 && size.height > 0);
        }
    }
}
