use crate::macos::{primary_monitor_size, AutomationExecutor};
use crate::models::{Extent, Size};
use crate::services::screen_manager::ScreenManager;
use crate::{Result, ShowFileError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Something that can put a file or URL in front of the user
pub trait Browser: Send + Sync {
    /// Size of the screen the browser shows things on
    fn screen_size(&self) -> impl Future<Output = Result<Size>> + Send;

    /// Show `path`, placed at `extent` when given and supported
    fn show_file(&self, path: &Path, extent: Option<Extent>) -> impl Future<Output = Result<()>> + Send;

    /// Show `url`, placed at `extent` when given and supported
    fn show_url(&self, url: &str, extent: Option<Extent>) -> impl Future<Output = Result<()>> + Send;
}

/// Which browser implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Preview when running on macOS with displays configured, else web
    #[default]
    Auto,
    /// Preview.app resized through AppleScript
    Preview,
    /// The default web browser
    Web,
}

impl BrowserKind {
    /// Settle `Auto` for the current platform and configuration
    pub fn resolve(self, has_displays: bool) -> BrowserKind {
        match self {
            BrowserKind::Auto if cfg!(target_os = "macos") && has_displays => BrowserKind::Preview,
            BrowserKind::Auto => BrowserKind::Web,
            kind => kind,
        }
    }
}

impl FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(BrowserKind::Auto),
            "preview" => Ok(BrowserKind::Preview),
            "web" => Ok(BrowserKind::Web),
            _ => Err(format!("Invalid browser: {}", s)),
        }
    }
}

/// `file://` URL for `path`, made absolute against the working directory
pub fn file_url(path: &Path) -> Result<String> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Could not resolve the working directory")?
            .join(path)
    };
    Ok(format!("file://{}", path.display()))
}

/// Opens files and URLs in the default web browser; extents are ignored
#[derive(Debug, Default, Clone)]
pub struct WebBrowser;

impl WebBrowser {
    pub fn new() -> Self {
        Self
    }

    fn open_url(&self, url: &str) -> Result<()> {
        info!("opening browser at: {}", url);
        open::that_detached(url)
            .map_err(|e| ShowFileError::Browser(format!("Could not open {}: {}", url, e)).into())
    }
}

impl Browser for WebBrowser {
    async fn screen_size(&self) -> Result<Size> {
        primary_monitor_size()
    }

    async fn show_file(&self, path: &Path, _extent: Option<Extent>) -> Result<()> {
        self.open_url(&file_url(path)?)
    }

    async fn show_url(&self, url: &str, _extent: Option<Extent>) -> Result<()> {
        self.open_url(url)
    }
}

/// Shows files in Preview, sized for the active display; URLs go to the web
/// browser
pub struct PreviewBrowser<E> {
    manager: ScreenManager<E>,
    web: WebBrowser,
}

impl<E: AutomationExecutor> PreviewBrowser<E> {
    pub fn new(manager: ScreenManager<E>) -> Self {
        Self {
            manager,
            web: WebBrowser::new(),
        }
    }

    pub fn manager(&self) -> &ScreenManager<E> {
        &self.manager
    }
}

impl<E: AutomationExecutor> Browser for PreviewBrowser<E> {
    async fn screen_size(&self) -> Result<Size> {
        self.manager.screen_size().await
    }

    async fn show_file(&self, path: &Path, extent: Option<Extent>) -> Result<()> {
        match extent {
            Some(extent) => self.manager.resize(path, &extent).await,
            None => self.manager.detect_and_resize(path).await,
        }
    }

    async fn show_url(&self, url: &str, extent: Option<Extent>) -> Result<()> {
        self.web.show_url(url, extent).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;
    use crate::macos::{ScriptOutput, ScriptedExecutor};
    use crate::services::{DisplayRegistry, ScreenManagerConfig};
    use std::sync::Arc;

    fn preview(responses: Vec<ScriptOutput>) -> PreviewBrowser<ScriptedExecutor> {
        let config = ConfigParser::new()
            .parse_str(
                "display_names = [\"laptop\"]\n\
                 [laptop]\nwidth = 1440\nheight = 900\n\
                 [laptop_target]\nwidth = 1440\nheight = 850\n",
            )
            .unwrap();
        let manager = ScreenManager::new(
            ScriptedExecutor::new_with(responses),
            Arc::new(DisplayRegistry::new(Arc::new(config))),
            ScreenManagerConfig::default(),
        );
        PreviewBrowser::new(manager)
    }

    #[test]
    fn auto_resolution() {
        assert_eq!(BrowserKind::Auto.resolve(false), BrowserKind::Web);
        assert_eq!(BrowserKind::Preview.resolve(false), BrowserKind::Preview);
        assert_eq!(BrowserKind::Web.resolve(true), BrowserKind::Web);
        let expected = if cfg!(target_os = "macos") {
            BrowserKind::Preview
        } else {
            BrowserKind::Web
        };
        assert_eq!(BrowserKind::Auto.resolve(true), expected);
    }

    #[test]
    fn parse_browser_kind() {
        assert_eq!("Preview".parse::<BrowserKind>().unwrap(), BrowserKind::Preview);
        assert!("safari".parse::<BrowserKind>().is_err());
    }

    #[test]
    fn file_urls_are_absolute() {
        assert_eq!(file_url(Path::new("/tmp/a.pdf")).unwrap(), "file:///tmp/a.pdf");
        let relative = file_url(Path::new("a.pdf")).unwrap();
        assert!(relative.starts_with("file:///"));
        assert!(relative.ends_with("/a.pdf"));
    }

    #[tokio::test]
    async fn preview_with_extent_skips_detection() {
        let browser = preview(vec![]);
        browser
            .show_file(Path::new("/tmp/a.pdf"), Some(Extent::new(10, 20, 300, 400)))
            .await
            .unwrap();

        let recorded = browser.manager().executor().recorded();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0]
            .script
            .ends_with("showPreview(\"/tmp/a.pdf\", 10, 20, 300, 400)"));
    }

    #[tokio::test]
    async fn preview_without_extent_detects_screen() {
        let browser = preview(vec![ScriptOutput::success("0, 0, 1440, 900")]);
        browser.show_file(Path::new("/tmp/a.pdf"), None).await.unwrap();

        let recorded = browser.manager().executor().recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[1]
            .script
            .ends_with("showPreview(\"/tmp/a.pdf\", 0, 0, 1440, 850)"));
    }

    #[tokio::test]
    async fn preview_screen_size_from_finder() {
        let browser = preview(vec![ScriptOutput::success("0, 0, 2560, 1440")]);
        assert_eq!(browser.screen_size().await.unwrap(), Size::new(2560, 1440));
    }
}
