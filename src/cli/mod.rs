//! Command-line interface for showfile
//!
//! Parses arguments with clap and drives the display registry and browsers.

use crate::config::ShowFileConfig;
use crate::macos::OsascriptExecutor;
use crate::models::{Display, Extent};
use crate::services::{
    Browser, BrowserKind, DisplayRegistry, PreviewBrowser, ScreenManager, ScreenManagerConfig,
    WebBrowser,
};
use crate::{Result, ShowFileError};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// showfile command-line interface
#[derive(Parser, Debug)]
#[command(name = "showfile")]
#[command(about = "Open a file in Preview sized for the current display")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ShowFileCli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable JSON output for machine-readable results
    #[arg(long, global = true)]
    pub json: bool,

    /// Browser to use, overriding the configuration
    #[arg(short, long, global = true, value_enum)]
    pub browser: Option<BrowserKind>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a file or URL
    Show(ShowArgs),

    /// List the configured displays
    Displays,

    /// Report the current screen size and the display it matches
    Screen,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// File path or URL
    pub target: String,

    /// Place the window on the target extent of this configured display
    #[arg(short, long, conflicts_with = "extent")]
    pub display: Option<String>,

    /// Place the window at an explicit extent (x,y,width,height)
    #[arg(short, long, allow_hyphen_values = true)]
    pub extent: Option<Extent>,
}

/// Whether `target` should be opened as a URL rather than a path
pub fn is_url(target: &str) -> bool {
    target.contains("://")
}

/// CLI command executor
pub struct ShowFileCliExecutor {
    config: Arc<ShowFileConfig>,
    registry: Arc<DisplayRegistry>,
    browser: BrowserKind,
    json_output: bool,
}

impl ShowFileCliExecutor {
    /// Create a new CLI executor; `browser` overrides the configured browser
    pub fn new(config: ShowFileConfig, browser: Option<BrowserKind>, json_output: bool) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(DisplayRegistry::new(config.clone()));
        let browser = browser
            .unwrap_or(config.settings.browser)
            .resolve(!registry.is_empty());

        Self {
            config,
            registry,
            browser,
            json_output,
        }
    }

    /// The browser used for `show`, with `Auto` already settled
    pub fn browser_kind(&self) -> BrowserKind {
        self.browser
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Show(args) => self.execute_show(args).await,
            Commands::Displays => self.execute_displays(),
            Commands::Screen => self.execute_screen().await,
        }
    }

    fn preview_browser(&self) -> PreviewBrowser<OsascriptExecutor> {
        let settings = &self.config.settings;
        let manager = ScreenManager::new(
            OsascriptExecutor::with_timeout(settings.automation_timeout()),
            self.registry.clone(),
            ScreenManagerConfig::from_settings(settings),
        );
        PreviewBrowser::new(manager)
    }

    async fn execute_show(&self, args: ShowArgs) -> Result<()> {
        let extent = resolve_extent(&self.registry, &args)?;
        debug!("Showing {} with {:?} (extent {:?})", args.target, self.browser, extent);

        match self.browser {
            BrowserKind::Preview => show(&self.preview_browser(), &args.target, extent).await,
            BrowserKind::Web | BrowserKind::Auto => {
                show(&WebBrowser::new(), &args.target, extent).await
            }
        }
    }

    fn execute_displays(&self) -> Result<()> {
        let displays = ordered_displays(&self.registry)?;

        if self.json_output {
            let mut dump = serde_json::Map::new();
            for display in &displays {
                dump.insert(display.name.clone(), serde_json::to_value(display)?);
            }
            println!("{}", serde_json::to_string_pretty(&dump)?);
        } else if displays.is_empty() {
            println!("No displays configured.");
        } else {
            print!("{}", format_displays(&displays));
        }

        Ok(())
    }

    async fn execute_screen(&self) -> Result<()> {
        info!("Detecting screen with {:?} browser", self.browser);

        let (size, display) = match self.browser {
            BrowserKind::Preview => {
                let browser = self.preview_browser();
                let size = browser.screen_size().await?;
                let display = self.registry.displays_by_size()?.get(&size).cloned();
                (size, display)
            }
            BrowserKind::Web | BrowserKind::Auto => (WebBrowser::new().screen_size().await?, None),
        };

        if self.json_output {
            let status = serde_json::json!({
                "screen": size,
                "display": display.as_ref().map(|d| d.name.clone()),
                "target": display.as_ref().map(|d| d.target),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            println!("Screen: {}", size);
            match display {
                Some(display) => println!("Display: {} -> {}", display, display.target),
                None => println!("Display: none"),
            }
        }

        Ok(())
    }
}

async fn show<B: Browser>(browser: &B, target: &str, extent: Option<Extent>) -> Result<()> {
    if is_url(target) {
        browser.show_url(target, extent).await
    } else {
        let path = Path::new(target);
        if !path.exists() {
            anyhow::bail!("No such file: {}", path.display());
        }
        browser.show_file(path, extent).await
    }
}

/// Extent requested on the command line, by display name or explicitly
fn resolve_extent(registry: &DisplayRegistry, args: &ShowArgs) -> Result<Option<Extent>> {
    match &args.display {
        Some(name) => registry
            .display(name)?
            .map(|display| Some(display.target))
            .ok_or_else(|| ShowFileError::DisplayNotFound(name.clone()).into()),
        None => Ok(args.extent),
    }
}

/// Displays in configured order
fn ordered_displays(registry: &DisplayRegistry) -> Result<Vec<Display>> {
    let displays = registry.displays()?;
    let mut seen = std::collections::HashSet::new();
    Ok(registry
        .display_names()
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .filter_map(|name| displays.get(name).cloned())
        .collect())
}

fn format_displays(displays: &[Display]) -> String {
    let mut out = String::from("Displays:\n");
    for display in displays {
        out.push_str(&format!(
            "  {} - {} -> {}\n",
            display.name,
            display.size(),
            display.target
        ));
    }
    out
}
