use crate::config::Settings;
use crate::macos::{applescript_escape, shorten, AutomationExecutor};
use crate::models::{Display, ErrorType, Extent, Size, WarnList};
use crate::services::display_registry::DisplayRegistry;
use crate::{Result, ShowFileError};
use anyhow::Context;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, instrument, warn};

/// AppleScript defining `showPreview(filePath, x, y, width, height)`
pub const SHOW_PREVIEW_SCRIPT: &str = include_str!("../../resources/show-preview.applescript");

/// Query answered by Finder with the desktop bounds `left, top, right, bottom`
pub const SCREEN_BOUNDS_QUERY: &str = "bounds of window of desktop";

/// Application asked for the desktop bounds
pub const SCREEN_BOUNDS_APP: &str = "Finder";

/// Longest command text quoted in a failure message
const COMMAND_DISPLAY_WIDTH: usize = 40;

/// Where the Preview script comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScriptSource {
    /// The script compiled into the binary
    #[default]
    Bundled,
    /// A script file read once on first use
    File(PathBuf),
}

/// Settings of the resize orchestrator
#[derive(Debug, Clone, Default)]
pub struct ScreenManagerConfig {
    pub script: ScriptSource,
    pub applescript_warns: WarnList,
    pub switch_back_app: Option<String>,
}

impl ScreenManagerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            script: settings
                .show_preview_script_path
                .clone()
                .map(ScriptSource::File)
                .unwrap_or_default(),
            applescript_warns: settings.applescript_warns.clone(),
            switch_back_app: settings.switch_back_app.clone(),
        }
    }
}

/// Counters for automation calls and how their failures were handled
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutomationMetrics {
    pub invocations: u64,
    pub ignored: u64,
    pub warnings: u64,
    pub failures: u64,
}

/// Opens files in Preview and fits the window to the active display
pub struct ScreenManager<E> {
    executor: E,
    registry: Arc<DisplayRegistry>,
    script_source: ScriptSource,
    script: OnceCell<String>,
    applescript_warns: WarnList,
    switch_back_app: Option<String>,
    metrics: RwLock<AutomationMetrics>,
}

impl<E: AutomationExecutor> ScreenManager<E> {
    pub fn new(executor: E, registry: Arc<DisplayRegistry>, config: ScreenManagerConfig) -> Self {
        Self {
            executor,
            registry,
            script_source: config.script,
            script: OnceCell::new(),
            applescript_warns: config.applescript_warns,
            switch_back_app: config.switch_back_app,
            metrics: RwLock::new(AutomationMetrics::default()),
        }
    }

    pub fn registry(&self) -> &DisplayRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub async fn metrics(&self) -> AutomationMetrics {
        self.metrics.read().await.clone()
    }

    /// How a failure with error text `err` is handled
    pub fn error_type(&self, err: &str) -> ErrorType {
        self.applescript_warns.classify(err)
    }

    /// The Preview script, read on first use
    pub async fn show_preview_script(&self) -> Result<&str> {
        let script = self
            .script
            .get_or_try_init(|| async {
                match &self.script_source {
                    ScriptSource::Bundled => Ok(SHOW_PREVIEW_SCRIPT.to_string()),
                    ScriptSource::File(path) => {
                        debug!("Reading Preview script from {}", path.display());
                        tokio::fs::read_to_string(path).await.with_context(|| {
                            format!("Could not read Preview script {}", path.display())
                        })
                    }
                }
            })
            .await?;

        Ok(script.as_str())
    }

    /// Size of the screen the desktop window is on
    pub async fn screen_size(&self) -> Result<Size> {
        let bounds = self
            .exec(SCREEN_BOUNDS_QUERY, Some(SCREEN_BOUNDS_APP))
            .await?;
        parse_bounds(&bounds)
    }

    /// The configured display matching the current screen size
    pub async fn detect_display(&self) -> Result<Display> {
        let screen = self.screen_size().await?;
        let found = self.registry.displays_by_size()?.get(&screen).cloned();
        debug!(
            "screen size: {} -> {}",
            screen,
            found
                .as_ref()
                .map_or_else(|| "none".to_string(), ToString::to_string)
        );

        found.ok_or_else(|| ShowFileError::NoDisplayForBounds(screen).into())
    }

    /// Open `file` in Preview and move its window onto `extent`
    #[instrument(skip(self, file), fields(file = %file.display()))]
    pub async fn resize(&self, file: &Path, extent: &Extent) -> Result<()> {
        let name = file
            .file_name()
            .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());
        info!("resizing {} to {}", name, extent);

        let path = absolute_path(file)?;
        let call = format!(
            "showPreview(\"{}\", {}, {}, {}, {})",
            applescript_escape(&path.to_string_lossy()),
            extent.x,
            extent.y,
            extent.width,
            extent.height
        );
        let command = format!("{}\n{}", self.show_preview_script().await?, call);

        self.exec(&command, None).await?;
        self.switch_back().await
    }

    /// Like [`resize`](Self::resize), using the target extent of the display
    /// that matches the current screen
    pub async fn detect_and_resize(&self, file: &Path) -> Result<()> {
        let detected = self.detect_display().await?;
        debug!("detected display {}", detected);
        self.resize(file, &detected.target).await
    }

    async fn switch_back(&self) -> Result<()> {
        if let Some(app) = &self.switch_back_app {
            debug!("switching back to {}", app);
            let command = format!("tell application \"{}\" to activate", applescript_escape(app));
            self.exec(&command, None).await?;
        }
        Ok(())
    }

    /// Run `command`, classifying a non-zero result against the warn-list
    async fn exec(&self, command: &str, app: Option<&str>) -> Result<String> {
        let output = match app {
            Some(app) => self.executor.tell(app, command).await?,
            None => self.executor.run(command).await?,
        };
        self.metrics.write().await.invocations += 1;

        if output.is_success() {
            return Ok(output.out);
        }

        let failure = ShowFileError::AutomationFailed {
            command: shorten(command, COMMAND_DISPLAY_WIDTH),
            message: output.err.clone(),
            code: output.code,
        };

        match self.error_type(&output.err) {
            ErrorType::Ignore => {
                self.metrics.write().await.ignored += 1;
            }
            ErrorType::Warning => {
                self.metrics.write().await.warnings += 1;
                warn!("{}", failure);
            }
            ErrorType::Error => {
                self.metrics.write().await.failures += 1;
                return Err(failure.into());
            }
        }

        Ok(output.out)
    }
}

fn absolute_path(file: &Path) -> Result<PathBuf> {
    if file.is_absolute() {
        return Ok(file.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Could not resolve the working directory")?;
    Ok(cwd.join(file))
}

/// Width and height from the last two fields of a comma separated bounds list
fn parse_bounds(bounds: &str) -> Result<Size> {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let separator = SEPARATOR.get_or_init(|| Regex::new(r"\s*,\s*").expect("valid separator pattern"));

    let fields = separator
        .split(bounds.trim())
        .map(str::parse::<i32>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ShowFileError::ScreenQuery(format!("'{}': {}", bounds, e)))?;

    match fields.as_slice() {
        [.., width, height] => Ok(Size::new(*width, *height)),
        _ => Err(ShowFileError::ScreenQuery(format!("'{}': expected at least two fields", bounds)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;
    use crate::macos::{ScriptOutput, ScriptedExecutor};

    const LAPTOP_CONFIG: &str = r#"
display_names = ["laptop"]

[laptop]
width = 1440
height = 900

[laptop_target]
width = 1440
height = 850
"#;

    fn manager(
        responses: Vec<ScriptOutput>,
        config: ScreenManagerConfig,
    ) -> ScreenManager<ScriptedExecutor> {
        let parsed = ConfigParser::new().parse_str(LAPTOP_CONFIG).unwrap();
        let registry = Arc::new(DisplayRegistry::new(Arc::new(parsed)));
        ScreenManager::new(ScriptedExecutor::new_with(responses), registry, config)
    }

    fn automation_failure(err: &anyhow::Error) -> Option<(&str, &str, i32)> {
        match err.downcast_ref::<ShowFileError>() {
            Some(ShowFileError::AutomationFailed {
                command,
                message,
                code,
            }) => Some((command.as_str(), message.as_str(), *code)),
            _ => None,
        }
    }

    #[test]
    fn parse_finder_bounds() {
        assert_eq!(parse_bounds("0, 0, 1440, 900").unwrap(), Size::new(1440, 900));
        assert_eq!(parse_bounds("-1920,0 ,0, 1080\n").unwrap(), Size::new(0, 1080));
        assert!(parse_bounds("").is_err());
        assert!(parse_bounds("1440").is_err());
        assert!(parse_bounds("0, 0, wide, 900").is_err());
    }

    #[tokio::test]
    async fn resize_builds_show_preview_call() {
        let manager = manager(vec![], ScreenManagerConfig::default());
        manager
            .resize(Path::new("/tmp/a.pdf"), &Extent::new(0, 0, 1440, 850))
            .await
            .unwrap();

        let recorded = manager.executor().recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].app, None);
        assert!(recorded[0].script.starts_with(SHOW_PREVIEW_SCRIPT));
        assert!(recorded[0]
            .script
            .ends_with("\nshowPreview(\"/tmp/a.pdf\", 0, 0, 1440, 850)"));
    }

    #[tokio::test]
    async fn resize_then_switch_back() {
        let config = ScreenManagerConfig {
            switch_back_app: Some("Emacs".to_string()),
            ..ScreenManagerConfig::default()
        };
        let manager = manager(vec![], config);
        manager
            .resize(Path::new("/tmp/a.pdf"), &Extent::new(0, 0, 800, 600))
            .await
            .unwrap();

        let recorded = manager.executor().recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[1].script, "tell application \"Emacs\" to activate");
        assert_eq!(manager.metrics().await.invocations, 2);
    }

    #[tokio::test]
    async fn relative_paths_become_absolute() {
        let manager = manager(vec![], ScreenManagerConfig::default());
        manager
            .resize(Path::new("docs/paper.pdf"), &Extent::new(0, 0, 800, 600))
            .await
            .unwrap();

        let expected = std::env::current_dir().unwrap().join("docs/paper.pdf");
        let script = &manager.executor().recorded()[0].script;
        assert!(script.contains(&format!("showPreview(\"{}\"", expected.display())));
    }

    #[tokio::test]
    async fn ignored_failure_continues_silently() {
        let config = ScreenManagerConfig {
            applescript_warns: WarnList::new().with("already open", ErrorType::Ignore),
            switch_back_app: Some("Emacs".to_string()),
            ..ScreenManagerConfig::default()
        };
        let manager = manager(
            vec![ScriptOutput::failure(1, "The document is already open. (-1)")],
            config,
        );

        manager
            .resize(Path::new("/tmp/a.pdf"), &Extent::new(0, 0, 800, 600))
            .await
            .unwrap();

        let metrics = manager.metrics().await;
        assert_eq!(metrics.ignored, 1);
        assert_eq!(metrics.warnings, 0);
        assert_eq!(metrics.failures, 0);
        // switch back still happens
        assert_eq!(manager.executor().recorded().len(), 2);
    }

    #[tokio::test]
    async fn warning_failure_continues() {
        let config = ScreenManagerConfig {
            applescript_warns: WarnList::new().with("User canceled", ErrorType::Warning),
            ..ScreenManagerConfig::default()
        };
        let manager = manager(vec![ScriptOutput::failure(1, "User canceled. (-128)")], config);

        manager
            .resize(Path::new("/tmp/a.pdf"), &Extent::new(0, 0, 800, 600))
            .await
            .unwrap();
        assert_eq!(manager.metrics().await.warnings, 1);
    }

    #[tokio::test]
    async fn unknown_failure_is_fatal() {
        let manager = manager(
            vec![ScriptOutput::failure(1, "execution error: Preview got an error (-1728)")],
            ScreenManagerConfig {
                switch_back_app: Some("Emacs".to_string()),
                ..ScreenManagerConfig::default()
            },
        );

        let err = manager
            .resize(Path::new("/tmp/a.pdf"), &Extent::new(0, 0, 800, 600))
            .await
            .unwrap_err();

        let (command, message, code) = automation_failure(&err).unwrap();
        assert!(command.chars().count() <= COMMAND_DISPLAY_WIDTH);
        assert!(command.ends_with("[...]"));
        assert_eq!(message, "execution error: Preview got an error (-1728)");
        assert_eq!(code, 1);
        assert!(err.to_string().contains("(1)"));

        // no switch back after a fatal failure
        assert_eq!(manager.executor().recorded().len(), 1);
        assert_eq!(manager.metrics().await.failures, 1);
    }

    #[tokio::test]
    async fn switch_back_failure_is_classified() {
        let config = ScreenManagerConfig {
            applescript_warns: WarnList::new().with("isn't running", ErrorType::Warning),
            switch_back_app: Some("Emacs".to_string()),
            ..ScreenManagerConfig::default()
        };
        let manager = manager(
            vec![
                ScriptOutput::success(""),
                ScriptOutput::failure(1, "Emacs isn't running"),
            ],
            config,
        );

        manager
            .resize(Path::new("/tmp/a.pdf"), &Extent::new(0, 0, 800, 600))
            .await
            .unwrap();
        assert_eq!(manager.metrics().await.warnings, 1);
    }

    #[tokio::test]
    async fn detect_and_resize_uses_matching_target() {
        let manager = manager(
            vec![ScriptOutput::success("0, 0, 1440, 900")],
            ScreenManagerConfig::default(),
        );

        manager.detect_and_resize(Path::new("/tmp/a.pdf")).await.unwrap();

        let recorded = manager.executor().recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].app.as_deref(), Some(SCREEN_BOUNDS_APP));
        assert_eq!(recorded[0].script, SCREEN_BOUNDS_QUERY);
        assert!(recorded[1]
            .script
            .ends_with("showPreview(\"/tmp/a.pdf\", 0, 0, 1440, 850)"));
    }

    #[tokio::test]
    async fn unmatched_screen_ignores_warn_list() {
        let config = ScreenManagerConfig {
            applescript_warns: WarnList::new()
                .with("", ErrorType::Ignore)
                .with("No display", ErrorType::Ignore),
            ..ScreenManagerConfig::default()
        };
        let manager = manager(vec![ScriptOutput::success("0, 0, 1920, 1080")], config);

        let err = manager
            .detect_and_resize(Path::new("/tmp/a.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ShowFileError>(),
            Some(ShowFileError::NoDisplayForBounds(size)) if *size == Size::new(1920, 1080)
        ));
        assert_eq!(err.to_string(), "No display entry for bounds: 1920 X 1080");
        assert_eq!(manager.executor().recorded().len(), 1);
    }

    #[tokio::test]
    async fn failed_screen_query_is_fatal() {
        let manager = manager(
            vec![ScriptOutput::failure(1, "Finder got an error")],
            ScreenManagerConfig::default(),
        );
        let err = manager.screen_size().await.unwrap_err();
        assert!(automation_failure(&err).is_some());
    }

    #[tokio::test]
    async fn ignored_screen_query_fails_to_parse() {
        let config = ScreenManagerConfig {
            applescript_warns: WarnList::new().with("Finder", ErrorType::Ignore),
            ..ScreenManagerConfig::default()
        };
        let manager = manager(vec![ScriptOutput::failure(1, "Finder got an error")], config);

        let err = manager.screen_size().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShowFileError>(),
            Some(ShowFileError::ScreenQuery(_))
        ));
    }

    #[tokio::test]
    async fn script_file_is_read_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.applescript");
        std::fs::write(&path, "on showPreview(f, x, y, w, h)\nend showPreview").unwrap();

        let config = ScreenManagerConfig {
            script: ScriptSource::File(path.clone()),
            ..ScreenManagerConfig::default()
        };
        let manager = manager(vec![], config);

        let first = manager.show_preview_script().await.unwrap().to_string();
        std::fs::remove_file(&path).unwrap();
        let second = manager.show_preview_script().await.unwrap();
        assert_eq!(first, second);
        assert!(second.starts_with("on showPreview"));
    }

    #[tokio::test]
    async fn missing_script_file_fails_resize() {
        let config = ScreenManagerConfig {
            script: ScriptSource::File(PathBuf::from("/nonexistent/preview.applescript")),
            ..ScreenManagerConfig::default()
        };
        let manager = manager(vec![], config);

        let result = manager
            .resize(Path::new("/tmp/a.pdf"), &Extent::new(0, 0, 800, 600))
            .await;
        assert!(result.is_err());
        assert!(manager.executor().recorded().is_empty());
    }
}
