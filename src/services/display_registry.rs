use crate::config::{ConfigParseError, ShowFileConfig, TARGET_SUFFIX};
use crate::models::{Display, Extent, Size};
use crate::{Result, ShowFileError};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Resolves configured display names into [`Display`] records
///
/// Both maps are built on first access and kept for the life of the
/// registry. A failed build is not cached, so the error is reported again on
/// the next call.
#[derive(Debug)]
pub struct DisplayRegistry {
    config: Arc<ShowFileConfig>,
    names: Vec<String>,
    displays: OnceLock<HashMap<String, Display>>,
    displays_by_size: OnceLock<HashMap<Size, Display>>,
}

impl DisplayRegistry {
    pub fn new(config: Arc<ShowFileConfig>) -> Self {
        let names = config.settings.display_names.clone();
        Self::with_names(config, names)
    }

    /// Registry over an explicit list of display section names
    pub fn with_names(config: Arc<ShowFileConfig>, names: Vec<String>) -> Self {
        Self {
            config,
            names,
            displays: OnceLock::new(),
            displays_by_size: OnceLock::new(),
        }
    }

    pub fn display_names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The configured displays keyed by name
    pub fn displays(&self) -> Result<&HashMap<String, Display>> {
        if let Some(displays) = self.displays.get() {
            return Ok(displays);
        }

        let displays = self
            .names
            .iter()
            .map(|name| self.load_display(name).map(|display| (name.clone(), display)))
            .collect::<std::result::Result<HashMap<_, _>, ConfigParseError>>()
            .map_err(ShowFileError::from)?;

        debug!("Loaded {} displays", displays.len());
        Ok(self.displays.get_or_init(|| displays))
    }

    /// The configured displays keyed by their physical size
    ///
    /// Displays are inserted in configured order, so when two share a size
    /// the later one is the one found.
    pub fn displays_by_size(&self) -> Result<&HashMap<Size, Display>> {
        if let Some(by_size) = self.displays_by_size.get() {
            return Ok(by_size);
        }

        let displays = self.displays()?;
        let mut by_size = HashMap::with_capacity(displays.len());

        for current in self.names.iter().filter_map(|name| displays.get(name)) {
            if let Some(previous) = by_size.insert(current.size(), current.clone()) {
                if previous.name != current.name {
                    warn!(
                        "Displays '{}' and '{}' share size {}; only '{}' can be detected",
                        previous.name,
                        current.name,
                        current.size(),
                        current.name
                    );
                }
            }
        }

        Ok(self.displays_by_size.get_or_init(|| by_size))
    }

    /// Look up a single display by its configured name
    pub fn display(&self, name: &str) -> Result<Option<&Display>> {
        Ok(self.displays()?.get(name))
    }

    fn load_display(&self, name: &str) -> std::result::Result<Display, ConfigParseError> {
        let size: Size = self.config.section(name)?;
        let target: Extent = self.config.section(&format!("{}{}", name, TARGET_SUFFIX))?;
        Ok(Display::new(name, size, target))
    }
}
