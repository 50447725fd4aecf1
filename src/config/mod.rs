//! Configuration loading for showfile

pub mod parser;

pub use parser::{
    default_config_path, ConfigParseError, ConfigParser, Settings, ShowFileConfig, TARGET_SUFFIX,
    WARNS_SECTION,
};
