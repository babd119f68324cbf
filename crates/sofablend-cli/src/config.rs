//! `sofablend.toml` settings.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sofablend_io::bake::ExportOptions;
use sofablend_server::ServerOptions;

/// Settings file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG: &str = "sofablend.toml";

/// Everything configurable from the settings file.
///
/// ```toml
/// [server]
/// host = "localhost"
/// port = 12345
/// auto_start = true
///
/// [export]
/// fps = 24.0
/// timing = "simulation"
/// base_dir = "sofa_export"
///
/// [[export.selection]]
/// classname = "MechanicalObject"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerOptions,
    pub export: ExportOptions,
}

impl Settings {
    /// Load settings from `path`, or from [`DEFAULT_CONFIG`] when it exists.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG);
                if !default.exists() {
                    debug!("no {DEFAULT_CONFIG}, using default settings");
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let settings = Self::parse(&text)
            .with_context(|| format!("failed to parse TOML from '{}'", path.display()))?;
        info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
