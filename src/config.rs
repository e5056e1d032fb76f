//! Linker configuration
//!
//! One explicit value carries the directories and naming conventions into
//! discovery and the entity graph. It can be stored as JSON in the user's
//! config directory:
//! - Linux: ~/.config/raw-linker/config.json
//! - macOS: ~/Library/Application Support/raw-linker/config.json
//! - Windows: %APPDATA%\raw-linker\config.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LinkError, Result};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory (or single file) where RAW files and sidecars live
    pub sources_dir: PathBuf,
    /// Directory where rendered outputs are written
    pub outputs_dir: PathBuf,
    /// RAW extensions, dot-prefixed, matched case-insensitively (e.g. ".ARW")
    pub raw_extensions: Vec<String>,
    /// Extension of sidecar metadata files
    pub sidecar_extension: String,
    /// Extension of rendered outputs
    pub output_extension: String,
    /// Path segments never descended into (e.g. Synology's "#recycle")
    pub ignored_segments: Vec<String>,
    /// Name of the subtree files are moved into when staged for deletion
    pub staging_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources_dir: PathBuf::from("./"),
            outputs_dir: PathBuf::from("./"),
            raw_extensions: vec![".ARW".to_string()],
            sidecar_extension: ".xmp".to_string(),
            output_extension: ".jpg".to_string(),
            ignored_segments: vec!["#recycle".to_string()],
            staging_dir: "delete".to_string(),
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// read if present, otherwise the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(LinkError::NotFound {
                        kind: "config file",
                        path: p.to_path_buf(),
                    });
                }
                p.to_path_buf()
            }
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = std::fs::read_to_string(&path).map_err(|e| LinkError::io(&path, e))?;
        let config = Self::from_json(&contents)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Per-user config file location, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("raw-linker");
        path.push(CONFIG_FILE_NAME);
        Some(path)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate and canonicalize extensions so they are all dot-prefixed.
    pub fn normalized(mut self) -> Result<Self> {
        if self.raw_extensions.is_empty() {
            return Err(LinkError::Config {
                message: "at least one raw extension is required".to_string(),
            });
        }
        self.raw_extensions = self
            .raw_extensions
            .iter()
            .map(|ext| dotted(ext))
            .collect::<Result<Vec<_>>>()?;
        self.sidecar_extension = dotted(&self.sidecar_extension)?;
        self.output_extension = dotted(&self.output_extension)?;
        if self.staging_dir.trim().is_empty() {
            return Err(LinkError::Config {
                message: "staging directory name cannot be empty".to_string(),
            });
        }
        Ok(self)
    }

    /// Segments excluded from every directory walk. The staging subtree is
    /// always included so staged files are not rediscovered.
    pub fn excluded_segments(&self) -> Vec<String> {
        let mut segments = self.ignored_segments.clone();
        if !segments.contains(&self.staging_dir) {
            segments.push(self.staging_dir.clone());
        }
        segments
    }
}

fn dotted(ext: &str) -> Result<String> {
    let trimmed = ext.trim();
    let bare = trimmed.trim_start_matches('.');
    if bare.is_empty() || bare.contains('.') {
        return Err(LinkError::Config {
            message: format!("invalid extension '{}'", ext),
        });
    }
    Ok(format!(".{}", bare))
}
