//! Configuration file.
//!
//! ```toml
//! sub_num = 5
//! store_path = "/media/subs"
//! plex = true
//! library = "/media/subtitle-archives"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::Error;

/// Default number of search results kept per video.
pub const DEFAULT_SUB_NUM: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of search results kept per video.
    pub sub_num: usize,
    /// Directory for extracted subtitles, instead of next to each video.
    pub store_path: Option<PathBuf>,
    /// Name subtitles `video.zh.srt` so Plex picks them up.
    pub plex: bool,
    /// Also extract the `.srt`/`.ass` sibling of the chosen subtitle.
    pub both: bool,
    /// Replace subtitles that already exist.
    pub over: bool,
    /// Keep the downloaded archive next to the subtitle.
    pub more: bool,
    /// Only search this site.
    pub downloader: Option<String>,
    /// Local directory of subtitle archives served by the `library` site.
    pub library: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sub_num: DEFAULT_SUB_NUM,
            store_path: None,
            plex: false,
            both: false,
            over: false,
            more: false,
            downloader: None,
            library: None,
        }
    }
}

impl Config {
    /// Segment inserted between the video name and the subtitle extension.
    pub fn identifier(&self) -> &'static str {
        if self.plex {
            ".zh"
        } else {
            ""
        }
    }

    /// Checked after loading and again after command line overrides.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sub_num == 0 {
            return Err(Error::Config("sub_num must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, Error> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a TOML string.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, Error> {
    let config: Config = toml::from_str(toml_str).map_err(|e| Error::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// `$XDG_CONFIG_HOME/getsub/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "getsub").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load the default config file if there is one, else built-in defaults.
pub fn load_default_config() -> Result<Config, Error> {
    match default_config_path() {
        Some(path) if path.exists() => load_config(&path),
        _ => Ok(Config::default()),
    }
}
