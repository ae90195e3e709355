//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration lives in a small TOML file. Every field is
//! optional: a missing file, or a file that only sets a few keys, falls back
//! to built-in defaults.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `POMBOLA_ROOT_FOLDER`
//! 3. TOML config file `root_folder`
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "POMBOLA_ROOT_FOLDER";

/// Environment variable overriding the database path
pub const DATABASE_ENV: &str = "POMBOLA_DATABASE";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "pombola.db";

/// Election data directory (correction tables, API cache) inside the root folder
pub const DEFAULT_DATA_DIRECTORY: &str = "kenya/2013-election-data";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Root folder holding the database and election data
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path (default: `<root>/pombola.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Explicit election data directory (default: `<root>/kenya/2013-election-data`)
    #[serde(default)]
    pub data_directory: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub iebc: IebcConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// IEBC API and aspirant import settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IebcConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub api_id: Option<String>,

    #[serde(default)]
    pub api_secret: Option<String>,

    /// Cache directory name, relative to the data directory
    #[serde(default = "default_cache_directory")]
    pub cache_directory: String,

    /// Minimum interval between API requests
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Jaro-Winkler similarity needed before an existing person is proposed
    /// as the same person as a candidate
    #[serde(default = "default_person_match_threshold")]
    pub person_match_threshold: f64,

    /// Create parties the database does not know yet instead of failing the race
    #[serde(default = "default_true")]
    pub create_missing_parties: bool,

    /// Contest type mapping; empty means the built-in Kenya 2013 table
    #[serde(default)]
    pub races: Vec<RaceConfig>,

    #[serde(default = "default_ignored_contest_types")]
    pub ignored_contest_types: Vec<String>,
}

impl Default for IebcConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_id: None,
            api_secret: None,
            cache_directory: default_cache_directory(),
            rate_limit_ms: default_rate_limit_ms(),
            person_match_threshold: default_person_match_threshold(),
            create_missing_parties: true,
            races: Vec::new(),
            ignored_contest_types: default_ignored_contest_types(),
        }
    }
}

/// How one IEBC contest type maps onto places and position titles
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RaceConfig {
    pub contest_type: String,
    pub place_kind: String,
    pub session: String,
    pub title: String,
    pub race_type: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_base_url() -> String {
    "http://api.iebc.or.ke".to_string()
}

fn default_cache_directory() -> String {
    "api-cache-2013-02-14".to_string()
}

fn default_rate_limit_ms() -> u64 {
    250
}

fn default_person_match_threshold() -> f64 {
    0.92
}

fn default_true() -> bool {
    true
}

fn default_ignored_contest_types() -> Vec<String> {
    vec!["president".to_string()]
}

impl TomlConfig {
    /// Load configuration
    ///
    /// An explicitly requested file must exist. Otherwise the platform config
    /// locations are searched and a missing file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match find_config_file() {
                Some(path) => path,
                None => {
                    warn!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        let config = Self::from_file(&path)?;
        info!("Loaded config: {}", path.display());
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Candidate config file locations, most specific first
fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("pombola").join("pombola.toml"));
    }
    if cfg!(unix) {
        candidates.push(PathBuf::from("/etc/pombola/pombola.toml"));
    }
    candidates
}

fn find_config_file() -> Option<PathBuf> {
    config_file_candidates().into_iter().find(|p| p.exists())
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pombola"))
        .unwrap_or_else(|| PathBuf::from("./pombola_data"))
}

/// Resolved root folder and the paths derived from it
#[derive(Debug, Clone)]
pub struct RootFolder {
    root: PathBuf,
    database_path: PathBuf,
    data_directory: PathBuf,
}

impl RootFolder {
    /// Resolve the root folder (CLI → ENV → TOML → default) and derived paths
    pub fn resolve(cli_arg: Option<&Path>, config: &TomlConfig) -> Self {
        let root = if let Some(path) = cli_arg {
            path.to_path_buf()
        } else if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            PathBuf::from(path)
        } else if let Some(path) = &config.root_folder {
            path.clone()
        } else {
            default_root_folder()
        };

        let database_path = config
            .database_path
            .clone()
            .unwrap_or_else(|| root.join(DATABASE_FILE));
        let data_directory = config
            .data_directory
            .clone()
            .unwrap_or_else(|| root.join(DEFAULT_DATA_DIRECTORY));

        Self {
            root,
            database_path,
            data_directory,
        }
    }

    /// Override the database path (e.g. from `--database`)
    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = path;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }

    /// Create the root folder if it is missing
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            info!("Created root folder: {}", self.root.display());
        }
        Ok(())
    }
}
