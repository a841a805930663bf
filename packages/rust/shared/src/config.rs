//! Application configuration for placeseo.
//!
//! Lookup order: an explicit `--config` file, then `<root>/placeseo.toml`,
//! then `~/.placeseo/placeseo.toml`, then built-in defaults.
//! CLI flags override config file values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PlaceSeoError, Result};
use crate::types::StageName;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "placeseo.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".placeseo";

// ---------------------------------------------------------------------------
// Config structs (matching placeseo.toml)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Project layout.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Place collection settings.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Content improvement settings.
    #[serde(default)]
    pub improver: ImproverConfig,

    /// External commands replacing built-in stages, keyed by stage name.
    #[serde(default)]
    pub stages: BTreeMap<String, StageCommandConfig>,
}

/// `[defaults]` section. Relative paths resolve against the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding one sub-directory per brand.
    #[serde(default = "default_clients_dir")]
    pub clients_dir: String,

    /// Raw (hierarchical) taxonomy document.
    #[serde(default = "default_taxonomy_path")]
    pub taxonomy_path: String,

    /// Flattened taxonomy written by the normalize-taxonomy stage.
    #[serde(default = "default_normalized_taxonomy_path")]
    pub normalized_taxonomy_path: String,

    /// Artifact JSON Schema. The built-in schema is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            clients_dir: default_clients_dir(),
            taxonomy_path: default_taxonomy_path(),
            normalized_taxonomy_path: default_normalized_taxonomy_path(),
            schema_path: None,
        }
    }
}

fn default_clients_dir() -> String {
    "clients".into()
}
fn default_taxonomy_path() -> String {
    "shared/keyword_meta_taxonomy.json".into()
}
fn default_normalized_taxonomy_path() -> String {
    "shared/keyword_meta_taxonomy.normalized.json".into()
}

/// `[collector]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Base URL of the place pages; the place id is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per fetch, including the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay of the exponential backoff.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Consecutive failures before the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// How long an open breaker rejects calls.
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,

    /// Fall back to `inputs/` data (then intake) when the live fetch fails.
    #[serde(default = "default_true")]
    pub offline_fallback: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            failure_threshold: default_failure_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            offline_fallback: true,
        }
    }
}

impl CollectorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

fn default_endpoint() -> String {
    "https://pcmap.place.naver.com/place/".into()
}
fn default_user_agent() -> String {
    concat!("placeseo/", env!("CARGO_PKG_VERSION")).into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2000
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_reset_timeout_ms() -> u64 {
    60_000
}
fn default_true() -> bool {
    true
}

/// `[improver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImproverConfig {
    /// Intro text is padded until it reaches this many characters.
    #[serde(default = "default_intro_min_chars")]
    pub intro_min_chars: usize,

    /// Compliance lint flags intros longer than this.
    #[serde(default = "default_intro_max_chars")]
    pub intro_max_chars: usize,
}

impl Default for ImproverConfig {
    fn default() -> Self {
        Self {
            intro_min_chars: default_intro_min_chars(),
            intro_max_chars: default_intro_max_chars(),
        }
    }
}

fn default_intro_min_chars() -> usize {
    1200
}
fn default_intro_max_chars() -> usize {
    2200
}

/// `[stages.<name>]` entry: run this command instead of the built-in stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCommandConfig {
    /// Program followed by its arguments.
    pub command: Vec<String>,
}

impl AppConfig {
    /// External stage commands with their names parsed.
    pub fn external_stages(&self) -> Result<BTreeMap<StageName, StageCommandConfig>> {
        self.stages
            .iter()
            .map(|(name, cfg)| {
                let stage: StageName = name.parse().map_err(PlaceSeoError::config)?;
                if cfg.command.is_empty() {
                    return Err(PlaceSeoError::config(format!(
                        "[stages.{name}] command must not be empty"
                    )));
                }
                Ok((stage, cfg.clone()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Project paths (runtime, resolved against the project root)
// ---------------------------------------------------------------------------

/// Config paths resolved against a project root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub clients_dir: PathBuf,
    pub taxonomy: PathBuf,
    pub normalized_taxonomy: PathBuf,
    pub schema: Option<PathBuf>,
}

impl ProjectPaths {
    pub fn resolve(root: &Path, config: &AppConfig) -> Self {
        let at = |p: &str| root.join(p);
        Self {
            root: root.to_path_buf(),
            clients_dir: at(&config.defaults.clients_dir),
            taxonomy: at(&config.defaults.taxonomy_path),
            normalized_taxonomy: at(&config.defaults.normalized_taxonomy_path),
            schema: config.defaults.schema_path.as_deref().map(at),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.placeseo/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PlaceSeoError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.placeseo/placeseo.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load config for a project: `<root>/placeseo.toml`, else the user config,
/// else defaults.
pub fn load_config(root: &Path) -> Result<AppConfig> {
    let project = root.join(CONFIG_FILE_NAME);
    if project.exists() {
        return load_config_from(&project);
    }

    let user = config_file_path()?;
    if user.exists() {
        return load_config_from(&user);
    }

    tracing::debug!(?project, ?user, "config file not found, using defaults");
    Ok(AppConfig::default())
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PlaceSeoError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PlaceSeoError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file into `dir`. Returns the path to the created file.
pub fn init_config(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| PlaceSeoError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PlaceSeoError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PlaceSeoError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
