//! Application configuration for Themis.
//!
//! User config lives at `~/.themis/themis.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ThemisError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "themis.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".themis";

/// Fixed name of the persisted tree in the working directory.
pub const DEFAULT_TREE_FILE: &str = "assignment_tree.json";

// ---------------------------------------------------------------------------
// Config structs (matching themis.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Portal connection settings.
    #[serde(default)]
    pub portal: PortalConfig,

    /// Tree building and persistence defaults.
    #[serde(default)]
    pub tree: TreeConfig,
}

/// `[portal]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Start page used when `pull` gets no URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout enforced by the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// CSS selector matching assignment links on a page.
    #[serde(default = "default_link_selector")]
    pub link_selector: String,

    /// Name of the env var holding a session cookie (never store the cookie itself).
    #[serde(default = "default_session_cookie_env")]
    pub session_cookie_env: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            link_selector: default_link_selector(),
            session_cookie_env: default_session_cookie_env(),
        }
    }
}

fn default_base_url() -> String {
    "https://themis.housing.rug.nl".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_link_selector() -> String {
    ".ass-children a[href]".into()
}
fn default_session_cookie_env() -> String {
    "THEMIS_SESSION".into()
}

/// `[tree]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Default number of levels to expand below the root.
    #[serde(default = "default_depth")]
    pub depth: i32,

    /// Where `pull` writes the tree.
    #[serde(default = "default_output_file")]
    pub output_file: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            output_file: default_output_file(),
        }
    }
}

fn default_depth() -> i32 {
    2
}
fn default_output_file() -> String {
    DEFAULT_TREE_FILE.into()
}

// ---------------------------------------------------------------------------
// Pull config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pull configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PullConfig {
    /// Page whose assignments become the root's children.
    pub start_url: Url,
    /// Levels to expand below the root.
    pub depth: i32,
    /// Levels below the root written to disk.
    pub save_depth: i32,
    /// Output file path.
    pub output_file: PathBuf,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// CSS selector for assignment links.
    pub link_selector: String,
    /// Session cookie resolved from the environment, if set.
    pub session_cookie: Option<String>,
}

impl TryFrom<&AppConfig> for PullConfig {
    type Error = ThemisError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let start_url = parse_url(&config.portal.base_url)?;
        let session_cookie = std::env::var(&config.portal.session_cookie_env)
            .ok()
            .filter(|v| !v.is_empty());

        Ok(Self {
            start_url,
            depth: config.tree.depth,
            save_depth: config.tree.depth.saturating_add(1),
            output_file: PathBuf::from(&config.tree.output_file),
            timeout: Duration::from_secs(config.portal.timeout_secs),
            link_selector: config.portal.link_selector.clone(),
            session_cookie,
        })
    }
}

/// Parse an absolute http(s) URL, mapping failures to a config error.
pub fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| ThemisError::config(format!("invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ThemisError::config(format!(
            "unsupported URL scheme '{other}' in '{raw}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.themis/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ThemisError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.themis/themis.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ThemisError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ThemisError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ThemisError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ThemisError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ThemisError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
