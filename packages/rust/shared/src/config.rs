//! Application configuration for Draftwright.
//!
//! User config lives at `~/.draftwright/draftwright.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DraftwrightError, Result};
use crate::types::DEFAULT_WORDS_PER_MINUTE;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "draftwright.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".draftwright";

// ---------------------------------------------------------------------------
// Config structs (matching draftwright.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Generation bridge subprocess settings.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// libSQL database file holding the workspace snapshot.
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Storage key the snapshot is written under.
    #[serde(default = "default_state_key")]
    pub state_key: String,

    /// Directory for editable article part drafts.
    #[serde(default = "default_drafts_dir")]
    pub drafts_dir: String,

    /// Reading speed used for reading-time estimates.
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            state_key: default_state_key(),
            drafts_dir: default_drafts_dir(),
            words_per_minute: default_words_per_minute(),
        }
    }
}

fn default_state_path() -> String {
    "~/.draftwright/state.db".into()
}
fn default_state_key() -> String {
    "app-storage".into()
}
fn default_drafts_dir() -> String {
    "~/.draftwright/drafts".into()
}
fn default_words_per_minute() -> u32 {
    DEFAULT_WORDS_PER_MINUTE
}

/// `[bridge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Interpreter or executable that runs the bridge.
    #[serde(default = "default_bridge_cmd")]
    pub cmd: String,

    /// Script passed to `cmd`, if any.
    #[serde(default = "default_bridge_script")]
    pub script: String,

    /// Working directory for the bridge process. Empty means the current one.
    #[serde(default)]
    pub working_dir: String,

    /// Model identifier forwarded to the bridge.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cmd: default_bridge_cmd(),
            script: default_bridge_script(),
            working_dir: String::new(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_bridge_cmd() -> String {
    "bun".into()
}
fn default_bridge_script() -> String {
    "bridge/main.ts".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.draftwright/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DraftwrightError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.draftwright/draftwright.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| DraftwrightError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        DraftwrightError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if config.defaults.words_per_minute == 0 {
        return Err(DraftwrightError::config(
            "defaults.words_per_minute must be greater than zero",
        ));
    }
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DraftwrightError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DraftwrightError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DraftwrightError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Check that the generation API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.bridge.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(DraftwrightError::config(format!(
            "generation API key not found. Set the {var_name} environment variable."
        ))),
    }
}
