/// Config file loading and creation for the versus CLI.
///
/// Config lives at ~/.config/versus/config.toml.
/// All fields are optional; CLI args override config values.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bail;

#[derive(Deserialize, Default, Debug, PartialEq)]
pub struct VersusConfig {
    pub session: Option<String>,
    pub json: Option<bool>,
    pub seed: Option<u64>,
    pub noise: Option<f64>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# versus configuration
# All values here can be overridden by CLI flags.

# Session file used by start / next / choose / rank
# session = \"/home/me/.local/share/versus/session.json\"

# Print JSON instead of tables
# json = false

# Defaults for `versus simulate`
# seed = 42
# noise = 0.0
";

/// Session file used when neither --session nor the config names one.
pub const DEFAULT_SESSION_FILE: &str = "versus-session.json";

/// Returns the default config path: ~/.config/versus/config.toml
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home).join(".config").join("versus").join("config.toml")
}

/// Parse config text.
pub fn parse_config(content: &str) -> Result<VersusConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> VersusConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content)
            .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => VersusConfig::default(),
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config() -> PathBuf {
    let path = config_path();

    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));

    path
}
