pub mod validation;

use serde::{Deserialize, Serialize};

use crate::mcp::McpTool;

use self::validation::validate_config;

/// Environment variable that switches the MCP XML bridge on or off.
///
/// Unset means enabled; `0`, `false`, `no` and `off` (any case) disable it.
pub const MCP_XML_ENV: &str = "MCP_XML_ENABLED";

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit log lines as JSON objects instead of plain text.
    #[serde(default)]
    pub log_json: bool,
}

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Config-side switch; the [`MCP_XML_ENV`] toggle can still disable it.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tool definitions. Only `mcp__*` names are handled by the bridge.
    #[serde(default)]
    pub tools: Vec<McpTool>,
    #[serde(default)]
    pub features: FeaturesConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tools: Vec::new(),
            features: FeaturesConfig::default(),
        }
    }
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<BridgeConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] or [`ConfigError::Validation`].
pub fn parse_config(contents: &str) -> Result<BridgeConfig, ConfigError> {
    let config: BridgeConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Feature toggle
// ---------------------------------------------------------------------------

/// Whether the MCP XML bridge is enabled by the process environment.
#[must_use]
pub fn is_mcp_xml_enabled() -> bool {
    let raw = std::env::var(MCP_XML_ENV).ok();
    toggle_value_enabled(raw.as_deref())
}

/// Interpret a raw toggle value. Missing or blank values mean enabled.
#[must_use]
pub fn toggle_value_enabled(raw: Option<&str>) -> bool {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return true;
    };
    !["0", "false", "no", "off"]
        .iter()
        .any(|off| raw.eq_ignore_ascii_case(off))
}
