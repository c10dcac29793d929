use rustc_hash::FxHashSet;

use super::{BridgeConfig, ConfigError};
use crate::mcp::is_mcp_tool_name;

/// Validate the full bridge config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &BridgeConfig) -> Result<(), ConfigError> {
    validate_tools(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_tools(config: &BridgeConfig) -> Result<(), ConfigError> {
    let mut seen = FxHashSet::default();
    for tool in &config.tools {
        let name = tool.name.as_str();
        if name.trim().is_empty() {
            return Err(validation_err("tool name cannot be empty"));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '<' | '>' | '/'))
        {
            return Err(validation_err(format!(
                "Tool '{name}': name cannot contain {bad:?}"
            )));
        }
        if !seen.insert(name) {
            return Err(validation_err(format!("duplicate tool entry '{name}'")));
        }
        if let Some(schema) = &tool.input_schema {
            if !schema.is_object() {
                return Err(validation_err(format!(
                    "Tool '{name}': input_schema must be a JSON object"
                )));
            }
        }
        if !is_mcp_tool_name(name) {
            tracing::warn!(
                tool = name,
                "tool is not an mcp__ tool and will not be handled by the XML bridge"
            );
        }
    }
    Ok(())
}

fn validate_log_level(config: &BridgeConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeaturesConfig;
    use crate::mcp::McpTool;

    fn make_valid_config() -> BridgeConfig {
        BridgeConfig {
            enabled: true,
            tools: vec![
                McpTool {
                    name: "mcp__fs__read".to_string(),
                    description: "Read a file".to_string(),
                    input_schema: Some(serde_json::json!({"type": "object"})),
                },
                McpTool::new("mcp__fs__list"),
            ],
            features: FeaturesConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_tool_list_is_valid() {
        let mut config = make_valid_config();
        config.tools.clear();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_non_mcp_tool_is_accepted() {
        let mut config = make_valid_config();
        config.tools.push(McpTool::new("get_weather"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_tool_name() {
        let mut config = make_valid_config();
        config.tools.push(McpTool::new("  "));
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("tool name cannot be empty"));
    }

    #[test]
    fn test_tool_name_with_markup_characters() {
        for bad in ["mcp__a b", "mcp__<x", "mcp__x>", "mcp__a/b"] {
            let mut config = make_valid_config();
            config.tools.push(McpTool::new(bad));
            let err = validate_config(&config).unwrap_err();
            assert!(err.to_string().contains("name cannot contain"), "{bad}");
        }
    }

    #[test]
    fn test_duplicate_tool() {
        let mut config = make_valid_config();
        config.tools.push(McpTool::new("mcp__fs__read"));
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate tool entry"));
    }

    #[test]
    fn test_schema_must_be_object() {
        let mut config = make_valid_config();
        config.tools[1].input_schema = Some(serde_json::json!("string"));
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("input_schema must be a JSON object"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = make_valid_config();
        config.features.log_level = "VERBOSE".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for level in &[
            "DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED", "debug",
        ] {
            let mut config = make_valid_config();
            config.features.log_level = (*level).to_string();
            assert!(
                validate_config(&config).is_ok(),
                "Level {level} should be valid"
            );
        }
    }
}
