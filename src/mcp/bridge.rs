use std::sync::Arc;

use super::prompt::{build_mcp_tool_result_xml, build_mcp_xml_system_prompt};
use super::{is_mcp_tool_name, McpTool, McpToolCall, XmlStreamTokenizer};
use crate::config::{is_mcp_xml_enabled, BridgeConfig};

/// Per-request bridge state: the MCP tools offered to the model, the system
/// prompt describing them, and a factory for per-response tokenizers.
///
/// Cheap to clone; the prompt is shared.
#[derive(Debug, Clone)]
pub struct McpXmlBridge {
    tools: Vec<McpTool>,
    tool_names: Vec<String>,
    system_prompt: Arc<str>,
}

impl McpXmlBridge {
    /// Build a bridge over the `mcp__*` subset of `tools`.
    pub fn new<I>(tools: I) -> Self
    where
        I: IntoIterator<Item = McpTool>,
    {
        let tools: Vec<McpTool> = tools
            .into_iter()
            .filter(|tool| is_mcp_tool_name(&tool.name))
            .collect();
        let tool_names = tools.iter().map(|tool| tool.name.clone()).collect();
        let system_prompt = Arc::from(build_mcp_xml_system_prompt(&tools));
        Self {
            tools,
            tool_names,
            system_prompt,
        }
    }

    /// Build a bridge from configuration, honoring the [`MCP_XML_ENV`]
    /// environment toggle.
    ///
    /// [`MCP_XML_ENV`]: crate::config::MCP_XML_ENV
    #[must_use]
    pub fn from_config(config: &BridgeConfig) -> Option<Self> {
        Self::from_config_with_toggle(config, is_mcp_xml_enabled())
    }

    /// Like [`Self::from_config`] with the environment toggle supplied by the
    /// caller. Returns `None` when either switch is off.
    #[must_use]
    pub fn from_config_with_toggle(config: &BridgeConfig, env_enabled: bool) -> Option<Self> {
        if !env_enabled || !config.enabled {
            tracing::debug!(
                env_enabled,
                config_enabled = config.enabled,
                "mcp xml bridge disabled"
            );
            return None;
        }
        Some(Self::new(config.tools.iter().cloned()))
    }

    #[must_use]
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    #[must_use]
    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    /// `true` when no MCP tool survived filtering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Instruction block to append to the system prompt; empty when
    /// [`Self::is_empty`].
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// A fresh tokenizer for one model response.
    #[must_use]
    pub fn stream(&self) -> XmlStreamTokenizer {
        XmlStreamTokenizer::new(&self.tool_names)
    }

    /// Format the result of executing `call` for re-insertion into the model
    /// context.
    #[must_use]
    pub fn format_result(&self, call: &McpToolCall, result: &str, is_error: bool) -> String {
        build_mcp_tool_result_xml(&call.name, &call.id, result, is_error)
    }
}
