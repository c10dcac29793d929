//! MCP XML bridge.
//!
//! Tools whose names carry the `mcp__` prefix are not offered to the upstream
//! through native function calling. The model is instead told to emit each
//! call as `<tool_name>{json}</tool_name>` in plain text, and the
//! [`XmlStreamTokenizer`] lifts those elements back out of the response
//! stream while every other byte passes through untouched.

pub mod bridge;
pub mod decode;
pub mod prompt;
pub mod tokenizer;

use std::sync::atomic::AtomicU64;

use serde::{Deserialize, Serialize};

use crate::util::next_generated_id;

pub use bridge::McpXmlBridge;
pub use decode::try_parse_tool_call_xml;
pub use prompt::{build_mcp_tool_result_xml, build_mcp_xml_system_prompt, MCP_TOOL_RESULT_TAG};
pub use tokenizer::XmlStreamTokenizer;

/// Name prefix that routes a tool through the XML bridge.
pub const MCP_TOOL_PREFIX: &str = "mcp__";

static TOOL_USE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An MCP tool definition as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the tool input, rendered verbatim into the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

impl McpTool {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: None,
        }
    }
}

/// A tool call decoded from an XML element in the model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct McpToolCall {
    /// Generated tool-use id, see [`make_tool_use_id`].
    pub id: String,
    pub name: String,
    pub input: serde_json::Map<String, serde_json::Value>,
}

impl McpToolCall {
    /// Render the call back into the element shape the model emits.
    ///
    /// The id is not part of the markup.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let body = serde_json::to_string(&self.input).unwrap_or_else(|_| "{}".to_string());
        format!("<{name}>{body}</{name}>", name = self.name)
    }
}

/// One unit of tokenizer output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    /// Literal passthrough text, never empty.
    Text(String),
    /// A decoded tool call.
    Tool(McpToolCall),
}

impl Segment {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(text) => Some(text),
            Segment::Tool(_) => None,
        }
    }

    #[must_use]
    pub fn as_tool(&self) -> Option<&McpToolCall> {
        match self {
            Segment::Text(_) => None,
            Segment::Tool(call) => Some(call),
        }
    }
}

// ---------------------------------------------------------------------------
// Name filter / ids
// ---------------------------------------------------------------------------

/// Whether `name` belongs to the MCP namespace handled by the XML bridge.
#[must_use]
pub fn is_mcp_tool_name(name: &str) -> bool {
    name.starts_with(MCP_TOOL_PREFIX)
}

/// Keep only MCP tool names, preserving input order.
pub fn mcp_tool_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|name| is_mcp_tool_name(name))
        .map(ToOwned::to_owned)
        .collect()
}

/// Mint a process-unique tool-use id of the form `{name}-{n}`.
#[must_use]
pub fn make_tool_use_id(name: &str) -> String {
    next_generated_id(name, &TOOL_USE_ID_COUNTER)
}
