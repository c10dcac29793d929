use serde::Serialize;

use super::{is_mcp_tool_name, McpTool};

/// Root tag of the element that carries a tool result back to the model.
pub const MCP_TOOL_RESULT_TAG: &str = "mcp_tool_result";

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Build the instruction block that asks the model to call MCP tools through
/// XML elements instead of native function calling.
///
/// Returns an empty string when none of `tools` is an MCP tool.
#[must_use]
pub fn build_mcp_xml_system_prompt(tools: &[McpTool]) -> String {
    let mut mcp_tools = tools
        .iter()
        .filter(|tool| is_mcp_tool_name(&tool.name))
        .peekable();
    if mcp_tools.peek().is_none() {
        return String::new();
    }

    let example_result = build_mcp_tool_result_xml("mcp__server__tool", "toolu_xxx", "...", false);
    let mut lines: Vec<String> = vec![
        "==== MCP XML tool calls (mcp__* only) ====".to_string(),
        "When you need to call a tool whose name starts with `mcp__`:".to_string(),
        "1) Do not use tool_use/function_call for it; that channel rejects these tools.".to_string(),
        "2) Output a single XML element instead (XML only, no explanation, no markdown fence).".to_string(),
        "3) The root tag must be the tool name and the body must be a JSON object holding the tool input.".to_string(),
        String::new(),
        "Example:".to_string(),
        r#"<mcp__server__tool>{"arg":"value"}</mcp__server__tool>"#.to_string(),
        String::new(),
        "Once the tool has run, its result is returned to you as:".to_string(),
        example_result,
        String::new(),
        "When is_error is true the tool failed and result holds the error message.".to_string(),
        String::new(),
        "Tools not named `mcp__*` keep using the regular tool calling mechanism.".to_string(),
        String::new(),
        "Available MCP tools (name / description / input_schema):".to_string(),
    ];

    for tool in mcp_tools {
        if tool.description.is_empty() {
            lines.push(format!("- {}", tool.name));
        } else {
            lines.push(format!("- {}: {}", tool.name, tool.description));
        }
        if let Some(schema) = &tool.input_schema {
            lines.push(format!("  input_schema: {schema}"));
        }
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tool result element
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ToolResultPayload<'a> {
    is_error: bool,
    name: &'a str,
    result: &'a str,
    tool_use_id: &'a str,
}

/// Format a tool result as `<mcp_tool_result>{json}</mcp_tool_result>`.
///
/// `<`, `>` and `&` inside the JSON are written as `\u003c`-style escapes so
/// that result text can never close the wrapper element early. Keys are
/// emitted in sorted order.
#[must_use]
pub fn build_mcp_tool_result_xml(
    tool_name: &str,
    tool_use_id: &str,
    result: &str,
    is_error: bool,
) -> String {
    let payload = ToolResultPayload {
        is_error,
        name: tool_name,
        result,
        tool_use_id,
    };
    let json = serde_json::to_string(&payload).unwrap_or_default();

    let mut out = String::with_capacity(2 * MCP_TOOL_RESULT_TAG.len() + 5 + result.len() + 64);
    out.push('<');
    out.push_str(MCP_TOOL_RESULT_TAG);
    out.push('>');
    push_html_safe_json(&mut out, &json);
    out.push_str("</");
    out.push_str(MCP_TOOL_RESULT_TAG);
    out.push('>');
    out
}

/// Markup characters only occur inside JSON strings, where the unicode escape
/// is equivalent.
fn push_html_safe_json(out: &mut String, json: &str) {
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str, description: &str, schema: Option<serde_json::Value>) -> McpTool {
        McpTool {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: schema,
        }
    }

    #[test]
    fn prompt_empty_without_mcp_tools() {
        assert!(build_mcp_xml_system_prompt(&[]).is_empty());
        assert!(build_mcp_xml_system_prompt(&[tool("get_weather", "w", None)]).is_empty());
    }

    #[test]
    fn prompt_lists_only_mcp_tools() {
        let prompt = build_mcp_xml_system_prompt(&[
            tool("get_weather", "Weather", None),
            tool(
                "mcp__fs__read",
                "Read a file",
                Some(json!({"type": "object", "properties": {"path": {"type": "string"}}})),
            ),
            tool("mcp__fs__list", "", None),
        ]);

        assert!(prompt.contains("- mcp__fs__read: Read a file"));
        let schema_line = prompt
            .lines()
            .find_map(|line| line.strip_prefix("  input_schema: "))
            .expect("schema line");
        let schema: serde_json::Value = serde_json::from_str(schema_line).expect("json");
        assert_eq!(schema["properties"]["path"]["type"], "string");
        assert!(prompt.lines().any(|line| line == "- mcp__fs__list"));
        assert!(!prompt.contains("- get_weather"));
        assert!(prompt.contains("<mcp_tool_result>"));
    }

    #[test]
    fn result_element_carries_all_fields() {
        let xml = build_mcp_tool_result_xml("mcp__fs__read", "mcp__fs__read-7", "hello", true);
        let inner = xml
            .strip_prefix("<mcp_tool_result>")
            .and_then(|s| s.strip_suffix("</mcp_tool_result>"))
            .expect("wrapper");
        let value: serde_json::Value = serde_json::from_str(inner).expect("json");
        assert_eq!(
            value,
            json!({
                "name": "mcp__fs__read",
                "tool_use_id": "mcp__fs__read-7",
                "result": "hello",
                "is_error": true,
            })
        );
    }

    #[test]
    fn result_element_keys_are_sorted() {
        let xml = build_mcp_tool_result_xml("n", "id", "r", false);
        assert_eq!(
            xml,
            r#"<mcp_tool_result>{"is_error":false,"name":"n","result":"r","tool_use_id":"id"}</mcp_tool_result>"#
        );
    }

    #[test]
    fn result_markup_cannot_escape_wrapper() {
        let xml = build_mcp_tool_result_xml("n", "id", "</mcp_tool_result> & <b>", false);
        assert_eq!(xml.matches("</mcp_tool_result>").count(), 1);
        let inner = &xml["<mcp_tool_result>".len()..xml.len() - "</mcp_tool_result>".len()];
        let value: serde_json::Value = serde_json::from_str(inner).expect("json");
        assert_eq!(value["result"], "</mcp_tool_result> & <b>");
    }
}
