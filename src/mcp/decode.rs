//! Standalone decode of one complete `<name ...>{json}</name>` element.
//!
//! Used by the streaming tokenizer for every extracted span and usable on its
//! own when the caller already holds a finished element.

use serde_json::{Map, Value};

use super::{make_tool_use_id, McpToolCall};

/// Decode `xml_text` as a call to `tool_name`.
///
/// The opening tag must sit at the start of the span (leading whitespace is
/// allowed) and may carry attributes, which are ignored. The closing tag must
/// end the span (trailing whitespace is allowed). An empty or whitespace-only
/// body decodes to an empty input map.
///
/// Returns `None` when the wrappers do not match or the body is not a JSON
/// object. A fresh tool-use id is minted only on success.
#[must_use]
pub fn try_parse_tool_call_xml(xml_text: &str, tool_name: &str) -> Option<McpToolCall> {
    if tool_name.is_empty() || xml_text.is_empty() {
        return None;
    }

    let content_start = open_tag_end(xml_text, tool_name)?;
    let content_end = close_tag_start(xml_text, tool_name)?;
    // `get` rejects a closing tag that begins inside the opening tag.
    let inner = xml_text.get(content_start..content_end)?.trim();
    let input = decode_input(inner)?;

    Some(McpToolCall {
        id: make_tool_use_id(tool_name),
        name: tool_name.to_string(),
        input,
    })
}

/// Byte offset just past the opening tag's `>`.
fn open_tag_end(xml_text: &str, tool_name: &str) -> Option<usize> {
    let bytes = xml_text.as_bytes();
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace())?;
    let rest = &bytes[start..];
    if rest[0] != b'<' || !rest[1..].starts_with(tool_name.as_bytes()) {
        return None;
    }

    let after_name = start + 1 + tool_name.len();
    match *bytes.get(after_name)? {
        b'>' => Some(after_name + 1),
        b if b.is_ascii_whitespace() => {
            let attrs_start = after_name + 1;
            memchr::memchr(b'>', &bytes[attrs_start..]).map(|rel| attrs_start + rel + 1)
        }
        _ => None,
    }
}

/// Byte offset of the `</` that starts the trailing closing tag.
fn close_tag_start(xml_text: &str, tool_name: &str) -> Option<usize> {
    let head = xml_text
        .trim_end_matches(|c: char| c.is_ascii_whitespace())
        .strip_suffix('>')?
        .trim_end_matches(|c: char| c.is_ascii_whitespace())
        .strip_suffix(tool_name)?
        .strip_suffix("</")?;
    Some(head.len())
}

fn decode_input(inner: &str) -> Option<Map<String, Value>> {
    if inner.is_empty() {
        return Some(Map::new());
    }

    // `null` decodes like an empty body.
    match serde_json::from_str::<Option<Map<String, Value>>>(inner) {
        Ok(input) => Some(input.unwrap_or_default()),
        Err(err) => {
            tracing::debug!(error = %err, "mcp xml body is not a JSON object");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TOOL: &str = "mcp__fs__read";

    #[test]
    fn decodes_json_object_body() {
        let call = try_parse_tool_call_xml(
            r#"<mcp__fs__read>{"path":"/etc/hosts","limit":3}</mcp__fs__read>"#,
            TOOL,
        )
        .expect("decode");
        assert_eq!(call.name, TOOL);
        assert_eq!(call.input["path"], "/etc/hosts");
        assert_eq!(call.input["limit"], 3);
        assert!(call.id.starts_with("mcp__fs__read-"));
    }

    #[test]
    fn tolerates_surrounding_whitespace_and_attributes() {
        let xml = "  \n<mcp__fs__read id=\"1\" mode='x'>\n  {\"a\": [1, 2]}\n</mcp__fs__read >\n ";
        let call = try_parse_tool_call_xml(xml, TOOL).expect("decode");
        assert_eq!(call.input["a"], json!([1, 2]));
    }

    #[test]
    fn empty_and_whitespace_bodies_yield_empty_input() {
        for xml in [
            "<mcp__fs__read></mcp__fs__read>",
            "<mcp__fs__read>  \n\t </mcp__fs__read>",
            "<mcp__fs__read>null</mcp__fs__read>",
        ] {
            let call = try_parse_tool_call_xml(xml, TOOL).expect("decode");
            assert!(call.input.is_empty(), "{xml}");
            assert!(!call.id.is_empty());
        }
    }

    #[test]
    fn rejects_non_object_bodies() {
        for body in ["{not json}", "[1,2]", "\"s\"", "42", "{\"a\":1} trailing"] {
            let xml = format!("<{TOOL}>{body}</{TOOL}>");
            assert!(try_parse_tool_call_xml(&xml, TOOL).is_none(), "{body}");
        }
    }

    #[test]
    fn rejects_mismatched_wrappers() {
        assert!(try_parse_tool_call_xml("<mcp__fs__readx>{}</mcp__fs__readx>", TOOL).is_none());
        assert!(try_parse_tool_call_xml("<mcp__fs__read>{}</mcp__fs__write>", TOOL).is_none());
        assert!(try_parse_tool_call_xml("text <mcp__fs__read>{}</mcp__fs__read>", TOOL).is_none());
        assert!(try_parse_tool_call_xml("<mcp__fs__read>{}</mcp__fs__read> tail", TOOL).is_none());
        assert!(try_parse_tool_call_xml("<mcp__fs__read/>{}</mcp__fs__read>", TOOL).is_none());
        assert!(try_parse_tool_call_xml("<mcp__fs__read>{}</mcp__fs__read", TOOL).is_none());
    }

    #[test]
    fn rejects_closing_tag_inside_opening_tag() {
        assert!(try_parse_tool_call_xml("<mcp__fs__read </mcp__fs__read>", TOOL).is_none());
    }

    #[test]
    fn rejects_empty_inputs() {
        assert!(try_parse_tool_call_xml("", TOOL).is_none());
        assert!(try_parse_tool_call_xml("<x></x>", "").is_none());
    }

    #[test]
    fn multibyte_body_round_trips() {
        let call = try_parse_tool_call_xml(
            "<mcp__fs__read>{\"q\":\"caf\u{e9} \u{1f600}\"}</mcp__fs__read>",
            TOOL,
        )
        .expect("decode");
        assert_eq!(call.input["q"], "caf\u{e9} \u{1f600}");
    }
}
