use std::io::{self, BufRead, BufWriter, Write};

use mcp_xml_bridge::config::{load_config, BridgeConfig};
use mcp_xml_bridge::error::BridgeError;
use mcp_xml_bridge::mcp::{McpXmlBridge, Segment};
use mcp_xml_bridge::observability::init_tracing;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&path).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration from '{path}': {e}");
        eprintln!("Please copy 'config.example.yaml' to 'config.yaml' and modify as needed.");
        std::process::exit(1);
    });

    init_tracing(&config.features.log_level, config.features.log_json);

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(err) = run(&config, stdin.lock(), BufWriter::new(stdout.lock())) {
        eprintln!("mcp-xml-bridge: {err}");
        std::process::exit(1);
    }
}

/// Tokenize `input` line by line and write one JSON segment per line.
fn run<R: BufRead, W: Write>(
    config: &BridgeConfig,
    mut input: R,
    mut output: W,
) -> Result<(), BridgeError> {
    let bridge = McpXmlBridge::from_config(config);
    let mut tokenizer = bridge.as_ref().map(McpXmlBridge::stream);
    match &bridge {
        Some(bridge) => tracing::info!(
            tools = bridge.tool_names().len(),
            "mcp-xml-bridge tokenizing stdin"
        ),
        None => tracing::info!("mcp-xml-bridge disabled, passing stdin through as text"),
    }

    let mut line = String::new();
    let mut text_segments = 0usize;
    let mut tool_segments = 0usize;
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let segments = match tokenizer.as_mut() {
            Some(tokenizer) => tokenizer.push(&line),
            None => vec![Segment::Text(line.clone())],
        };
        write_segments(&mut output, &segments, &mut text_segments, &mut tool_segments)?;
    }
    if let Some(tokenizer) = tokenizer.as_mut() {
        let rest = tokenizer.flush();
        write_segments(&mut output, &rest, &mut text_segments, &mut tool_segments)?;
    }
    output.flush()?;

    tracing::info!(
        text_segments,
        tool_segments,
        "mcp-xml-bridge stream finished"
    );
    Ok(())
}

fn write_segments<W: Write>(
    output: &mut W,
    segments: &[Segment],
    text_segments: &mut usize,
    tool_segments: &mut usize,
) -> Result<(), BridgeError> {
    for segment in segments {
        match segment {
            Segment::Text(_) => *text_segments += 1,
            Segment::Tool(call) => {
                *tool_segments += 1;
                tracing::debug!(tool = %call.name, id = %call.id, "decoded mcp tool call");
            }
        }
        serde_json::to_writer(&mut *output, segment)?;
        output.write_all(b"\n")?;
    }
    Ok(())
}
