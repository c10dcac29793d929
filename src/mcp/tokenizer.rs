use std::mem;

use memchr::{memchr, memmem, memrchr};

use super::decode::try_parse_tool_call_xml;
use super::Segment;
use crate::util::is_tag_space;

// Streaming MCP XML tokenizer.
//
// Splits a model's text stream into passthrough text and decoded
// `<tool_name>{json}</tool_name>` calls. One instance serves one stream.
//
// Key invariants:
// - Output does not depend on how the input was chunked.
// - A name only opens an element when followed by end-of-buffer, `>`, `/` or
//   tag whitespace, so `<foo` never matches inside `<foobar`.
// - A buffered tail that could still grow into an opening or closing tag is
//   held back instead of being emitted as text.
// - The first `</name` after an opening tag closes it, even inside a JSON
//   string.

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ToolTag {
    name: Box<str>,
    /// `<name`
    open: memmem::Finder<'static>,
    /// `</name`
    close: memmem::Finder<'static>,
}

impl ToolTag {
    fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            open: memmem::Finder::new(format!("<{name}").as_bytes()).into_owned(),
            close: memmem::Finder::new(format!("</{name}").as_bytes()).into_owned(),
        }
    }

    #[inline]
    fn could_become_tag(&self, tail: &[u8]) -> bool {
        self.open.needle().starts_with(tail) || self.close.needle().starts_with(tail)
    }
}

/// An opening tag at the front of the buffer still waiting for its close.
#[derive(Debug, Clone, Copy)]
struct PendingElement {
    tag: usize,
    /// No `</name` starts before this offset.
    close_search_from: usize,
}

/// Streaming splitter of text and MCP XML tool calls.
#[derive(Debug, Clone)]
pub struct XmlStreamTokenizer {
    /// Sorted, deduplicated, non-empty.
    tags: Vec<ToolTag>,
    buffer: String,
    pending: Option<PendingElement>,
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

impl XmlStreamTokenizer {
    /// Create a tokenizer recognizing `tool_names`. Empty names are dropped.
    pub fn new<I, S>(tool_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = tool_names
            .into_iter()
            .map(|name| name.as_ref().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort_unstable();
        names.dedup();

        Self {
            tags: names.iter().map(|name| ToolTag::new(name)).collect(),
            buffer: String::new(),
            pending: None,
        }
    }

    /// Known tool names, sorted.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|tag| &*tag.name)
    }

    /// Text received but not yet emitted.
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    // -- public API ---------------------------------------------------------

    /// Feed a text delta and return every segment it completes, in stream
    /// order.
    pub fn push(&mut self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        if text.is_empty() {
            return segments;
        }
        self.buffer.push_str(text);

        loop {
            let Some((start, tag)) = self.find_next_tool_start() else {
                let keep_from = self.partial_tag_start();
                let tail = self.buffer.split_off(keep_from);
                let emit = mem::replace(&mut self.buffer, tail);
                push_text(&mut segments, emit);
                self.pending = None;
                break;
            };

            if start > 0 {
                let tail = self.buffer.split_off(start);
                let before = mem::replace(&mut self.buffer, tail);
                push_text(&mut segments, before);
                self.pending = None;
            }

            let Some(end) = self.find_close_tag_end(tag) else {
                break;
            };

            let tail = self.buffer.split_off(end);
            let element = mem::replace(&mut self.buffer, tail);
            self.pending = None;

            let name = &*self.tags[tag].name;
            if let Some(call) = try_parse_tool_call_xml(&element, name) {
                segments.push(Segment::Tool(call));
            } else {
                tracing::debug!(
                    tool = name,
                    len = element.len(),
                    "mcp xml element did not decode, passing it through as text"
                );
                segments.push(Segment::Text(element));
            }
        }

        segments
    }

    /// Call when the stream ends. Releases anything still buffered, including
    /// an unclosed element, as one text segment.
    pub fn flush(&mut self) -> Vec<Segment> {
        self.pending = None;
        if self.buffer.is_empty() {
            return Vec::new();
        }
        if self.buffer.starts_with('<') {
            tracing::debug!(
                len = self.buffer.len(),
                "stream ended with an incomplete mcp xml tag"
            );
        }
        vec![Segment::Text(mem::take(&mut self.buffer))]
    }

    // -- Tag Locator --------------------------------------------------------

    /// Earliest accepted `<name` in the buffer as `(byte offset, tag index)`.
    fn find_next_tool_start(&self) -> Option<(usize, usize)> {
        let bytes = self.buffer.as_bytes();

        // The element already waiting at the front stays the earliest match as
        // long as its boundary byte has arrived and still qualifies.
        if let Some(pending) = self.pending {
            let open_len = self.tags[pending.tag].open.needle().len();
            if bytes.get(open_len).copied().is_some_and(is_open_boundary) {
                return Some((0, pending.tag));
            }
        }

        let mut best: Option<(usize, usize)> = None;
        for (tag_idx, tag) in self.tags.iter().enumerate() {
            let open_len = tag.open.needle().len();
            let mut from = 0usize;
            while let Some(rel) = tag.open.find(&bytes[from..]) {
                let idx = from + rel;
                if best.is_some_and(|(best_idx, _)| idx >= best_idx) {
                    break;
                }
                // Past the end counts as a boundary: the tag may still be
                // completed by the next chunk.
                if bytes.get(idx + open_len).copied().map_or(true, is_open_boundary) {
                    best = Some((idx, tag_idx));
                    break;
                }
                from = idx + 1;
            }
        }
        best
    }

    // -- Element Extractor --------------------------------------------------

    /// Byte offset just past the `>` of the first `</name...>` in the buffer,
    /// which must start with the opening tag of `tag`.
    fn find_close_tag_end(&mut self, tag: usize) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        let close = &self.tags[tag].close;
        let close_len = close.needle().len();
        let search_from = match self.pending {
            Some(pending) if pending.tag == tag => pending.close_search_from,
            _ => 0,
        };

        let Some(rel) = close.find(&bytes[search_from..]) else {
            self.pending = Some(PendingElement {
                tag,
                close_search_from: bytes.len().saturating_sub(close_len - 1),
            });
            return None;
        };

        let close_at = search_from + rel;
        let after = close_at + close_len;
        let end = if after < bytes.len() {
            memchr(b'>', &bytes[after..]).map(|gt| after + gt + 1)
        } else {
            None
        };
        if end.is_none() {
            self.pending = Some(PendingElement {
                tag,
                close_search_from: close_at,
            });
        }
        end
    }

    // -- Partial tags -------------------------------------------------------

    /// Offset from which the buffer must be retained because it may be the
    /// start of a tag split across chunks; the buffer length if nothing needs
    /// retaining.
    fn partial_tag_start(&self) -> usize {
        let bytes = self.buffer.as_bytes();
        let Some(last_lt) = memrchr(b'<', bytes) else {
            return bytes.len();
        };
        let tail = &bytes[last_lt..];
        if self.tags.iter().any(|tag| tag.could_become_tag(tail)) {
            last_lt
        } else {
            bytes.len()
        }
    }
}

#[inline]
fn is_open_boundary(byte: u8) -> bool {
    byte == b'>' || byte == b'/' || is_tag_space(byte)
}

#[inline]
fn push_text(segments: &mut Vec<Segment>, text: String) {
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
}

#[cfg(test)]
#[path = "tokenizer_tests.rs"]
mod tests;
