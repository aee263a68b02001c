use serde::Deserialize;
use tracing::{debug, trace};

use super::utf8::Utf8Decoder;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One `data:` record of a streamed chat completion. Only the fields the
/// client reads are modelled; everything else is ignored.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    /// Legacy completions shape.
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl StreamChunk {
    fn into_token(self) -> Option<String> {
        let choice = self.choices.into_iter().next()?;
        let content = choice.delta.and_then(|d| d.content).filter(|c| !c.is_empty());
        content.or(choice.text).filter(|t| !t.is_empty())
    }
}

/// Extracts the token carried by one complete line, if any.
///
/// Lines without the `data:` prefix, empty payloads, the `[DONE]` sentinel and
/// payloads that are not valid JSON all yield nothing.
pub fn parse_line(raw: &str) -> Option<String> {
    let payload = raw.trim().strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk.into_token(),
        Err(e) => {
            trace!("Skipping malformed stream record: {e}");
            None
        }
    }
}

/// Push-style decoder for the completion event stream.
///
/// Bytes go in as they arrive; tokens come out once the line carrying them is
/// complete. The trailing partial line stays buffered until its newline shows
/// up.
#[derive(Debug, Default)]
pub struct SseDecoder {
    text: Utf8Decoder,
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let decoded = self.text.decode(chunk);
        self.buffer.push_str(&decoded);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete.split('\n').filter_map(parse_line).collect()
    }

    /// Ends the stream. An unterminated final line is dropped, never parsed.
    pub fn finish(&mut self) {
        self.buffer.push_str(&self.text.finish());
        if !self.buffer.trim().is_empty() {
            debug!(
                "Discarding {} bytes of unterminated stream data",
                self.buffer.len()
            );
        }
        self.buffer.clear();
    }

    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}
