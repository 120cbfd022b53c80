use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::{RelayError, RelayResult};

/// Tag carried by every meaningful line on the wire
pub const DATA_PREFIX: &str = "data: ";
/// Reserved payload marking end of stream
pub const SENTINEL: &str = "[DONE]";
/// Terminator between frames
pub const FRAME_END: &str = "\n\n";

#[derive(Debug, Serialize, Deserialize)]
struct FramePayload {
    content: String,
}

/// One wire-level record: a content delta or the end-of-stream marker
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Content { content: String },
    Done,
}

impl Frame {
    pub fn content<S: Into<String>>(content: S) -> Self {
        Frame::Content {
            content: content.into(),
        }
    }

    /// Serialize for the response stream
    pub fn to_wire(&self) -> String {
        match self {
            Frame::Content { content } => {
                format!("{}{}{}", DATA_PREFIX, json!({ "content": content }), FRAME_END)
            }
            Frame::Done => format!("{}{}{}", DATA_PREFIX, SENTINEL, FRAME_END),
        }
    }

    /// Parse one terminator-delimited block.
    ///
    /// Only the first `data: ` line is interpreted; lines with other
    /// tags are skipped so newer producers stay compatible with this
    /// parser.
    pub fn parse(block: &str) -> RelayResult<Frame> {
        for line in block.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
                if payload.trim() == SENTINEL {
                    return Ok(Frame::Done);
                }
                let payload: FramePayload = serde_json::from_str(payload)
                    .map_err(|e| RelayError::MalformedFrame(format!("invalid payload: {}", e)))?;
                return Ok(Frame::Content {
                    content: payload.content,
                });
            }
        }
        Err(RelayError::MalformedFrame(
            "no data line in frame".to_string(),
        ))
    }
}
