use bytes::BytesMut;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::errors::{RelayError, RelayResult};
use crate::frame::Frame;

/// One display-layer notification: the delta just applied and the
/// cumulative message after applying it.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageUpdate {
    pub delta: String,
    pub assembled: String,
}

/// Reassembles logical frames from an arbitrarily chunked byte stream.
///
/// One decoder per stream, not reusable. The transport may deliver a
/// byte at a time, a frame at a time, or anything in between; frames
/// are extracted as soon as their terminator arrives, so the buffer
/// never holds more than one partial frame.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: BytesMut,
    assembled: String,
    done: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb newly received bytes and return the content deltas of
    /// every frame they completed, in arrival order.
    ///
    /// Malformed frames are logged and skipped; they never abort the
    /// stream or corrupt the assembled message.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            // Anything after the sentinel is not ours to interpret
            return deltas;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(end) = find_terminator(&self.buffer) {
            let block = self.buffer.split_to(end + 2);
            let block = match std::str::from_utf8(&block[..end]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("skipping frame with invalid utf-8: {}", e);
                    continue;
                }
            };
            match Frame::parse(block) {
                Ok(Frame::Done) => {
                    self.done = true;
                    break;
                }
                Ok(Frame::Content { content }) => {
                    self.assembled.push_str(&content);
                    deltas.push(content);
                }
                Err(e) => {
                    tracing::warn!("skipping malformed frame: {}", e);
                }
            }
        }
        deltas
    }

    /// The full message assembled so far.
    pub fn assembled(&self) -> &str {
        &self.assembled
    }

    /// Whether the sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume the decoder at end of transport.
    ///
    /// If the stream stopped before the sentinel the error still
    /// carries whatever was assembled, so late failures never discard
    /// partial output.
    pub fn finish(self) -> RelayResult<String> {
        if self.done {
            Ok(self.assembled)
        } else {
            Err(RelayError::TransportInterrupted {
                partial: self.assembled,
            })
        }
    }
}

fn find_terminator(buffer: &BytesMut) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\n\n")
}

/// Lazily decode a fallible byte stream into cumulative message
/// updates.
///
/// The stream ends after the sentinel; if the transport stops or
/// errors first, the final item is a `TransportInterrupted` carrying
/// the partial message.
pub fn updates<S, B, E>(bytes: S) -> BoxStream<'static, Result<MessageUpdate, RelayError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send,
{
    Box::pin(async_stream::try_stream! {
        let mut decoder = StreamDecoder::new();
        let mut bytes = Box::pin(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::error!("transport failed mid-stream: {}", e);
                RelayError::TransportInterrupted {
                    partial: decoder.assembled().to_string(),
                }
            })?;

            for delta in decoder.feed(chunk.as_ref()) {
                yield MessageUpdate {
                    delta,
                    assembled: decoder.assembled().to_string(),
                };
            }
            if decoder.is_done() {
                break;
            }
        }

        if !decoder.is_done() {
            Err(RelayError::TransportInterrupted {
                partial: decoder.assembled().to_string(),
            })?;
        }
    })
}
