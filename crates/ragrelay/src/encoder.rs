use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::errors::RelayError;
use crate::frame::Frame;
use crate::segment::{split_units, strip_reasoning};

/// Shown when the upstream answered with nothing usable.
pub const EMPTY_ANSWER_NOTICE: &str = "The assistant did not return an answer. Please try again.";

/// Default delay between content frames.
pub const DEFAULT_PACING: Duration = Duration::from_millis(30);

/// Re-frames one finished upstream answer as a paced event stream.
///
/// One encoder per request. Frames go out through the channel in
/// order and every stream ends with exactly one sentinel, on the
/// success path and the failure path alike.
pub struct RelayEncoder {
    pacing: Duration,
}

impl Default for RelayEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

impl RelayEncoder {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    /// Stream an answer, one sentence-bounded unit per frame.
    ///
    /// An answer that is empty once reasoning markup is stripped still
    /// produces one content frame, carrying the fallback notice.
    pub async fn encode(&self, answer: &str, tx: &mpsc::Sender<String>) {
        let cleaned = strip_reasoning(answer);
        let units = split_units(&cleaned);

        if units.is_empty() {
            tracing::warn!("{}, sending fallback notice", RelayError::EmptyAnswer);
            self.emit(EMPTY_ANSWER_NOTICE, tx).await;
        } else {
            for unit in &units {
                if !self.emit(unit, tx).await {
                    // Receiver hung up, nothing left to pace
                    return;
                }
            }
        }

        let _ = tx.send(Frame::Done.to_wire()).await;
    }

    /// Stream a failure notice in place of an answer.
    ///
    /// No content frame precedes the notice, so a failed upstream call
    /// still yields a well-formed, sentinel-terminated stream.
    pub async fn encode_error(&self, description: &str, tx: &mpsc::Sender<String>) {
        let notice = format!(
            "Sorry, something went wrong while answering: {}",
            description
        );
        self.emit(&notice, tx).await;
        let _ = tx.send(Frame::Done.to_wire()).await;
    }

    // One content frame, with its display separator, then the pacing
    // pause. Returns false once the receiver is gone.
    async fn emit(&self, unit: &str, tx: &mpsc::Sender<String>) -> bool {
        let frame = Frame::content(format!("{} ", unit));
        if tx.send(frame.to_wire()).await.is_err() {
            tracing::debug!("relay receiver dropped, stopping emission");
            return false;
        }
        sleep(self.pacing).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SENTINEL;

    async fn collect_frames(answer: &str) -> Vec<String> {
        let (tx, mut rx) = mpsc::channel(32);
        let encoder = RelayEncoder::new(Duration::ZERO);
        encoder.encode(answer, &tx).await;
        drop(tx);

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    fn contents(frames: &[String]) -> Vec<String> {
        frames
            .iter()
            .filter_map(|wire| match Frame::parse(wire.trim_end()) {
                Ok(Frame::Content { content }) => Some(content),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_three_sentences_three_frames_then_sentinel() {
        let frames = collect_frames("Line one. Line two? Line three!").await;
        assert_eq!(
            contents(&frames),
            vec!["Line one. ", "Line two? ", "Line three! "]
        );
        assert_eq!(frames.last().unwrap(), &Frame::Done.to_wire());
    }

    #[tokio::test]
    async fn test_empty_answer_yields_fallback_notice() {
        let frames = collect_frames("").await;
        assert_eq!(frames.len(), 2);
        assert_eq!(contents(&frames), vec![format!("{} ", EMPTY_ANSWER_NOTICE)]);
        assert!(frames[1].contains(SENTINEL));
    }

    #[tokio::test]
    async fn test_reasoning_only_answer_yields_fallback_notice() {
        let frames = collect_frames("<think>all internal</think>").await;
        assert_eq!(contents(&frames), vec![format!("{} ", EMPTY_ANSWER_NOTICE)]);
    }

    #[tokio::test]
    async fn test_reasoning_markup_stripped_before_framing() {
        let frames = collect_frames("<think>internal</think>Final answer.").await;
        assert_eq!(contents(&frames), vec!["Final answer. "]);
    }

    #[tokio::test]
    async fn test_contents_reassemble_to_normalized_answer() {
        let answer = "First  sentence.   Second one?\nAnd a tail";
        let frames = collect_frames(answer).await;
        let reassembled: String = contents(&frames).concat();
        assert_eq!(reassembled.trim_end(), "First sentence. Second one? And a tail");
    }

    #[tokio::test]
    async fn test_error_path_is_single_notice_then_sentinel() {
        let (tx, mut rx) = mpsc::channel(32);
        let encoder = RelayEncoder::new(Duration::ZERO);
        encoder.encode_error("connection refused", &tx).await;
        drop(tx);

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        assert_eq!(frames.len(), 2);
        let notice = &contents(&frames)[0];
        assert!(notice.contains("connection refused"));
        assert_eq!(frames[1], Frame::Done.to_wire());
    }

    #[tokio::test]
    async fn test_emission_stops_when_receiver_drops() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let encoder = RelayEncoder::new(Duration::ZERO);
        // Must return rather than hang or panic once the channel closes
        encoder.encode("One. Two. Three.", &tx).await;
    }
}
