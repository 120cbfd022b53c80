use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    extract::State,
    http::{self, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::Stream;
use ragrelay::encoder::RelayEncoder;
use ragrelay::errors::RelayError;
use ragrelay::models::message::Message;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::state::AppState;

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: String,
    content: String,
}

// Streamed response body carrying the relay frames
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .body(body)
            .unwrap()
    }
}

// Split the transcript into the query (the final user message) and the
// preceding conversation history.
fn split_transcript(mut messages: Vec<IncomingMessage>) -> Option<(String, Vec<Message>)> {
    let last = messages.pop()?;
    if last.role != "user" {
        return None;
    }

    let history = messages
        .into_iter()
        .filter_map(|m| match m.role.as_str() {
            "user" => Some(Message::user(m.content.clone())),
            "assistant" => Some(Message::assistant(m.content.clone())),
            other => {
                tracing::warn!("dropping history message with unknown role: {}", other);
                None
            }
        })
        .collect();

    Some((last.content, history))
}

async fn handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<SseResponse, StatusCode> {
    let (query, history) = split_transcript(request.messages).ok_or(StatusCode::BAD_REQUEST)?;

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(32);
    let stream = ReceiverStream::new(rx);

    // One encoder per request; the upstream collaborator comes from
    // application state, never from a fixed endpoint in the handler
    let encoder = RelayEncoder::new(state.pacing);
    let upstream = state.upstream.clone();

    // Spawn task to handle streaming. Upstream failure is recovered
    // in-band: the body still terminates with the sentinel.
    tokio::spawn(async move {
        match upstream.answer(&query, &history).await {
            Ok(answer) => encoder.encode(&answer, &tx).await,
            Err(e) => {
                let err = RelayError::UpstreamUnavailable(e.to_string());
                tracing::error!("{}", err);
                encoder.encode_error(&err.to_string(), &tx).await;
            }
        }
    });

    Ok(SseResponse::new(stream))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handler))
        .with_state(state)
}
