use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::base::Upstream;
use crate::models::message::Message;

/// Default timeout for one upstream answer. Generation is slow; the
/// relay waits rather than races it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Ordered candidate keys probed for the answer text.
const ANSWER_KEYS: [&str; 3] = ["response", "answer", "text"];

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub host: String,
    pub timeout: Duration,
}

/// HTTP client for the answer service's `/chat` endpoint.
pub struct HttpUpstream {
    client: Client,
    config: UpstreamConfig,
}

impl HttpUpstream {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }
}

/// Pick the answer text out of an upstream response object.
///
/// The first candidate key holding a string wins; a response with none
/// of them is passed through serialized, so the caller still gets
/// something displayable rather than a hard failure.
fn extract_answer(data: &Value) -> String {
    for key in ANSWER_KEYS {
        if let Some(text) = data.get(key).and_then(|v| v.as_str()) {
            return text.to_string();
        }
    }
    data.to_string()
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn answer(&self, query: &str, history: &[Message]) -> Result<String> {
        let url = format!("{}/chat", self.config.host.trim_end_matches('/'));

        let conversation_history: Vec<Value> = history
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();
        let payload = json!({
            "query": query,
            "conversation_history": conversation_history,
        });

        let response = self.client.post(&url).json(&payload).send().await?;

        match response.status() {
            StatusCode::OK => {
                let data: Value = response.json().await?;
                Ok(extract_answer(&data))
            }
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => Err(anyhow!("Request failed: {}", status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response_body: Value) -> (MockServer, HttpUpstream) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let upstream = HttpUpstream::new(UpstreamConfig {
            host: mock_server.uri(),
            timeout: DEFAULT_TIMEOUT,
        })
        .unwrap();
        (mock_server, upstream)
    }

    #[test]
    fn test_extract_answer_candidate_order() {
        let data = json!({ "answer": "second", "response": "first", "text": "third" });
        assert_eq!(extract_answer(&data), "first");

        let data = json!({ "text": "third", "answer": "second" });
        assert_eq!(extract_answer(&data), "second");

        let data = json!({ "text": "third" });
        assert_eq!(extract_answer(&data), "third");
    }

    #[test]
    fn test_extract_answer_skips_non_string_candidates() {
        let data = json!({ "response": 17, "answer": "usable" });
        assert_eq!(extract_answer(&data), "usable");
    }

    #[test]
    fn test_extract_answer_falls_back_to_serialized_object() {
        let data = json!({ "sources": ["a.pdf"] });
        assert_eq!(extract_answer(&data), r#"{"sources":["a.pdf"]}"#);
    }

    #[tokio::test]
    async fn test_answer_basic() -> Result<()> {
        let (_server, upstream) = setup_mock_server(json!({
            "response": "The line runs at 40 units per hour.",
            "sources": ["manual.pdf"]
        }))
        .await;

        let history = vec![Message::user("earlier question")];
        let answer = upstream.answer("How fast is the line?", &history).await?;
        assert_eq!(answer, "The line runs at 40 units per hour.");
        Ok(())
    }

    #[tokio::test]
    async fn test_request_carries_query_and_history() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(json!({
                "query": "and now?",
                "conversation_history": [
                    { "role": "user", "content": "first" },
                    { "role": "assistant", "content": "reply" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "ok" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let upstream = HttpUpstream::new(UpstreamConfig {
            host: mock_server.uri(),
            timeout: DEFAULT_TIMEOUT,
        })?;

        let history = vec![Message::user("first"), Message::assistant("reply")];
        upstream.answer("and now?", &history).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let upstream = HttpUpstream::new(UpstreamConfig {
            host: mock_server.uri(),
            timeout: DEFAULT_TIMEOUT,
        })?;

        let result = upstream.answer("anyone?", &[]).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Server error: 500"));
        Ok(())
    }

    #[tokio::test]
    async fn test_client_error() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let upstream = HttpUpstream::new(UpstreamConfig {
            host: mock_server.uri(),
            timeout: DEFAULT_TIMEOUT,
        })?;

        let result = upstream.answer("anyone?", &[]).await;
        assert!(result.unwrap_err().to_string().contains("Request failed: 404"));
        Ok(())
    }
}
