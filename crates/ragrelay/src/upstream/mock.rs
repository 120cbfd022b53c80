use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::base::Upstream;
use crate::models::message::Message;

/// A scripted upstream for tests.
///
/// Lives outside `cfg(test)` so downstream crates can inject it into
/// their own route and client tests.
pub struct MockUpstream {
    responses: Arc<Mutex<Vec<Result<String, String>>>>,
}

impl MockUpstream {
    /// A mock that answers with the given responses, in order
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.into_iter().map(|r| Ok(r.into())).collect(),
            )),
        }
    }

    /// A mock whose every call fails with the given description
    pub fn failing<S: Into<String>>(error: S) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(error.into())])),
        }
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn answer(&self, _query: &str, _history: &[Message]) -> Result<String> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return an empty answer once the script runs out
            Ok(String::new())
        } else {
            responses.remove(0).map_err(|e| anyhow!(e))
        }
    }
}
