use anyhow::Result;
use async_trait::async_trait;

use crate::models::message::Message;

/// The answer-generation service the relay fronts.
///
/// The relay never interprets how an answer was produced; it only
/// needs one complete string per turn. Handlers take this as an
/// injected dependency so tests can substitute a scripted fake.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Ask for one complete answer to `query`, given the prior turns.
    async fn answer(&self, query: &str, history: &[Message]) -> Result<String>;
}
