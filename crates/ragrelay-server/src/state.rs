use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ragrelay::upstream::base::Upstream;
use ragrelay::upstream::http::HttpUpstream;

use crate::configuration::Settings;

/// Shared application state
///
/// The upstream collaborator is held as a trait object so request
/// handlers stay decoupled from any particular endpoint and tests can
/// inject a scripted fake.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
    pub upstream_host: String,
    pub pacing: Duration,
}

impl AppState {
    pub fn new(upstream: Arc<dyn Upstream>, upstream_host: String, pacing: Duration) -> Self {
        Self {
            upstream,
            upstream_host,
            pacing,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let upstream = HttpUpstream::new(settings.upstream.to_config())?;
        Ok(Self::new(
            Arc::new(upstream),
            settings.upstream.host.clone(),
            settings.relay.pacing(),
        ))
    }
}
