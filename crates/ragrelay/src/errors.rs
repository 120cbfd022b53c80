use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize)]
pub enum RelayError {
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Transport interrupted before end of stream")]
    TransportInterrupted { partial: String },

    #[error("Upstream returned an empty answer")]
    EmptyAnswer,
}

pub type RelayResult<T> = Result<T, RelayError>;
