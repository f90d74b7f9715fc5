use thiserror::Error;

/// Transport-level errors shared by every REST-speaking component (exchange adapters, the
/// rates oracle). Distinct from [`ladder_execution`](../../ladder_execution)'s `AdapterError`
/// taxonomy, which classifies *what an adapter call means to the engine*; this type only
/// classifies *why the wire call itself failed*.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("error building request: {0}")]
    Build(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("error parsing url: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("deserialising JSON error: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out")]
    Timeout,
}

impl TransportError {
    /// Whether the engine should treat this as transient and retry on the next tick.
    pub fn is_temporary(&self) -> bool {
        match self {
            TransportError::Http(err) => err.is_timeout() || err.is_connect(),
            TransportError::Timeout => true,
            TransportError::Status { status,.. } => *status == 429 || *status >= 500,
            TransportError::Build(_)
            | TransportError::UrlParse(_)
            | TransportError::Deserialise { .. } => false,
        }
    }
}
