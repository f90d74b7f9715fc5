use thiserror::Error;

/// The adapter-facing error taxonomy of spec §7, restricted to the three shapes an
/// [`ExchangeAdapter`](crate::adapter::ExchangeAdapter) call can return (§4.1): success,
/// upstream error (temporary or permanent), or protocol error. `Auth` and `Unsupported` are
/// broken out of "upstream" because the engine reacts to them differently (§7 policy column)
/// even though a venue usually signals both via an ordinary HTTP response.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// 429/5xx/timeout/nonce-skew: the engine skips this tick and retries next tick.
    #[error("upstream temporary error{}: {message}", code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    UpstreamTemporary {
        code: Option<String>,
        message: String,
    },

    /// Insufficient balance, below minimum, rejected order: the engine marks the rung
    /// `not-placed` and does not retry until reinit or config change.
    #[error("upstream permanent error{}: {message}", code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    UpstreamPermanent {
        code: Option<String>,
        message: String,
    },

    /// Malformed response / missing field: log and continue, never mutate state for that record.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Venue lacks the capability (see [`AdapterCapabilities`](crate::capabilities::AdapterCapabilities)).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Bad API key / expired signature: the engine stops trading loops but keeps the
    /// dispatcher alive to surface the error.
    #[error("auth error: {0}")]
    Auth(String),

    /// Bad pair, negative amount, unknown purpose: returned before any call reaches the venue.
    #[error("validation error: {0}")]
    Validation(String),

    /// An order exists on the venue with no matching local record. Never cancelled silently;
    /// only surfaced so the `Reconciler` can record it.
    #[error("inconsistency: {0}")]
    Inconsistency(String),
}

impl AdapterError {
    /// `true` when the engine should retry on the next scheduled tick rather than treat the
    /// failure as final.
    pub fn is_temporary(&self) -> bool {
        matches!(self, AdapterError::UpstreamTemporary { .. })
    }

    pub fn upstream_temporary(message: impl Into<String>) -> Self {
        Self::UpstreamTemporary {
            code: None,
            message: message.into(),
        }
    }

    pub fn upstream_permanent(message: impl Into<String>) -> Self {
        Self::UpstreamPermanent {
            code: None,
            message: message.into(),
        }
    }
}
