use crate::error::TransportError;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::Duration;

/// A single REST call an adapter or the rates oracle wants to make, independent of *how* the
/// venue wants it signed. Concrete adapters implement this per endpoint.
pub trait RestRequest {
    type Response: DeserializeOwned;

    fn method(&self) -> reqwest::Method;
    fn path(&self) -> Cow<'_, str>;
    fn query_params(&self) -> Option<Vec<(&str, String)>> {
        None
    }
    fn body(&self) -> Option<serde_json::Value> {
        None
    }
    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }
}

/// Per-venue signing/header strategy, kept separate from [`RestClient`] so the same client
/// plumbing serves both authenticated and public endpoints.
pub trait BuildStrategy {
    fn build(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, TransportError>;
}

/// No-op strategy for unauthenticated public endpoints (tickers, order books, markets).
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicStrategy;

impl BuildStrategy for PublicStrategy {
    fn build(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Request, TransportError> {
        builder.build().map_err(TransportError::from)
    }
}

/// Minimal signed-REST client. Each venue adapter owns one, parameterised by its own
/// [`BuildStrategy`] (HMAC headers, API key headers, etc.) — the call/timing/parsing plumbing
/// itself never changes.
#[derive(Debug, Clone)]
pub struct RestClient<Strategy> {
    pub http_client: reqwest::Client,
    pub base_url: String,
    pub strategy: Strategy,
}

impl<Strategy> RestClient<Strategy>
where
    Strategy: BuildStrategy,
{
    pub fn new(base_url: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            strategy,
        }
    }

    pub async fn execute<Request>(
        &self,
        request: Request,
    ) -> Result<Request::Response, TransportError>
    where
        Request: RestRequest,
    {
        let url = format!("{}{}", self.base_url, request.path());

        let mut builder = self
            .http_client
            .request(request.method(), url)
            .timeout(request.timeout());

        if let Some(query) = request.query_params() {
            builder = builder.query(&query);
        }

        if let Some(body) = request.body() {
            builder = builder.json(&body);
        }

        let built = self.strategy.build(builder)?;

        let response = self
            .http_client
            .execute(built)
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        let body_text = response.text().await.map_err(TransportError::from)?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        serde_json::from_str(&body_text).map_err(|error| TransportError::Deserialise {
            error,
            payload: body_text,
        })
    }
}
