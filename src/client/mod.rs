//! HTTP client chain aware of GitHub's rules: retries, rate limiting,
//! abuse detection back-off, authentication and status code errors.

pub mod abuse_preventing;
pub mod authenticating;
pub mod error_wrapping;
pub mod rate_limiting;
pub mod retrying;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use abuse_preventing::AbusePreventing;
pub use authenticating::{Authenticating, Credentials};
pub use error_wrapping::ErrorWrapping;
pub use rate_limiting::{RateLimiter, RateLimiting};
pub use retrying::Retrying;
pub use transport::ReqwestTransport;
pub use types::{RateLimitInfo, Request, Response, ResponseHead};

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unexpected HTTP status {status} for {url}\n{dump}")]
    Status {
        url: Url,
        status: reqwest::StatusCode,
        dump: String,
    },

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl ClientError {
    pub fn transport(url: &Url, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ClientError::Transport {
            url: url.clone(),
            source: source.into(),
        }
    }

    /// Whether the error came from the network rather than from the server's answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }
}

/// Anything that turns a [`Request`] into a [`Response`].
/// Every layer of the chain implements it and wraps another implementation.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, ClientError>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        (**self).send(request).await
    }
}

/// Settings for the whole chain built by [`build`].
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub credentials: Option<Credentials>,
    /// Minimum spacing between requests; `None` or zero disables limiting
    pub rate_limit: Option<Duration>,
    /// Additional attempts after a transport error
    pub max_retries: u32,
    /// Emit one log line per completed request
    pub log_requests: bool,
}

/// Chain all the layers together, outermost first:
/// `Client → ErrorWrapping → Authenticating → AbusePreventing → RateLimiting → Retrying → transport`.
///
/// Retries sit below rate limiting so every retry still waits for its tick, and
/// authentication sits above abuse prevention so re-sent requests stay authenticated.
pub fn build<T: HttpClient + 'static>(transport: T, options: Options) -> Client {
    let retrying = Retrying::new(transport, options.max_retries);
    let limiter = options
        .rate_limit
        .filter(|period| !period.is_zero())
        .map(RateLimiter::new);
    let rate_limiting = RateLimiting::new(retrying, limiter);
    let abuse_preventing = AbusePreventing::new(rate_limiting);
    let authenticating = Authenticating::new(abuse_preventing, options.credentials);
    let error_wrapping = ErrorWrapping::new(authenticating);
    Client::new(error_wrapping, options.log_requests)
}

/// Top of the chain. Remembers the head of the last response so callers can
/// inspect rate-limit headers, and optionally logs every request.
pub struct Client {
    inner: Box<dyn HttpClient>,
    last_response: Mutex<Option<ResponseHead>>,
    log_requests: bool,
}

impl Client {
    pub fn new(inner: impl HttpClient + 'static, log_requests: bool) -> Self {
        Self {
            inner: Box::new(inner),
            last_response: Mutex::new(None),
            log_requests,
        }
    }

    /// Head of whichever request completed most recently; `None` if it failed.
    pub fn last_response(&self) -> Option<ResponseHead> {
        self.last_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl HttpClient for Client {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let result = self.inner.send(request).await;

        *self
            .last_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = result.as_ref().ok().map(Response::head);

        if self.log_requests {
            info!(method = %request.method, url = %request.url, "DONE");
        }

        result
    }
}
