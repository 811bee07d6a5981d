use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;

use super::{ClientError, HttpClient, Request, Response};

/// Waits and re-sends when GitHub's abuse detection answers with
/// `403` and a `Retry-After` header (seconds, possibly fractional).
///
/// See <https://docs.github.com/en/rest/using-the-rest-api/best-practices-for-using-the-rest-api>.
pub struct AbusePreventing<C> {
    inner: C,
}

impl<C> AbusePreventing<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for AbusePreventing<C> {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        loop {
            let response = self.inner.send(request).await?;
            let Some(delay) = retry_after(&response) else {
                return Ok(response);
            };
            warn!(url = %request.url, delay_secs = delay.as_secs_f64(), "abuse detection triggered, backing off");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Back-off requested by the server, if this is an abuse-detection response.
fn retry_after(response: &Response) -> Option<Duration> {
    if response.status != StatusCode::FORBIDDEN {
        return None;
    }
    let seconds = response.header(RETRY_AFTER)?.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
