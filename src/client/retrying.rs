use async_trait::async_trait;
use tracing::debug;

use super::{ClientError, HttpClient, Request, Response};

/// Re-sends a request right away when the transport fails.
/// Errors built from a server response are returned untouched.
pub struct Retrying<C> {
    inner: C,
    max_retries: u32,
}

impl<C> Retrying<C> {
    pub fn new(inner: C, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for Retrying<C> {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut result = self.inner.send(request).await;
        let mut retries_left = self.max_retries;

        while retries_left > 0 {
            match &result {
                Err(err) if err.is_transport() => {
                    retries_left -= 1;
                    debug!(url = %request.url, retries_left, error = %err, "retrying after transport error");
                }
                _ => break,
            }
            result = self.inner.send(request).await;
        }

        result
    }
}
