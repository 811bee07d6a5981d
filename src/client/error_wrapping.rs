use async_trait::async_trait;

use super::{ClientError, HttpClient, Request, Response};

/// Turns any response with a status code of 300 or more into [`ClientError::Status`].
pub struct ErrorWrapping<C> {
    inner: C,
}

impl<C> ErrorWrapping<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ErrorWrapping<C> {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let response = self.inner.send(request).await?;
        if response.status.as_u16() >= 300 {
            return Err(ClientError::Status {
                url: request.url.clone(),
                status: response.status,
                dump: response.dump(),
            });
        }
        Ok(response)
    }
}
