use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};
use tracing::debug;

use super::{ClientError, HttpClient, Request, Response};

const DEFAULT_USER_AGENT: &str = concat!("pr-harvest/", env!("CARGO_PKG_VERSION"));

/// Bottom of the chain: performs the actual HTTP exchange with `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut headers = request.headers.clone();
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|err| ClientError::transport(&request.url, err))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| ClientError::transport(&request.url, err))?;
        debug!(url = %request.url, %status, body_bytes = body.len(), "received response");

        Ok(Response {
            url: request.url.clone(),
            status,
            headers,
            body: Some(body),
        })
    }
}
