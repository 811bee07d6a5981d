use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use std::fmt;

use super::{ClientError, HttpClient, Request, Response};

/// GitHub user name plus personal access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    fn apply(&self, headers: &mut HeaderMap) -> Result<(), ClientError> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.token));
        let mut authorization = HeaderValue::from_str(&format!("Basic {encoded}"))?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.username)?);
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Adds basic authentication and a `User-Agent` equal to the user name.
/// Without credentials requests pass through unmodified.
pub struct Authenticating<C> {
    inner: C,
    credentials: Option<Credentials>,
}

impl<C> Authenticating<C> {
    pub fn new(inner: C, credentials: Option<Credentials>) -> Self {
        Self { inner, credentials }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for Authenticating<C> {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let Some(credentials) = &self.credentials else {
            return self.inner.send(request).await;
        };
        let mut authenticated = request.clone();
        credentials.apply(&mut authenticated.headers)?;
        self.inner.send(&authenticated).await
    }
}
