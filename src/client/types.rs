use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

/// A single HTTP request travelling through the client chain.
/// Layers never mutate the caller's request; the ones that add headers work on a clone,
/// so the same value can be re-sent as often as a layer needs to.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// URL of the request that produced this response
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Raw body; `None` when the transport delivered no body at all
    pub body: Option<Bytes>,
}

impl Response {
    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: impl reqwest::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.status,
            headers: self.headers.clone(),
        }
    }

    /// Render status line, headers and body for error diagnostics.
    pub fn dump(&self) -> String {
        let mut dump = format!("HTTP {}\n", self.status);
        for (name, value) in &self.headers {
            dump.push_str(&format!(
                "{}: {}\n",
                name,
                value.to_str().unwrap_or("<binary>")
            ));
        }
        if let Some(body) = &self.body {
            dump.push('\n');
            dump.push_str(&String::from_utf8_lossy(body));
        }
        dump
    }
}

/// Status and headers of a response, kept without its body.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseHead {
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        RateLimitInfo::from_headers(&self.headers)
    }
}

/// Quota details GitHub reports through `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &str| headers.get(name)?.to_str().ok()?.trim().parse::<i64>().ok();

        let limit = u32::try_from(read("x-ratelimit-limit")?).ok()?;
        let remaining = u32::try_from(read("x-ratelimit-remaining")?).ok()?;
        let reset_at = DateTime::from_timestamp(read("x-ratelimit-reset")?, 0)?;

        Some(Self {
            limit,
            remaining,
            reset_at,
        })
    }
}
