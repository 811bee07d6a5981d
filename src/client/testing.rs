//! Scripted stand-ins for the network, shared by the client and pager tests.

use super::{ClientError, HttpClient, Request, Response};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

type Script = Box<dyn Fn(usize) -> Result<Response, ClientError> + Send + Sync>;

/// Answers each call from a script indexed by call number and records what it was sent.
pub struct ScriptedClient {
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedClient {
    /// Play `responses` in order; panics if called more often than scripted.
    pub fn new(responses: Vec<Result<Response, ClientError>>) -> Self {
        let responses = Mutex::new(responses.into_iter().map(Some).collect::<Vec<_>>());
        Self::from_fn(move |call| {
            responses
                .lock()
                .unwrap()
                .get_mut(call)
                .and_then(Option::take)
                .unwrap_or_else(|| panic!("should not be called a {}th time", call + 1))
        })
    }

    pub fn always(
        response: impl Fn() -> Result<Response, ClientError> + Send + Sync + 'static,
    ) -> Self {
        Self::from_fn(move |_| response())
    }

    pub fn from_fn(
        script: impl Fn(usize) -> Result<Response, ClientError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(call)
    }
}

pub fn dummy_request() -> Request {
    Request::get(Url::parse("http://example.com/url1").unwrap())
}

pub fn response(status: u16, headers: &[(&str, &str)]) -> Result<Response, ClientError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    Ok(Response {
        url: dummy_request().url,
        status: StatusCode::from_u16(status).unwrap(),
        headers: map,
        body: Some(bytes::Bytes::new()),
    })
}

pub fn successful_response() -> Result<Response, ClientError> {
    response(200, &[("Success", "yes")])
}
