use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior};

use super::{ClientError, HttpClient, Request, Response};

/// Periodic ticker shared by every clone; each caller waits for its own tick.
/// Ticks missed while idle are not saved up, so there are no bursts.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    ticks: Arc<Mutex<Interval>>,
}

impl RateLimiter {
    /// Must be called inside a tokio runtime. `period` must be non-zero.
    pub fn new(period: Duration) -> Self {
        let mut ticks = tokio::time::interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticks: Arc::new(Mutex::new(ticks)),
        }
    }

    pub async fn wait(&self) {
        self.ticks.lock().await.tick().await;
    }
}

/// Spaces out the requests going through it to stay under GitHub's abuse radar.
pub struct RateLimiting<C> {
    inner: C,
    limiter: Option<RateLimiter>,
}

impl<C> RateLimiting<C> {
    pub fn new(inner: C, limiter: Option<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for RateLimiting<C> {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }
        self.inner.send(request).await
    }
}
