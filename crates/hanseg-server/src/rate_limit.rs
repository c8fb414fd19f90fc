use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tower::{Layer, Service};
use tracing::warn;

const LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct RateLimiterLayer {
    rate_per_sec: f64,
    burst: f64,
}

impl RateLimiterLayer {
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        Self {
            rate_per_sec: rate_per_sec as f64,
            burst: burst as f64,
        }
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            buckets: Arc::new(DashMap::new()),
            dropped: Arc::new(DropCounter {
                since_log: AtomicU64::new(0),
                last_log: Mutex::new(Instant::now()),
            }),
            rate_per_sec: self.rate_per_sec,
            burst: self.burst,
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter<S> {
    inner: S,
    buckets: Arc<DashMap<String, Bucket>>,
    dropped: Arc<DropCounter>,
    rate_per_sec: f64,
    burst: f64,
}

struct DropCounter {
    since_log: AtomicU64,
    last_log: Mutex<Instant>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, rate_per_sec: f64, burst: f64) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * rate_per_sec).min(burst);
            self.last_refill = now;
        }
    }

    fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl<S, ReqBody> Service<axum::http::Request<ReqBody>> for RateLimiter<S>
where
    S: Service<axum::http::Request<ReqBody>, Response = axum::http::Response<axum::body::Body>>
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: axum::http::Request<ReqBody>) -> Self::Future {
        if let Some(client) = client_id(&req)
            && !self.check_and_consume(&client)
        {
            self.dropped.since_log.fetch_add(1, Ordering::Relaxed);
            self.log_drops_if_due();
            return Box::pin(async move {
                Ok(axum::http::Response::builder()
                    .status(axum::http::StatusCode::TOO_MANY_REQUESTS)
                    .body(axum::body::Body::from("rate limited"))
                    .unwrap())
            });
        }

        let fut = self.inner.call(req);
        Box::pin(async move { fut.await })
    }
}

// First hop of X-Forwarded-For when a proxy fronts the service; direct
// connections are not limited.
fn client_id<B>(req: &axum::http::Request<B>) -> Option<String> {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl<S> RateLimiter<S> {
    fn check_and_consume(&self, client: &str) -> bool {
        let mut bucket = self.buckets.entry(client.to_string()).or_insert(Bucket {
            tokens: self.burst,
            last_refill: Instant::now(),
        });
        bucket.refill(self.rate_per_sec, self.burst);
        bucket.try_consume()
    }

    fn log_drops_if_due(&self) {
        let now = Instant::now();
        let mut last = self.dropped.last_log.lock().unwrap();
        if now.saturating_duration_since(*last) >= LOG_INTERVAL {
            let dropped = self.dropped.since_log.swap(0, Ordering::Relaxed);
            if dropped > 0 {
                warn!("rate limiter dropped {dropped} requests in the last minute");
            }
            *last = now;
        }
    }
}
