use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::state::AppState;

/// Fixed-window request counter keyed by client address
#[derive(Clone)]
pub struct RateLimiter {
    requests: u32,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, (Instant, u32)>>>,
}

impl RateLimiter {
    pub fn new(requests: u32, window_secs: u64) -> Self {
        Self {
            requests,
            window: Duration::from_secs(window_secs),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one request for `key`; false once the window is full
    pub async fn admit(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        windows.retain(|_, (start, _)| now.duration_since(*start) < self.window);
        let (_, count) = windows.entry(key.to_string()).or_insert((now, 0));
        if *count >= self.requests {
            return false;
        }
        *count += 1;
        true
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.api.enable_rate_limiting {
        return Ok(next.run(request).await);
    }

    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.limiter.admit(&key, Instant::now()).await {
        tracing::warn!("Rate limit exceeded for {}", key);
        return Err(ApiError::too_many_requests("Too Many Requests"));
    }
    Ok(next.run(request).await)
}
