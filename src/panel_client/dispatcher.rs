//! Request Dispatcher
//!
//! Single authenticated session against the panel. Every response is
//! classified into success / transient block / hard failure, and 429/504
//! arm a process-wide cooldown during which calls fail fast without any
//! network I/O.
//!
//! The dispatcher never retries; retry policy belongs to the caller.

use super::types::{
    HttpMethod, PanelError, PanelRequest, PanelResponse, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_REQUEST_TIMEOUT, GATEWAY_TIMEOUT_COOLDOWN, RATE_LIMIT_COOLDOWN,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// `Instant::now()`
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Rate-limit deadline shared by every call site
#[derive(Debug, Default, Clone, Copy)]
pub struct CooldownState {
    blocked_until: Option<Instant>,
}

impl CooldownState {
    pub fn blocked_until(&self) -> Option<Instant> {
        self.blocked_until
    }

    /// Time left before requests may go out again
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.blocked_until
            .and_then(|deadline| deadline.checked_duration_since(now))
            .filter(|left| !left.is_zero())
    }

    /// Move the deadline to `deadline` unless it is already later
    pub fn extend_to(&mut self, deadline: Instant) -> Instant {
        let next = match self.blocked_until {
            Some(current) if current >= deadline => current,
            _ => deadline,
        };
        self.blocked_until = Some(next);
        next
    }
}

/// Panel request dispatcher
pub struct RequestDispatcher {
    base_url: String,
    api_key: String,
    timeout: Duration,
    session: RwLock<Option<Client>>,
    cooldown: Mutex<CooldownState>,
    clock: Arc<dyn Clock>,
}

impl RequestDispatcher {
    /// Create a dispatcher; the HTTP session is built on first use
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            session: RwLock::new(None),
            cooldown: Mutex::new(CooldownState::default()),
            clock: Arc::new(MonotonicClock),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================
    // Session
    // ========================================

    async fn session(&self) -> Result<Client, PanelError> {
        if let Some(client) = self.session.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut guard = self.session.write().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = self.build_client()?;
        debug!(base_url = %self.base_url, "Panel session opened");
        *guard = Some(client.clone());
        Ok(client)
    }

    fn build_client(&self) -> Result<Client, PanelError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| PanelError::network(format!("invalid API key: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(PanelError::network)
    }

    /// Release the session; the next call opens a fresh one
    pub async fn close(&self) {
        if self.session.write().await.take().is_some() {
            debug!(base_url = %self.base_url, "Panel session closed");
        }
    }

    pub async fn is_open(&self) -> bool {
        self.session.read().await.is_some()
    }

    // ========================================
    // Cooldown
    // ========================================

    /// Remaining cooldown, `None` when requests may go out
    pub async fn cooldown_remaining(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.cooldown.lock().await.remaining(now)
    }

    async fn ensure_not_blocked(&self) -> Result<(), PanelError> {
        if let Some(retry_after) = self.cooldown_remaining().await {
            warn!(
                wait_secs = retry_after.as_secs_f64(),
                "API requests are rate limited, blocking call"
            );
            return Err(PanelError::RateLimited { retry_after });
        }
        Ok(())
    }

    /// Arm the cooldown for `duration` from now and return what is left of it
    async fn arm_cooldown(&self, duration: Duration) -> Duration {
        let now = self.clock.now();
        let mut state = self.cooldown.lock().await;
        let deadline = state.extend_to(now + duration);
        deadline.saturating_duration_since(now)
    }

    // ========================================
    // Dispatch
    // ========================================

    fn url(&self, path: &str) -> String {
        if path.is_empty() || path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// GET shortcut
    pub async fn get(&self, path: &str) -> Result<PanelResponse, PanelError> {
        self.execute(PanelRequest::get(path)).await
    }

    /// Perform one call and classify the response
    pub async fn execute(&self, request: PanelRequest) -> Result<PanelResponse, PanelError> {
        self.ensure_not_blocked().await?;
        let client = self.session().await?;

        let url = self.url(&request.path);
        debug!(method = %request.method, url = %url, "Panel request");

        let mut builder = client.request(request.method.into(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            if matches!(request.method, HttpMethod::Post | HttpMethod::Put) {
                builder = builder.json(body);
            }
        }

        let response = builder.send().await.map_err(|e| {
            error!(method = %request.method, url = %url, error = %e, "Panel request failed");
            PanelError::network(e)
        })?;

        self.classify(request.method, &url, response).await
    }

    async fn classify(
        &self,
        method: HttpMethod,
        url: &str,
        response: reqwest::Response,
    ) -> Result<PanelResponse, PanelError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(url = %url, error = %e, "Failed to read panel response body");
            PanelError::network(e)
        })?;

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = self.arm_cooldown(RATE_LIMIT_COOLDOWN).await;
                error!(url = %url, "Rate limit hit (429), blocking API calls for 60 seconds");
                Err(PanelError::RateLimited { retry_after })
            }
            StatusCode::GATEWAY_TIMEOUT => {
                self.arm_cooldown(GATEWAY_TIMEOUT_COOLDOWN).await;
                error!(url = %url, "Gateway timeout (504), blocking API calls for 10 minutes");
                Err(PanelError::GatewayTimeout)
            }
            StatusCode::NO_CONTENT => Ok(PanelResponse::NoContent),
            s if s.is_success() => {
                if body.trim().is_empty() {
                    return Ok(PanelResponse::NoContent);
                }
                match serde_json::from_str::<serde_json::Value>(&body) {
                    Ok(value) => Ok(PanelResponse::Json(value)),
                    Err(e) => {
                        warn!(url = %url, error = %e, "Panel returned a non-JSON success body");
                        Err(PanelError::HardFailure {
                            status: s.as_u16(),
                            body,
                        })
                    }
                }
            }
            s => {
                warn!(method = %method, url = %url, status = s.as_u16(), "Panel request rejected");
                Err(PanelError::HardFailure {
                    status: s.as_u16(),
                    body,
                })
            }
        }
    }

    /// Fetch raw bytes from an absolute (signed) URL under the same cooldown
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, PanelError> {
        self.ensure_not_blocked().await?;
        let client = self.session().await?;

        let response = client.get(url).send().await.map_err(|e| {
            error!(error = %e, "File download failed");
            PanelError::network(e)
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = self.arm_cooldown(RATE_LIMIT_COOLDOWN).await;
            error!("Rate limit hit (429) during download, blocking API calls for 60 seconds");
            return Err(PanelError::RateLimited { retry_after });
        }
        if status != StatusCode::OK {
            let body = response.text().await.map_err(|e| {
                error!(status = status.as_u16(), error = %e, "Failed to read download error body");
                PanelError::network(e)
            })?;
            return Err(PanelError::HardFailure {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(PanelError::network)?;
        info!(size = bytes.len(), "File downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Clock;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Clock that only moves when told to
    pub struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }
}
