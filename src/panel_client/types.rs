//! Panel Client Type Definitions
//!
//! Request/response shapes, the failure taxonomy and the typed payloads
//! decoded from the panel's `{"data": [{"attributes": {...}}]}` envelopes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

// ============================================================
// Constants
// ============================================================

/// Panel client API root
pub const DEFAULT_BASE_URL: &str = "https://games.bisecthosting.com/api/client";

/// Cooldown armed by a 429 response
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Cooldown armed by a 504 response
pub const GATEWAY_TIMEOUT_COOLDOWN: Duration = Duration::from_secs(600);

/// Per-request transport timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Message carried by the synthetic no-content payload
pub const NO_CONTENT_MESSAGE: &str = "Request completed successfully.";

// ============================================================
// Errors
// ============================================================

/// Failure taxonomy for a single panel call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    /// 429 observed now or earlier; no request was (or will be) sent
    /// until `retry_after` has elapsed
    #[error("API rate limited, retry in {:.1}s", .retry_after.as_secs_f64())]
    RateLimited { retry_after: Duration },

    /// 504 from the gateway; requests are paused for ten minutes
    #[error("API gateway timeout (504), requests paused for 10 minutes")]
    GatewayTimeout,

    /// Any other non-success status, surfaced verbatim
    #[error("API request failed: {status} - {body}")]
    HardFailure { status: u16, body: String },

    /// No response at all (connect failure, timeout, broken body)
    #[error("Network error: {cause}")]
    NetworkError { cause: String },
}

impl PanelError {
    /// Rate limit and gateway timeout clear on their own
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::GatewayTimeout)
    }

    /// Delay after which a transient failure is expected to clear
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            Self::GatewayTimeout => Some(GATEWAY_TIMEOUT_COOLDOWN),
            _ => None,
        }
    }

    pub(crate) fn network(err: impl std::fmt::Display) -> Self {
        Self::NetworkError {
            cause: err.to_string(),
        }
    }
}

// ============================================================
// Requests / Responses
// ============================================================

/// Methods the panel API accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One call against the panel, relative to the dispatcher's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl PanelRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Put, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Append a query parameter (URL-encoded when sent)
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Successful outcome of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum PanelResponse {
    /// 200/201 with a JSON body
    Json(serde_json::Value),
    /// 204 or an empty body
    NoContent,
}

impl PanelResponse {
    /// Render as JSON; no-content becomes `{"message": "Request completed successfully."}`
    pub fn into_value(self) -> serde_json::Value {
        match self {
            Self::Json(value) => value,
            Self::NoContent => serde_json::json!({ "message": NO_CONTENT_MESSAGE }),
        }
    }

    /// Decode into a typed payload
    pub fn decode<T: DeserializeOwned>(self) -> crate::Result<T> {
        Ok(serde_json::from_value(self.into_value())?)
    }

    /// `message` field if the panel sent one
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Json(value) => value.get("message").and_then(|m| m.as_str()),
            Self::NoContent => Some(NO_CONTENT_MESSAGE),
        }
    }
}

// ============================================================
// Envelopes / Pagination
// ============================================================

/// `{"attributes": {...}}` wrapper around every panel object
#[derive(Debug, Clone, Deserialize)]
pub struct Resource<T> {
    pub attributes: Option<T>,
}

/// Listing response: `{"data": [...], "meta": {"pagination": {...}}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<Resource<T>>,
    #[serde(default)]
    pub meta: ListMeta,
}

impl<T> ListEnvelope<T> {
    /// Attribute payloads, skipping entries without attributes
    pub fn into_items(self) -> Vec<T> {
        self.data.into_iter().filter_map(|r| r.attributes).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// One fetched page of a paginated collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
}

// ============================================================
// Typed payloads
// ============================================================

/// Entry of the server listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteServer {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Server details (limits)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerDetails {
    #[serde(default, deserialize_with = "null_as_default")]
    pub identifier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub limits: ServerLimits,
}

/// Resource limits in MiB / percent, 0 meaning unlimited
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerLimits {
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disk: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpu: u64,
}

/// `GET /servers/{id}/resources`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceUsage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: ResourceStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory_bytes: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpu_absolute: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disk_bytes: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub network_rx_bytes: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub network_tx_bytes: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uptime: u64,
}

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

impl ResourceUsage {
    pub fn is_running(&self) -> bool {
        self.current_state == "running"
    }

    pub fn memory_gib(&self) -> f64 {
        self.resources.memory_bytes as f64 / GIB
    }

    pub fn disk_gib(&self) -> f64 {
        self.resources.disk_bytes as f64 / GIB
    }
}

/// Power signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSignal {
    Start,
    Stop,
    Restart,
    Kill,
}

impl PowerSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Kill => "kill",
        }
    }
}

impl std::str::FromStr for PowerSignal {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "kill" => Ok(Self::Kill),
            other => Err(crate::Error::Validation(format!(
                "unknown power signal: {}",
                other
            ))),
        }
    }
}

/// Directory listing entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_file: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
}

/// One move inside `files/rename`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEntry {
    pub from: String,
    pub to: String,
}

/// `{"attributes": {"url": ...}}` from `files/download`
#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrl {
    #[serde(default)]
    pub url: Option<String>,
}

/// Player roster entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Player {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default = "unknown_username", deserialize_with = "username_or_unknown")]
    pub username: String,
    #[serde(default = "unknown_status", deserialize_with = "status_or_unknown")]
    pub status: String,
    #[serde(default)]
    pub last_seen: Option<String>,
}

fn unknown_username() -> String {
    "Unknown".to_string()
}

fn unknown_status() -> String {
    "unknown".to_string()
}

/// Panel announcement
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Announcement {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default = "default_announcement_title", deserialize_with = "title_or_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default = "default_announcement_color", deserialize_with = "color_or_default")]
    pub color: String,
    #[serde(default = "default_true", deserialize_with = "dismissible_or_true")]
    pub dismissible: bool,
}

fn default_announcement_title() -> String {
    "Announcement".to_string()
}

fn default_announcement_color() -> String {
    "#3498db".to_string()
}

fn default_true() -> bool {
    true
}

impl Announcement {
    /// `#rrggbb` as an integer, `None` when malformed
    pub fn color_rgb(&self) -> Option<u32> {
        u32::from_str_radix(self.color.trim_start_matches('#'), 16).ok()
    }
}

/// Explicit `null` decodes like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_or<'de, D, T>(deserializer: D, fallback: fn() -> T) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_else(fallback))
}

fn username_or_unknown<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    null_or(d, unknown_username)
}

fn status_or_unknown<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    null_or(d, unknown_status)
}

fn title_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    null_or(d, default_announcement_title)
}

fn color_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    null_or(d, default_announcement_color)
}

fn dismissible_or_true<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    null_or(d, default_true)
}

/// Panel ids come back as numbers or strings depending on the endpoint
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
