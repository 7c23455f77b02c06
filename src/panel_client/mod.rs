//! PanelClient Module
//!
//! ## Responsibilities
//!
//! - One authenticated session against the hosting panel (bearer token)
//! - Response classification: success / rate limited / gateway timeout /
//!   hard failure / network error
//! - Cooldown after 429 (60 s) and 504 (10 min); calls fail fast meanwhile
//! - Pagination aggregation for listing endpoints
//! - Typed wrappers for the panel endpoints
//!
//! ## Module layout
//! - `types`: request/response shapes, error taxonomy, payloads
//! - `dispatcher`: session, cooldown, classification
//! - `pagination`: page walker
//! - `client`: endpoint wrappers
//! - `mods`: mod enable/disable rename planning
//!
//! ## Usage
//! ```rust,ignore
//! let dispatcher = Arc::new(RequestDispatcher::new(DEFAULT_BASE_URL, api_key));
//! let client = PanelClient::new(dispatcher.clone());
//!
//! let usage = client.resources("a1b2c3d4").await?;
//! let roster = client.players("a1b2c3d4").await?;
//!
//! dispatcher.close().await;
//! ```

pub mod client;
pub mod dispatcher;
pub mod mods;
pub mod pagination;
pub mod types;

// Re-exports
pub use client::PanelClient;
pub use dispatcher::{Clock, CooldownState, MonotonicClock, RequestDispatcher};
pub use mods::{ModAction, ModTogglePlan, WildcardPattern};
pub use pagination::PaginatedFetcher;
pub use types::*;
