//! ServerSage Library
//!
//! Panel API client and local server registry for the ServerSage bot
//!
//! ## Architecture (4 Components)
//!
//! 1. ConfigStore - persisted sections (registry entries, panel credentials)
//! 2. PanelClient - authenticated panel session, cooldown, pagination, endpoints
//! 3. ServerRegistry - stable `server_{n}` keys reconciled against the panel
//! 4. AnnouncementFeed - unseen panel announcements for visible servers
//!
//! ## Design Principles
//!
//! - The panel is the source of truth for which servers exist
//! - The local registry owns display-only state (`hide`)
//! - Errors are typed so callers can tell a cooldown from a hard failure

pub mod announcement_feed;
pub mod config_store;
pub mod error;
pub mod panel_client;
pub mod server_registry;
pub mod state;

pub use error::{Error, Result};
pub use state::{AppConfig, AppState};
