//! Server Registry Type Definitions

use crate::config_store::{SectionMap, StoreOp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of every registry section
pub const SERVER_SECTION_PREFIX: &str = "server_";

/// Keys inside a registry section
pub mod keys {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const HIDE: &str = "hide";
}

/// `server_{n}`
pub fn ordinal_key(ordinal: u32) -> String {
    format!("{}{}", SERVER_SECTION_PREFIX, ordinal)
}

/// Ordinal of a canonical `server_{n}` key (n >= 1, no leading zeros)
pub fn parse_ordinal(local_key: &str) -> Option<u32> {
    let digits = local_key.strip_prefix(SERVER_SECTION_PREFIX)?;
    let ordinal: u32 = digits.parse().ok()?;
    (ordinal > 0 && ordinal.to_string() == digits).then_some(ordinal)
}

pub fn is_server_section(section: &str) -> bool {
    section.starts_with(SERVER_SECTION_PREFIX)
}

/// Canonical keys by ordinal, any other `server_*` key after them by name
pub fn sort_by_ordinal(records: &mut [ServerRecord]) {
    records.sort_by(|a, b| {
        (a.ordinal().unwrap_or(u32::MAX), &a.local_key)
            .cmp(&(b.ordinal().unwrap_or(u32::MAX), &b.local_key))
    });
}

/// One remote server as known locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub local_key: String,
    pub remote_id: String,
    pub name: String,
    pub hidden: bool,
}

impl ServerRecord {
    /// Fresh record as created by reconciliation
    pub fn new(local_key: impl Into<String>, remote_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            local_key: local_key.into(),
            remote_id: remote_id.into(),
            name: name.into(),
            hidden: false,
        }
    }

    /// Parse a persisted section; `None` when it carries no usable `id`
    pub fn from_section(local_key: &str, section: &SectionMap) -> Option<Self> {
        let remote_id = section
            .get(keys::ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())?;

        let name = section
            .get(keys::NAME)
            .and_then(Value::as_str)
            .unwrap_or_default();

        let hidden = match section.get(keys::HIDE) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "y"),
            _ => false,
        };

        Some(Self {
            local_key: local_key.to_string(),
            remote_id: remote_id.to_string(),
            name: name.to_string(),
            hidden,
        })
    }

    pub fn ordinal(&self) -> Option<u32> {
        parse_ordinal(&self.local_key)
    }

    /// Writes that create this record
    pub fn create_ops(&self) -> Vec<StoreOp> {
        vec![
            StoreOp::set(&self.local_key, keys::ID, self.remote_id.as_str()),
            StoreOp::set(&self.local_key, keys::NAME, self.name.as_str()),
            StoreOp::set(&self.local_key, keys::HIDE, self.hidden),
        ]
    }

    pub fn summary(&self) -> ServerSummary {
        ServerSummary {
            local_key: self.local_key.clone(),
            remote_id: self.remote_id.clone(),
            name: self.name.clone(),
            hidden: self.hidden,
        }
    }
}

/// Registry entry handed to display code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSummary {
    pub local_key: String,
    pub remote_id: String,
    pub name: String,
    pub hidden: bool,
}

/// Persisted registry as loaded from the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalRegistry {
    pub records: Vec<ServerRecord>,
    /// `server_*` sections without a usable id
    pub malformed: Vec<String>,
}

/// Why a section was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Remote id no longer listed by the panel
    Gone,
    /// Another section already holds the same remote id
    Duplicate,
    /// Section has no id
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Removal {
    pub local_key: String,
    pub remote_id: Option<String>,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rename {
    pub local_key: String,
    pub remote_id: String,
    pub from: String,
    pub to: String,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Registry after the pass, by ordinal key
    pub servers: Vec<ServerSummary>,
    pub created: Vec<ServerSummary>,
    pub renamed: Vec<Rename>,
    pub removed: Vec<Removal>,
}

impl ReconcileReport {
    pub fn change_count(&self) -> usize {
        self.created.len() + self.renamed.len() + self.removed.len()
    }

    pub fn is_noop(&self) -> bool {
        self.change_count() == 0
    }
}

/// Periodic sync status
#[derive(Debug, Clone, Default)]
pub struct PeriodicSyncState {
    /// Last successful pass
    pub last_success: Option<DateTime<Utc>>,
    pub is_running: bool,
    pub next_sync_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}
